//! Protocol dispatch and the common client interface.

use std::future::Future;

use tracing::info;
use unimail_imap::ImapStream;
use unimail_oauth::{Provider, RefreshClient, TokenExchange};
use unimail_pop3::Pop3Stream;

use crate::auth::resolve_access_token;
use crate::imap::ImapAdapter;
use crate::model::ParsedMessage;
use crate::options::{FetchOptions, MonitorOptions};
use crate::params::{LoginParams, Protocol};
use crate::pop3::Pop3Adapter;
use crate::session::{Connector, ImapSession, NetworkConnector, Pop3Session};
use crate::{Error, Result};

/// Operations every retrieval client supports.
pub trait MailClient: Send {
    /// Lists mailbox names.
    fn list_mailboxes(&mut self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fetches the newest messages.
    fn get_email(
        &mut self,
        options: &FetchOptions,
    ) -> impl Future<Output = Result<Vec<ParsedMessage>>> + Send;

    /// Waits for new messages.
    fn monit_email(
        &mut self,
        options: &MonitorOptions,
    ) -> impl Future<Output = Result<Vec<ParsedMessage>>> + Send;

    /// Closes the session.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

impl<S: ImapSession> MailClient for ImapAdapter<S> {
    async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        Self::list_mailboxes(self).await
    }

    async fn get_email(&mut self, options: &FetchOptions) -> Result<Vec<ParsedMessage>> {
        Self::get_email(self, options).await
    }

    async fn monit_email(&mut self, options: &MonitorOptions) -> Result<Vec<ParsedMessage>> {
        Self::monit_email(self, options).await
    }

    async fn close(&mut self) -> Result<()> {
        Self::close(self).await
    }
}

impl<S: Pop3Session> MailClient for Pop3Adapter<S> {
    async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        Self::list_mailboxes(self)
    }

    async fn get_email(&mut self, options: &FetchOptions) -> Result<Vec<ParsedMessage>> {
        Self::get_email(self, options).await
    }

    async fn monit_email(&mut self, options: &MonitorOptions) -> Result<Vec<ParsedMessage>> {
        Self::monit_email(self, options).await
    }

    async fn close(&mut self) -> Result<()> {
        Self::close(self).await
    }
}

/// A connected client for whichever protocol was requested.
#[derive(Debug)]
pub enum Client<
    I = unimail_imap::Session<ImapStream>,
    P = unimail_pop3::Session<Pop3Stream>,
> {
    /// IMAP client.
    Imap(ImapAdapter<I>),
    /// POP3 client.
    Pop3(Pop3Adapter<P>),
}

impl<I, P> Client<I, P> {
    /// Returns the protocol in use.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        match self {
            Self::Imap(_) => Protocol::Imap,
            Self::Pop3(_) => Protocol::Pop3,
        }
    }
}

impl<I: ImapSession, P: Pop3Session> MailClient for Client<I, P> {
    async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        match self {
            Self::Imap(c) => c.list_mailboxes().await,
            Self::Pop3(c) => Pop3Adapter::list_mailboxes(c),
        }
    }

    async fn get_email(&mut self, options: &FetchOptions) -> Result<Vec<ParsedMessage>> {
        match self {
            Self::Imap(c) => c.get_email(options).await,
            Self::Pop3(c) => c.get_email(options).await,
        }
    }

    async fn monit_email(&mut self, options: &MonitorOptions) -> Result<Vec<ParsedMessage>> {
        match self {
            Self::Imap(c) => c.monit_email(options).await,
            Self::Pop3(c) => c.monit_email(options).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Imap(c) => c.close().await,
            Self::Pop3(c) => c.close().await,
        }
    }
}

/// Connects and authenticates over the network according to `params`.
///
/// Delegated-auth hosts exchange the refresh token with their identity
/// provider before any connection is opened.
///
/// # Errors
///
/// See [`auto_login_with`].
pub async fn auto_login(params: &LoginParams) -> Result<Client> {
    let exchange = Provider::for_mail_host(&params.host)
        .map_err(|e| Error::Config(e.to_string()))?
        .map(RefreshClient::new);
    auto_login_with(&NetworkConnector, exchange.as_ref(), params).await
}

/// Connects and authenticates with the given connector and token exchange.
///
/// - IMAP: delegated-auth hosts resolve an access token first (failing
///   unless the exchange succeeds) and authenticate with XOAUTH2; other
///   hosts use LOGIN. A rejected session is closed.
/// - POP3: USER/PASS.
/// - SMTP: fails with [`Error::Unimplemented`].
///
/// # Errors
///
/// Returns [`Error::Config`] for invalid parameters or a delegated host
/// without a token exchange, [`Error::AccountBlocked`] or
/// [`Error::Authentication`] from the exchange or login,
/// [`Error::Connection`] for dial failures, or [`Error::Unimplemented`].
pub async fn auto_login_with<C, E>(
    connector: &C,
    exchange: Option<&E>,
    params: &LoginParams,
) -> Result<Client<C::Imap, C::Pop3>>
where
    C: Connector,
    E: TokenExchange,
{
    params.validate()?;
    info!(host = %params.host, port = params.port, protocol = %params.protocol, "logging in");

    match params.protocol {
        Protocol::Imap => login_imap(connector, exchange, params).await.map(Client::Imap),
        Protocol::Pop3 => Pop3Adapter::connect_with(
            connector,
            &params.host,
            params.port,
            &params.user,
            &params.password,
        )
        .await
        .map(Client::Pop3)
        .map_err(|e| match e {
            Error::Connection(reason) => {
                Error::Connection(format!("failed to connect to POP3 server: {reason}"))
            }
            other => other,
        }),
        Protocol::Smtp => Err(Error::Unimplemented(Protocol::Smtp)),
    }
}

async fn login_imap<C, E>(
    connector: &C,
    exchange: Option<&E>,
    params: &LoginParams,
) -> Result<ImapAdapter<C::Imap>>
where
    C: Connector,
    E: TokenExchange,
{
    if !params.is_delegated() {
        return ImapAdapter::connect_with(
            connector,
            &params.host,
            params.port,
            &params.user,
            &params.password,
        )
        .await;
    }

    let exchange = exchange.ok_or_else(|| {
        Error::Config(format!("no token exchange configured for {}", params.host))
    })?;
    let (Some(client_id), Some(refresh_token)) = (&params.client_id, &params.refresh_token)
    else {
        return Err(Error::Config(format!(
            "{} requires client_id and refresh_token",
            params.host
        )));
    };

    let token = resolve_access_token(exchange, refresh_token, client_id).await?;
    ImapAdapter::connect_oauth(connector, &params.host, params.port, &params.user, &token).await
}
