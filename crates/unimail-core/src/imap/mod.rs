//! IMAP adapter: mailbox listing, windowed fetch and IDLE-based monitoring.

mod convert;
mod monitor;

pub use convert::parse_fetched;

use tracing::{debug, info};
use unimail_imap::ImapStream;
use unimail_oauth::AccessToken;
use unimail_oauth::sasl::xoauth2_response;

use crate::model::ParsedMessage;
use crate::options::{FetchOptions, MonitorOptions, PartialResultPolicy};
use crate::session::{Connector, ImapSession, NetworkConnector};
use crate::window::fetch_window;
use crate::{Error, Result};

/// Retrieval client over an authenticated IMAP session.
///
/// Starts authenticated with no mailbox open; every fetch or monitor call
/// opens its mailbox read-only. After [`ImapAdapter::close`] every call
/// fails with [`Error::Closed`].
#[derive(Debug)]
pub struct ImapAdapter<S> {
    session: Option<S>,
    selected: Option<String>,
}

impl ImapAdapter<unimail_imap::Session<ImapStream>> {
    /// Connects over TLS and logs in with a password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::Authentication`].
    pub async fn connect(host: &str, port: u16, user: &str, password: &str) -> Result<Self> {
        Self::connect_with(&NetworkConnector, host, port, user, password).await
    }
}

impl<S: ImapSession> ImapAdapter<S> {
    /// Wraps an already authenticated session.
    #[must_use]
    pub const fn new(session: S) -> Self {
        Self {
            session: Some(session),
            selected: None,
        }
    }

    /// Connects with `connector` and logs in with a password. The session
    /// is closed again if the login is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::Authentication`].
    pub async fn connect_with<C>(
        connector: &C,
        host: &str,
        port: u16,
        user: &str,
        password: &str,
    ) -> Result<Self>
    where
        C: Connector<Imap = S>,
    {
        let mut session = dial(connector, host, port).await?;
        if let Err(e) = session.login(user, password).await {
            close_quietly(&mut session).await;
            return Err(Error::Authentication(e.to_string()));
        }
        info!(host, "imap login succeeded");
        Ok(Self::new(session))
    }

    /// Connects with `connector` and authenticates with XOAUTH2. The
    /// session is closed again if authentication is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::Authentication`].
    pub async fn connect_oauth<C>(
        connector: &C,
        host: &str,
        port: u16,
        user: &str,
        token: &AccessToken,
    ) -> Result<Self>
    where
        C: Connector<Imap = S>,
    {
        let mut session = dial(connector, host, port).await?;
        let initial = xoauth2_response(user, &token.access_token);
        if let Err(e) = session.authenticate_xoauth2(&initial).await {
            close_quietly(&mut session).await;
            return Err(Error::Authentication(e.to_string()));
        }
        info!(host, "imap xoauth2 authentication succeeded");
        Ok(Self::new(session))
    }

    /// Returns the mailbox opened by the last fetch or monitor call.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Returns true once the adapter has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /// Lists all mailbox names in server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if LIST fails, or [`Error::Closed`].
    pub async fn list_mailboxes(&mut self) -> Result<Vec<String>> {
        let session = self.session.as_mut().ok_or(Error::Closed)?;
        session
            .list_mailboxes()
            .await
            .map_err(|e| Error::Fetch(format!("failed to list mailboxes: {e}")))
    }

    /// Fetches the newest `count` messages of a mailbox.
    ///
    /// The default policy is [`PartialResultPolicy::FailFast`]: one message
    /// that cannot be parsed fails the batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxSelect`], [`Error::Status`], [`Error::Fetch`],
    /// [`Error::Parse`] or [`Error::Closed`].
    pub async fn get_email(&mut self, options: &FetchOptions) -> Result<Vec<ParsedMessage>> {
        let total = self.open(&options.mailbox).await?;
        let Some(range) = fetch_window(total, options.count) else {
            return Ok(Vec::new());
        };

        let session = self.session.as_mut().ok_or(Error::Closed)?;
        debug!(mailbox = %options.mailbox, range = %range, "fetching");
        let fetched = session
            .fetch(range)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let policy = options.policy.unwrap_or(PartialResultPolicy::FailFast);
        policy.collect(fetched.into_iter().map(|f| (f.seq, parse_fetched(f))))
    }

    /// Waits for new messages to arrive in a mailbox.
    ///
    /// Returns once `count` new messages have been collected, once IDLE
    /// cannot be re-entered, or when the timeout fires; in the last two
    /// cases the result holds whatever arrived, possibly nothing. If the
    /// timeout interrupts a command the server never answered, the session
    /// is dropped and the adapter is closed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxSelect`] or [`Error::Status`] if the mailbox
    /// cannot be opened, [`Error::Monitor`] if IDLE cannot be started or the
    /// worker fails, or [`Error::Closed`].
    pub async fn monit_email(&mut self, options: &MonitorOptions) -> Result<Vec<ParsedMessage>> {
        let baseline = self.open(&options.mailbox).await?;
        if options.count == 0 {
            return Ok(Vec::new());
        }

        let mut session = self.session.take().ok_or(Error::Closed)?;
        if let Err(e) = session.idle_start().await {
            self.session = Some(session);
            return Err(Error::Monitor(format!("failed to start IDLE: {e}")));
        }

        info!(mailbox = %options.mailbox, baseline, "monitoring for new mail");
        let plan = monitor::Plan {
            mailbox: options.mailbox.clone(),
            baseline,
            target: usize::try_from(options.count).unwrap_or(usize::MAX),
            poll_interval: options.poll_interval,
            timeout: options.timeout,
        };
        let (session, messages) = monitor::run(session, plan).await?;
        if session.is_none() {
            self.selected = None;
        }
        self.session = session;
        Ok(messages)
    }

    /// Logs out. Later calls fail with [`Error::Closed`]; closing twice is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if LOGOUT fails; the adapter is closed
    /// either way.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        self.selected = None;
        session
            .close()
            .await
            .map_err(|e| Error::Connection(format!("logout failed: {e}")))
    }

    /// Opens a mailbox read-only and returns its message count.
    async fn open(&mut self, mailbox: &str) -> Result<u32> {
        let session = self.session.as_mut().ok_or(Error::Closed)?;
        session
            .examine(mailbox)
            .await
            .map_err(|e| Error::MailboxSelect {
                mailbox: mailbox.to_string(),
                reason: e.to_string(),
            })?;
        self.selected = Some(mailbox.to_string());

        let session = self.session.as_mut().ok_or(Error::Closed)?;
        session
            .message_count(mailbox)
            .await
            .map_err(|e| Error::Status(e.to_string()))
    }
}

async fn dial<C: Connector>(connector: &C, host: &str, port: u16) -> Result<C::Imap> {
    connector
        .connect_imap(host, port)
        .await
        .map_err(|e| Error::Connection(format!("{host}:{port}: {e}")))
}

async fn close_quietly<S: ImapSession>(session: &mut S) {
    if let Err(e) = session.close().await {
        debug!(error = %e, "closing rejected session");
    }
}
