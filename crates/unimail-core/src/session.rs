//! Session traits the adapters are written against.
//!
//! The wire crates implement these for their live sessions; tests plug in
//! in-memory fakes. Errors stay in the wire crates' types here and are
//! given context by the adapters.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use unimail_imap::{FetchedMessage, ImapStream, SequenceRange};
use unimail_pop3::{Pop3Stream, Stat};

/// An IMAP session: authenticate, open a mailbox, fetch, IDLE.
pub trait ImapSession: Send + 'static {
    /// Authenticates with LOGIN.
    fn login(
        &mut self,
        user: &str,
        password: &str,
    ) -> impl Future<Output = unimail_imap::Result<()>> + Send;

    /// Authenticates with SASL XOAUTH2 using a ready-made initial response.
    fn authenticate_xoauth2(
        &mut self,
        initial_response: &str,
    ) -> impl Future<Output = unimail_imap::Result<()>> + Send;

    /// Lists every mailbox name in server order.
    fn list_mailboxes(&mut self) -> impl Future<Output = unimail_imap::Result<Vec<String>>> + Send;

    /// Opens a mailbox read-only.
    fn examine(&mut self, mailbox: &str) -> impl Future<Output = unimail_imap::Result<u32>> + Send;

    /// Returns the mailbox's message count.
    fn message_count(
        &mut self,
        mailbox: &str,
    ) -> impl Future<Output = unimail_imap::Result<u32>> + Send;

    /// Fetches a range from the open mailbox.
    fn fetch(
        &mut self,
        range: SequenceRange,
    ) -> impl Future<Output = unimail_imap::Result<Vec<FetchedMessage>>> + Send;

    /// Enters IDLE.
    fn idle_start(&mut self) -> impl Future<Output = unimail_imap::Result<()>> + Send;

    /// Leaves IDLE; a no-op when not idling.
    fn idle_stop(&mut self) -> impl Future<Output = unimail_imap::Result<()>> + Send;

    /// Logs out and closes the connection.
    fn close(&mut self) -> impl Future<Output = unimail_imap::Result<()>> + Send;
}

/// A POP3 session: authenticate, count, retrieve by index.
pub trait Pop3Session: Send + 'static {
    /// Authenticates with USER/PASS.
    fn login(
        &mut self,
        user: &str,
        password: &str,
    ) -> impl Future<Output = unimail_pop3::Result<()>> + Send;

    /// Returns message count and total size.
    fn stat(&mut self) -> impl Future<Output = unimail_pop3::Result<Stat>> + Send;

    /// Retrieves one message by 1-based index.
    fn retrieve(&mut self, index: u32)
    -> impl Future<Output = unimail_pop3::Result<Vec<u8>>> + Send;

    /// Sends QUIT and closes the connection.
    fn quit(&mut self) -> impl Future<Output = unimail_pop3::Result<()>> + Send;
}

/// Opens connected (greeted, not yet authenticated) sessions.
pub trait Connector: Send + Sync {
    /// IMAP session type.
    type Imap: ImapSession;
    /// POP3 session type.
    type Pop3: Pop3Session;

    /// Dials an IMAP server.
    fn connect_imap(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = unimail_imap::Result<Self::Imap>> + Send;

    /// Dials a POP3 server.
    fn connect_pop3(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = unimail_pop3::Result<Self::Pop3>> + Send;
}

/// Connects over implicit TLS with the wire crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector;

impl Connector for NetworkConnector {
    type Imap = unimail_imap::Session<ImapStream>;
    type Pop3 = unimail_pop3::Session<Pop3Stream>;

    async fn connect_imap(&self, host: &str, port: u16) -> unimail_imap::Result<Self::Imap> {
        unimail_imap::connect(host, port).await
    }

    async fn connect_pop3(&self, host: &str, port: u16) -> unimail_pop3::Result<Self::Pop3> {
        unimail_pop3::connect(host, port).await
    }
}

impl<S> ImapSession for unimail_imap::Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn login(&mut self, user: &str, password: &str) -> unimail_imap::Result<()> {
        Self::login(self, user, password).await
    }

    async fn authenticate_xoauth2(&mut self, initial_response: &str) -> unimail_imap::Result<()> {
        Self::authenticate_xoauth2(self, initial_response).await
    }

    async fn list_mailboxes(&mut self) -> unimail_imap::Result<Vec<String>> {
        self.list().await
    }

    async fn examine(&mut self, mailbox: &str) -> unimail_imap::Result<u32> {
        Self::examine(self, mailbox).await
    }

    async fn message_count(&mut self, mailbox: &str) -> unimail_imap::Result<u32> {
        self.status_messages(mailbox).await
    }

    async fn fetch(&mut self, range: SequenceRange) -> unimail_imap::Result<Vec<FetchedMessage>> {
        Self::fetch(self, range).await
    }

    async fn idle_start(&mut self) -> unimail_imap::Result<()> {
        self.idle().await
    }

    async fn idle_stop(&mut self) -> unimail_imap::Result<()> {
        self.idle_done().await
    }

    async fn close(&mut self) -> unimail_imap::Result<()> {
        self.logout().await
    }
}

impl<S> Pop3Session for unimail_pop3::Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn login(&mut self, user: &str, password: &str) -> unimail_pop3::Result<()> {
        Self::login(self, user, password).await
    }

    async fn stat(&mut self) -> unimail_pop3::Result<Stat> {
        Self::stat(self).await
    }

    async fn retrieve(&mut self, index: u32) -> unimail_pop3::Result<Vec<u8>> {
        self.retr(index).await
    }

    async fn quit(&mut self) -> unimail_pop3::Result<()> {
        Self::quit(self).await
    }
}
