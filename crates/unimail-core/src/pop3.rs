//! POP3 adapter: one fixed inbox, retrieval by index.

use chrono::Utc;
use tracing::{debug, info};
use unimail_mime::{Entity, decode_subject, flatten, parse_address_list};
use unimail_pop3::Pop3Stream;

use crate::model::ParsedMessage;
use crate::options::{DEFAULT_MAILBOX, FetchOptions, MonitorOptions, PartialResultPolicy};
use crate::session::{Connector, NetworkConnector, Pop3Session};
use crate::window::fetch_window;
use crate::{Error, Result};

/// Retrieval client over an authenticated POP3 session.
///
/// POP3 has no mailboxes, flags or receipt times: the mailbox list is just
/// `INBOX`, flags are always empty and `internal_date` is the retrieval
/// time. Monitoring is a single immediate fetch.
#[derive(Debug)]
pub struct Pop3Adapter<S> {
    session: Option<S>,
}

impl Pop3Adapter<unimail_pop3::Session<Pop3Stream>> {
    /// Connects over TLS and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::Authentication`].
    pub async fn connect(host: &str, port: u16, user: &str, password: &str) -> Result<Self> {
        Self::connect_with(&NetworkConnector, host, port, user, password).await
    }
}

impl<S: Pop3Session> Pop3Adapter<S> {
    /// Wraps an already authenticated session.
    #[must_use]
    pub const fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Connects with `connector` and logs in with USER/PASS.
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
        C: Connector<Pop3 = S>,
    {
        let mut session = connector
            .connect_pop3(host, port)
            .await
            .map_err(|e| Error::Connection(format!("{host}:{port}: {e}")))?;

        if let Err(e) = session.login(user, password).await {
            if let Err(quit) = session.quit().await {
                debug!(error = %quit, "closing rejected session");
            }
            return Err(Error::Authentication(e.to_string()));
        }
        info!(host, "pop3 login succeeded");
        Ok(Self::new(session))
    }

    /// Returns `["INBOX"]`; POP3 has a single maildrop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] after [`Pop3Adapter::close`].
    pub fn list_mailboxes(&self) -> Result<Vec<String>> {
        if self.session.is_none() {
            return Err(Error::Closed);
        }
        Ok(vec![DEFAULT_MAILBOX.to_string()])
    }

    /// Retrieves the newest `count` messages. The mailbox name is ignored.
    ///
    /// The default policy is [`PartialResultPolicy::SkipAndContinue`]: a
    /// message that cannot be retrieved or parsed is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] if STAT fails, [`Error::Closed`], or under
    /// fail-fast the first [`Error::Fetch`]/[`Error::Parse`].
    pub async fn get_email(&mut self, options: &FetchOptions) -> Result<Vec<ParsedMessage>> {
        let session = self.session.as_mut().ok_or(Error::Closed)?;
        let stat = session
            .stat()
            .await
            .map_err(|e| Error::Status(e.to_string()))?;

        let Some(range) = fetch_window(stat.count, options.count) else {
            return Ok(Vec::new());
        };
        debug!(range = %range, total = stat.count, "retrieving");

        let policy = options
            .policy
            .unwrap_or(PartialResultPolicy::SkipAndContinue);
        let mut results = Vec::new();
        for index in range.start()..=range.end() {
            let result = match session.retrieve(index).await {
                Ok(raw) => parse_message(index, &raw),
                Err(e) => Err(Error::Fetch(format!("message {index}: {e}"))),
            };
            match result {
                Err(e) if policy == PartialResultPolicy::FailFast => return Err(e),
                other => results.push((index, other)),
            }
        }
        policy.collect(results)
    }

    /// Same as [`Pop3Adapter::get_email`] with the monitor's count; POP3
    /// cannot wait for new mail.
    ///
    /// # Errors
    ///
    /// As [`Pop3Adapter::get_email`].
    pub async fn monit_email(&mut self, options: &MonitorOptions) -> Result<Vec<ParsedMessage>> {
        self.get_email(&options.as_fetch()).await
    }

    /// Sends QUIT. Later calls fail with [`Error::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if QUIT fails.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session
            .quit()
            .await
            .map_err(|e| Error::Connection(format!("quit failed: {e}")))
    }
}

/// Parses one retrieved message.
///
/// Only the first `From` address is kept. The whole body is flattened to
/// one string and treated as HTML if it contains `<html` or `<body`.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the message is not valid MIME.
pub fn parse_message(index: u32, raw: &[u8]) -> Result<ParsedMessage> {
    let entity = Entity::parse(raw).map_err(|e| Error::Parse {
        seq: index,
        reason: e.to_string(),
    })?;
    let header = |name: &str| entity.headers.get(name).unwrap_or_default();
    let addresses = |name: &str| parse_address_list(header(name)).unwrap_or_default();

    let mut message = ParsedMessage::new(Utc::now());
    message.message_id = header("Message-ID").trim().to_string();
    message.subject = decode_subject(header("Subject"));
    message.from = addresses("From").into_iter().take(1).collect();
    message.to = addresses("To");
    message.cc = addresses("Cc");

    let flat = flatten(&entity);
    if !flat.body.is_empty() {
        if looks_like_html(&flat.body) {
            message.html_body = Some(flat.body);
        } else {
            message.text_body = Some(flat.body);
        }
    }
    message.attachments = flat.attachments;

    debug!(index, subject = %message.subject, "parsed");
    Ok(message)
}

fn looks_like_html(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("<html") || lower.contains("<body")
}
