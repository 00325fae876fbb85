//! IMAP session: command issuing and response collection.
//!
//! A session is used strictly sequentially. While IDLE is active the only
//! valid command is DONE (`idle_done`); any other command fails with
//! `Error::InvalidState`.

#![allow(clippy::missing_errors_doc)]

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use crate::connection::{FramedStream, ImapStream, connect_tls};
use crate::parser::{
    Response, Status, parse_exists, parse_fetch, parse_list, parse_status_messages,
    untagged_status,
};
use crate::tag::TagGenerator;
use crate::types::{FetchedMessage, SequenceRange};
use crate::utf7::encode_mailbox_name;
use crate::{Error, Result};

/// Data items requested for every fetched message.
const FETCH_ITEMS: &str = "(FLAGS INTERNALDATE RFC822.SIZE ENVELOPE BODY.PEEK[])";

/// One argument of a command line.
enum Arg<'a> {
    /// Sent verbatim.
    Raw(&'a str),
    /// Sent as an atom, quoted string or literal, whichever fits.
    Str(&'a str),
}

/// An IMAP session over any async byte stream.
pub struct Session<S> {
    stream: FramedStream<S>,
    tags: TagGenerator,
    idle_tag: Option<String>,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tags", &self.tags)
            .field("idle_tag", &self.idle_tag)
            .finish_non_exhaustive()
    }
}

/// Connects over implicit TLS and reads the server greeting.
pub async fn connect(host: &str, port: u16) -> Result<Session<ImapStream>> {
    let stream = connect_tls(host, port).await?;
    Session::from_stream(stream).await
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an established stream and consumes the greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut stream = FramedStream::new(stream);
        let greeting = stream.read_response().await?;

        match Response::parse(&greeting)? {
            Response::Untagged(payload) => match untagged_status(&payload) {
                Some((Status::Ok | Status::PreAuth, text)) => {
                    debug!(greeting = %text, "imap server ready");
                }
                Some((Status::Bye, text)) => return Err(Error::Bye(text)),
                _ => return Err(unexpected_greeting(&payload)),
            },
            _ => return Err(unexpected_greeting(&greeting)),
        }

        Ok(Self {
            stream,
            tags: TagGenerator::default(),
            idle_tag: None,
        })
    }

    /// Returns true while IDLE is active.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.idle_tag.is_some()
    }

    /// Authenticates with LOGIN.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        match self
            .command(&[Arg::Raw("LOGIN"), Arg::Str(user), Arg::Str(password)])
            .await
        {
            Err(Error::No(text)) => Err(Error::Auth(text)),
            other => other.map(|_| ()),
        }
    }

    /// Authenticates with SASL XOAUTH2.
    ///
    /// `initial_response` is the base64 XOAUTH2 client response. If the
    /// server answers with an error challenge, an empty response is sent so
    /// it can complete the exchange with a tagged NO.
    pub async fn authenticate_xoauth2(&mut self, initial_response: &str) -> Result<()> {
        self.ensure_not_idle()?;
        let tag = self.tags.next_tag();
        self.stream
            .write_line(format!("{tag} AUTHENTICATE XOAUTH2").as_bytes())
            .await?;

        let mut sent = false;
        loop {
            let raw = self.stream.read_response().await?;
            match Response::parse(&raw)? {
                Response::Continuation(_) if !sent => {
                    self.stream.write_line(initial_response.as_bytes()).await?;
                    sent = true;
                }
                Response::Continuation(challenge) => {
                    debug!(challenge = %challenge, "xoauth2 error challenge");
                    self.stream.write_line(b"").await?;
                }
                Response::Untagged(_) => {}
                Response::Tagged { tag: t, status, text } if t == tag => {
                    return match status {
                        Status::Ok => Ok(()),
                        _ => Err(Error::Auth(text)),
                    };
                }
                Response::Tagged { tag: t, .. } => {
                    return Err(Error::Protocol(format!("unexpected tag {t}")));
                }
            }
        }
    }

    /// Lists every mailbox name, decoded from modified UTF-7.
    pub async fn list(&mut self) -> Result<Vec<String>> {
        let untagged = self
            .command(&[Arg::Raw("LIST"), Arg::Raw("\"\""), Arg::Raw("\"*\"")])
            .await?;

        let mut names = Vec::new();
        for payload in &untagged {
            if let Some(name) = parse_list(payload)? {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Opens a mailbox read-only and returns its message count.
    pub async fn examine(&mut self, mailbox: &str) -> Result<u32> {
        let encoded = encode_mailbox_name(mailbox);
        let untagged = self
            .command(&[Arg::Raw("EXAMINE"), Arg::Str(&encoded)])
            .await?;

        Ok(untagged
            .iter()
            .filter_map(|payload| parse_exists(payload))
            .last()
            .unwrap_or(0))
    }

    /// Returns the MESSAGES count reported by STATUS.
    pub async fn status_messages(&mut self, mailbox: &str) -> Result<u32> {
        let encoded = encode_mailbox_name(mailbox);
        let untagged = self
            .command(&[
                Arg::Raw("STATUS"),
                Arg::Str(&encoded),
                Arg::Raw("(MESSAGES)"),
            ])
            .await?;

        for payload in &untagged {
            if let Some(count) = parse_status_messages(payload)? {
                return Ok(count);
            }
        }
        Err(Error::Protocol(
            "STATUS response missing MESSAGES".to_string(),
        ))
    }

    /// Fetches flags, dates, size, envelope and full body for a range,
    /// without setting `\Seen`.
    ///
    /// Results are ordered by sequence number; unsolicited FETCH responses
    /// outside the range are dropped.
    pub async fn fetch(&mut self, range: SequenceRange) -> Result<Vec<FetchedMessage>> {
        let set = range.to_string();
        let untagged = self
            .command(&[Arg::Raw("FETCH"), Arg::Raw(&set), Arg::Raw(FETCH_ITEMS)])
            .await?;

        let mut messages = Vec::new();
        for payload in &untagged {
            if let Some(message) = parse_fetch(payload)?
                && (range.start()..=range.end()).contains(&message.seq)
            {
                messages.push(message);
            }
        }
        messages.sort_by_key(|m| m.seq);
        trace!(range = %range, count = messages.len(), "fetched");
        Ok(messages)
    }

    /// Enters IDLE and waits for the server's continuation.
    pub async fn idle(&mut self) -> Result<()> {
        self.ensure_not_idle()?;
        let tag = self.tags.next_tag();
        self.stream
            .write_line(format!("{tag} IDLE").as_bytes())
            .await?;

        loop {
            let raw = self.stream.read_response().await?;
            match Response::parse(&raw)? {
                Response::Continuation(_) => {
                    self.idle_tag = Some(tag);
                    return Ok(());
                }
                Response::Untagged(_) => {}
                Response::Tagged { status, text, .. } => return Err(status_error(status, text)),
            }
        }
    }

    /// Leaves IDLE with DONE. Untagged updates received meanwhile are
    /// discarded. Does nothing if IDLE is not active.
    pub async fn idle_done(&mut self) -> Result<()> {
        let Some(tag) = self.idle_tag.take() else {
            return Ok(());
        };
        self.stream.write_line(b"DONE").await?;
        self.read_until_tagged(&tag).await.map(|_| ())
    }

    /// Ends the session with LOGOUT and closes the stream.
    pub async fn logout(&mut self) -> Result<()> {
        if let Err(e) = self.idle_done().await {
            debug!(error = %e, "leaving idle before logout failed");
        }

        let result = match self.command(&[Arg::Raw("LOGOUT")]).await {
            Err(e) if !e.is_disconnect() => Err(e),
            _ => Ok(()),
        };
        if let Err(e) = self.stream.shutdown().await {
            trace!(error = %e, "shutdown after logout");
        }
        result
    }

    fn ensure_not_idle(&self) -> Result<()> {
        if self.is_idle() {
            return Err(Error::InvalidState(
                "command issued while IDLE is active".to_string(),
            ));
        }
        Ok(())
    }

    /// Sends a tagged command and returns the untagged payloads received
    /// before its completion.
    async fn command(&mut self, args: &[Arg<'_>]) -> Result<Vec<Vec<u8>>> {
        self.ensure_not_idle()?;
        let tag = self.tags.next_tag();
        self.send(&tag, args).await?;
        self.read_until_tagged(&tag).await
    }

    async fn send(&mut self, tag: &str, args: &[Arg<'_>]) -> Result<()> {
        let mut line = tag.as_bytes().to_vec();
        for arg in args {
            line.push(b' ');
            match arg {
                Arg::Raw(raw) => line.extend_from_slice(raw.as_bytes()),
                Arg::Str(s) if needs_literal(s) => {
                    line.extend_from_slice(format!("{{{}}}", s.len()).as_bytes());
                    self.stream.write_line(&line).await?;
                    self.expect_continuation(tag).await?;
                    line = s.as_bytes().to_vec();
                }
                Arg::Str(s) => write_astring(&mut line, s),
            }
        }
        self.stream.write_line(&line).await
    }

    async fn expect_continuation(&mut self, tag: &str) -> Result<()> {
        loop {
            let raw = self.stream.read_response().await?;
            match Response::parse(&raw)? {
                Response::Continuation(_) => return Ok(()),
                Response::Untagged(_) => {}
                Response::Tagged { tag: t, status, text } if t == tag => {
                    return Err(status_error(status, text));
                }
                Response::Tagged { tag: t, .. } => {
                    return Err(Error::Protocol(format!("unexpected tag {t}")));
                }
            }
        }
    }

    async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut untagged = Vec::new();
        let mut bye = None;

        loop {
            let raw = match self.stream.read_response().await {
                Ok(raw) => raw,
                Err(e) => return Err(bye.map_or(e, Error::Bye)),
            };

            match Response::parse(&raw)? {
                Response::Tagged { tag: t, status, text } if t == tag => {
                    return match status {
                        Status::Ok => Ok(untagged),
                        _ => Err(status_error(status, text)),
                    };
                }
                Response::Tagged { tag: t, .. } => {
                    return Err(Error::Protocol(format!("unexpected tag {t}")));
                }
                Response::Continuation(_) => {
                    return Err(Error::Protocol("unexpected continuation".to_string()));
                }
                Response::Untagged(payload) => {
                    if let Some((Status::Bye, text)) = untagged_status(&payload) {
                        bye = Some(text);
                    }
                    untagged.push(payload);
                }
            }
        }
    }
}

fn unexpected_greeting(line: &[u8]) -> Error {
    Error::Greeting(String::from_utf8_lossy(line).trim_end().to_string())
}

fn status_error(status: Status, text: String) -> Error {
    match status {
        Status::No => Error::No(text),
        Status::Bad => Error::Bad(text),
        Status::Bye => Error::Bye(text),
        Status::Ok | Status::PreAuth => {
            Error::Protocol(format!("unexpected completion: {text}"))
        }
    }
}

/// Strings that cannot travel as a quoted string are sent as literals.
fn needs_literal(s: &str) -> bool {
    s.bytes().any(|b| b == b'\r' || b == b'\n' || !b.is_ascii())
}

fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b == 0x7F
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn astring(s: &str) -> String {
        let mut buf = Vec::new();
        write_astring(&mut buf, s);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_astring() {
        assert_eq!(astring("INBOX"), "INBOX");
        assert_eq!(astring("Sent Items"), "\"Sent Items\"");
        assert_eq!(astring("pa\"ss"), "\"pa\\\"ss\"");
        assert_eq!(astring(""), "\"\"");
    }

    #[test]
    fn test_needs_literal() {
        assert!(needs_literal("pässword"));
        assert!(!needs_literal("plain"));
    }

    #[tokio::test]
    async fn test_greeting_bye_rejected() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Session::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_greeting_must_be_untagged_ok() {
        let mock = Builder::new().read(b"A1 OK hello\r\n").build();
        let err = Session::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Greeting(line) if line == "A1 OK hello"));
    }

    #[tokio::test]
    async fn test_login_rejected_maps_to_auth() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN user@example.com secret\r\n")
            .read(b"A0001 NO [AUTHENTICATIONFAILED] nope\r\n")
            .build();
        let mut session = Session::from_stream(mock).await.unwrap();
        let err = session.login("user@example.com", "secret").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_login_with_literal_password() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN bob {6}\r\n")
            .read(b"+ go ahead\r\n")
            .write("pässw\r\n".as_bytes())
            .read(b"A0001 OK done\r\n")
            .build();
        let mut session = Session::from_stream(mock).await.unwrap();
        session.login("bob", "pässw").await.unwrap();
    }

    #[tokio::test]
    async fn test_command_while_idle_is_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 IDLE\r\n")
            .read(b"+ idling\r\n")
            .build();
        let mut session = Session::from_stream(mock).await.unwrap();
        session.idle().await.unwrap();
        assert!(session.is_idle());

        let err = session.status_messages("INBOX").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_idle_done_discards_updates() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 IDLE\r\n")
            .read(b"+ idling\r\n")
            .write(b"DONE\r\n")
            .read(b"* 5 EXISTS\r\n")
            .read(b"A0001 OK IDLE terminated\r\n")
            .write(b"A0002 STATUS INBOX (MESSAGES)\r\n")
            .read(b"* STATUS INBOX (MESSAGES 5)\r\n")
            .read(b"A0002 OK done\r\n")
            .build();
        let mut session = Session::from_stream(mock).await.unwrap();
        session.idle().await.unwrap();
        session.idle_done().await.unwrap();
        assert!(!session.is_idle());
        assert_eq!(session.status_messages("INBOX").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_bye_then_eof_reports_bye() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 STATUS INBOX (MESSAGES)\r\n")
            .read(b"* BYE shutting down\r\n")
            .build();
        let mut session = Session::from_stream(mock).await.unwrap();
        let err = session.status_messages("INBOX").await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "shutting down"));
    }
}
