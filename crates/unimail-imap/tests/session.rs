//! Session tests against a scripted server.
//!
//! The mock stream replays canned server output and records what the
//! client wrote, so command formatting can be checked after the fact.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use unimail_imap::{Error, Flag, SequenceRange, Session};

struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Vec<u8>,
}

impl MockStream {
    fn new(responses: &[u8]) -> Self {
        Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Vec::new(),
        }
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

const MESSAGE: &[u8] = b"From: Alice <alice@example.com>\r\nSubject: Hi\r\n\r\nHello\r\n";

fn fetch_line(seq: u32) -> Vec<u8> {
    let mut line = format!(
        "* {seq} FETCH (FLAGS (\\Seen) INTERNALDATE \"01-Feb-2024 09:30:00 +0000\" \
         RFC822.SIZE {} BODY[] {{{}}}\r\n",
        MESSAGE.len(),
        MESSAGE.len()
    )
    .into_bytes();
    line.extend_from_slice(MESSAGE);
    line.extend_from_slice(b")\r\n");
    line
}

#[tokio::test]
async fn test_list_examine_fetch_flow() {
    let mut script = Vec::new();
    script.extend_from_slice(b"* OK [CAPABILITY IMAP4rev1 IDLE] ready\r\n");
    script.extend_from_slice(b"A0001 OK LOGIN completed\r\n");
    script.extend_from_slice(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n");
    script.extend_from_slice(b"* LIST (\\HasNoChildren) \"/\" \"&XfJT0ZAB-\"\r\n");
    script.extend_from_slice(b"A0002 OK LIST completed\r\n");
    script.extend_from_slice(b"* 2 EXISTS\r\n* 0 RECENT\r\n");
    script.extend_from_slice(b"* OK [UIDVALIDITY 1] UIDs valid\r\n");
    script.extend_from_slice(b"A0003 OK [READ-ONLY] EXAMINE completed\r\n");
    script.extend_from_slice(&fetch_line(2));
    script.extend_from_slice(&fetch_line(1));
    script.extend_from_slice(b"A0004 OK FETCH completed\r\n");

    let mut session = Session::from_stream(MockStream::new(&script)).await.unwrap();
    session.login("alice@example.com", "secret").await.unwrap();

    let mailboxes = session.list().await.unwrap();
    assert_eq!(mailboxes, vec!["INBOX".to_string(), "已发送".to_string()]);

    assert_eq!(session.examine("INBOX").await.unwrap(), 2);

    let messages = session
        .fetch(SequenceRange::new(1, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].seq, 1);
    assert_eq!(messages[1].seq, 2);
    assert_eq!(messages[0].flags, vec![Flag::Seen]);
    assert_eq!(messages[0].body.as_deref(), Some(MESSAGE));
    assert_eq!(
        messages[0].size,
        Some(u32::try_from(MESSAGE.len()).unwrap())
    );
}

#[tokio::test]
async fn test_commands_written() {
    let script = b"* OK ready\r\n\
A0001 OK logged in\r\n\
* STATUS \"Sent Items\" (MESSAGES 17)\r\n\
A0002 OK STATUS completed\r\n";

    let mut mock = MockStream::new(script);
    {
        let mut session = Session::from_stream(&mut mock).await.unwrap();
        session.login("bob", "two words").await.unwrap();
        assert_eq!(session.status_messages("Sent Items").await.unwrap(), 17);
    }

    let sent = String::from_utf8(mock.sent).unwrap();
    assert_eq!(
        sent,
        "A0001 LOGIN bob \"two words\"\r\nA0002 STATUS \"Sent Items\" (MESSAGES)\r\n"
    );
}

#[tokio::test]
async fn test_xoauth2_success() {
    let script = b"* OK ready\r\n+ \r\nA0001 OK AUTHENTICATE completed\r\n";
    let mut mock = MockStream::new(script);
    {
        let mut session = Session::from_stream(&mut mock).await.unwrap();
        session.authenticate_xoauth2("dXNlcj1h").await.unwrap();
    }
    assert_eq!(
        String::from_utf8(mock.sent).unwrap(),
        "A0001 AUTHENTICATE XOAUTH2\r\ndXNlcj1h\r\n"
    );
}

#[tokio::test]
async fn test_xoauth2_error_challenge() {
    let script = b"* OK ready\r\n\
+ \r\n\
+ eyJzdGF0dXMiOiI0MDEifQ==\r\n\
A0001 NO AUTHENTICATE failed\r\n";
    let mut mock = MockStream::new(script);
    {
        let mut session = Session::from_stream(&mut mock).await.unwrap();
        let err = session.authenticate_xoauth2("dXNlcj1h").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
    assert_eq!(
        String::from_utf8(mock.sent).unwrap(),
        "A0001 AUTHENTICATE XOAUTH2\r\ndXNlcj1h\r\n\r\n"
    );
}

#[tokio::test]
async fn test_examine_missing_mailbox() {
    let script = b"* OK ready\r\nA0001 NO [NONEXISTENT] no such mailbox\r\n";
    let mut session = Session::from_stream(MockStream::new(script)).await.unwrap();
    let err = session.examine("Nope").await.unwrap_err();
    assert!(matches!(err, Error::No(_)));
}

#[tokio::test]
async fn test_logout_tolerates_closed_stream() {
    let script = b"* OK ready\r\n* BYE logging out\r\n";
    let mut session = Session::from_stream(MockStream::new(script)).await.unwrap();
    session.logout().await.unwrap();
}

#[tokio::test]
async fn test_unsolicited_fetch_outside_range_dropped() {
    let mut script = Vec::new();
    script.extend_from_slice(b"* OK ready\r\n");
    script.extend_from_slice(b"* 9 FETCH (FLAGS (\\Deleted))\r\n");
    script.extend_from_slice(&fetch_line(3));
    script.extend_from_slice(b"A0001 OK FETCH completed\r\n");

    let mut session = Session::from_stream(MockStream::new(&script)).await.unwrap();
    let messages = session
        .fetch(SequenceRange::new(3, 3).unwrap())
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].seq, 3);
}
