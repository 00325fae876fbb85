//! Framed I/O for IMAP protocol.
//!
//! Responses are CRLF-terminated lines that may embed literals
//! (`{n}\r\n` followed by `n` raw bytes).

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Buffered reader/writer speaking IMAP framing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one complete response, including any embedded literals.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, on EOF, or if a line or literal
    /// exceeds the size limits.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(literal_len) = literal_length(&line) else {
                break;
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::LiteralTooLarge {
                    size: literal_len,
                    max: MAX_LITERAL_SIZE,
                });
            }

            let start = response.len();
            response.resize(start + literal_len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }

        Ok(response)
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&buf[..=pos]);
                self.reader.consume(pos + 1);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes `line` followed by CRLF and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(line);
        self.write_buffer.extend_from_slice(b"\r\n");

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Shuts down the write half of the underlying stream.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }
}

/// Parses a trailing literal marker `{n}` or `{n+}` from a line.
fn literal_length(line: &[u8]) -> Option<usize> {
    let line = line
        .strip_suffix(b"\r\n")
        .or_else(|| line.strip_suffix(b"\n"))?;
    let inner = line.strip_suffix(b"}")?;
    let open = inner.iter().rposition(|&b| b == b'{')?;
    let digits = &inner[open + 1..];
    let digits = digits.strip_suffix(b"+").unwrap_or(digits);

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length(b"BODY[] {123}\r\n"), Some(123));
        assert_eq!(literal_length(b"BODY[] {123+}\r\n"), Some(123));
        assert_eq!(literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(literal_length(b"no literal\r\n"), None);
        assert_eq!(literal_length(b"incomplete {123"), None);
        assert_eq!(literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(literal_length(b"empty {}\r\n"), None);
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_read_with_literal_split_across_reads() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {11}\r\nHello")
            .read(b" World)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[] {11}\r\nHello World)\r\n");
    }

    #[tokio::test]
    async fn test_literal_containing_crlf() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {4}\r\na\r\nb)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[] {4}\r\na\r\nb)\r\n");
    }

    #[tokio::test]
    async fn test_write_line_appends_crlf() {
        let mock = Builder::new().write(b"A0001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_line(b"A0001 NOOP").await.unwrap();
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::LiteralTooLarge { max: MAX_LITERAL_SIZE, .. }));
    }

    #[tokio::test]
    async fn test_eof_is_error() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);
        assert!(framed.read_response().await.is_err());
    }
}
