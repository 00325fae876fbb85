//! POP3 session: USER/PASS, STAT, RETR, QUIT.

#![allow(clippy::missing_errors_doc)]

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

use crate::stream::{Pop3Stream, connect_tls};
use crate::{Error, Result};

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Maximum message size accepted from RETR.
const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Mailbox totals reported by STAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Number of messages in the maildrop.
    pub count: u32,
    /// Total size in octets.
    pub size: u64,
}

/// A POP3 session over any async byte stream.
pub struct Session<S> {
    reader: BufReader<S>,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Connects over implicit TLS and reads the server greeting.
pub async fn connect(host: &str, port: u16) -> Result<Session<Pop3Stream>> {
    let stream = connect_tls(host, port).await?;
    Session::from_stream(stream).await
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an established stream and consumes the `+OK` greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut session = Self {
            reader: BufReader::new(stream),
        };
        let greeting = session.read_status().await?;
        debug!(greeting = %greeting, "pop3 server ready");
        Ok(session)
    }

    /// Authenticates with USER and PASS.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let auth_failed = |e: Error| match e {
            Error::Err(text) => Error::Auth(text),
            other => other,
        };

        self.write_line(&format!("USER {user}")).await?;
        self.read_status().await.map_err(auth_failed)?;
        self.write_line(&format!("PASS {password}")).await?;
        self.read_status().await.map_err(auth_failed)?;
        Ok(())
    }

    /// Returns the message count and total size.
    pub async fn stat(&mut self) -> Result<Stat> {
        self.write_line("STAT").await?;
        let text = self.read_status().await?;

        let mut fields = text.split_whitespace();
        let count = fields.next().and_then(|s| s.parse().ok());
        let size = fields.next().and_then(|s| s.parse().ok());
        match (count, size) {
            (Some(count), Some(size)) => Ok(Stat { count, size }),
            _ => Err(Error::Protocol(format!("malformed STAT response: {text}"))),
        }
    }

    /// Retrieves message `index` (1-based) as raw bytes, dot-unstuffed,
    /// with CRLF line endings preserved.
    pub async fn retr(&mut self, index: u32) -> Result<Vec<u8>> {
        self.write_line(&format!("RETR {index}")).await?;
        self.read_status().await?;
        let message = self.read_multiline().await?;
        trace!(index, size = message.len(), "retrieved");
        Ok(message)
    }

    /// Ends the session with QUIT and closes the stream.
    pub async fn quit(&mut self) -> Result<()> {
        self.write_line("QUIT").await?;
        let result = match self.read_status().await {
            Ok(_) => Ok(()),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = self.reader.get_mut().shutdown().await {
            trace!(error = %e, "shutdown after quit");
        }
        result
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;
        Ok(())
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

    /// Reads a single-line status response and returns the text after
    /// `+OK`.
    async fn read_status(&mut self) -> Result<String> {
        let line = self.read_line().await?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end();

        if let Some(text) = line.strip_prefix("+OK") {
            Ok(text.trim().to_string())
        } else if let Some(text) = line.strip_prefix("-ERR") {
            Err(Error::Err(text.trim().to_string()))
        } else {
            Err(Error::Protocol(format!("unexpected status line: {line}")))
        }
    }

    async fn read_multiline(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        loop {
            let line = self.read_line().await?;
            let content = line
                .strip_suffix(b"\r\n")
                .or_else(|| line.strip_suffix(b"\n"))
                .unwrap_or(&line);

            if content == b"." {
                return Ok(out);
            }

            let unstuffed = content.strip_prefix(b".").unwrap_or(content);
            out.extend_from_slice(unstuffed);
            out.extend_from_slice(b"\r\n");

            if out.len() > MAX_MESSAGE_SIZE {
                return Err(Error::Protocol(format!(
                    "message exceeds {MAX_MESSAGE_SIZE} bytes"
                )));
            }
        }
    }
}
