//! Error types for the IMAP session.

use std::io;

use thiserror::Error;

/// Errors from dialing, framing, parsing or a server completion.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket failure or unexpected end of stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS setup failed.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The host is not a valid TLS server name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// The server did not open with `* OK` or `* PREAUTH`.
    #[error("Unexpected greeting: {0}")]
    Greeting(String),

    /// A literal announced more bytes than the session accepts.
    #[error("literal too large: {size} bytes (max {max})")]
    LiteralTooLarge {
        /// Announced size.
        size: usize,
        /// Accepted maximum.
        max: usize,
    },

    /// Malformed response data.
    #[error("Parse error at byte {position}: {message}")]
    Parse {
        /// Offset into the response.
        position: usize,
        /// What was expected.
        message: String,
    },

    /// LOGIN or AUTHENTICATE was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Tagged `NO` completion.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Tagged `BAD` completion.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// The server closed the session with `BYE`.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Command issued in the wrong session state, e.g. while idling.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Response out of sequence, e.g. an unknown tag.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true if the connection is gone: `BYE` or an I/O failure.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Bye(_) | Self::Io(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_disconnect() {
        assert!(Error::Bye("idle timeout".into()).is_disconnect());
        assert!(Error::Io(io::Error::from(io::ErrorKind::UnexpectedEof)).is_disconnect());
        assert!(!Error::No("[NONEXISTENT]".into()).is_disconnect());
    }
}
