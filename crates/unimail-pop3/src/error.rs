//! Error types for the POP3 library.

use thiserror::Error;

/// Errors that can occur during POP3 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Server answered `-ERR`.
    #[error("Server returned -ERR: {0}")]
    Err(String),

    /// USER or PASS was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Malformed or unexpected server output.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
