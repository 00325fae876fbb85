//! Error types for the core library.

use thiserror::Error;

use crate::params::Protocol;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Dial, TLS or greeting failure.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Credentials rejected or token exchange failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The identity provider reported the account as blocked.
    #[error("Account blocked: {0}")]
    AccountBlocked(String),

    /// The protocol selector is not recognized.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The protocol is recognized but has no retrieval client.
    #[error("{0} is not implemented")]
    Unimplemented(Protocol),

    /// The mailbox could not be opened.
    #[error("Failed to select mailbox {mailbox}: {reason}")]
    MailboxSelect {
        /// Mailbox name.
        mailbox: String,
        /// Server or transport error.
        reason: String,
    },

    /// The message count could not be read.
    #[error("Failed to get message count: {0}")]
    Status(String),

    /// Listing or fetching messages failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// A message could not be parsed.
    #[error("Failed to parse message {seq}: {reason}")]
    Parse {
        /// Sequence number of the message.
        seq: u32,
        /// Parser error.
        reason: String,
    },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The monitoring task failed.
    #[error("Monitoring failed: {0}")]
    Monitor(String),

    /// The client has been closed.
    #[error("Client is closed")]
    Closed,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
