//! # unimail-imap
//!
//! A small async IMAP4rev1 client covering what a retrieval tool needs:
//! greeting, LOGIN, SASL XOAUTH2, LIST, EXAMINE, STATUS, FETCH and IDLE.
//!
//! ## Quick Start
//!
//! ```ignore
//! use unimail_imap::{SequenceRange, connect};
//!
//! #[tokio::main]
//! async fn main() -> unimail_imap::Result<()> {
//!     let mut session = connect("imap.example.com", 993).await?;
//!     session.login("user@example.com", "password").await?;
//!
//!     let total = session.examine("INBOX").await?;
//!     if let Some(range) = SequenceRange::new(total.saturating_sub(9).max(1), total) {
//!         for message in session.fetch(range).await? {
//!             println!("{} {:?}", message.seq, message.envelope);
//!         }
//!     }
//!
//!     session.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## IDLE
//!
//! [`Session::idle`] puts the session into IDLE; every other command is
//! refused until [`Session::idle_done`] has been called.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod connection;
mod error;
pub mod parser;
mod session;
mod tag;
pub mod types;
pub mod utf7;

pub use connection::{ImapStream, connect_tls};
pub use error::{Error, Result};
pub use session::{Session, connect};
pub use types::{Address, Envelope, FetchedMessage, Flag, SequenceRange};
