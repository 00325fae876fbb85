//! # unimail-core
//!
//! Protocol-agnostic mail retrieval for unimail.
//!
//! This crate provides:
//! - Login parameters and protocol dispatch ([`auto_login`])
//! - IMAP retrieval: mailbox listing, windowed fetch, IDLE-based monitoring
//! - POP3 retrieval of the newest messages
//! - Token exchange for delegated-auth hosts (XOAUTH2)
//! - A normalized [`ParsedMessage`] model
//!
//! ## Quick Start
//!
//! ```ignore
//! use unimail_core::{FetchOptions, LoginParams, MailClient, auto_login};
//!
//! #[tokio::main]
//! async fn main() -> unimail_core::Result<()> {
//!     let params = LoginParams::from_json_file("account.json")?;
//!     let mut client = auto_login(&params).await?;
//!
//!     for message in client.get_email(&FetchOptions::new().with_count(5)).await? {
//!         println!("{} {}", message.internal_date, message.subject);
//!     }
//!
//!     client.close().await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
mod error;
pub mod imap;
pub mod model;
pub mod options;
pub mod params;
pub mod pop3;
pub mod session;
pub mod window;

pub use auth::resolve_access_token;
pub use client::{Client, MailClient, auto_login, auto_login_with};
pub use error::{Error, Result};
pub use imap::ImapAdapter;
pub use model::{Address, Attachment, ParsedMessage};
pub use options::{
    DEFAULT_FETCH_COUNT, DEFAULT_MAILBOX, FetchOptions, MonitorOptions, PartialResultPolicy,
};
pub use params::{LoginParams, Protocol};
pub use pop3::Pop3Adapter;
pub use session::{Connector, ImapSession, NetworkConnector, Pop3Session};
pub use window::fetch_window;
