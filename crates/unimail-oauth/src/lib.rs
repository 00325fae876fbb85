//! # unimail-oauth
//!
//! Delegated authentication for mail hosts that refuse password logins.
//!
//! ## Features
//!
//! - **Provider table**: Maps mail hosts such as `outlook.office365.com` to
//!   their identity-platform token endpoint
//! - **Refresh-token exchange**: One form-encoded POST, classified into
//!   success, blocked account, or generic failure
//! - **SASL mechanisms**: XOAUTH2 initial response
//!
//! ## Quick Start
//!
//! ```ignore
//! use unimail_oauth::{Provider, RefreshClient, TokenExchange};
//! use unimail_oauth::sasl::xoauth2_response;
//!
//! let provider = Provider::for_mail_host("outlook.office365.com")?
//!     .expect("delegated host");
//! let client = RefreshClient::new(provider);
//!
//! let token = client
//!     .exchange("refresh_token", "client_id")
//!     .await?
//!     .into_result()?;
//!
//! // Send: AUTHENTICATE XOAUTH2 {initial_response}
//! let initial_response = xoauth2_response("user@outlook.com", &token.access_token);
//!
//! // Persist the rotated refresh token if the provider issued one.
//! if let Some(next) = token.refresh_token { /* ... */ }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod provider;
mod refresh;
pub mod sasl;
pub mod token;

pub use error::{Error, Result};
pub use provider::Provider;
pub use refresh::{RefreshClient, TokenExchange, TokenOutcome, classify};
pub use token::{AccessToken, TokenEndpointResponse};
