//! # unimail-pop3
//!
//! A minimal async POP3 client: implicit-TLS connect, USER/PASS, STAT,
//! RETR and QUIT. POP3 has a single maildrop and no server-side flags, so
//! this is all a retrieval client needs.
//!
//! ```ignore
//! let mut session = unimail_pop3::connect("pop.example.com", 995).await?;
//! session.login("user@example.com", "password").await?;
//! let stat = session.stat().await?;
//! let newest = session.retr(stat.count).await?;
//! session.quit().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod session;
mod stream;

pub use error::{Error, Result};
pub use session::{Session, Stat, connect};
pub use stream::{Pop3Stream, connect_tls};
