//! # unimail-mime
//!
//! MIME parsing and body normalization for fetched email.
//!
//! ## Features
//!
//! - **Entity parsing**: Parse raw RFC 5322 messages into a tree of MIME
//!   entities, descending into arbitrarily nested multipart containers
//! - **Decoding**: Base64, Quoted-Printable, declared charsets and RFC 2047
//!   encoded-words
//! - **Addresses**: Lenient address-list parsing for `From`/`To`/`Cc`
//! - **Normalization**: Reduce an entity tree to a plain-text body, an HTML
//!   body and a list of attachments
//!
//! ## Quick Start
//!
//! ```
//! use unimail_mime::{Entity, normalize};
//!
//! let raw = b"Subject: Hello\r\n\
//!             Content-Type: text/plain; charset=utf-8\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let entity = Entity::parse(raw).unwrap();
//! let body = normalize(&entity);
//! assert_eq!(body.text.as_deref(), Some("Hello, World!"));
//! assert!(body.html.is_none());
//! ```
//!
//! ### Encoded-word headers
//!
//! ```
//! use unimail_mime::decode_subject;
//!
//! assert_eq!(decode_subject("=?utf-8?B?SMOpbGxv?="), "Héllo");
//! assert_eq!(decode_subject("plain subject"), "plain subject");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod entity;
mod error;
mod header;
mod normalize;

pub mod encoding;

pub use address::{Address, parse_address_list};
pub use content_type::{ContentDisposition, ContentType};
pub use entity::{Body, Entity, TransferEncoding};
pub use error::{Error, Result};
pub use header::Headers;
pub use normalize::{
    Attachment, BodyParts, FlatBody, PLACEHOLDER_FILENAME, decode_subject, flatten, normalize,
};
