//! Protocol-independent message model.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use unimail_imap::Flag;

pub use unimail_mime::{Address, Attachment};

/// A fetched message, normalized the same way for every protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMessage {
    /// `Message-ID`, empty when the message has none.
    pub message_id: String,
    /// Subject with encoded-words decoded.
    pub subject: String,
    /// Senders in header order.
    pub from: Vec<Address>,
    /// Primary recipients in header order.
    pub to: Vec<Address>,
    /// Carbon-copy recipients in header order.
    pub cc: Vec<Address>,
    /// Server receipt time for IMAP; retrieval time for POP3, which has no
    /// such metadata.
    pub internal_date: DateTime<Utc>,
    /// Plain-text body.
    pub text_body: Option<String>,
    /// HTML body.
    pub html_body: Option<String>,
    /// Message flags; always empty for POP3.
    #[serde(serialize_with = "serialize_flags")]
    pub flags: Vec<Flag>,
    /// Attachments in document order.
    pub attachments: Vec<Attachment>,
}

impl ParsedMessage {
    /// Creates an empty message dated `internal_date`.
    #[must_use]
    pub const fn new(internal_date: DateTime<Utc>) -> Self {
        Self {
            message_id: String::new(),
            subject: String::new(),
            from: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            internal_date,
            text_body: None,
            html_body: None,
            flags: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Returns true if the message carries the `\Seen` flag.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.flags.contains(&Flag::Seen)
    }
}

fn serialize_flags<S: Serializer>(flags: &[Flag], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(flags.iter().map(Flag::as_str))
}
