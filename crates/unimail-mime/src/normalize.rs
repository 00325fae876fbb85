//! Reduces a MIME entity tree to text, HTML and attachments.

use crate::encoding::decode_encoded_words;
use crate::entity::{Body, Entity};
use tracing::debug;

/// Filename used when an attachment declares none.
pub const PLACEHOLDER_FILENAME: &str = "attachment";

/// A materialized attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attachment {
    /// Filename, never empty.
    pub filename: String,
    /// Media type essence, e.g. `application/pdf`.
    pub content_type: String,
    /// Decoded content.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub data: Vec<u8>,
}

impl Attachment {
    fn from_part(part: &Entity, data: Vec<u8>) -> Self {
        Self {
            filename: part
                .filename()
                .unwrap_or_else(|| PLACEHOLDER_FILENAME.to_string()),
            content_type: part.content_type().essence(),
            data,
        }
    }
}

/// Bodies and attachments extracted by [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyParts {
    /// Plain-text body.
    pub text: Option<String>,
    /// HTML body.
    pub html: Option<String>,
    /// Attachments in document order.
    pub attachments: Vec<Attachment>,
}

/// Extracts the text body, HTML body and attachments from an entity.
///
/// In a multipart container:
/// - a leaf with an `attachment` disposition or a declared filename becomes
///   an [`Attachment`], at any depth;
/// - sibling `text/plain` leaves are joined with `"\n"`;
/// - the first `text/html` leaf wins;
/// - nested containers only fill a body that no leaf at the current level
///   provided.
///
/// A single-part entity is classified by media type alone; anything other
/// than `text/plain` or `text/html` is dropped. Unreadable parts are skipped.
#[must_use]
pub fn normalize(entity: &Entity) -> BodyParts {
    let mut out = BodyParts::default();

    match &entity.body {
        Body::Multipart(parts) => {
            let (text, html) = walk(parts, &mut out.attachments);
            out.text = text;
            out.html = html;
        }
        Body::Single(_) => {
            let content_type = entity.content_type();
            if content_type.is_plain_text() {
                out.text = readable_text(entity);
            } else if content_type.is_html() {
                out.html = readable_text(entity);
            }
        }
    }

    out
}

fn walk(parts: &[Entity], attachments: &mut Vec<Attachment>) -> (Option<String>, Option<String>) {
    let mut texts = Vec::new();
    let mut html = None;
    let mut nested_text = None;
    let mut nested_html = None;

    for part in parts {
        if let Body::Multipart(children) = &part.body {
            let (text, inner_html) = walk(children, attachments);
            nested_text = nested_text.or(text);
            nested_html = nested_html.or(inner_html);
            continue;
        }

        if part.is_attachment() {
            match part.decoded_body() {
                Ok(data) => attachments.push(Attachment::from_part(part, data)),
                Err(e) => debug!(error = %e, "skipping undecodable attachment"),
            }
            continue;
        }

        let content_type = part.content_type();
        if content_type.is_plain_text() {
            texts.extend(readable_text(part));
        } else if content_type.is_html() && html.is_none() {
            html = readable_text(part);
        }
    }

    let text = if texts.is_empty() {
        nested_text
    } else {
        Some(texts.join("\n"))
    };
    (text, html.or(nested_html))
}

fn readable_text(part: &Entity) -> Option<String> {
    match part.text() {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "skipping unreadable text part");
            None
        }
    }
}

/// A message body collapsed to a single string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatBody {
    /// All textual content.
    pub body: String,
    /// Attachments in document order.
    pub attachments: Vec<Attachment>,
}

/// Collapses an entity into one body string.
///
/// Every `text/*` leaf of a multipart message is decoded and joined with
/// `"\n"`; attachments are collected as in [`normalize`]. A single-part
/// message is taken whole regardless of its declared type.
#[must_use]
pub fn flatten(entity: &Entity) -> FlatBody {
    let mut out = FlatBody::default();

    if let Body::Multipart(parts) = &entity.body {
        let mut texts = Vec::new();
        collect_leaves(parts, &mut texts, &mut out.attachments);
        out.body = texts.join("\n");
    } else {
        out.body = entity.text().unwrap_or_else(|e| {
            debug!(error = %e, "body undecodable, using raw content");
            match &entity.body {
                Body::Single(raw) => String::from_utf8_lossy(raw).into_owned(),
                Body::Multipart(_) => String::new(),
            }
        });
    }

    out
}

fn collect_leaves(parts: &[Entity], texts: &mut Vec<String>, attachments: &mut Vec<Attachment>) {
    for part in parts {
        if let Body::Multipart(children) = &part.body {
            collect_leaves(children, texts, attachments);
        } else if part.is_attachment() {
            match part.decoded_body() {
                Ok(data) => attachments.push(Attachment::from_part(part, data)),
                Err(e) => debug!(error = %e, "skipping undecodable attachment"),
            }
        } else if part.content_type().is_text() {
            match part.text() {
                Ok(text) => texts.push(text),
                Err(e) => debug!(error = %e, "skipping unreadable text part"),
            }
        }
    }
}

/// Decodes encoded-words in a subject, keeping the raw value on failure.
#[must_use]
pub fn decode_subject(raw: &str) -> String {
    decode_encoded_words(raw).unwrap_or_else(|e| {
        debug!(error = %e, "subject decode failed, keeping raw value");
        raw.to_string()
    })
}
