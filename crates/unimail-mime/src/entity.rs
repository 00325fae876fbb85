//! MIME entity tree.

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;
use tracing::debug;

/// Multipart nesting deeper than this is kept as an opaque leaf.
const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a `Content-Transfer-Encoding` value.
    ///
    /// Unknown mechanisms are treated as identity encodings.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
            Self::Binary => "binary",
        })
    }
}

/// Body of a MIME entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// A leaf part holding still-encoded content.
    Single(Vec<u8>),
    /// Child entities of a `multipart/*` container, in wire order.
    Multipart(Vec<Entity>),
}

/// A MIME entity: a header block and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity headers.
    pub headers: Headers,
    /// Entity body.
    pub body: Body,
}

impl Entity {
    /// Creates a new entity.
    #[must_use]
    pub const fn new(headers: Headers, body: Body) -> Self {
        Self { headers, body }
    }

    /// Parses a raw RFC 5322 message or body part.
    ///
    /// Multipart containers are split recursively. A child part that fails to
    /// parse is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or if a multipart container
    /// declares no boundary.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Self::parse_at_depth(raw, 0)
    }

    fn parse_at_depth(raw: &[u8], depth: usize) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::Empty);
        }

        let (header_bytes, body_bytes) = split_header_body(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_bytes));
        let content_type = content_type_of(&headers);

        if !content_type.is_multipart() || depth >= MAX_DEPTH {
            return Ok(Self::new(headers, Body::Single(body_bytes.to_vec())));
        }

        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let children = split_multipart(body_bytes, boundary)
            .into_iter()
            .enumerate()
            .filter_map(|(index, part)| match Self::parse_at_depth(part, depth + 1) {
                Ok(child) => Some(child),
                Err(e) => {
                    debug!(index, depth, error = %e, "skipping unreadable body part");
                    None
                }
            })
            .collect();

        Ok(Self::new(headers, Body::Multipart(children)))
    }

    /// Returns the declared content type, defaulting to `text/plain` when the
    /// header is missing or malformed.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        content_type_of(&self.headers)
    }

    /// Returns the content disposition, if declared.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Returns the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or_else(TransferEncoding::default, TransferEncoding::parse)
    }

    /// Returns true if this is a multipart container.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    /// Returns the child entities (empty for leaf parts).
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.body {
            Body::Multipart(parts) => parts,
            Body::Single(_) => &[],
        }
    }

    /// Returns the declared filename: the disposition `filename`, else the
    /// content-type `name`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename().map(str::to_string))
            .or_else(|| self.content_type().name().map(str::to_string))
    }

    /// Returns true if the part is an attachment: it has an `attachment`
    /// disposition or declares a filename.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition().is_some_and(|d| d.is_attachment()) || self.filename().is_some()
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// Multipart containers have no content of their own and yield an empty
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if Base64 content is malformed.
    pub fn decoded_body(&self) -> Result<Vec<u8>> {
        let Body::Single(raw) = &self.body else {
            return Ok(Vec::new());
        };

        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(raw)),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(raw)),
            TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
                Ok(raw.clone())
            }
        }
    }

    /// Decodes the body to UTF-8 text using the declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer encoding cannot be reversed.
    pub fn text(&self) -> Result<String> {
        let bytes = self.decoded_body()?;
        Ok(decode_charset(&bytes, self.content_type().charset()))
    }
}

fn content_type_of(headers: &Headers) -> ContentType {
    match headers.get("content-type").map(ContentType::parse) {
        Some(Ok(ct)) => ct,
        Some(Err(e)) => {
            debug!(error = %e, "invalid content type, assuming text/plain");
            ContentType::text_plain()
        }
        None => ContentType::text_plain(),
    }
}

/// Returns the index just past the next `\n` at or after `pos`.
fn next_line_end(data: &[u8], pos: usize) -> usize {
    data[pos..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(data.len(), |i| pos + i + 1)
}

/// Splits at the first empty line. Without one, everything is header.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;
    while pos < raw.len() {
        let end = next_line_end(raw, pos);
        let line = &raw[pos..end];
        if line == b"\n" || line == b"\r\n" {
            return (&raw[..pos], &raw[end..]);
        }
        pos = end;
    }
    (raw, &[])
}

fn strip_line_ending(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n")
        .or_else(|| data.strip_suffix(b"\n"))
        .unwrap_or(data)
}

/// Splits a multipart body into its raw parts (RFC 2046 §5.1.1).
///
/// The preamble and epilogue are discarded. A body missing its closing
/// delimiter keeps the trailing part.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut current: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let end = next_line_end(body, pos);
        let line = strip_line_ending(&body[pos..end]);

        if let Some(rest) = line.strip_prefix(delimiter.as_bytes()) {
            let rest = rest.trim_ascii_end();
            let closing = rest == b"--";
            if closing || rest.is_empty() {
                if let Some(start) = current.take() {
                    // The line break before a delimiter belongs to the delimiter.
                    parts.push(strip_line_ending(&body[start..pos]));
                }
                if closing {
                    return parts;
                }
                current = Some(end);
            }
        }

        pos = end;
    }

    if let Some(start) = current {
        parts.push(&body[start..]);
    }
    parts
}
