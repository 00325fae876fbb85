//! MIME content type and content disposition handling.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Creates a text/plain content type.
    ///
    /// This is the RFC 2045 default when no usable header is present.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Returns the `type/subtype` essence without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// Returns the `name` parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameters
            .get("name")
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Checks if this is `text/plain`.
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        self.is_text() && self.sub_type == "plain"
    }

    /// Checks if this is `text/html`.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.is_text() && self.sub_type == "html"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = split_parameters(s).into_iter();

        let type_str = segments
            .next()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidContentType("Empty content type".to_string()))?;

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {type_str}")))?;

        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(type_str));
        }

        let mut content_type = Self::new(main_type, sub_type);
        content_type.parameters = parse_parameters(segments);
        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        let mut params: Vec<_> = self.parameters.iter().collect();
        params.sort();
        for (key, value) in params {
            // Quote value if it contains special characters
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

/// MIME content disposition (RFC 2183).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercased ("inline", "attachment", ...).
    pub kind: String,
    /// Parameters (e.g., filename=report.pdf).
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a content disposition header value.
    ///
    /// A header consisting only of parameters yields an empty `kind`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut segments = split_parameters(s).into_iter();
        let first = segments.next().unwrap_or_default();

        // Some senders omit the disposition type and start with a parameter.
        if first.contains('=') {
            let parameters = parse_parameters(std::iter::once(first).chain(segments));
            return Self {
                kind: String::new(),
                parameters,
            };
        }

        Self {
            kind: first.trim().to_lowercase(),
            parameters: parse_parameters(segments),
        }
    }

    /// Returns true for the `attachment` disposition type.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the `filename` parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters
            .get("filename")
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }
}

/// Splits a header value on `;`, ignoring separators inside quotes.
fn split_parameters(s: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Parses `key=value` segments into a lowercase-keyed map.
fn parse_parameters(segments: impl Iterator<Item = String>) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    for segment in segments {
        if let Some((key, value)) = segment.trim().split_once('=') {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            parameters.insert(key, unquote(value.trim()));
        }
    }
    parameters
}

/// Strips surrounding quotes and resolves backslash escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert!(ct.is_plain_text());
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_quoted_semicolon() {
        let ct = ContentType::parse("application/pdf; name=\"a;b.pdf\"").unwrap();
        assert_eq!(ct.name(), Some("a;b.pdf"));
        assert_eq!(ct.essence(), "application/pdf");
    }

    #[test]
    fn test_content_type_case_insensitive() {
        let ct = ContentType::parse("TEXT/HTML; CHARSET=\"GBK\"").unwrap();
        assert!(ct.is_html());
        assert_eq!(ct.charset(), Some("GBK"));
    }

    #[test]
    fn test_content_type_invalid() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("/plain").is_err());
    }

    #[test]
    fn test_content_type_display() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_disposition_attachment() {
        let cd = ContentDisposition::parse("attachment; filename=\"report 2024.pdf\"");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename(), Some("report 2024.pdf"));
    }

    #[test]
    fn test_disposition_inline_without_filename() {
        let cd = ContentDisposition::parse("inline");
        assert!(!cd.is_attachment());
        assert_eq!(cd.filename(), None);
    }

    #[test]
    fn test_disposition_parameters_only() {
        let cd = ContentDisposition::parse("filename=data.csv");
        assert_eq!(cd.kind, "");
        assert_eq!(cd.filename(), Some("data.csv"));
    }
}
