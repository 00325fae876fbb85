//! MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, declared charsets, and RFC 2047
//! encoded-word headers.

use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::{Encoding, UTF_8};

/// Base64 engine that tolerates missing padding and trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    LENIENT_BASE64.decode(cleaned.as_bytes()).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045 §6.7).
///
/// Malformed escape sequences are kept literally, as the RFC recommends
/// for robust decoders.
#[must_use]
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break
        if input[i + 1..].starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if input[i + 1..].starts_with(b"\n") {
            i += 2;
            continue;
        }

        match (
            input.get(i + 1).copied().and_then(hex_value),
            input.get(i + 2).copied().and_then(hex_value),
        ) {
            (Some(high), Some(low)) => {
                result.push(high << 4 | low);
                i += 3;
            }
            _ => {
                result.push(b'=');
                i += 1;
            }
        }
    }

    result
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Converts bytes in the declared charset to a UTF-8 string.
///
/// Unknown or missing charsets fall back to UTF-8. Invalid sequences are
/// replaced with U+FFFD.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset.and_then(lookup_charset).unwrap_or(UTF_8);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

fn lookup_charset(label: &str) -> Option<&'static Encoding> {
    // RFC 2231 allows a language suffix: us-ascii*en
    let label = label.split('*').next().unwrap_or(label).trim();
    Encoding::for_label(label.as_bytes())
}

/// Decodes all RFC 2047 encoded-words in a header value.
///
/// Plain text is passed through unchanged, so decoding is idempotent on
/// values without encoded-words. Whitespace between two adjacent
/// encoded-words is dropped (RFC 2047 §6.2), and adjacent words in the same
/// charset are decoded together so multi-byte characters split across words
/// survive.
///
/// # Errors
///
/// Returns an error if an encoded-word names an unknown charset or
/// encoding, or if its payload is not valid Base64.
pub fn decode_encoded_words(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut pending: Option<(&'static Encoding, Vec<u8>)> = None;
    let mut rest = text;

    while let Some((start, end, word)) = find_encoded_word(rest) {
        let before = &rest[..start];
        let adjacent = pending.is_some() && before.chars().all(char::is_whitespace);
        let (encoding, bytes) = word.decode()?;

        match pending.as_mut() {
            Some((pending_encoding, buf)) if adjacent && *pending_encoding == encoding => {
                buf.extend_from_slice(&bytes);
            }
            _ => {
                flush_pending(&mut out, pending.take());
                if !adjacent {
                    out.push_str(before);
                }
                pending = Some((encoding, bytes));
            }
        }

        rest = &rest[end..];
    }

    flush_pending(&mut out, pending);
    out.push_str(rest);
    Ok(out)
}

fn flush_pending(out: &mut String, pending: Option<(&'static Encoding, Vec<u8>)>) {
    if let Some((encoding, bytes)) = pending {
        let (text, _) = encoding.decode_without_bom_handling(&bytes);
        out.push_str(&text);
    }
}

/// A single `=?charset?encoding?payload?=` token.
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    payload: &'a str,
}

impl EncodedWord<'_> {
    fn decode(&self) -> Result<(&'static Encoding, Vec<u8>)> {
        let encoding =
            lookup_charset(self.charset).ok_or_else(|| Error::UnknownCharset(self.charset.into()))?;

        let bytes = match self.encoding {
            "B" | "b" => decode_base64(self.payload)?,
            "Q" | "q" => decode_quoted_printable(self.payload.replace('_', " ").as_bytes()),
            other => {
                return Err(Error::InvalidEncoding(format!(
                    "unknown encoded-word encoding: {other}"
                )));
            }
        };

        Ok((encoding, bytes))
    }
}

/// Finds the next well-formed encoded-word, returning its byte span.
fn find_encoded_word(s: &str) -> Option<(usize, usize, EncodedWord<'_>)> {
    let mut from = 0;
    while let Some(offset) = s[from..].find("=?") {
        let start = from + offset;
        if let Some((len, word)) = parse_encoded_word(&s[start..]) {
            return Some((start, start + len, word));
        }
        from = start + 2;
    }
    None
}

fn parse_encoded_word(s: &str) -> Option<(usize, EncodedWord<'_>)> {
    let inner = s.strip_prefix("=?")?;
    let (charset, rest) = inner.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let payload = &rest[..end];

    if charset.is_empty()
        || encoding.len() != 1
        || charset.contains(char::is_whitespace)
        || payload.contains(char::is_whitespace)
    {
        return None;
    }

    let len = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
    Some((
        len,
        EncodedWord {
            charset,
            encoding,
            payload,
        },
    ))
}
