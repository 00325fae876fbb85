//! Modified UTF-7 for mailbox names (RFC 3501 §5.1.3).

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

const MUTF7: GeneralPurpose = GeneralPurpose::new(
    &alphabet::IMAP_MUTF7,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes a mailbox name received from the server.
///
/// Malformed shift sequences are passed through unchanged.
#[must_use]
pub fn decode_mailbox_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let Some(dash) = after.find('-') else {
            out.push_str(&rest[amp..]);
            return out;
        };

        let encoded = &after[..dash];
        if encoded.is_empty() {
            out.push('&');
        } else if let Some(decoded) = decode_utf16_run(encoded) {
            out.push_str(&decoded);
        } else {
            out.push_str(&rest[amp..=amp + 1 + dash]);
        }
        rest = &after[dash + 1..];
    }

    out.push_str(rest);
    out
}

fn decode_utf16_run(encoded: &str) -> Option<String> {
    let bytes = MUTF7.decode(encoded).ok()?;
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Encodes a mailbox name for use in a command.
#[must_use]
pub fn encode_mailbox_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending: Vec<u16> = Vec::new();

    for c in name.chars() {
        if (' '..='~').contains(&c) {
            flush_utf16_run(&mut out, &mut pending);
            if c == '&' {
                out.push_str("&-");
            } else {
                out.push(c);
            }
        } else {
            let mut units = [0u16; 2];
            pending.extend_from_slice(c.encode_utf16(&mut units));
        }
    }
    flush_utf16_run(&mut out, &mut pending);
    out
}

fn flush_utf16_run(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }
    let bytes: Vec<u8> = pending.drain(..).flat_map(u16::to_be_bytes).collect();
    out.push('&');
    out.push_str(&MUTF7.encode(bytes));
    out.push('-');
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ascii_unchanged() {
        assert_eq!(decode_mailbox_name("INBOX"), "INBOX");
        assert_eq!(encode_mailbox_name("Sent Items"), "Sent Items");
    }

    #[test]
    fn test_ampersand() {
        assert_eq!(encode_mailbox_name("R&D"), "R&-D");
        assert_eq!(decode_mailbox_name("R&-D"), "R&D");
    }

    #[test]
    fn test_known_vectors() {
        // RFC 3501 example
        assert_eq!(
            decode_mailbox_name("~peter/mail/&U,BTFw-/&ZeVnLIqe-"),
            "~peter/mail/台北/日本語"
        );
        assert_eq!(encode_mailbox_name("已发送"), "&XfJT0ZAB-");
        assert_eq!(decode_mailbox_name("&XfJT0ZAB-"), "已发送");
    }

    #[test]
    fn test_malformed_passthrough() {
        assert_eq!(decode_mailbox_name("a&b"), "a&b");
        assert_eq!(decode_mailbox_name("&***-x"), "&***-x");
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(name in "\\PC{0,24}") {
            prop_assert_eq!(decode_mailbox_name(&encode_mailbox_name(&name)), name);
        }
    }
}
