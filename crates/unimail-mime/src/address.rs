//! Address-list parsing for `From`, `To` and `Cc` headers.

use crate::encoding::decode_encoded_words;
use crate::error::{Error, Result};
use std::fmt;

/// A mailbox: optional display name plus `local@domain`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Display name, encoded-word decoded.
    pub name: Option<String>,
    /// Address specification (`local@domain`).
    pub address: String,
}

impl Address {
    /// Creates a new address.
    #[must_use]
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.filter(|n| !n.is_empty()),
            address: address.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Parses an RFC 5322 address list.
///
/// Accepts `addr@host`, `Name <addr@host>`, quoted display names, comments
/// and groups (`team: a@x, b@y;`). Group names are dropped and their members
/// flattened in order. Display names are encoded-word decoded; a name that
/// fails to decode is kept raw.
///
/// # Errors
///
/// Returns an error if any mailbox lacks an `@`.
pub fn parse_address_list(input: &str) -> Result<Vec<Address>> {
    let mut addresses = Vec::new();
    for item in split_top_level(input) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let item = strip_group_name(item);
        if item.is_empty() {
            continue;
        }
        addresses.push(parse_mailbox(item)?);
    }
    Ok(addresses)
}

/// Splits on `,` and `;` outside quotes, angle brackets and comments.
fn split_top_level(input: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut angle = 0usize;
    let mut comment = 0usize;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes || comment > 0 => {
                current.push(c);
                escaped = true;
            }
            '"' if comment == 0 => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '(' if !in_quotes => {
                comment += 1;
                current.push(c);
            }
            ')' if !in_quotes && comment > 0 => {
                comment -= 1;
                current.push(c);
            }
            '<' if !in_quotes && comment == 0 => {
                angle += 1;
                current.push(c);
            }
            '>' if !in_quotes && comment == 0 => {
                angle = angle.saturating_sub(1);
                current.push(c);
            }
            ',' | ';' if !in_quotes && comment == 0 && angle == 0 => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    items.push(current);
    items
}

/// Removes a leading `group-name:` outside quotes and brackets.
fn strip_group_name(item: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in item.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' | '@' if !in_quotes => return item,
            ':' if !in_quotes => return item[i + 1..].trim(),
            _ => {}
        }
    }
    item
}

fn parse_mailbox(item: &str) -> Result<Address> {
    let without_comments = strip_comments(item);
    let item = without_comments.trim();

    let (name, spec) = match (item.rfind('<'), item.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let name = item[..open].trim();
            (Some(name), item[open + 1..close].trim())
        }
        _ => (None, item),
    };

    if !spec.contains('@') || spec.contains(char::is_whitespace) {
        return Err(Error::InvalidAddress(item.to_string()));
    }

    let name = name
        .map(unquote_name)
        .map(|raw| decode_encoded_words(&raw).unwrap_or(raw));
    Ok(Address::new(name, spec))
}

fn strip_comments(item: &str) -> String {
    let mut out = String::with_capacity(item.len());
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for c in item.chars() {
        if escaped {
            if depth == 0 {
                out.push(c);
            }
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                if depth == 0 {
                    out.push(c);
                }
            }
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                out.push(c);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn unquote_name(name: &str) -> String {
    let Some(inner) = name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) else {
        return name.to_string();
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
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address() {
        let list = parse_address_list("user@example.com").unwrap();
        assert_eq!(list, vec![Address::new(None, "user@example.com")]);
    }

    #[test]
    fn test_named_addresses_in_order() {
        let list =
            parse_address_list("Alice <alice@example.com>, \"Bob, Jr.\" <bob@example.com>")
                .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_deref(), Some("Alice"));
        assert_eq!(list[0].address, "alice@example.com");
        assert_eq!(list[1].name.as_deref(), Some("Bob, Jr."));
        assert_eq!(list[1].address, "bob@example.com");
    }

    #[test]
    fn test_encoded_name() {
        let list = parse_address_list("=?utf-8?B?SMOpbGxv?= <h@example.com>").unwrap();
        assert_eq!(list[0].name.as_deref(), Some("Héllo"));
    }

    #[test]
    fn test_comment_removed() {
        let list = parse_address_list("carol@example.com (Carol Smith)").unwrap();
        assert_eq!(list, vec![Address::new(None, "carol@example.com")]);
    }

    #[test]
    fn test_group() {
        let list = parse_address_list("Team: a@x.org, b@y.org;, c@z.org").unwrap();
        let addrs: Vec<_> = list.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(addrs, vec!["a@x.org", "b@y.org", "c@z.org"]);
    }

    #[test]
    fn test_empty_group() {
        assert!(parse_address_list("undisclosed-recipients:;").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_address() {
        assert!(parse_address_list("not an address").is_err());
        assert!(parse_address_list("Name <nobody>").is_err());
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_address_list("").unwrap().is_empty());
        assert!(parse_address_list(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Address::new(Some("Ann".into()), "ann@example.com").to_string(),
            "Ann <ann@example.com>"
        );
        assert_eq!(Address::new(Some(String::new()), "x@y").to_string(), "x@y");
    }
}
