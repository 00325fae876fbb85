//! IMAP response parsing.
//!
//! Responses are read as generic values (atoms, numbers, strings, literals,
//! parenthesized lists) and then interpreted for the handful of untagged
//! responses a retrieval client needs: LIST, STATUS, EXISTS and FETCH.

use chrono::{DateTime, FixedOffset};

use crate::types::{Address, Envelope, FetchedMessage, Flag};
use crate::utf7::decode_mailbox_name;
use crate::{Error, Result};

/// Completion status of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command succeeded.
    Ok,
    /// Command failed.
    No,
    /// Command was rejected as malformed.
    Bad,
    /// Server is closing the connection.
    Bye,
    /// Connection is already authenticated (greeting only).
    PreAuth,
}

impl Status {
    fn parse(atom: &str) -> Option<Self> {
        match atom.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "BYE" => Some(Self::Bye),
            "PREAUTH" => Some(Self::PreAuth),
            _ => None,
        }
    }
}

/// A server response, classified by its first token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `+ text`
    Continuation(String),
    /// `* payload`, with the payload kept raw for later interpretation.
    Untagged(Vec<u8>),
    /// `tag status text`
    Tagged {
        /// Command tag.
        tag: String,
        /// Completion status.
        status: Status,
        /// Human-readable text, including any response code.
        text: String,
    },
}

impl Response {
    /// Classifies one framed response.
    ///
    /// # Errors
    ///
    /// Returns an error if a tagged response lacks a valid status.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if let Some(rest) = raw.strip_prefix(b"+") {
            return Ok(Self::Continuation(line_text(rest)));
        }
        if let Some(rest) = raw.strip_prefix(b"* ") {
            return Ok(Self::Untagged(rest.to_vec()));
        }

        let mut reader = Reader::new(raw);
        let tag = reader.read_atom()?;
        reader.skip_spaces();
        let status_atom = reader.read_atom()?;
        let status = Status::parse(&status_atom)
            .ok_or_else(|| reader.error(&format!("invalid status: {status_atom}")))?;

        Ok(Self::Tagged {
            tag,
            status,
            text: line_text(reader.remaining()),
        })
    }
}

/// Interprets an untagged `OK`/`NO`/`BAD`/`BYE`/`PREAUTH` payload.
#[must_use]
pub fn untagged_status(payload: &[u8]) -> Option<(Status, String)> {
    let mut reader = Reader::new(payload);
    let atom = reader.read_atom().ok()?;
    let status = Status::parse(&atom)?;
    Some((status, line_text(reader.remaining())))
}

fn line_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// A generic IMAP data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `NIL`
    Nil,
    /// Unsigned number.
    Number(u64),
    /// Atom, including section specs such as `BODY[]`.
    Atom(String),
    /// Quoted string or literal.
    Str(Vec<u8>),
    /// Parenthesized list.
    List(Vec<Self>),
}

impl Value {
    /// Returns string-like content as text.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Str(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Self::Atom(atom) => Some(atom.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Nil | Self::List(_) => None,
        }
    }

    /// Returns list items; `NIL` is an empty list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            Self::Nil => Some(&[]),
            _ => None,
        }
    }

    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Byte-level reader over a response.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over the given bytes.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Returns the unread input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos.min(self.input.len())..]
    }

    /// Returns true at end of input or at the closing CRLF.
    #[must_use]
    pub fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\r' | b'\n'))
    }

    /// Skips spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Reads the next value.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed or truncated input.
    pub fn read_value(&mut self) -> Result<Value> {
        self.skip_spaces();
        match self.peek() {
            None | Some(b'\r' | b'\n') => Err(self.error("unexpected end of response")),
            Some(b'(') => self.read_list(),
            Some(b'"') => self.read_quoted().map(Value::Str),
            Some(b'{') => self.read_literal().map(Value::Str),
            Some(_) => {
                let atom = self.read_atom()?;
                if atom.eq_ignore_ascii_case("NIL") {
                    Ok(Value::Nil)
                } else if let Ok(n) = atom.parse::<u64>() {
                    Ok(Value::Number(n))
                } else {
                    Ok(Value::Atom(atom))
                }
            }
        }
    }

    fn read_list(&mut self) -> Result<Value> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_spaces();
            match self.peek() {
                Some(b')') => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                None => return Err(self.error("unterminated list")),
                Some(_) => items.push(self.read_value()?),
            }
        }
    }

    fn read_quoted(&mut self) -> Result<Vec<u8>> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("unterminated quoted string"))?;
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("unterminated quoted string"));
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn read_literal(&mut self) -> Result<Vec<u8>> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let len: usize = std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("invalid literal size"))?;

        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if self.peek() != Some(b'}') {
            return Err(self.error("expected '}' after literal size"));
        }
        self.pos += 1;
        if self.peek() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek() != Some(b'\n') {
            return Err(self.error("expected line break after literal size"));
        }
        self.pos += 1;

        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("literal exceeds response"))?;
        let data = self.input[self.pos..end].to_vec();
        self.pos = end;
        Ok(data)
    }

    /// Reads an atom. Bracketed sections (`BODY[HEADER.FIELDS (A B)]`) are
    /// part of the atom.
    ///
    /// # Errors
    ///
    /// Returns an error if no atom characters are present.
    pub fn read_atom(&mut self) -> Result<String> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'[' => depth += 1,
                b']' if depth > 0 => depth -= 1,
                b' ' | b'(' | b')' if depth == 0 => break,
                b'\r' | b'\n' | b'"' | b'{' if depth == 0 => break,
                b'\r' | b'\n' => break,
                _ => {}
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected atom"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }
}

/// Parses a `LIST` payload into the decoded mailbox name.
///
/// Returns `Ok(None)` for any other untagged response.
///
/// # Errors
///
/// Returns an error if the LIST payload is malformed.
pub fn parse_list(payload: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::new(payload);
    if !reader
        .read_atom()
        .is_ok_and(|a| a.eq_ignore_ascii_case("LIST"))
    {
        return Ok(None);
    }

    let _attributes = reader.read_value()?;
    let _delimiter = reader.read_value()?;
    let name = reader
        .read_value()?
        .as_text()
        .ok_or_else(|| reader.error("LIST mailbox name missing"))?;

    Ok(Some(decode_mailbox_name(&name)))
}

/// Parses the `MESSAGES` count from a `STATUS` payload.
///
/// # Errors
///
/// Returns an error if the STATUS payload is malformed.
pub fn parse_status_messages(payload: &[u8]) -> Result<Option<u32>> {
    let mut reader = Reader::new(payload);
    if !reader
        .read_atom()
        .is_ok_and(|a| a.eq_ignore_ascii_case("STATUS"))
    {
        return Ok(None);
    }

    let _mailbox = reader.read_value()?;
    let items = reader.read_value()?;
    let items = items
        .as_list()
        .ok_or_else(|| reader.error("STATUS attributes must be a list"))?;

    Ok(items.chunks(2).find_map(|pair| match pair {
        [Value::Atom(name), value] if name.eq_ignore_ascii_case("MESSAGES") => {
            value.as_number().and_then(|n| u32::try_from(n).ok())
        }
        _ => None,
    }))
}

/// Parses `n EXISTS`.
#[must_use]
pub fn parse_exists(payload: &[u8]) -> Option<u32> {
    let mut reader = Reader::new(payload);
    let count = reader.read_value().ok()?.as_number()?;
    reader.skip_spaces();
    let atom = reader.read_atom().ok()?;
    atom.eq_ignore_ascii_case("EXISTS")
        .then(|| u32::try_from(count).ok())
        .flatten()
}

/// Parses a `n FETCH (...)` payload.
///
/// Returns `Ok(None)` for any other untagged response.
///
/// # Errors
///
/// Returns an error if the FETCH payload is malformed.
pub fn parse_fetch(payload: &[u8]) -> Result<Option<FetchedMessage>> {
    let mut reader = Reader::new(payload);
    let Ok(Value::Number(seq)) = reader.read_value() else {
        return Ok(None);
    };
    reader.skip_spaces();
    if !reader
        .read_atom()
        .is_ok_and(|a| a.eq_ignore_ascii_case("FETCH"))
    {
        return Ok(None);
    }

    let seq = u32::try_from(seq).map_err(|_| reader.error("sequence number out of range"))?;
    let items = reader.read_value()?;
    let Value::List(items) = items else {
        return Err(reader.error("FETCH data must be a list"));
    };

    let mut message = FetchedMessage {
        seq,
        ..FetchedMessage::default()
    };
    let mut text_section = None;

    for pair in items.chunks(2) {
        let [Value::Atom(name), value] = pair else {
            return Err(reader.error("malformed FETCH item"));
        };
        let name = name.to_ascii_uppercase();

        match name.as_str() {
            "FLAGS" => {
                message.flags = value
                    .as_list()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Value::as_text)
                    .map(|f| Flag::parse(&f))
                    .collect();
            }
            "INTERNALDATE" => {
                message.internal_date = value.as_text().and_then(|d| parse_internal_date(&d));
            }
            "RFC822.SIZE" => {
                message.size = value.as_number().and_then(|n| u32::try_from(n).ok());
            }
            "ENVELOPE" => {
                message.envelope = value.as_list().map(parse_envelope);
            }
            "RFC822" | "BODY[]" => message.body = string_bytes(value),
            "BODY[TEXT]" => text_section = string_bytes(value),
            _ if name.starts_with("BODY[]<") => message.body = string_bytes(value),
            _ => {}
        }
    }

    if message.body.is_none() {
        message.body = text_section;
    }

    Ok(Some(message))
}

fn string_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Str(bytes) => Some(bytes.clone()),
        Value::Atom(atom) => Some(atom.clone().into_bytes()),
        _ => None,
    }
}

/// Parses an INTERNALDATE value: `17-Jul-1996 02:44:25 -0700`.
#[must_use]
pub fn parse_internal_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), "%d-%b-%Y %H:%M:%S %z").ok()
}

fn parse_envelope(fields: &[Value]) -> Envelope {
    let text = |i: usize| fields.get(i).and_then(Value::as_text);
    let addresses = |i: usize| {
        fields
            .get(i)
            .and_then(Value::as_list)
            .map(|list| list.iter().filter_map(parse_address).collect())
            .unwrap_or_default()
    };

    Envelope {
        date: text(0),
        subject: text(1),
        from: addresses(2),
        sender: addresses(3),
        reply_to: addresses(4),
        to: addresses(5),
        cc: addresses(6),
        bcc: addresses(7),
        in_reply_to: text(8),
        message_id: text(9),
    }
}

fn parse_address(value: &Value) -> Option<Address> {
    let parts = value.as_list()?;
    let part = |i: usize| parts.get(i).and_then(Value::as_text);
    Some(Address {
        name: part(0),
        adl: part(1),
        mailbox: part(2),
        host: part(3),
    })
}
