//! Conversion of fetched IMAP data into [`ParsedMessage`].

use chrono::{DateTime, Utc};
use unimail_imap::FetchedMessage;
use unimail_imap::types::Envelope;
use unimail_mime::encoding::decode_encoded_words;
use unimail_mime::{Address, Entity, decode_subject, normalize, parse_address_list};

use crate::model::ParsedMessage;
use crate::{Error, Result};

/// Builds a [`ParsedMessage`] from one FETCH result.
///
/// Header fields come from the envelope, or from the parsed body when the
/// server sent no envelope. A message without a body section keeps its
/// envelope data only.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the body cannot be parsed as MIME.
pub fn parse_fetched(fetched: FetchedMessage) -> Result<ParsedMessage> {
    let seq = fetched.seq;
    let entity = fetched
        .body
        .as_deref()
        .map(Entity::parse)
        .transpose()
        .map_err(|e| Error::Parse {
            seq,
            reason: e.to_string(),
        })?;

    let internal_date = fetched
        .internal_date
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| envelope_date(fetched.envelope.as_ref()))
        .unwrap_or_else(Utc::now);

    let mut message = ParsedMessage::new(internal_date);
    message.flags = fetched.flags;

    if let Some(envelope) = &fetched.envelope {
        apply_envelope(&mut message, envelope);
    } else if let Some(entity) = &entity {
        apply_headers(&mut message, entity);
    }

    if let Some(entity) = &entity {
        let body = normalize(entity);
        message.text_body = body.text;
        message.html_body = body.html;
        message.attachments = body.attachments;
    }

    Ok(message)
}

fn envelope_date(envelope: Option<&Envelope>) -> Option<DateTime<Utc>> {
    let date = envelope?.date.as_deref()?;
    DateTime::parse_from_rfc2822(date.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn apply_envelope(message: &mut ParsedMessage, envelope: &Envelope) {
    message.message_id = envelope.message_id.clone().unwrap_or_default();
    message.subject = envelope
        .subject
        .as_deref()
        .map(decode_subject)
        .unwrap_or_default();
    message.from = convert_addresses(&envelope.from);
    message.to = convert_addresses(&envelope.to);
    message.cc = convert_addresses(&envelope.cc);
}

fn convert_addresses(addresses: &[unimail_imap::Address]) -> Vec<Address> {
    addresses
        .iter()
        .filter_map(|a| {
            let email = a.email()?;
            let name = a
                .name
                .as_deref()
                .map(|n| decode_encoded_words(n).unwrap_or_else(|_| n.to_string()));
            Some(Address::new(name, email))
        })
        .collect()
}

fn apply_headers(message: &mut ParsedMessage, entity: &Entity) {
    let header = |name: &str| entity.headers.get(name).unwrap_or_default();
    let addresses = |name: &str| parse_address_list(header(name)).unwrap_or_default();

    message.message_id = header("Message-ID").trim().to_string();
    message.subject = decode_subject(header("Subject"));
    message.from = addresses("From");
    message.to = addresses("To");
    message.cc = addresses("Cc");
}
