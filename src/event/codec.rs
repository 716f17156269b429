//! Fragment codec: one event <-> `type|name|createdAt|size|nblocks`
//!
//! Position is the only source of field identity; the layout table below is
//! fixed configuration shared by encoder and decoder.

use thiserror::Error;

use super::{Event, EventType};

/// Separator between the fields of one fragment
pub const FIELD_SEPARATOR: char = '|';

/// Number of fields in a fragment
pub const FIELD_COUNT: usize = 5;

/// How a field is typed on decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned base-10 integer
    Integer,
    /// Free text, separator-free
    Text,
}

/// Name and kind of one positional field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as it appears in reports
    pub name: &'static str,
    /// Decoded type
    pub kind: FieldKind,
}

const TYPE: FieldSpec = FieldSpec { name: "type", kind: FieldKind::Integer };
const NAME: FieldSpec = FieldSpec { name: "name", kind: FieldKind::Text };
const CREATED_AT: FieldSpec = FieldSpec { name: "createdAt", kind: FieldKind::Integer };
const SIZE: FieldSpec = FieldSpec { name: "size", kind: FieldKind::Integer };
const NBLOCKS: FieldSpec = FieldSpec { name: "nblocks", kind: FieldKind::Integer };

/// Position -> field mapping of the wire format
pub const FIELD_LAYOUT: [FieldSpec; FIELD_COUNT] = [TYPE, NAME, CREATED_AT, SIZE, NBLOCKS];

/// Errors raised by the codec
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Event name would collide with the wire format's separators
    #[error("malformed event name {name:?}: {reason}")]
    MalformedEvent {
        /// Offending name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Fragment does not decode into the expected typed fields
    #[error("corrupt log fragment {fragment:?}: {reason}")]
    CorruptFragment {
        /// Raw fragment as read from the log
        fragment: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Check that a name can be stored in a fragment
///
/// The event separator is two field separators, so excluding the field
/// separator excludes both. An empty name would put two field separators side
/// by side and is rejected for the same reason.
pub fn validate_name(name: &str) -> Result<(), CodecError> {
    if name.is_empty() {
        return Err(CodecError::MalformedEvent {
            name: String::new(),
            reason: "names must not be empty".to_string(),
        });
    }
    if name.contains(FIELD_SEPARATOR) {
        return Err(CodecError::MalformedEvent {
            name: name.to_string(),
            reason: format!("names must not contain {FIELD_SEPARATOR:?}"),
        });
    }
    Ok(())
}

/// Render an event as a fragment
pub fn encode(event: &Event) -> String {
    debug_assert!(validate_name(&event.name).is_ok());
    format!(
        "{}{sep}{}{sep}{}{sep}{}{sep}{}",
        event.event_type.code(),
        event.name,
        event.created_at,
        event.size,
        event.nblocks,
        sep = FIELD_SEPARATOR,
    )
}

/// Parse a fragment back into an event
///
/// Each field is checked against its [`FIELD_LAYOUT`] entry: integer fields
/// must parse, text fields must be non-empty.
pub fn decode(fragment: &str) -> Result<Event, CodecError> {
    let fields: Vec<&str> = fragment.split(FIELD_SEPARATOR).collect();
    let [_, name, _, _, _] = fields.as_slice() else {
        return Err(corrupt(
            fragment,
            format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
        ));
    };

    let mut integers = [0u64; FIELD_COUNT];
    for ((field, raw), slot) in FIELD_LAYOUT.iter().zip(&fields).zip(&mut integers) {
        match field.kind {
            FieldKind::Integer => *slot = parse_integer(fragment, field, raw)?,
            FieldKind::Text if raw.is_empty() => {
                return Err(corrupt(fragment, format!("field `{}` is empty", field.name)));
            }
            FieldKind::Text => {}
        }
    }

    let [code, _, created_at, size, nblocks] = integers;
    let event_type = EventType::from_code(code)
        .ok_or_else(|| corrupt(fragment, format!("unknown event type {code}")))?;

    Ok(Event {
        event_type,
        name: name.to_string(),
        created_at,
        size,
        nblocks,
    })
}

/// Strict base-10 parse: digits only, no sign, no whitespace.
fn parse_integer(fragment: &str, field: &FieldSpec, raw: &str) -> Result<u64, CodecError> {
    debug_assert_eq!(field.kind, FieldKind::Integer);
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(corrupt(
            fragment,
            format!("field `{}` is not a decimal integer: {raw:?}", field.name),
        ));
    }
    raw.parse().map_err(|_| {
        corrupt(
            fragment,
            format!("field `{}` does not fit in 64 bits: {raw:?}", field.name),
        )
    })
}

fn corrupt(fragment: &str, reason: String) -> CodecError {
    CodecError::CorruptFragment {
        fragment: fragment.to_string(),
        reason,
    }
}
