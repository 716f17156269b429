//! Append-only event log stored in a single string slot
//!
//! Writes never read back prior events: each append costs the same no matter
//! how long the log already is. Parsing is linear and paid once, at collection.

use tracing::trace;

use crate::event::{encode, Event};
use crate::store::VariableStore;
use crate::ProfilerError;

/// Separator between two fragments
///
/// Two field separators in a row never occur inside a fragment because names
/// cannot contain the field separator and integers are digits only.
pub const EVENT_SEPARATOR: &str = "||";

/// Produce the new slot value after appending `event`
///
/// The first event replaces whatever the slot held; later events are joined
/// with [`EVENT_SEPARATOR`]. An absent or empty slot has nothing to join onto,
/// so the event starts the log whatever `is_first` says.
pub fn append(existing: Option<&str>, event: &Event, is_first: bool) -> String {
    let fragment = encode(event);
    match existing {
        Some(log) if !is_first && !log.is_empty() => {
            let mut value = String::with_capacity(log.len() + EVENT_SEPARATOR.len() + fragment.len());
            value.push_str(log);
            value.push_str(EVENT_SEPARATOR);
            value.push_str(&fragment);
            value
        }
        _ => fragment,
    }
}

/// Append `event` to the log held in `store` under `key`
///
/// This is the only place the profiler writes the log slot.
pub fn append_to_store(
    store: &mut dyn VariableStore,
    key: &str,
    event: &Event,
    is_first: bool,
) -> Result<(), ProfilerError> {
    if is_first {
        store.set(key, encode(event))?;
    } else {
        store.append(key, &format!("{EVENT_SEPARATOR}{}", encode(event)))?;
    }
    trace!(key, name = event.name(), is_first, "appended profiler event");
    Ok(())
}

/// Split a log into its fragments
///
/// An absent or empty log means the profiler never started.
pub fn split<'a>(log: Option<&'a str>, key: &str) -> Result<Vec<&'a str>, ProfilerError> {
    match log {
        Some(log) if !log.is_empty() => Ok(log.split(EVENT_SEPARATOR).collect()),
        _ => Err(ProfilerError::NoEvents {
            key: key.to_string(),
        }),
    }
}
