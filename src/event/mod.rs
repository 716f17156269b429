//! Event records and their wire codec
//!
//! An event is a snapshot of the allocator's state at one instant of the request:
//! - Type: start, snapshot or end
//! - Name chosen by the caller
//! - Wall-clock timestamp in milliseconds
//! - Allocated size in bytes and number of live blocks

mod codec;

pub use codec::{
    decode, encode, validate_name, CodecError, FieldKind, FieldSpec, FIELD_COUNT, FIELD_LAYOUT,
    FIELD_SEPARATOR,
};

use std::fmt;

use serde::Serialize;

use crate::snapshot::MemoryStats;

/// Kind of event recorded in the log
///
/// Encoded as a small integer to keep the persisted log short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    /// Recorded once when profiling starts
    #[serde(rename = "profiler:start")]
    Start,

    /// Recorded for every named event pushed by the caller
    #[serde(rename = "profiler:snapshot")]
    Snapshot,

    /// Synthesised at collection time, never persisted
    #[serde(rename = "profiler:end")]
    End,
}

impl EventType {
    /// Integer code used in the persisted log
    pub fn code(self) -> u8 {
        match self {
            EventType::Start => 1,
            EventType::Snapshot => 2,
            EventType::End => 3,
        }
    }

    /// Decode from the integer code
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(EventType::Start),
            2 => Some(EventType::Snapshot),
            3 => Some(EventType::End),
            _ => None,
        }
    }

    /// Human-readable label used in reports
    pub fn label(self) -> &'static str {
        match self {
            EventType::Start => "profiler:start",
            EventType::Snapshot => "profiler:snapshot",
            EventType::End => "profiler:end",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One timestamped memory snapshot
///
/// Every constructor checks the name against the wire format, so any `Event`
/// value can be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    event_type: EventType,
    name: String,
    created_at: u64,
    size: u64,
    nblocks: u64,
}

impl Event {
    /// Create an event, rejecting names that would corrupt the log
    pub fn new(
        event_type: EventType,
        name: impl Into<String>,
        created_at: u64,
        size: u64,
        nblocks: u64,
    ) -> Result<Self, CodecError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            event_type,
            name,
            created_at,
            size,
            nblocks,
        })
    }

    /// Create an event from a memory snapshot taken at `created_at`
    pub fn from_stats(
        event_type: EventType,
        name: impl Into<String>,
        created_at: u64,
        stats: &MemoryStats,
    ) -> Result<Self, CodecError> {
        Self::new(event_type, name, created_at, stats.size, stats.nblocks)
    }

    /// Event type
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Caller-supplied name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Milliseconds since the Unix epoch
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Allocated bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Live allocation blocks
    pub fn nblocks(&self) -> u64 {
        self.nblocks
    }
}
