//! Report assembly
//!
//! Turns the flat persisted log back into typed events, appends the END event
//! captured at collection time and derives the begin/end summary.

use serde::{Serialize, Serializer};

use crate::event::{decode, Event, EventType};
use crate::event_log::split;
use crate::{CodecError, ProfilerError};

/// Finished view of one request's events
///
/// Always holds at least START and END.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    id: String,
    events: Vec<Event>,
}

/// Timestamp and memory figures of one boundary event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    /// Milliseconds since the Unix epoch
    pub created_at: u64,
    /// Allocated bytes
    pub size: u64,
    /// Live blocks
    pub nblocks: u64,
}

impl From<&Event> for EventStats {
    fn from(event: &Event) -> Self {
        Self {
            created_at: event.created_at(),
            size: event.size(),
            nblocks: event.nblocks(),
        }
    }
}

/// Aggregate figures derived from the first and last event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// START figures
    pub begin: EventStats,
    /// END figures
    pub end: EventStats,
    /// END.created_at - START.created_at
    pub elapsed_time_ms: i64,
    /// END.size - START.size
    pub size_growth: i64,
    /// END.nblocks - START.nblocks
    pub nblocks_growth: i64,
}

/// Build a report from a persisted log and the END event
pub fn assemble(
    log: Option<&str>,
    log_key: &str,
    id: impl Into<String>,
    end: Event,
) -> Result<Report, ProfilerError> {
    let fragments = split(log, log_key)?;
    let mut events = Vec::with_capacity(fragments.len() + 1);
    for fragment in fragments {
        events.push(decode(fragment)?);
    }

    if let Some(first) = events.first() {
        if first.event_type() != EventType::Start {
            return Err(CodecError::CorruptFragment {
                fragment: crate::event::encode(first),
                reason: format!("log must begin with {}, found {}", EventType::Start, first.event_type()),
            }
            .into());
        }
    }

    events.push(end);
    Ok(Report {
        id: id.into(),
        events,
    })
}

impl Report {
    /// Request id the report is filed under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Events in append order, END last
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// START event
    pub fn start(&self) -> &Event {
        // `assemble` never yields fewer than two events
        &self.events[0]
    }

    /// END event
    pub fn end(&self) -> &Event {
        &self.events[self.events.len() - 1]
    }

    /// Milliseconds between START and END
    pub fn elapsed_time_ms(&self) -> i64 {
        delta(self.start().created_at(), self.end().created_at())
    }

    /// Allocated bytes gained between START and END
    pub fn size_growth(&self) -> i64 {
        delta(self.start().size(), self.end().size())
    }

    /// Blocks gained between START and END
    pub fn nblocks_growth(&self) -> i64 {
        delta(self.start().nblocks(), self.end().nblocks())
    }

    /// Derived figures, recomputed on every call
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            begin: self.start().into(),
            end: self.end().into(),
            elapsed_time_ms: self.elapsed_time_ms(),
            size_growth: self.size_growth(),
            nblocks_growth: self.nblocks_growth(),
        }
    }

    /// Serialize as a single-line JSON document
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            id: &'a str,
            events: &'a [Event],
            summary: ReportSummary,
        }

        Wire {
            id: &self.id,
            events: &self.events,
            summary: self.summary(),
        }
        .serialize(serializer)
    }
}

/// Signed difference, saturating at the `i64` range
fn delta(begin: u64, end: u64) -> i64 {
    let diff = i128::from(end) - i128::from(begin);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}
