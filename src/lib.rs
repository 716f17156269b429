//! # Request-scoped memory and timing profiler
//!
//! Records memory-usage and timing snapshots at arbitrary points of a single
//! logical request and assembles them into a [`Report`] when the request ends.
//!
//! The host environment only offers a string-typed variable store that lives as
//! long as the request, and may re-enter the scripting context several times
//! per request while discarding in-memory state in between. Every piece of
//! intermediate state therefore lives in that store:
//!
//! 1. **Status slot**: `"1"` while running, `"2"` once the report was delivered
//! 2. **Event log slot**: every event encoded as `type|name|createdAt|size|nblocks`,
//!    events joined with `||`
//! 3. **Request id slot**: the id the report is filed under
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use reqprof::{AllocatorSnapshots, LogSink, MemoryStore, Profiler, SystemClock};
//!
//! # fn main() -> Result<(), reqprof::ProfilerError> {
//! let mut store = MemoryStore::new();
//! let profiler = Profiler::new(
//!     &mut store,
//!     Arc::new(AllocatorSnapshots::new()),
//!     Arc::new(SystemClock),
//! );
//!
//! // Collected automatically when the session goes out of scope.
//! let mut session = profiler.start(Some("req-1"), LogSink::default())?;
//! session.push_event("load_config")?;
//! session.push_event("render")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod event;      // Event records and the fragment codec
pub mod event_log;  // Append-only log over one string slot
pub mod status;     // Per-request status state machine
pub mod store;      // Host variable store seam
pub mod snapshot;   // Memory statistics and clocks
pub mod report;     // Report assembly
pub mod sink;       // Report consumers
pub mod profiler;   // init / push_event / collect

// Re-exports for convenience
pub use event::{CodecError, Event, EventType};
pub use profiler::{CollectOutcome, InitOutcome, Profiler, ProfilerConfig, ProfilerSession};
pub use report::{EventStats, Report, ReportSummary};
pub use sink::{FileSink, LogSink, ReporterSink, SinkError, VarSink};
pub use snapshot::{
    AllocatorSnapshots, Clock, CountingAllocator, FixedSnapshots, ManualClock, MemoryStats,
    SnapshotProvider, SystemClock,
};
pub use status::ProfilerStatus;
pub use store::{MemoryStore, StoreError, StoreKeys, VariableStore};

use thiserror::Error;

/// Errors that can occur while driving the profiler
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// An event could not be encoded or a log fragment could not be decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Collection found no persisted events
    #[error("no profiler events recorded in `{key}`; was the profiler initialised?")]
    NoEvents {
        /// Store key holding the event log
        key: String,
    },

    /// Operation invoked while the profiler is in a state that forbids it
    #[error("cannot {operation} while the profiler is {status}")]
    InvalidState {
        /// Operation that was rejected
        operation: &'static str,
        /// Status observed when the operation was attempted
        status: ProfilerStatus,
    },

    /// The status slot holds a value this crate never writes
    #[error("unrecognised profiler status {0:?}")]
    UnknownStatus(String),

    /// No request id was supplied and the host did not provide one
    #[error("no request id supplied and `{key}` is not set")]
    MissingRequestId {
        /// Store key consulted for the host's request id
        key: String,
    },

    /// The variable store rejected a write
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reporter sink failed to deliver the report
    #[error("report sink failed: {0}")]
    Sink(#[from] SinkError),
}
