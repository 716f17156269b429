//! Profiler lifecycle: init, push_event, collect
//!
//! A `Profiler` is cheap to build and holds no state of its own beyond its
//! collaborators. Each entry of the host into the scripting context can build a
//! fresh one over the same variable store and pick up where the last left off.

mod config;
mod session;

pub use config::ProfilerConfig;
pub use session::ProfilerSession;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::event::{Event, EventType};
use crate::event_log::append_to_store;
use crate::report::{assemble, Report};
use crate::sink::ReporterSink;
use crate::snapshot::{Clock, MemoryStats, SnapshotProvider};
use crate::status::ProfilerStatus;
use crate::store::VariableStore;
use crate::ProfilerError;

/// Result of [`Profiler::init`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// START recorded, status now RUNNING
    Started {
        /// Id the report will be filed under
        request_id: String,
    },
    /// An earlier invocation already started profiling this request
    AlreadyRunning,
}

/// Result of [`Profiler::collect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Report handed to the sink, status now DONE
    Delivered(Report),
    /// The report was already delivered for this request; sink not invoked
    AlreadyCollected,
}

/// Request-scoped profiler over a host variable store
pub struct Profiler<S: VariableStore> {
    store: S,
    config: ProfilerConfig,
    snapshots: Arc<dyn SnapshotProvider>,
    clock: Arc<dyn Clock>,
}

impl<S: VariableStore + fmt::Debug> fmt::Debug for Profiler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: VariableStore> Profiler<S> {
    /// Create a profiler with default variable names
    pub fn new(store: S, snapshots: Arc<dyn SnapshotProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config: ProfilerConfig::default(),
            snapshots,
            clock,
        }
    }

    /// Use custom configuration
    pub fn with_config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Underlying variable store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the variable store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Current status for this request
    pub fn status(&self) -> Result<ProfilerStatus, ProfilerError> {
        ProfilerStatus::load(&self.store, &self.config.keys.status)
    }

    /// Id the report is filed under, once profiling started
    pub fn request_id(&self) -> Option<String> {
        self.store.get(&self.config.keys.profiler_request_id)
    }

    /// Start profiling this request
    ///
    /// A second call while RUNNING is a no-op: the host may run the entry
    /// point more than once per request. Starting again after the report was
    /// delivered is an error. Without an explicit `request_id` the host's own
    /// request id variable is used.
    pub fn init(&mut self, request_id: Option<&str>) -> Result<InitOutcome, ProfilerError> {
        let status = self.status()?;
        match status {
            ProfilerStatus::Running => {
                debug!("profiler already running, init ignored");
                return Ok(InitOutcome::AlreadyRunning);
            }
            ProfilerStatus::Done => {
                return Err(ProfilerError::InvalidState {
                    operation: "init",
                    status,
                });
            }
            ProfilerStatus::Uninitialized => {}
        }

        let keys = &self.config.keys;
        let request_id = match request_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self
                .store
                .get(&keys.request_id)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| ProfilerError::MissingRequestId {
                    key: keys.request_id.clone(),
                })?,
        };

        let stats = self.snapshots.current();
        let start = self.capture(EventType::Start, EventType::Start.label(), &stats)?;

        let keys = &self.config.keys;
        self.store.set(&keys.profiler_request_id, request_id.clone())?;
        self.store.set(&keys.cluster_size, stats.cluster_size.to_string())?;
        self.store.set(&keys.page_size, stats.page_size.to_string())?;
        append_to_store(&mut self.store, &keys.events, &start, true)?;
        status.advance(ProfilerStatus::Running, &mut self.store, &keys.status)?;

        debug!(%request_id, size = stats.size, nblocks = stats.nblocks, "profiler started");
        Ok(InitOutcome::Started { request_id })
    }

    /// Record a named snapshot
    ///
    /// Only valid while RUNNING. A rejected call leaves the log untouched.
    pub fn push_event(&mut self, name: &str) -> Result<(), ProfilerError> {
        let status = self.status()?;
        if status != ProfilerStatus::Running {
            return Err(ProfilerError::InvalidState {
                operation: "push an event",
                status,
            });
        }

        let stats = self.snapshots.current();
        let event = self.capture(EventType::Snapshot, name, &stats)?;
        append_to_store(&mut self.store, &self.config.keys.events, &event, false)?;
        Ok(())
    }

    /// Assemble the report and hand it to `sink`
    ///
    /// Delivers at most once per request: DONE is recorded before the sink
    /// runs, and later calls return [`CollectOutcome::AlreadyCollected`]. A
    /// failing sink therefore still leaves the status DONE; its error is
    /// returned afterwards. If the DONE write itself fails, the sink is not
    /// invoked.
    pub fn collect(&mut self, sink: &mut dyn ReporterSink) -> Result<CollectOutcome, ProfilerError> {
        let status = self.status()?;
        match status {
            ProfilerStatus::Done => {
                debug!("profiler already collected, collect ignored");
                return Ok(CollectOutcome::AlreadyCollected);
            }
            ProfilerStatus::Uninitialized => {
                return Err(ProfilerError::NoEvents {
                    key: self.config.keys.events.clone(),
                });
            }
            ProfilerStatus::Running => {}
        }

        let keys = &self.config.keys;
        let request_id = self
            .request_id()
            .ok_or_else(|| ProfilerError::MissingRequestId {
                key: keys.profiler_request_id.clone(),
            })?;

        let stats = self.snapshots.current();
        let end = self.capture(EventType::End, EventType::End.label(), &stats)?;
        let log = self.store.get(&keys.events);
        let report = assemble(log.as_deref(), &keys.events, request_id, end)?;

        // DONE before delivery, so a refused status write never reaches the sink.
        status.advance(ProfilerStatus::Done, &mut self.store, &keys.status)?;
        let delivered = sink.consume(&report, &mut self.store);

        if let Err(err) = delivered {
            warn!(request_id = report.id(), error = %err, "profiler report sink failed");
            return Err(err.into());
        }

        debug!(
            request_id = report.id(),
            events = report.events().len(),
            elapsed_ms = report.elapsed_time_ms(),
            size_growth = report.size_growth(),
            "profiler report delivered"
        );
        Ok(CollectOutcome::Delivered(report))
    }

    /// Start profiling and arm collection for when the returned session drops
    ///
    /// Only the call that actually starts profiling arms its session. A
    /// session built on re-entry (status already RUNNING) leaves collection to
    /// the session that started it.
    pub fn start<K: ReporterSink>(
        mut self,
        request_id: Option<&str>,
        sink: K,
    ) -> Result<ProfilerSession<S, K>, ProfilerError> {
        let armed = matches!(self.init(request_id)?, InitOutcome::Started { .. });
        Ok(ProfilerSession::new(self, sink, armed))
    }

    fn capture(&self, event_type: EventType, name: &str, stats: &MemoryStats) -> Result<Event, ProfilerError> {
        Ok(Event::from_stats(event_type, name, self.clock.now_ms(), stats)?)
    }
}
