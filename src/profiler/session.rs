use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::{CollectOutcome, Profiler};
use crate::sink::ReporterSink;
use crate::store::VariableStore;
use crate::ProfilerError;

/// End-of-request hook as a scope guard
///
/// Created by [`Profiler::start`]. When the session that started profiling
/// goes out of scope it collects once with the sink chosen at start. Errors
/// at that point can only be logged; call [`finish`](Self::finish) to see them.
pub struct ProfilerSession<S: VariableStore, K: ReporterSink> {
    profiler: Profiler<S>,
    sink: K,
    armed: bool,
}

impl<S: VariableStore, K: ReporterSink> ProfilerSession<S, K> {
    pub(super) fn new(profiler: Profiler<S>, sink: K, armed: bool) -> Self {
        Self {
            profiler,
            sink,
            armed,
        }
    }

    /// Whether dropping this session will collect
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Sink chosen at start
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Collect now with the session's sink and disarm
    pub fn finish(mut self) -> Result<CollectOutcome, ProfilerError> {
        self.armed = false;
        self.profiler.collect(&mut self.sink)
    }
}

impl<S: VariableStore, K: ReporterSink> Deref for ProfilerSession<S, K> {
    type Target = Profiler<S>;

    fn deref(&self) -> &Self::Target {
        &self.profiler
    }
}

impl<S: VariableStore, K: ReporterSink> DerefMut for ProfilerSession<S, K> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.profiler
    }
}

impl<S: VariableStore, K: ReporterSink> Drop for ProfilerSession<S, K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Err(err) = self.profiler.collect(&mut self.sink) {
            warn!(error = %err, "profiler collection at end of request failed");
        }
    }
}

impl<S: VariableStore + fmt::Debug, K: ReporterSink + fmt::Debug> fmt::Debug for ProfilerSession<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilerSession")
            .field("profiler", &self.profiler)
            .field("sink", &self.sink)
            .field("armed", &self.armed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::report::Report;
    use crate::sink::SinkError;
    use crate::snapshot::{FixedSnapshots, ManualClock, MemoryStats};
    use crate::status::ProfilerStatus;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct Counting {
        delivered: usize,
    }

    impl ReporterSink for Counting {
        fn consume(&mut self, _report: &Report, _store: &mut dyn VariableStore) -> Result<(), SinkError> {
            self.delivered += 1;
            Ok(())
        }
    }

    fn profiler(store: &mut MemoryStore) -> Profiler<&mut MemoryStore> {
        Profiler::new(
            store,
            Arc::new(FixedSnapshots::constant(MemoryStats::default())),
            Arc::new(ManualClock::new(1_000)),
        )
    }

    #[test]
    fn test_drop_collects_once() {
        let mut store = MemoryStore::new();
        let mut sink = Counting::default();
        {
            let mut session = profiler(&mut store).start(Some("req-1"), &mut sink).unwrap();
            assert!(session.is_armed());
            session.push_event("render").unwrap();
        }
        assert_eq!(sink.delivered, 1);
        assert_eq!(store.get_ref("profiler_status"), Some("2"));
    }

    #[test]
    fn test_reentry_is_unarmed() {
        let mut store = MemoryStore::new();
        let mut sink = Counting::default();

        // An earlier entry started profiling and owns the end-of-request hook
        profiler(&mut store).init(Some("req-1")).unwrap();

        {
            let mut again = profiler(&mut store).start(Some("req-1"), &mut sink).unwrap();
            assert!(!again.is_armed());
            again.push_event("log_phase").unwrap();
        }
        assert_eq!(sink.delivered, 0);
        assert_eq!(store.get_ref("profiler_status"), Some("1"));
    }

    #[test]
    fn test_finish_disarms() {
        let mut store = MemoryStore::new();
        let mut sink = Counting::default();

        let session = profiler(&mut store).start(Some("req-1"), &mut sink).unwrap();
        let outcome = session.finish().unwrap();
        assert!(matches!(outcome, CollectOutcome::Delivered(_)));
        assert_eq!(sink.delivered, 1);
    }

    #[test]
    fn test_explicit_collect_suppresses_drop() {
        let mut store = MemoryStore::new();
        let mut early = Counting::default();
        let mut on_exit = Counting::default();
        {
            let mut session = profiler(&mut store).start(Some("req-1"), &mut on_exit).unwrap();
            session.collect(&mut early).unwrap();
            assert_eq!(session.status().unwrap(), ProfilerStatus::Done);
        }
        assert_eq!(early.delivered, 1);
        assert_eq!(on_exit.delivered, 0);
    }
}
