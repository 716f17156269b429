#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use reqprof::{
    FixedSnapshots, ManualClock, MemoryStats, MemoryStore, Profiler, Report, ReporterSink,
    SinkError, StoreError, VariableStore,
};
use tracing_subscriber::fmt::MakeWriter;

pub const START_MS: u64 = 1_671_143_290_831;

/// Sink that keeps every report it receives.
#[derive(Debug, Default)]
pub struct CaptureSink {
    pub reports: Vec<Report>,
}

impl ReporterSink for CaptureSink {
    fn consume(&mut self, report: &Report, _store: &mut dyn VariableStore) -> Result<(), SinkError> {
        self.reports.push(report.clone());
        Ok(())
    }
}

/// Sink that always fails.
#[derive(Debug, Default)]
pub struct FailingSink {
    pub calls: usize,
}

impl ReporterSink for FailingSink {
    fn consume(&mut self, report: &Report, _store: &mut dyn VariableStore) -> Result<(), SinkError> {
        self.calls += 1;
        Err(SinkError::InvalidReportId(report.id().to_string()))
    }
}

pub fn stats(size: u64, nblocks: u64) -> MemoryStats {
    MemoryStats {
        size,
        nblocks,
        cluster_size: 8192,
        page_size: 128,
    }
}

/// Profiler over `store` whose allocator grows by 100 bytes and one block per snapshot.
pub fn profiler(store: &mut MemoryStore) -> Profiler<&mut MemoryStore> {
    profiler_over(store)
}

/// Same as [`profiler`] for any store type.
pub fn profiler_over<S: VariableStore>(store: S) -> Profiler<S> {
    let series = (0..64u64).map(|step| stats(47_600 + step * 100, 3 + step));
    Profiler::new(
        store,
        Arc::new(FixedSnapshots::new(series)),
        Arc::new(ManualClock::new(START_MS)),
    )
}

/// Store that refuses every write to one variable.
#[derive(Debug, Default)]
pub struct RefusingStore {
    pub inner: MemoryStore,
    pub refused_key: String,
    pub refused_value: Option<String>,
}

impl RefusingStore {
    /// Refuse any write to `key`.
    pub fn refusing(key: &str) -> Self {
        Self {
            refused_key: key.to_string(),
            ..Self::default()
        }
    }

    /// Only refuse writes of `value` to the key.
    pub fn with_value(mut self, value: &str) -> Self {
        self.refused_value = Some(value.to_string());
        self
    }
}

impl VariableStore for RefusingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let value_matches = self.refused_value.as_deref().map_or(true, |refused| refused == value);
        if key == self.refused_key && value_matches {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                reason: "variable is read-only".to_string(),
            });
        }
        self.inner.set(key, value)
    }
}

/// Profiler with explicit snapshots and clock.
pub fn profiler_with(
    store: &mut MemoryStore,
    snapshots: impl IntoIterator<Item = MemoryStats>,
    clock: Arc<ManualClock>,
) -> Profiler<&mut MemoryStore> {
    Profiler::new(store, Arc::new(FixedSnapshots::new(snapshots)), clock)
}

/// `tracing` writer collecting formatted output in memory.
#[derive(Clone, Debug, Default)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureWriter {
    pub fn contents(&self) -> String {
        String::from_utf8(self.buffer.lock().unwrap().clone()).expect("log output is UTF-8")
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
