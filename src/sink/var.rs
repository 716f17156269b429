use super::{ReporterSink, SinkError};
use crate::report::Report;
use crate::store::VariableStore;

/// Variables written by [`VarSink`], in write order
pub const VAR_KEYS: [&str; 10] = [
    "profiler_start_size",
    "profiler_start_blocks",
    "profiler_start_time",
    "profiler_end_size",
    "profiler_end_blocks",
    "profiler_end_time",
    "profiler_elapsed_time",
    "profiler_size_growth",
    "profiler_blocks_growth",
    "profiler_full_report",
];

/// Projects report figures back into the variable store
///
/// Meant for access-log formats. Access logs are usually written before the
/// end-of-request hook fires, so collect explicitly when using this sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarSink;

impl ReporterSink for VarSink {
    fn consume(&mut self, report: &Report, store: &mut dyn VariableStore) -> Result<(), SinkError> {
        let summary = report.summary();
        let values = [
            summary.begin.size.to_string(),
            summary.begin.nblocks.to_string(),
            summary.begin.created_at.to_string(),
            summary.end.size.to_string(),
            summary.end.nblocks.to_string(),
            summary.end.created_at.to_string(),
            summary.elapsed_time_ms.to_string(),
            summary.size_growth.to_string(),
            summary.nblocks_growth.to_string(),
            report.to_json()?,
        ];
        for (key, value) in VAR_KEYS.into_iter().zip(values) {
            store.set(key, value)?;
        }
        Ok(())
    }
}
