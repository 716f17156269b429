use tracing::{debug, error, info, trace, warn, Level};

use super::{ReporterSink, SinkError};
use crate::report::Report;
use crate::store::VariableStore;

/// `tracing` target every report is emitted on
pub const REPORT_TARGET: &str = "reqprof::report";

/// Emits each report as one JSON log line
///
/// Defaults to ERROR so reports land in the host's error log next to the
/// request they describe.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    level: Level,
}

impl LogSink {
    /// Emit reports at `level`
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Level reports are emitted at
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(Level::ERROR)
    }
}

impl ReporterSink for LogSink {
    fn consume(&mut self, report: &Report, _store: &mut dyn VariableStore) -> Result<(), SinkError> {
        let json = report.to_json()?;
        let report_id = report.id();
        if self.level == Level::ERROR {
            error!(target: REPORT_TARGET, report_id, "{json}");
        } else if self.level == Level::WARN {
            warn!(target: REPORT_TARGET, report_id, "{json}");
        } else if self.level == Level::INFO {
            info!(target: REPORT_TARGET, report_id, "{json}");
        } else if self.level == Level::DEBUG {
            debug!(target: REPORT_TARGET, report_id, "{json}");
        } else {
            trace!(target: REPORT_TARGET, report_id, "{json}");
        }
        Ok(())
    }
}
