use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::{ReporterSink, SinkError};
use crate::report::Report;
use crate::store::VariableStore;

/// Writes each report to `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Write reports into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write reports into the working directory
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    /// Destination for the report filed under `id`
    ///
    /// Ids that would escape `dir` are rejected.
    pub fn path_for(&self, id: &str) -> Result<PathBuf, SinkError> {
        let file_name = format!("{id}.json");
        let mut components = Path::new(&file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !id.is_empty() => Ok(self.dir.join(file_name)),
            _ => Err(SinkError::InvalidReportId(id.to_string())),
        }
    }
}

impl ReporterSink for FileSink {
    fn consume(&mut self, report: &Report, _store: &mut dyn VariableStore) -> Result<(), SinkError> {
        let path = self.path_for(report.id())?;
        let json = report.to_json()?;
        fs::write(&path, json).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "wrote profiler report");
        Ok(())
    }
}
