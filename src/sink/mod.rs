//! Consumers of finished reports
//!
//! The profiler only depends on [`ReporterSink`]; which sink runs is chosen by
//! the caller when profiling starts.

mod file;
mod log;
mod var;

pub use file::FileSink;
pub use log::{LogSink, REPORT_TARGET};
pub use var::{VarSink, VAR_KEYS};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::report::Report;
use crate::store::{StoreError, VariableStore};

/// Errors raised while delivering a report
#[derive(Debug, Error)]
pub enum SinkError {
    /// Report could not be rendered as JSON
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Report could not be written to disk
    #[error("failed to write report to {path}: {source}")]
    Io {
        /// Destination file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Projection into the variable store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request id cannot be used as a file name
    #[error("report id {0:?} is not a valid file name")]
    InvalidReportId(String),
}

/// Something that consumes a finished report
pub trait ReporterSink {
    /// Deliver `report`; `store` is the request's variable store
    fn consume(&mut self, report: &Report, store: &mut dyn VariableStore) -> Result<(), SinkError>;
}

impl<K: ReporterSink + ?Sized> ReporterSink for &mut K {
    fn consume(&mut self, report: &Report, store: &mut dyn VariableStore) -> Result<(), SinkError> {
        (**self).consume(report, store)
    }
}

impl<K: ReporterSink + ?Sized> ReporterSink for Box<K> {
    fn consume(&mut self, report: &Report, store: &mut dyn VariableStore) -> Result<(), SinkError> {
        (**self).consume(report, store)
    }
}
