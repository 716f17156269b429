//! Host variable store seam
//!
//! The host keeps one string per variable name for the lifetime of a request.
//! All profiler state crosses invocations through this trait.

use std::collections::HashMap;

use thiserror::Error;

/// Errors reported by a variable store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The host refused to write a variable (e.g. it was never declared)
    #[error("variable `{key}` rejected write: {reason}")]
    Rejected {
        /// Variable name
        key: String,
        /// Host-supplied reason
        reason: String,
    },
}

/// Request-scoped string key/value store
pub trait VariableStore {
    /// Read a variable
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrite a variable
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    /// Concatenate `suffix` onto a variable, treating an absent one as empty
    fn append(&mut self, key: &str, suffix: &str) -> Result<(), StoreError> {
        let mut value = self.get(key).unwrap_or_default();
        value.push_str(suffix);
        self.set(key, value)
    }
}

impl<S: VariableStore + ?Sized> VariableStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn append(&mut self, key: &str, suffix: &str) -> Result<(), StoreError> {
        (**self).append(key, suffix)
    }
}

/// In-process store backed by a `HashMap`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    vars: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    /// Builder-style preset, e.g. the host's own `request_id`
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Borrow a variable without copying it
    pub fn get_ref(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Number of variables set
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variable is set
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VariableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.vars.insert(key.to_string(), value);
        Ok(())
    }

    fn append(&mut self, key: &str, suffix: &str) -> Result<(), StoreError> {
        self.vars.entry(key.to_string()).or_default().push_str(suffix);
        Ok(())
    }
}

/// Names of the variables the profiler reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    /// Host-provided request identity, used when no id is passed to `init`
    pub request_id: String,
    /// Id the report is filed under
    pub profiler_request_id: String,
    /// Status slot
    pub status: String,
    /// Event log slot
    pub events: String,
    /// Allocator cluster size captured at start
    pub cluster_size: String,
    /// Allocator page size captured at start
    pub page_size: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            request_id: "request_id".to_string(),
            profiler_request_id: "profiler_request_id".to_string(),
            status: "profiler_status".to_string(),
            events: "profiler_internal_events".to_string(),
            cluster_size: "profiler_memory_cluster_size".to_string(),
            page_size: "profiler_memory_page_size".to_string(),
        }
    }
}
