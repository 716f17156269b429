use crate::store::StoreKeys;

/// Configuration for a [`Profiler`](super::Profiler)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Variable names used for profiler state
    pub keys: StoreKeys,
}

impl ProfilerConfig {
    /// Default variable names
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every variable name at once
    pub fn with_keys(mut self, keys: StoreKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Variable the host fills with its own request id
    pub fn with_request_id_key(mut self, key: impl Into<String>) -> Self {
        self.keys.request_id = key.into();
        self
    }

    /// Variable holding the id reports are filed under
    pub fn with_profiler_request_id_key(mut self, key: impl Into<String>) -> Self {
        self.keys.profiler_request_id = key.into();
        self
    }

    /// Variable holding the status code
    pub fn with_status_key(mut self, key: impl Into<String>) -> Self {
        self.keys.status = key.into();
        self
    }

    /// Variable holding the event log
    pub fn with_events_key(mut self, key: impl Into<String>) -> Self {
        self.keys.events = key.into();
        self
    }
}
