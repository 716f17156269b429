//! Per-request profiler status
//!
//! UNINITIALIZED -> RUNNING -> DONE, never backwards. The status is stored as a
//! short code so re-entrant invocations can see what earlier ones did.

use std::fmt;

use crate::store::VariableStore;
use crate::ProfilerError;

/// Where the profiler is in its per-request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilerStatus {
    /// Slot absent: `init` has not run for this request
    Uninitialized,
    /// START recorded, events may be pushed
    Running,
    /// Report delivered, nothing more happens for this request
    Done,
}

impl ProfilerStatus {
    /// Stored code, `None` for the absent slot
    pub fn code(self) -> Option<&'static str> {
        match self {
            ProfilerStatus::Uninitialized => None,
            ProfilerStatus::Running => Some("1"),
            ProfilerStatus::Done => Some("2"),
        }
    }

    /// Decode a stored code
    pub fn from_code(code: Option<&str>) -> Result<Self, ProfilerError> {
        match code {
            None | Some("") => Ok(ProfilerStatus::Uninitialized),
            Some("1") => Ok(ProfilerStatus::Running),
            Some("2") => Ok(ProfilerStatus::Done),
            Some(other) => Err(ProfilerError::UnknownStatus(other.to_string())),
        }
    }

    /// Whether moving to `next` keeps the lifecycle monotonic
    pub fn can_transition_to(self, next: ProfilerStatus) -> bool {
        matches!(
            (self, next),
            (ProfilerStatus::Uninitialized, ProfilerStatus::Running)
                | (ProfilerStatus::Running, ProfilerStatus::Done)
        )
    }

    /// Read the status held under `key`
    pub fn load(store: &dyn VariableStore, key: &str) -> Result<Self, ProfilerError> {
        Self::from_code(store.get(key).as_deref())
    }

    /// Move the status held under `key` from `self` to `next`
    pub fn advance(
        self,
        next: ProfilerStatus,
        store: &mut dyn VariableStore,
        key: &str,
    ) -> Result<(), ProfilerError> {
        let Some(code) = next.code().filter(|_| self.can_transition_to(next)) else {
            return Err(ProfilerError::InvalidState {
                operation: next.verb(),
                status: self,
            });
        };
        store.set(key, code.to_string())?;
        Ok(())
    }

    fn verb(self) -> &'static str {
        match self {
            ProfilerStatus::Uninitialized => "reset",
            ProfilerStatus::Running => "start",
            ProfilerStatus::Done => "finish",
        }
    }
}

impl fmt::Display for ProfilerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfilerStatus::Uninitialized => "uninitialized",
            ProfilerStatus::Running => "running",
            ProfilerStatus::Done => "done",
        })
    }
}
