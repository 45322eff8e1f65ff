//! Runtime status of supervised backends

use std::sync::{Mutex, PoisonError};

pub use sc_protocol::BackendStatus;

use crate::time::current_time_millis;

/// Point-in-time status of one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub status: BackendStatus,
    /// Short operator-facing message
    pub message: String,
    /// Longer detail, e.g. the underlying error
    pub verbose_message: String,
    /// When the status last changed (unix millis)
    pub updated_at: u64,
}

impl StatusInfo {
    pub fn new(status: BackendStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            verbose_message: String::new(),
            updated_at: current_time_millis(),
        }
    }

    /// Attach detail to the status
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.verbose_message = detail.into();
        self
    }
}

/// Shared, updatable status of one backend.
///
/// Handed to the process supervisor so it can report crashes and respawns
/// while the reconciler keeps sole ownership of registry membership.
#[derive(Debug)]
pub struct StatusCell {
    inner: Mutex<StatusInfo>,
}

impl StatusCell {
    /// A cell for a backend that has not been started
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusInfo::new(BackendStatus::Unknown, "Registered")),
        }
    }

    /// Current status
    pub fn get(&self) -> StatusInfo {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the status
    pub fn set(&self, info: StatusInfo) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = info;
    }

    /// Shorthand for `set(StatusInfo::new(..))`
    pub fn update(&self, status: BackendStatus, message: impl Into<String>) {
        self.set(StatusInfo::new(status, message));
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cell_is_unknown() {
        let cell = StatusCell::new();
        assert_eq!(cell.get().status, BackendStatus::Unknown);
    }

    #[test]
    fn test_update_replaces_status() {
        let cell = StatusCell::new();
        cell.set(StatusInfo::new(BackendStatus::Failing, "Failed to start").with_detail("boom"));
        let info = cell.get();
        assert_eq!(info.status, BackendStatus::Failing);
        assert_eq!(info.verbose_message, "boom");

        cell.update(BackendStatus::Running, "Running");
        let info = cell.get();
        assert_eq!(info.status, BackendStatus::Running);
        assert!(info.verbose_message.is_empty());
    }
}
