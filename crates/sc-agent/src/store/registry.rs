//! Runner registry

use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use sc_core::{BackendDefinition, BackendId, StatusCell};

/// Lifecycle state of a runner as seen by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Registered with the supervisor, not started yet
    Added,
    /// Started and supervised
    Running,
    /// Stopped on purpose
    Stopped,
    /// Configuration or start failed; retried on the next cycle
    Failed,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerState::Added => write!(f, "added"),
            RunnerState::Running => write!(f, "running"),
            RunnerState::Stopped => write!(f, "stopped"),
            RunnerState::Failed => write!(f, "failed"),
        }
    }
}

/// Registry entry for one supervised backend
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    /// Backend this runner realizes
    pub backend_id: BackendId,
    /// Backend name (registry key)
    pub name: String,
    /// Lifecycle state
    pub state: RunnerState,
    /// Checksum of the definition the runner was last started with
    pub checksum: String,
    /// Runtime status, also updated by the process supervisor
    pub status: Arc<StatusCell>,
}

impl RunnerHandle {
    /// A freshly registered runner for `definition`
    pub fn added(definition: &BackendDefinition, status: Arc<StatusCell>) -> Self {
        Self {
            backend_id: definition.id.clone(),
            name: definition.name.clone(),
            state: RunnerState::Added,
            checksum: definition.checksum.clone(),
            status,
        }
    }

    /// Whether the runner is started (or about to be)
    pub fn is_active(&self) -> bool {
        matches!(self.state, RunnerState::Added | RunnerState::Running)
    }
}

impl PartialEq for RunnerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.backend_id == other.backend_id
            && self.name == other.name
            && self.state == other.state
            && self.checksum == other.checksum
            && Arc::ptr_eq(&self.status, &other.status)
    }
}

/// Live runners keyed by backend name.
///
/// Only the reconciler adds, removes, or changes the state of entries.
pub struct RunnerRegistry {
    runners: DashMap<String, RunnerHandle>,
}

impl RunnerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            runners: DashMap::new(),
        }
    }

    /// Insert or replace a runner
    pub fn insert(&self, handle: RunnerHandle) {
        self.runners.insert(handle.name.clone(), handle);
    }

    /// Get a runner by name
    pub fn get(&self, name: &str) -> Option<RunnerHandle> {
        self.runners.get(name).map(|r| r.clone())
    }

    /// Check if a runner exists
    pub fn contains(&self, name: &str) -> bool {
        self.runners.contains_key(name)
    }

    /// Remove a runner
    pub fn remove(&self, name: &str) -> Option<RunnerHandle> {
        self.runners.remove(name).map(|(_, handle)| handle)
    }

    /// Change a runner's lifecycle state. Returns false if it does not exist.
    pub fn set_state(&self, name: &str, state: RunnerState) -> bool {
        match self.runners.get_mut(name) {
            Some(mut handle) => {
                handle.state = state;
                true
            }
            None => false,
        }
    }

    /// Record the definition checksum a runner was (re)started with
    pub fn set_checksum(&self, name: &str, checksum: &str) -> bool {
        match self.runners.get_mut(name) {
            Some(mut handle) => {
                handle.checksum = checksum.to_string();
                true
            }
            None => false,
        }
    }

    /// All runners, sorted by name
    pub fn list(&self) -> Vec<RunnerHandle> {
        let mut handles: Vec<_> = self.runners.iter().map(|r| r.value().clone()).collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    /// Backend IDs of active (added or running) runners
    pub fn active_backend_ids(&self) -> HashSet<BackendId> {
        self.runners
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.backend_id.clone())
            .collect()
    }

    /// Number of runners
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
