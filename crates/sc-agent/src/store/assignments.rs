//! Assignment store

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use sc_core::BackendId;
use sc_protocol::ConfigurationAssignment;

/// Backends this node must run, mapped to the configuration revision the
/// server assigned with them
pub type AssignmentSet = HashMap<BackendId, String>;

/// Desired-state snapshot installed by the status exchange.
///
/// Each exchange replaces the whole set atomically.
pub struct AssignmentStore {
    current: RwLock<Arc<AssignmentSet>>,
}

impl AssignmentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(AssignmentSet::new())),
        }
    }

    /// Current assignments
    pub fn snapshot(&self) -> Arc<AssignmentSet> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace all assignments
    pub fn replace(&self, assignments: AssignmentSet) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(assignments);
    }

    /// Replace all assignments with those from a registration response.
    ///
    /// Returns the number of assigned backends.
    pub fn replace_from(&self, assignments: &[ConfigurationAssignment]) -> usize {
        let set: AssignmentSet = assignments
            .iter()
            .map(|a| (BackendId::new(a.collector_id.clone()), a.configuration_id.clone()))
            .collect();
        let count = set.len();
        self.replace(set);
        count
    }

    /// Whether a backend is assigned
    pub fn contains(&self, id: &BackendId) -> bool {
        self.snapshot().contains_key(id)
    }

    /// Number of assigned backends
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for AssignmentStore {
    fn default() -> Self {
        Self::new()
    }
}
