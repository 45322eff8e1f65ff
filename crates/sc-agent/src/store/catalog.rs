//! Backend catalog store

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use sc_core::{BackendDefinition, BackendId};

/// Immutable view of the catalog at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    by_id: HashMap<BackendId, Arc<BackendDefinition>>,
}

impl CatalogSnapshot {
    /// Get a definition by backend ID
    pub fn get(&self, id: &BackendId) -> Option<Arc<BackendDefinition>> {
        self.by_id.get(id).cloned()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Known backend definitions, keyed by backend ID.
///
/// Updates are copy-on-write: a batch is applied to a copy of the current
/// map which then replaces it, so a reader holding a snapshot never sees a
/// partially applied update.
pub struct BackendCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl BackendCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
        }
    }

    /// Current catalog contents
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Get a definition by backend ID
    pub fn get(&self, id: &BackendId) -> Option<Arc<BackendDefinition>> {
        self.snapshot().get(id)
    }

    /// Insert or wholly replace definitions, keyed by ID.
    ///
    /// Definitions absent from `definitions` are kept. Returns the number
    /// of definitions applied.
    pub fn upsert_all(&self, definitions: impl IntoIterator<Item = BackendDefinition>) -> usize {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = CatalogSnapshot::clone(&current);
        let mut applied = 0;
        for definition in definitions {
            next.by_id.insert(definition.id.clone(), Arc::new(definition));
            applied += 1;
        }

        *current = Arc::new(next);
        applied
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for BackendCatalog {
    fn default() -> Self {
        Self::new()
    }
}
