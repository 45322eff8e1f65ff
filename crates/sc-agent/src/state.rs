//! Agent state management

use std::sync::Arc;

use sc_core::config::SidecarConfig;

use crate::store::{AssignmentStore, BackendCatalog, RunnerRegistry};

/// Configuration and the stores shared by the periodic loops
pub struct AgentState {
    /// Configuration
    pub config: SidecarConfig,
    /// Identifier this node registers under
    pub node_id: String,
    /// Backend definitions, written by the catalog refresher
    pub catalog: Arc<BackendCatalog>,
    /// Desired backends, written by the status reporter
    pub assignments: Arc<AssignmentStore>,
    /// Live runners, written by the reconciler
    pub registry: Arc<RunnerRegistry>,
}

impl AgentState {
    /// Create new agent state with empty stores
    pub fn new(config: SidecarConfig, node_id: impl Into<String>) -> Self {
        Self {
            config,
            node_id: node_id.into(),
            catalog: Arc::new(BackendCatalog::new()),
            assignments: Arc::new(AssignmentStore::new()),
            registry: Arc::new(RunnerRegistry::new()),
        }
    }
}
