//! Reconciliation loop
//!
//! Converges the runner registry to the assignment set:
//!
//! - `to_add = assigned - active`: look up each backend in the catalog,
//!   register a runner, render its configuration and start it. Backends the
//!   catalog does not know yet stay pending until a later cycle.
//! - `to_remove = registered - assigned`: stop and forget the runner.
//!
//! Additions are processed before removals. An empty assignment set skips
//! the cycle entirely, so collectors keep running until the first status
//! exchange has completed.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use sc_core::traits::{ConfigRenderer, Supervisor};
use sc_core::{BackendDefinition, BackendId, BackendStatus, StatusCell, StatusInfo};

use super::periodic::Periodical;
use crate::store::{
    AssignmentStore, BackendCatalog, CatalogSnapshot, RunnerHandle, RunnerRegistry, RunnerState,
};

/// Message attached to a backend whose new configuration failed validation
pub const INVALID_CONFIGURATION: &str =
    "Collector configuration file is not valid, waiting for the next update.";

/// What one reconciliation cycle did, listed by backend id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Cycle skipped because nothing is assigned
    pub skipped: bool,
    /// Backends started
    pub started: Vec<String>,
    /// Backends whose configuration or start failed
    pub failed: Vec<String>,
    /// Assigned backends missing from the catalog
    pub pending: Vec<BackendId>,
    /// Backends stopped because their assignment was withdrawn
    pub removed: Vec<String>,
    /// Running backends restarted for a configuration change
    pub reloaded: Vec<String>,
}

impl ReconcileReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Whether the cycle changed nothing
    pub fn is_noop(&self) -> bool {
        self.started.is_empty()
            && self.failed.is_empty()
            && self.removed.is_empty()
            && self.reloaded.is_empty()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} started, {} failed, {} pending, {} removed, {} reloaded",
            self.started.len(),
            self.failed.len(),
            self.pending.len(),
            self.removed.len(),
            self.reloaded.len()
        )
    }
}

/// Starts and stops supervised collectors to match the assignment set
pub struct Reconciler {
    assignments: Arc<AssignmentStore>,
    catalog: Arc<BackendCatalog>,
    registry: Arc<RunnerRegistry>,
    supervisor: Arc<dyn Supervisor>,
    renderer: Arc<dyn ConfigRenderer>,
    restart_on_configuration_change: bool,
}

impl Reconciler {
    pub fn new(
        assignments: Arc<AssignmentStore>,
        catalog: Arc<BackendCatalog>,
        registry: Arc<RunnerRegistry>,
        supervisor: Arc<dyn Supervisor>,
        renderer: Arc<dyn ConfigRenderer>,
    ) -> Self {
        Self {
            assignments,
            catalog,
            registry,
            supervisor,
            renderer,
            restart_on_configuration_change: false,
        }
    }

    /// Also restart running collectors whose catalog definition changed.
    ///
    /// Off by default: assignment changes alone drive restarts.
    pub fn with_restart_on_configuration_change(mut self, enabled: bool) -> Self {
        self.restart_on_configuration_change = enabled;
        self
    }

    /// Run one reconciliation cycle
    pub async fn reconcile(&self) -> ReconcileReport {
        let desired = self.assignments.snapshot();
        if desired.is_empty() {
            tracing::info!("No configurations assigned to this instance. Skipping reconciliation.");
            return ReconcileReport::skipped();
        }

        let catalog = self.catalog.snapshot();
        let mut report = ReconcileReport::default();

        let desired_ids: BTreeSet<&BackendId> = desired.keys().collect();
        let active = self.registry.active_backend_ids();

        for id in desired_ids.iter().filter(|id| !active.contains(**id)) {
            let Some(definition) = catalog.get(id) else {
                tracing::info!("Backend {} is assigned but not in the catalog yet", id);
                report.pending.push((*id).clone());
                continue;
            };

            if self.start(definition).await {
                report.started.push(id.to_string());
            } else {
                report.failed.push(id.to_string());
            }
        }
        report.started.sort();

        for handle in self.registry.list() {
            if desired.contains_key(&handle.backend_id) {
                continue;
            }
            tracing::info!("Removing backend runner: {}", handle.name);
            self.supervisor.delete_backend(&handle.name).await;
            self.registry.remove(&handle.name);
            report.removed.push(handle.backend_id.to_string());
        }

        if self.restart_on_configuration_change {
            self.reload_changed(&catalog, &mut report).await;
        }

        if !report.is_noop() {
            tracing::info!("Reconciliation finished: {}", report);
        }
        report
    }

    /// Register, render and start one backend. Returns whether it runs.
    async fn start(&self, definition: Arc<BackendDefinition>) -> bool {
        let name = definition.name.clone();

        // A failed runner keeps its status cell so the last error stays visible
        let status = match self.registry.get(&name) {
            Some(existing) => Arc::clone(&existing.status),
            None => Arc::new(StatusCell::new()),
        };

        tracing::info!("Adding backend runner: {}", name);
        self.supervisor
            .add_backend(Arc::clone(&definition), Arc::clone(&status))
            .await;
        self.registry
            .insert(RunnerHandle::added(&definition, Arc::clone(&status)));

        if let Err(e) = self.renderer.render_on_change(&definition).await {
            self.mark_failed(&name, &status, "Failed to write collector configuration", &e);
            return false;
        }

        match self.supervisor.restart(&name).await {
            Ok(()) => {
                self.registry.set_state(&name, RunnerState::Running);
                status.update(BackendStatus::Running, "Running");
                true
            }
            Err(e) => {
                self.mark_failed(&name, &status, "Failed to start collector", &e);
                false
            }
        }
    }

    async fn reload_changed(&self, catalog: &CatalogSnapshot, report: &mut ReconcileReport) {
        for handle in self.registry.list() {
            if handle.state != RunnerState::Running {
                continue;
            }
            let Some(definition) = catalog.get(&handle.backend_id) else {
                continue;
            };
            if definition.checksum == handle.checksum {
                continue;
            }

            let name = handle.name.clone();
            let id = handle.backend_id.to_string();

            // The running collector stays up until its replacement is known to start
            if let Err(e) = self.supervisor.check_backend(&definition) {
                self.reject_reload(&name, &handle.status, "Refusing to restart collector", &e);
                self.registry.set_checksum(&name, &definition.checksum);
                report.failed.push(id);
                continue;
            }

            let changed = match self.renderer.render_on_change(&definition).await {
                Ok(changed) => changed,
                Err(e) => {
                    self.reject_reload(&name, &handle.status, "Failed to write collector configuration", &e);
                    report.failed.push(id);
                    continue;
                }
            };
            // Not retried until the catalog moves again
            self.registry.set_checksum(&name, &definition.checksum);
            if !changed {
                continue;
            }

            match self.renderer.validate_configuration_file(&definition).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::error!("[{}] {}", name, INVALID_CONFIGURATION);
                    handle.status.update(BackendStatus::Failing, INVALID_CONFIGURATION);
                    continue;
                }
                Err(e) => {
                    tracing::error!("[{}] Failed to validate configuration: {}", name, e);
                    handle.status.set(
                        StatusInfo::new(BackendStatus::Failing, INVALID_CONFIGURATION)
                            .with_detail(e.to_string()),
                    );
                    continue;
                }
            }

            self.supervisor
                .add_backend(Arc::clone(&definition), Arc::clone(&handle.status))
                .await;
            match self.supervisor.restart(&name).await {
                Ok(()) => {
                    handle.status.update(BackendStatus::Running, "Running");
                    report.reloaded.push(id);
                }
                Err(e) => {
                    self.mark_failed(&name, &handle.status, "Failed to restart collector", &e);
                    report.failed.push(id);
                }
            }
        }
    }

    /// Report a reload that did not happen. The collector keeps running on
    /// its previous configuration.
    fn reject_reload(&self, name: &str, status: &StatusCell, message: &str, error: &dyn fmt::Display) {
        tracing::error!("[{}] {}: {}", name, message, error);
        status.set(StatusInfo::new(BackendStatus::Failing, message).with_detail(error.to_string()));
    }

    fn mark_failed(&self, name: &str, status: &StatusCell, message: &str, error: &dyn fmt::Display) {
        tracing::error!("[{}] {}: {}", name, message, error);
        self.registry.set_state(name, RunnerState::Failed);
        status.set(StatusInfo::new(BackendStatus::Failing, message).with_detail(error.to_string()));
    }
}

#[async_trait]
impl Periodical for Reconciler {
    fn name(&self) -> &'static str {
        "reconcile"
    }

    async fn run_once(&mut self) {
        self.reconcile().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{definition, MemoryRenderer, RecordingSupervisor, SupervisorCall};
    use std::collections::HashSet;

    struct Fixture {
        assignments: Arc<AssignmentStore>,
        catalog: Arc<BackendCatalog>,
        registry: Arc<RunnerRegistry>,
        supervisor: Arc<RecordingSupervisor>,
        renderer: Arc<MemoryRenderer>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                assignments: Arc::new(AssignmentStore::new()),
                catalog: Arc::new(BackendCatalog::new()),
                registry: Arc::new(RunnerRegistry::new()),
                supervisor: Arc::new(RecordingSupervisor::default()),
                renderer: Arc::new(MemoryRenderer::new()),
            }
        }

        fn reconciler(&self) -> Reconciler {
            Reconciler::new(
                Arc::clone(&self.assignments),
                Arc::clone(&self.catalog),
                Arc::clone(&self.registry),
                self.supervisor.clone(),
                self.renderer.clone(),
            )
        }

        fn assign(&self, ids: &[&str]) {
            self.assignments.replace(
                ids.iter()
                    .map(|id| (BackendId::new(*id), format!("cfg-{}", id)))
                    .collect(),
            );
        }

        fn registered_ids(&self) -> HashSet<String> {
            self.registry
                .list()
                .into_iter()
                .map(|h| h.backend_id.to_string())
                .collect()
        }
    }

    #[tokio::test]
    async fn test_two_assigned_backends_start_once() {
        let fx = Fixture::new();
        fx.catalog
            .upsert_all(vec![definition("shipper-1", "filebeat"), definition("shipper-2", "nxlog")]);
        fx.assign(&["shipper-1", "shipper-2"]);
        let reconciler = fx.reconciler();

        let report = reconciler.reconcile().await;

        assert_eq!(report.started, vec!["shipper-1", "shipper-2"]);
        assert_eq!(fx.supervisor.restarts(), 2);
        for name in ["filebeat", "nxlog"] {
            let handle = fx.registry.get(name).unwrap();
            assert_eq!(handle.state, RunnerState::Running);
            assert_eq!(handle.status.get().status, BackendStatus::Running);
        }

        let before = fx.registry.list();
        let second = reconciler.reconcile().await;

        assert!(second.is_noop());
        assert_eq!(fx.supervisor.restarts(), 2);
        assert_eq!(fx.registry.list(), before);
    }

    #[tokio::test]
    async fn test_converges_to_assignment_set() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![
            definition("a", "filebeat"),
            definition("b", "nxlog"),
            definition("c", "winlogbeat"),
        ]);
        fx.assign(&["a", "c"]);

        fx.reconciler().reconcile().await;

        let expected: HashSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(fx.registered_ids(), expected);
    }

    #[tokio::test]
    async fn test_empty_assignments_skip_cycle() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![definition("a", "filebeat")]);
        fx.assign(&["a"]);
        let reconciler = fx.reconciler();
        reconciler.reconcile().await;
        fx.supervisor.clear();

        fx.assign(&[]);
        let report = reconciler.reconcile().await;

        assert!(report.skipped);
        assert!(fx.supervisor.calls().is_empty());
        assert!(fx.registry.contains("filebeat"));
    }

    #[tokio::test]
    async fn test_missing_catalog_entry_stays_pending() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![definition("a", "filebeat")]);
        fx.assign(&["a", "x"]);
        let reconciler = fx.reconciler();

        let report = reconciler.reconcile().await;

        assert_eq!(report.pending, vec![BackendId::new("x")]);
        assert_eq!(report.started, vec!["a"]);
        assert_eq!(fx.registry.len(), 1);
        assert_eq!(fx.renderer.renders(), vec!["filebeat"]);

        // Catalog catches up on a later cycle
        fx.catalog.upsert_all(vec![definition("x", "nxlog")]);
        let report = reconciler.reconcile().await;

        assert_eq!(report.started, vec!["x"]);
        assert!(report.pending.is_empty());
        assert_eq!(fx.registry.len(), 2);
    }

    #[tokio::test]
    async fn test_withdrawal_deletes_only_withdrawn_backend() {
        let fx = Fixture::new();
        fx.catalog
            .upsert_all(vec![definition("a", "filebeat"), definition("b", "nxlog")]);
        fx.assign(&["a", "b"]);
        let reconciler = fx.reconciler();
        reconciler.reconcile().await;
        fx.supervisor.clear();

        fx.assign(&["a"]);
        let report = reconciler.reconcile().await;

        assert_eq!(report.removed, vec!["b"]);
        assert_eq!(fx.supervisor.deletes(), vec!["nxlog"]);
        assert_eq!(fx.supervisor.calls(), vec![SupervisorCall::Delete("nxlog".to_string())]);
        assert!(!fx.registry.contains("nxlog"));
        assert!(fx.registry.contains("filebeat"));
    }

    #[tokio::test]
    async fn test_additions_run_before_removals() {
        let fx = Fixture::new();
        fx.catalog
            .upsert_all(vec![definition("old", "filebeat-old"), definition("new", "filebeat-new")]);
        fx.assign(&["old"]);
        let reconciler = fx.reconciler();
        reconciler.reconcile().await;
        fx.supervisor.clear();

        fx.assign(&["new"]);
        reconciler.reconcile().await;

        assert_eq!(
            fx.supervisor.calls(),
            vec![
                SupervisorCall::Add("filebeat-new".to_string()),
                SupervisorCall::Restart("filebeat-new".to_string()),
                SupervisorCall::Delete("filebeat-old".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_start_failure_is_isolated_and_retried() {
        let fx = Fixture::new();
        fx.catalog
            .upsert_all(vec![definition("a", "filebeat"), definition("b", "nxlog")]);
        fx.assign(&["a", "b"]);
        fx.supervisor.fail_restart("nxlog");
        let reconciler = fx.reconciler();

        let report = reconciler.reconcile().await;

        assert_eq!(report.started, vec!["a"]);
        assert_eq!(report.failed, vec!["b"]);
        let failed = fx.registry.get("nxlog").unwrap();
        assert_eq!(failed.state, RunnerState::Failed);
        let info = failed.status.get();
        assert_eq!(info.status, BackendStatus::Failing);
        assert!(info.verbose_message.contains("exec format error"));
        assert_eq!(fx.registry.get("filebeat").unwrap().state, RunnerState::Running);

        fx.supervisor.heal("nxlog");
        fx.supervisor.clear();
        let report = reconciler.reconcile().await;

        assert_eq!(report.started, vec!["b"]);
        assert_eq!(fx.supervisor.restarts(), 1);
        let recovered = fx.registry.get("nxlog").unwrap();
        assert_eq!(recovered.state, RunnerState::Running);
        assert!(Arc::ptr_eq(&recovered.status, &failed.status));
    }

    #[tokio::test]
    async fn test_config_change_ignored_by_default() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![definition("a", "filebeat")]);
        fx.assign(&["a"]);
        let reconciler = fx.reconciler();
        reconciler.reconcile().await;
        fx.supervisor.clear();

        let mut changed = definition("a", "filebeat");
        changed.checksum = "new-checksum".to_string();
        fx.catalog.upsert_all(vec![changed]);
        let report = reconciler.reconcile().await;

        assert!(report.is_noop());
        assert!(fx.supervisor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_config_change_restarts_when_enabled() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![definition("a", "filebeat")]);
        fx.assign(&["a"]);
        let reconciler = fx.reconciler().with_restart_on_configuration_change(true);
        reconciler.reconcile().await;
        fx.supervisor.clear();

        let mut changed = definition("a", "filebeat");
        changed.checksum = "new-checksum".to_string();
        fx.catalog.upsert_all(vec![changed]);
        let report = reconciler.reconcile().await;

        assert_eq!(report.reloaded, vec!["a"]);
        assert_eq!(fx.supervisor.restarts(), 1);
        assert_eq!(fx.registry.get("filebeat").unwrap().checksum, "new-checksum");

        // Same definition again: nothing to do
        fx.supervisor.clear();
        assert!(reconciler.reconcile().await.is_noop());
        assert!(fx.supervisor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_change_skips_restart() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![definition("a", "filebeat")]);
        fx.assign(&["a"]);
        let reconciler = fx.reconciler().with_restart_on_configuration_change(true);
        reconciler.reconcile().await;
        fx.supervisor.clear();

        fx.renderer.set_valid(false);
        let mut changed = definition("a", "filebeat");
        changed.checksum = "broken".to_string();
        fx.catalog.upsert_all(vec![changed]);
        let report = reconciler.reconcile().await;

        assert!(report.reloaded.is_empty());
        assert_eq!(fx.supervisor.restarts(), 0);
        let handle = fx.registry.get("filebeat").unwrap();
        assert_eq!(handle.state, RunnerState::Running);
        assert_eq!(handle.status.get().message, INVALID_CONFIGURATION);
    }

    #[tokio::test]
    async fn test_rejected_config_change_keeps_collector_running() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![definition("a", "filebeat")]);
        fx.assign(&["a"]);
        let reconciler = fx.reconciler().with_restart_on_configuration_change(true);
        reconciler.reconcile().await;
        fx.supervisor.clear();

        fx.supervisor.reject_executable("/opt/rogue/filebeat");
        let mut changed = definition("a", "filebeat");
        changed.executable_path = "/opt/rogue/filebeat".into();
        changed.checksum = "moved".to_string();
        fx.catalog.upsert_all(vec![changed]);
        let report = reconciler.reconcile().await;

        assert_eq!(report.failed, vec!["a"]);
        assert!(fx.supervisor.calls().is_empty());
        let handle = fx.registry.get("filebeat").unwrap();
        assert_eq!(handle.state, RunnerState::Running);
        assert_eq!(handle.status.get().status, BackendStatus::Failing);

        // Not retried until the catalog changes again
        assert!(reconciler.reconcile().await.is_noop());
        assert!(fx.supervisor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_on_config_change_keeps_collector_running() {
        let fx = Fixture::new();
        fx.catalog.upsert_all(vec![definition("a", "filebeat")]);
        fx.assign(&["a"]);
        let reconciler = fx.reconciler().with_restart_on_configuration_change(true);
        reconciler.reconcile().await;
        fx.supervisor.clear();

        fx.renderer.set_writable(false);
        let mut changed = definition("a", "filebeat");
        changed.checksum = "new-checksum".to_string();
        fx.catalog.upsert_all(vec![changed]);
        let report = reconciler.reconcile().await;

        assert_eq!(report.failed, vec!["a"]);
        assert!(fx.supervisor.calls().is_empty());
        let handle = fx.registry.get("filebeat").unwrap();
        assert_eq!(handle.state, RunnerState::Running);
        assert!(handle.status.get().verbose_message.contains("read-only"));

        // The next cycle neither re-adds the runner nor restarts it
        fx.renderer.set_writable(true);
        let report = reconciler.reconcile().await;
        assert_eq!(report.reloaded, vec!["a"]);
        assert_eq!(
            fx.supervisor.calls(),
            vec![
                SupervisorCall::Add("filebeat".to_string()),
                SupervisorCall::Restart("filebeat".to_string()),
            ]
        );
    }
}
