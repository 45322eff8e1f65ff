//! Periodic loops
//!
//! Three independent loops share the stores in [`AgentState`]:
//!
//! - [`StatusReporter`] pushes status and installs the server's assignments
//! - [`CatalogRefresher`] keeps the backend catalog current
//! - [`Reconciler`] starts and stops collectors to match the assignments

mod catalog;
mod periodic;
mod reconcile;
mod status;

pub use catalog::{CatalogRefresher, RefreshOutcome};
pub use periodic::{run_periodical, spawn_periodical, Periodical};
pub use reconcile::{ReconcileReport, Reconciler, INVALID_CONFIGURATION};
pub use status::StatusReporter;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sc_core::traits::{ConfigRenderer, Supervisor, Transport};

use crate::api::StatusComposer;
use crate::AgentState;

/// Spawn the three loops. They run until `cancel` fires.
pub fn start_periodicals(
    state: &AgentState,
    transport: Arc<dyn Transport>,
    supervisor: Arc<dyn Supervisor>,
    renderer: Arc<dyn ConfigRenderer>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let interval = state.config.update_interval;

    let reporter = StatusReporter::new(
        Arc::clone(&transport),
        Arc::clone(&state.assignments),
        Arc::clone(&state.registry),
        StatusComposer::new(&state.config),
        interval,
    );
    let refresher = CatalogRefresher::new(transport, Arc::clone(&state.catalog));
    let reconciler = Reconciler::new(
        Arc::clone(&state.assignments),
        Arc::clone(&state.catalog),
        Arc::clone(&state.registry),
        supervisor,
        renderer,
    )
    .with_restart_on_configuration_change(state.config.restart_on_configuration_change);

    vec![
        spawn_periodical(reporter, interval, cancel.clone()),
        spawn_periodical(refresher, interval, cancel.clone()),
        spawn_periodical(reconciler, interval, cancel),
    ]
}
