//! Status reporting loop

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use sc_core::error::TransportError;
use sc_core::traits::Transport;
use sc_protocol::RegistrationResponse;

use super::periodic::Periodical;
use crate::api::StatusComposer;
use crate::store::{AssignmentStore, RunnerRegistry};

/// Pushes node status upstream and installs the assignments the server
/// answers with
pub struct StatusReporter {
    transport: Arc<dyn Transport>,
    assignments: Arc<AssignmentStore>,
    registry: Arc<RunnerRegistry>,
    composer: StatusComposer,
    update_interval: Duration,
}

impl StatusReporter {
    pub fn new(
        transport: Arc<dyn Transport>,
        assignments: Arc<AssignmentStore>,
        registry: Arc<RunnerRegistry>,
        composer: StatusComposer,
        update_interval: Duration,
    ) -> Self {
        Self {
            transport,
            assignments,
            registry,
            composer,
            update_interval,
        }
    }

    /// Send one status report. Returns the number of assignments installed.
    pub async fn report(&mut self) -> Result<usize, TransportError> {
        let request = self.composer.compose(&self.registry, &self.assignments).await;
        let response = self.transport.report_status(&request).await?;

        self.apply_override(&response);

        let count = self.assignments.replace_from(&response.assignments);
        tracing::debug!(
            "Assignments for {}: {:?}",
            self.composer.node_name(),
            self.assignments.snapshot()
        );
        Ok(count)
    }

    fn apply_override(&mut self, response: &RegistrationResponse) {
        if !response.configuration_override {
            return;
        }
        let Some(configuration) = &response.configuration else {
            return;
        };

        if configuration.send_status != self.composer.send_status() {
            tracing::info!("Server set send_status = {}", configuration.send_status);
            self.composer.set_send_status(configuration.send_status);
        }
        if configuration.update_interval != self.update_interval.as_secs() {
            // Loop intervals are fixed at startup
            tracing::debug!(
                "Server requested update_interval = {}s, keeping {}s until restart",
                configuration.update_interval,
                self.update_interval.as_secs()
            );
        }
    }
}

#[async_trait]
impl Periodical for StatusReporter {
    fn name(&self) -> &'static str {
        "status report"
    }

    async fn run_once(&mut self) {
        if let Err(e) = self.report().await {
            tracing::error!("Can't register sidecar: {}", e);
        }
    }
}
