//! Registration payload composition

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use sc_core::config::SidecarConfig;
use sc_core::BackendStatus;
use sc_protocol::{
    BackendStatusReport, LogFile, NodeDetails, NodeMetrics, NodeStatus, RegistrationRequest,
};

use super::logfiles::list_log_files;
use super::metrics::HostMetrics;
use crate::store::{AssignmentStore, RunnerRegistry};

/// Builds the registration request sent on every status cycle
pub struct StatusComposer {
    node_name: String,
    operating_system: String,
    send_status: bool,
    log_dirs: Arc<[PathBuf]>,
    metrics: Arc<Mutex<HostMetrics>>,
}

impl StatusComposer {
    pub fn new(config: &SidecarConfig) -> Self {
        Self {
            node_name: config.node_name(),
            operating_system: std::env::consts::OS.to_string(),
            send_status: config.send_status,
            log_dirs: config.list_log_files.clone().into(),
            metrics: Arc::new(Mutex::new(HostMetrics::new())),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn send_status(&self) -> bool {
        self.send_status
    }

    /// Applied when the server overrides local settings
    pub fn set_send_status(&mut self, send_status: bool) {
        self.send_status = send_status;
    }

    /// Compose a request from the current registry contents.
    ///
    /// With status reporting disabled only the node identity is sent.
    pub async fn compose(
        &self,
        registry: &RunnerRegistry,
        assignments: &AssignmentStore,
    ) -> RegistrationRequest {
        let mut details = NodeDetails {
            operating_system: self.operating_system.clone(),
            metrics: None,
            log_file_list: None,
            status: None,
        };

        if self.send_status {
            let assigned = assignments.snapshot();
            let collectors: Vec<BackendStatusReport> = registry
                .list()
                .into_iter()
                .map(|handle| {
                    let info = handle.status.get();
                    BackendStatusReport {
                        configuration_id: assigned
                            .get(&handle.backend_id)
                            .cloned()
                            .unwrap_or_default(),
                        collector_id: handle.backend_id.to_string(),
                        status: info.status,
                        message: info.message,
                        verbose_message: info.verbose_message,
                    }
                })
                .collect();

            let (status, message) = aggregate_status(&collectors);
            details.status = Some(NodeStatus {
                status,
                message,
                collectors,
            });
            if let Some((metrics, log_files)) = self.sample_host().await {
                details.metrics = Some(metrics);
                details.log_file_list = log_files;
            }
        }

        RegistrationRequest {
            node_name: self.node_name.clone(),
            node_details: details,
        }
    }
}

impl StatusComposer {
    /// Sample host metrics and list log files off the async workers
    async fn sample_host(&self) -> Option<(NodeMetrics, Option<Vec<LogFile>>)> {
        let metrics = Arc::clone(&self.metrics);
        let log_dirs = Arc::clone(&self.log_dirs);

        let sampled = tokio::task::spawn_blocking(move || {
            let sample = metrics
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .collect();
            let log_files = (!log_dirs.is_empty()).then(|| list_log_files(&log_dirs));
            (sample, log_files)
        })
        .await;

        match sampled {
            Ok(sampled) => Some(sampled),
            Err(e) => {
                tracing::warn!("Failed to sample host metrics: {}", e);
                None
            }
        }
    }
}

/// Node-level status summarizing every collector report
pub fn aggregate_status(reports: &[BackendStatusReport]) -> (BackendStatus, String) {
    let running = reports
        .iter()
        .filter(|r| r.status == BackendStatus::Running)
        .count();
    let failing = reports
        .iter()
        .filter(|r| r.status == BackendStatus::Failing)
        .count();

    let status = if failing > 0 {
        BackendStatus::Failing
    } else if running > 0 {
        BackendStatus::Running
    } else {
        BackendStatus::Unknown
    };
    (status, format!("{} running / {} failing", running, failing))
}
