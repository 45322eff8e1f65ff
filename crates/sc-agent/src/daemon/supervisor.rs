//! Supervisor implementation over exec runners

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use sc_core::config::{BackoffConfig, SidecarConfig};
use sc_core::error::SupervisorError;
use sc_core::traits::Supervisor;
use sc_core::{BackendDefinition, StatusCell};

use super::runner::ExecRunner;
use super::whitelist::ExecutableWhitelist;

/// Runs collectors as child processes of the agent
pub struct Daemon {
    runners: Mutex<HashMap<String, ExecRunner>>,
    config_dir: PathBuf,
    whitelist: ExecutableWhitelist,
    backoff: BackoffConfig,
}

impl Daemon {
    pub fn new(config: &SidecarConfig) -> Self {
        Self::with_whitelist(
            config.collector_configuration_directory.clone(),
            ExecutableWhitelist::new(config.collector_binaries_whitelist.clone()),
            config.backoff.clone(),
        )
    }

    pub fn with_whitelist(
        config_dir: PathBuf,
        whitelist: ExecutableWhitelist,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            runners: Mutex::new(HashMap::new()),
            config_dir,
            whitelist,
            backoff,
        }
    }

    /// Whether the runner named `name` has a live collector
    pub async fn is_running(&self, name: &str) -> bool {
        self.runners
            .lock()
            .await
            .get(name)
            .map(ExecRunner::is_running)
            .unwrap_or(false)
    }

    /// Number of registered runners
    pub async fn len(&self) -> usize {
        self.runners.lock().await.len()
    }

    fn check_executable(&self, definition: &BackendDefinition) -> Result<(), SupervisorError> {
        let executable = &definition.executable_path;
        if !self.whitelist.allows(executable) {
            return Err(SupervisorError::NotWhitelisted(executable.clone()));
        }
        // Relative names are resolved through PATH at spawn time
        if executable.is_absolute() && !executable.exists() {
            return Err(SupervisorError::ExecutableNotFound(executable.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl Supervisor for Daemon {
    async fn add_backend(&self, definition: Arc<BackendDefinition>, status: Arc<StatusCell>) {
        let name = definition.name.clone();
        let runner = ExecRunner::new(definition, &self.config_dir, status, self.backoff.clone());

        let mut runners = self.runners.lock().await;
        if let Some(mut previous) = runners.insert(name.clone(), runner) {
            tracing::debug!("[{}] Replacing runner", name);
            previous.stop().await;
        }
    }

    fn check_backend(&self, definition: &BackendDefinition) -> Result<(), SupervisorError> {
        self.check_executable(definition)
    }

    async fn delete_backend(&self, name: &str) {
        let removed = self.runners.lock().await.remove(name);
        match removed {
            Some(mut runner) => runner.stop().await,
            None => tracing::debug!("[{}] No runner to delete", name),
        }
    }

    async fn restart(&self, name: &str) -> Result<(), SupervisorError> {
        let mut runners = self.runners.lock().await;
        let runner = runners
            .get_mut(name)
            .ok_or_else(|| SupervisorError::UnknownBackend(name.to_string()))?;

        self.check_executable(runner.definition())?;

        runner.stop().await;
        tracing::info!("[{}] Starting collector", name);
        runner.start()
    }

    async fn stop_all(&self) {
        let runners: Vec<ExecRunner> = self.runners.lock().await.drain().map(|(_, r)| r).collect();
        if runners.is_empty() {
            return;
        }
        tracing::info!("Stopping {} collectors", runners.len());
        futures::future::join_all(runners.into_iter().map(|mut runner| async move {
            runner.stop().await;
        }))
        .await;
    }
}
