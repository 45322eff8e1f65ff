//! Process supervision traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::BackendDefinition;
use crate::error::SupervisorError;
use crate::status::StatusCell;

/// Starts and stops collector processes on behalf of the reconciler.
///
/// Implementations own process mechanics only; which backends exist is
/// decided by the caller.
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Register a runner for `definition` without starting it.
    ///
    /// The supervisor reports runtime status changes (crashes, respawns)
    /// into `status`.
    async fn add_backend(&self, definition: Arc<BackendDefinition>, status: Arc<StatusCell>);

    /// Check that `definition` may be started, leaving every runner as is.
    ///
    /// Callers replacing a live runner check first so a rejected
    /// definition does not stop the collector it would replace.
    fn check_backend(&self, _definition: &BackendDefinition) -> Result<(), SupervisorError> {
        Ok(())
    }

    /// Stop the runner named `name` (if running) and forget it
    async fn delete_backend(&self, name: &str);

    /// Start the runner named `name`, stopping a running instance first
    async fn restart(&self, name: &str) -> Result<(), SupervisorError>;

    /// Stop every runner
    async fn stop_all(&self);
}
