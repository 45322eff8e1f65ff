//! Configuration rendering traits

use async_trait::async_trait;

use crate::backend::BackendDefinition;
use crate::error::RenderError;

/// Materializes collector configuration files
#[async_trait]
pub trait ConfigRenderer: Send + Sync {
    /// Write the configuration for `definition` if it differs from what is
    /// on disk. Returns whether the file changed.
    async fn render_on_change(&self, definition: &BackendDefinition) -> Result<bool, RenderError>;

    /// Check the rendered configuration with the collector's own validator
    async fn validate_configuration_file(
        &self,
        definition: &BackendDefinition,
    ) -> Result<bool, RenderError>;
}
