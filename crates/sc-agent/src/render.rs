//! Collector configuration files

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use sc_core::backend::content_checksum;
use sc_core::config::SidecarConfig;
use sc_core::error::RenderError;
use sc_core::traits::ConfigRenderer;
use sc_core::BackendDefinition;

/// Writes each backend's template to `{dir}/{name}.conf`
pub struct FileRenderer {
    config_dir: PathBuf,
    validation_timeout: Duration,
}

impl FileRenderer {
    pub fn new(config: &SidecarConfig) -> Self {
        Self::with_dir(
            config.collector_configuration_directory.clone(),
            config.collector_validation_timeout,
        )
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>, validation_timeout: Duration) -> Self {
        Self {
            config_dir: config_dir.into(),
            validation_timeout,
        }
    }

    async fn write_atomic(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.config_dir).await?;
        let tmp = path.with_extension("conf.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await
    }
}

#[async_trait]
impl ConfigRenderer for FileRenderer {
    async fn render_on_change(&self, definition: &BackendDefinition) -> Result<bool, RenderError> {
        let path = definition.configuration_path(&self.config_dir);

        if let Ok(existing) = tokio::fs::read(&path).await {
            if content_checksum(&existing) == definition.checksum {
                return Ok(false);
            }
        }

        tracing::info!(
            "[{}] Configuration change detected, rewriting configuration file.",
            definition.name
        );
        self.write_atomic(&path, definition.template.as_bytes())
            .await
            .map_err(|source| RenderError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(true)
    }

    async fn validate_configuration_file(
        &self,
        definition: &BackendDefinition,
    ) -> Result<bool, RenderError> {
        if definition.validation_parameters.is_empty() {
            return Ok(true);
        }

        let path = definition.configuration_path(&self.config_dir);
        let output = Command::new(&definition.executable_path)
            .args(definition.validation_args(&path))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.validation_timeout, output).await {
            Err(_) => {
                tracing::error!(
                    "[{}] Validation timed out after {:?}",
                    definition.name,
                    self.validation_timeout
                );
                Ok(false)
            }
            Ok(Err(source)) => Err(RenderError::Validation {
                name: definition.name.clone(),
                source,
            }),
            Ok(Ok(output)) if output.status.success() => Ok(true),
            Ok(Ok(output)) => {
                tracing::error!(
                    "[{}] Configuration rejected ({}): {}",
                    definition.name,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                Ok(false)
            }
        }
    }
}
