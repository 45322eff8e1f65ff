//! Sidecar agent configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::{byte_size, duration_secs};
use crate::error::ConfigError;

/// Configuration for the sidecar agent.
///
/// Every field has a built-in default (see [`super::defaults`]); a config
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidecarConfig {
    /// Base URL of the coordination server API
    pub server_url: String,

    /// API token sent with every request (empty disables authentication)
    pub server_api_token: String,

    /// Accept invalid TLS certificates
    pub tls_skip_verify: bool,

    /// Node name (optional, defaults to hostname)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Node identifier, literal or `file:<path>`
    pub node_id: String,

    /// Directory for cached state. A relative `file:` node id is kept here.
    pub cache_path: PathBuf,

    /// Directory for the agent's own log files
    pub log_path: PathBuf,

    /// Directory collector configuration files are rendered into
    pub collector_configuration_directory: PathBuf,

    /// Rotate the agent log file once it reaches this size (bytes)
    #[serde(with = "byte_size")]
    pub log_rotate_max_file_size: u64,

    /// Number of rotated log files to keep
    pub log_rotate_keep_files: usize,

    /// Poll interval shared by the status, catalog and reconcile loops
    #[serde(with = "duration_secs")]
    pub update_interval: Duration,

    /// Upper bound for a single request to the server
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Push host metrics, log file list and collector status upstream
    pub send_status: bool,

    /// Directories whose files are listed in the status payload
    pub list_log_files: Vec<PathBuf>,

    /// Collector executables that may be launched (empty allows any)
    pub collector_binaries_whitelist: Vec<PathBuf>,

    /// Upper bound for running a collector's configuration validation
    #[serde(with = "duration_secs")]
    pub collector_validation_timeout: Duration,

    /// Re-render, validate and restart running collectors whose
    /// configuration changed in the catalog
    pub restart_on_configuration_change: bool,

    /// Backoff for respawning crashed collectors
    pub backoff: BackoffConfig,
}

impl SidecarConfig {
    /// Get the node name, falling back to hostname
    pub fn node_name(&self) -> String {
        self.node_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| gethostname::gethostname().to_string_lossy().into_owned())
    }

    /// Check value constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::Invalid("server_url must not be empty".to_string()));
        }
        reqwest::Url::parse(&self.server_url).map_err(|e| {
            ConfigError::Invalid(format!("server_url {:?} is not a URL: {}", self.server_url, e))
        })?;

        if self.node_id.trim().is_empty() {
            return Err(ConfigError::Invalid("node_id must not be empty".to_string()));
        }
        if self.update_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "update_interval must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be at least 1 second".to_string(),
            ));
        }
        if self.log_rotate_keep_files == 0 {
            return Err(ConfigError::Invalid(
                "log_rotate_keep_files must be at least 1".to_string(),
            ));
        }
        if let Some(entry) = self
            .collector_binaries_whitelist
            .iter()
            .find(|path| !path.is_absolute())
        {
            return Err(ConfigError::Invalid(format!(
                "collector_binaries_whitelist entry {} is not an absolute path",
                entry.display()
            )));
        }
        if self.backoff.multiplier < 1.0 || !(0.0..=1.0).contains(&self.backoff.jitter) {
            return Err(ConfigError::Invalid(
                "backoff multiplier must be >= 1.0 and jitter within 0.0..=1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Exponential backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Initial delay
    #[serde(with = "duration_secs")]
    pub initial: Duration,

    /// Maximum delay
    #[serde(with = "duration_secs")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}
