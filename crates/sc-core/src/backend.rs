//! Backend (collector) definitions

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use sc_protocol::CollectorResponse;

use crate::types::BackendId;

/// Placeholder in collector parameters replaced by the configuration file path
pub const CONFIG_PATH_PLACEHOLDER: &str = "%s";

/// A collector known to the coordination server.
///
/// Built wholesale from a catalog entry and never mutated afterwards; a
/// newer catalog replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDefinition {
    /// Unique, stable identifier
    pub id: BackendId,
    /// Unique name, used as the runner registry key
    pub name: String,
    /// Service type reported by the server (e.g. "exec", "svc")
    pub service_type: String,
    /// Operating system the definition targets
    pub operating_system: String,
    /// Collector binary
    pub executable_path: PathBuf,
    /// Arguments used to run the collector
    pub execute_parameters: Vec<String>,
    /// Arguments used to check a configuration file; empty disables validation
    pub validation_parameters: Vec<String>,
    /// Collector configuration payload
    pub template: String,
    /// SHA-256 hex digest of `template`
    pub checksum: String,
}

impl BackendDefinition {
    /// Build a definition from a catalog entry
    pub fn from_response(response: CollectorResponse) -> Self {
        let checksum = template_checksum(&response.template);
        Self {
            id: BackendId::new(response.id),
            name: response.name,
            service_type: response.service_type,
            operating_system: response.node_operating_system,
            executable_path: PathBuf::from(response.executable_path),
            execute_parameters: response.execute_parameters,
            validation_parameters: response.validation_parameters,
            template: response.template,
            checksum,
        }
    }

    /// Path of the rendered configuration file inside `config_dir`
    pub fn configuration_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(format!("{}.conf", self.name))
    }

    /// Arguments to run the collector with its configuration at `config_path`
    pub fn command_args(&self, config_path: &Path) -> Vec<String> {
        substitute(&self.execute_parameters, config_path)
    }

    /// Arguments to validate the configuration at `config_path`
    pub fn validation_args(&self, config_path: &Path) -> Vec<String> {
        substitute(&self.validation_parameters, config_path)
    }
}

/// SHA-256 hex digest of a configuration payload
pub fn template_checksum(content: &str) -> String {
    content_checksum(content.as_bytes())
}

/// SHA-256 hex digest of raw file contents
pub fn content_checksum(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn substitute(parameters: &[String], config_path: &Path) -> Vec<String> {
    let path = config_path.to_string_lossy();
    parameters
        .iter()
        .map(|p| p.replace(CONFIG_PATH_PLACEHOLDER, &path))
        .collect()
}
