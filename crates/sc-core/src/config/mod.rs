//! Configuration management for the sidecar

pub mod defaults;
pub mod serde_utils;
mod sidecar;

pub use defaults::Platform;
pub use sidecar::{BackoffConfig, SidecarConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration file path for the current platform
pub fn default_config_path() -> PathBuf {
    match Platform::current() {
        Platform::Posix => PathBuf::from("/etc/sidecar/sidecar.toml"),
        Platform::Windows => PathBuf::from(r"C:\Program Files\Sidecar\sidecar.toml"),
    }
}

impl SidecarConfig {
    /// Built-in defaults for `platform`, without any user overrides
    pub fn defaults(platform: Platform) -> Result<Self, ConfigError> {
        let table = defaults::defaults_table(platform)?;
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Parse user configuration and merge it over the platform defaults
    pub fn from_toml_str(content: &str, platform: Platform) -> Result<Self, ConfigError> {
        let overlay: toml::Table = toml::from_str(content)?;
        let mut table = defaults::defaults_table(platform)?;
        defaults::merge_tables(&mut table, overlay);

        let config: SidecarConfig = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from a file, merged over the current platform's defaults
pub fn load_config(path: &Path) -> Result<SidecarConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    SidecarConfig::from_toml_str(&content, Platform::current())
}
