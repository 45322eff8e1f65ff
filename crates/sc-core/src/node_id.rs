//! Node identity resolution
//!
//! The configured `node_id` is either a literal identifier or a
//! `file:<path>` reference. A referenced file that does not exist yet is
//! created with a freshly generated UUID, so the identity survives restarts.
//! Relative paths are taken to be inside the cache directory.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::ConfigError;

/// Prefix marking a node id that lives in a file
pub const FILE_PREFIX: &str = "file:";

/// Resolve the configured node id to the identifier sent to the server
pub fn resolve_node_id(configured: &str, cache_path: &Path) -> Result<String, ConfigError> {
    let configured = configured.trim();
    match configured.strip_prefix(FILE_PREFIX) {
        Some(path) => read_or_create(&cache_path.join(path.trim())),
        None if configured.is_empty() => {
            Err(ConfigError::Invalid("node_id must not be empty".to_string()))
        }
        None => Ok(configured.to_string()),
    }
}

fn read_or_create(path: &Path) -> Result<String, ConfigError> {
    let wrap = |source: io::Error| ConfigError::NodeId {
        path: path.to_path_buf(),
        source,
    };

    match fs::read_to_string(path) {
        Ok(contents) => {
            let id = contents.trim();
            if id.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "node id file {} is empty",
                    path.display()
                )));
            }
            Ok(id.to_string())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let id = uuid::Uuid::new_v4().to_string();

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(wrap)?;
            }
            fs::write(path, format!("{}\n", id)).map_err(wrap)?;

            tracing::info!("Generated new node id {} in {}", id, path.display());
            Ok(id)
        }
        Err(e) => Err(wrap(e)),
    }
}
