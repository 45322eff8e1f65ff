//! Collector executable whitelist

use std::path::{Path, PathBuf};

/// Absolute paths of the executables collectors may be launched from.
///
/// An empty whitelist allows every executable.
#[derive(Debug, Clone, Default)]
pub struct ExecutableWhitelist {
    entries: Vec<PathBuf>,
}

impl ExecutableWhitelist {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        if entries.is_empty() {
            tracing::warn!("Collector binaries whitelist is empty, any executable may be started");
        }
        Self { entries }
    }

    pub fn is_enabled(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Whether `executable` may be launched.
    ///
    /// Matches the path as given or with symlinks resolved on both sides.
    pub fn allows(&self, executable: &Path) -> bool {
        if !self.is_enabled() {
            return true;
        }
        if self.entries.iter().any(|entry| entry == executable) {
            return true;
        }

        let Ok(resolved) = executable.canonicalize() else {
            return false;
        };
        self.entries.iter().any(|entry| {
            entry
                .canonicalize()
                .map(|entry| entry == resolved)
                .unwrap_or(false)
        })
    }
}
