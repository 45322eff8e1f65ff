//! Listing of files in the watched log directories

use std::fs;
use std::path::{Path, PathBuf};

use sc_core::time::system_time_secs;
use sc_protocol::LogFile;

/// Upper bound on entries sent in one status payload
pub const MAX_LOG_FILES: usize = 1000;

/// Recursively list `roots`, directories included, in path order.
///
/// Unreadable entries are skipped. Stops after [`MAX_LOG_FILES`] entries.
pub fn list_log_files(roots: &[PathBuf]) -> Vec<LogFile> {
    let mut files = Vec::new();
    for root in roots {
        if files.len() >= MAX_LOG_FILES {
            break;
        }
        walk(root, &mut files);
    }
    files
}

fn walk(dir: &Path, files: &mut Vec<LogFile>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping log directory {}: {}", dir.display(), e);
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        if files.len() >= MAX_LOG_FILES {
            return;
        }
        let Ok(metadata) = fs::symlink_metadata(&path) else {
            continue;
        };
        let is_dir = metadata.is_dir();
        files.push(LogFile {
            path: path.display().to_string(),
            mod_time: metadata.modified().map(system_time_secs).unwrap_or(0),
            size: metadata.len(),
            is_dir,
        });
        if is_dir {
            walk(&path, files);
        }
    }
}
