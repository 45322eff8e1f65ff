//! Logging setup
//!
//! Events go to stdout and, when a log directory is configured, to
//! `sidecar.log` in that directory. The file is rotated by size.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sc_core::config::SidecarConfig;

/// Name of the agent's own log file
pub const LOG_FILE_NAME: &str = "sidecar.log";

/// Where and how verbosely to log
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub directory: Option<PathBuf>,
    pub max_file_size: u64,
    pub keep_files: usize,
}

impl LogSettings {
    pub fn from_config(config: &SidecarConfig, level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            directory: Some(config.log_path.clone()),
            max_file_size: config.log_rotate_max_file_size,
            keep_files: config.log_rotate_keep_files,
        }
    }
}

/// Install the global subscriber.
///
/// A log file that cannot be opened is reported once and logging continues
/// on stdout only.
pub fn init(settings: &LogSettings) {
    let file = settings.directory.as_ref().map(|dir| {
        let path = dir.join(LOG_FILE_NAME);
        RotatingFile::open(&path, settings.max_file_size, settings.keep_files)
            .map_err(|e| (path, e))
    });
    let (file, file_error) = match file {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| settings.level.clone()),
        ))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    if let Some((path, e)) = file_error {
        tracing::warn!("Logging to stdout only, can't open {}: {}", path.display(), e);
    }
}

/// Append-only log file rotated once it reaches a size limit.
///
/// Rotated files are `<path>.1` (newest) to `<path>.<keep>` (oldest).
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_size: u64,
    keep: usize,
}

impl RotatingFile {
    pub fn open(path: &Path, max_size: u64, keep: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            written,
            max_size,
            keep: keep.max(1),
        })
    }

    fn rotated(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        match fs::remove_file(self.rotated(self.keep)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        for index in (1..self.keep).rev() {
            let from = self.rotated(index);
            if from.exists() {
                fs::rename(&from, self.rotated(index + 1))?;
            }
        }
        fs::rename(&self.path, self.rotated(1))?;

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
