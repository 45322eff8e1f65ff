//! Core error types for the collector sidecar

use sc_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the sidecar
#[derive(Error, Debug)]
pub enum SidecarError {
    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Process supervision error
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// Configuration rendering error
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors talking to the coordination server
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request could not be sent or no response was received
    #[error("Request failed: {0}")]
    Request(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Server answered with an unexpected status code
    #[error("Unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors starting or stopping collector processes
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// No runner registered under this name
    #[error("No runner registered for backend: {0}")]
    UnknownBackend(String),

    /// Executable is not in the collector binaries whitelist
    #[error("Executable is not whitelisted: {0}")]
    NotWhitelisted(PathBuf),

    /// Executable does not exist
    #[error("Executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    /// Process could not be spawned
    #[error("Failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors materializing collector configuration files
#[derive(Error, Debug)]
pub enum RenderError {
    /// Configuration file could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Validation command could not be run
    #[error("Failed to run validation for {name}: {source}")]
    Validation {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Node id file could not be read or written
    #[error("Node id file {path}: {source}")]
    NodeId {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
