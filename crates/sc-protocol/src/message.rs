//! Message types for the sidecar API
//!
//! Two exchanges exist between an agent and the coordination server:
//!
//! 1. **Registration**: the agent `PUT`s a [`RegistrationRequest`] describing
//!    the node and the health of its collectors. The server answers with a
//!    [`RegistrationResponse`] carrying the collectors assigned to the node.
//! 2. **Catalog**: the agent `GET`s the collector list. The server answers
//!    with a [`CollectorListResponse`], or `304 Not Modified` when the
//!    agent's `If-None-Match` token is still current.

use serde::{Deserialize, Serialize};

use crate::BackendStatus;

/// Header every request must carry so the server accepts it
pub const REQUESTED_BY_HEADER: &str = "X-Requested-By";

/// Value sent in [`REQUESTED_BY_HEADER`]
pub const REQUESTED_BY: &str = "sidecar";

/// Body of the periodic registration / status push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Human-readable node name
    pub node_name: String,
    /// Node details
    pub node_details: NodeDetails,
}

/// Information about the host the agent runs on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetails {
    /// Operating system family (e.g. "linux", "windows")
    pub operating_system: String,

    /// Host metrics, only sent when status reporting is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<NodeMetrics>,

    /// Files found in the watched log directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_list: Option<Vec<LogFile>>,

    /// Aggregate and per-collector status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
}

/// Host metrics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Mount points that are more than 75% full
    pub disks_75: Vec<String>,
    /// CPU idle percentage (0-100)
    pub cpu_idle: f32,
    /// One-minute load average
    pub load_1: f64,
}

/// A file or directory found in a watched log directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFile {
    pub path: String,
    /// Last modification, unix seconds
    pub mod_time: u64,
    pub size: u64,
    pub is_dir: bool,
}

/// Aggregate node status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub status: BackendStatus,
    pub message: String,
    pub collectors: Vec<BackendStatusReport>,
}

/// Status of one collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatusReport {
    pub collector_id: String,
    #[serde(default)]
    pub configuration_id: String,
    pub status: BackendStatus,
    pub message: String,
    #[serde(default)]
    pub verbose_message: String,
}

/// Server answer to a registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Server-side settings for this node
    #[serde(default)]
    pub configuration: Option<ServerConfiguration>,

    /// Whether `configuration` should override the local settings
    #[serde(default)]
    pub configuration_override: bool,

    /// Collectors this node must run
    #[serde(default)]
    pub assignments: Vec<ConfigurationAssignment>,
}

/// Server-side node settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    pub update_interval: u64,
    pub send_status: bool,
}

/// Assignment of a collector (and the configuration revision to run it with)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationAssignment {
    pub collector_id: String,
    pub configuration_id: String,
}

/// Collector catalog listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorListResponse {
    #[serde(default)]
    pub collectors: Vec<CollectorResponse>,

    /// Listing checksum, used when the server sends no `ETag`
    #[serde(default)]
    pub checksum: Option<String>,
}

/// One collector definition as served by the catalog endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub node_operating_system: String,
    pub executable_path: String,
    #[serde(default)]
    pub execute_parameters: Vec<String>,
    #[serde(default)]
    pub validation_parameters: Vec<String>,
    /// Rendered collector configuration
    #[serde(default)]
    pub template: String,
}
