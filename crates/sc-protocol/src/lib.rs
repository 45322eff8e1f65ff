//! sc-protocol: Wire payloads for the collector sidecar
//!
//! This crate defines the JSON documents exchanged between the agent and
//! the coordination server: the registration/status exchange and the
//! collector catalog listing.

pub mod error;
pub mod message;
pub mod status;

pub use error::ProtocolError;
pub use message::{
    BackendStatusReport, CollectorListResponse, CollectorResponse, ConfigurationAssignment,
    LogFile, NodeDetails, NodeMetrics, NodeStatus, RegistrationRequest, RegistrationResponse,
    ServerConfiguration, REQUESTED_BY, REQUESTED_BY_HEADER,
};
pub use status::BackendStatus;

/// Decode a JSON response body into a protocol message
pub fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(body).map_err(ProtocolError::Decode)
}
