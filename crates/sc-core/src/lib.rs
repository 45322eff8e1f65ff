//! sc-core: Core abstractions and configuration for the collector sidecar
//!
//! This crate provides the configuration surface, domain types, error
//! taxonomy and the collaborator traits (transport, process supervision,
//! configuration rendering) that the agent's reconciliation loops depend on.

pub mod backend;
pub mod config;
pub mod error;
pub mod node_id;
pub mod status;
pub mod time;
pub mod traits;
pub mod types;

pub use backend::BackendDefinition;
pub use error::SidecarError;
pub use status::{BackendStatus, StatusCell, StatusInfo};
pub use types::{BackendId, ChangeToken};
