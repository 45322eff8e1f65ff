//! Collaborator traits the reconciliation loops depend on

mod renderer;
mod supervisor;
mod transport;

pub use renderer::ConfigRenderer;
pub use supervisor::Supervisor;
pub use transport::{CatalogFetch, Transport};
