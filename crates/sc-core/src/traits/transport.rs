//! Transport traits

use async_trait::async_trait;

use sc_protocol::{RegistrationRequest, RegistrationResponse};

use crate::backend::BackendDefinition;
use crate::error::TransportError;
use crate::types::ChangeToken;

/// Outcome of a catalog request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogFetch {
    /// The server's version still matches the token that was sent
    Unchanged,
    /// A listing was returned along with its version token
    Updated {
        token: ChangeToken,
        backends: Vec<BackendDefinition>,
    },
}

/// Abstraction over the coordination server API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Push node details and status, receive the current assignments
    async fn report_status(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, TransportError>;

    /// Fetch the backend catalog unless it still matches `last_token`
    async fn fetch_catalog(&self, last_token: &ChangeToken) -> Result<CatalogFetch, TransportError>;
}
