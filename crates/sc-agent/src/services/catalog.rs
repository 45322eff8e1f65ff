//! Backend catalog refresh loop

use async_trait::async_trait;
use std::sync::Arc;

use sc_core::traits::{CatalogFetch, Transport};
use sc_core::ChangeToken;

use super::periodic::Periodical;
use crate::store::BackendCatalog;

/// Result of one refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Server version matched; catalog untouched
    Unchanged,
    /// Definitions were applied to the catalog
    Updated { count: usize },
    /// Request failed; token kept for the next attempt
    Failed,
}

/// Pulls the backend catalog, skipping work when the server's version
/// token has not moved
pub struct CatalogRefresher {
    transport: Arc<dyn Transport>,
    catalog: Arc<BackendCatalog>,
    token: ChangeToken,
}

impl CatalogRefresher {
    pub fn new(transport: Arc<dyn Transport>, catalog: Arc<BackendCatalog>) -> Self {
        Self {
            transport,
            catalog,
            token: ChangeToken::initial(),
        }
    }

    /// Last adopted version token
    pub fn token(&self) -> &ChangeToken {
        &self.token
    }

    /// Fetch the catalog once and apply it
    pub async fn refresh(&mut self) -> RefreshOutcome {
        let fetched = match self.transport.fetch_catalog(&self.token).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!("Can't fetch collector list from server: {}", e);
                return RefreshOutcome::Failed;
            }
        };

        match fetched {
            CatalogFetch::Unchanged => {
                tracing::debug!("Collector list unchanged (token {})", self.token);
                RefreshOutcome::Unchanged
            }
            CatalogFetch::Updated { token, backends } if backends.is_empty() => {
                tracing::debug!("Server returned an empty collector list (token {})", token);
                self.token = token;
                RefreshOutcome::Unchanged
            }
            CatalogFetch::Updated { token, backends } => {
                let count = self.catalog.upsert_all(backends);
                tracing::info!("Applied {} collector definitions (token {})", count, token);
                self.token = token;
                RefreshOutcome::Updated { count }
            }
        }
    }
}

#[async_trait]
impl Periodical for CatalogRefresher {
    fn name(&self) -> &'static str {
        "catalog refresh"
    }

    async fn run_once(&mut self) {
        self.refresh().await;
    }
}
