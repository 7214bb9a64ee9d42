//! Store client factory.

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::query::QueryBuilder;
use crate::token::TokenProvider;
use crate::transport::{HttpTransport, StoreTransport};
use std::sync::Arc;

/// Handle to the remote table store.
///
/// Cheap to clone; holds no mutable state. The token provider is
/// consulted on every request, so a freshly minted user credential (or
/// the anonymous fallback) rides along with each round trip.
#[derive(Clone)]
pub struct StoreClient {
    transport: Arc<dyn StoreTransport>,
    tokens: Arc<dyn TokenProvider>,
    config: StoreConfig,
}

impl StoreClient {
    /// Create a client over the reqwest transport.
    pub fn new(config: StoreConfig, tokens: Arc<dyn TokenProvider>) -> StoreResult<Self> {
        let transport = Arc::new(HttpTransport::new(config.clone())?);
        Ok(Self::with_transport(config, tokens, transport))
    }

    /// Create a client over an arbitrary transport. Used by tests to
    /// substitute a recording mock for the network.
    pub fn with_transport(
        config: StoreConfig,
        tokens: Arc<dyn TokenProvider>,
        transport: Arc<dyn StoreTransport>,
    ) -> Self {
        Self {
            transport,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Start a query against the given table.
    pub fn table(&self, name: &str) -> QueryBuilder {
        QueryBuilder::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.tokens),
            self.config.anon_key.clone(),
            name,
        )
    }
}
