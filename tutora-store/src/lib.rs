//! Tutora Store - Remote Table Store Client
//!
//! This crate speaks the wire protocol of the managed table store backing
//! Tutora: a PostgREST-style HTTP endpoint where filtering, ordering, and
//! pagination are expressed as query parameters and headers, and writes
//! are plain JSON bodies.
//!
//! The crate does not reimplement the store. It provides:
//! - [`StoreConfig`]: endpoint, public key, timeout, and the page-size cap
//! - [`TokenProvider`]: the seam to the identity provider; failure to mint
//!   a token silently falls back to anonymous (public-key) access
//! - [`StoreTransport`]: the seam to the network, with the reqwest-backed
//!   [`HttpTransport`] as the production implementation
//! - [`StoreClient`] / [`QueryBuilder`]: per-table request assembly

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod token;
pub mod transport;

// Re-export commonly used types
pub use client::StoreClient;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use query::{OrFilter, OrderDirection, QueryBuilder};
pub use token::{AnonAccess, StaticToken, TokenProvider};
pub use transport::{HttpTransport, StoreMethod, StoreRequest, StoreResponse, StoreTransport};
