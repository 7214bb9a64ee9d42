//! Error types for the access layer.
//!
//! One policy everywhere: operations return `Result`, a missing row in a
//! single lookup is `Ok(None)`, and every store failure propagates as an
//! error carrying the store's message. Failures are terminal for the
//! request; recovery belongs to the caller's error boundary.

use thiserror::Error;
use tutora_store::StoreError;

/// Errors surfaced by companion access operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// The store rejected or failed the request.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An insert reported success but returned no row to normalize.
    #[error("Failed to create a companion")]
    CreateFailed,
}

/// Result type alias for access operations.
pub type DataResult<T> = Result<T, DataError>;
