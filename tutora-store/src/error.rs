//! Error types for store operations.
//!
//! Every failure is terminal for the current request: no retries, no
//! partial-success handling. Errors carry the store's own message when
//! one was returned, or a fixed default otherwise.

use thiserror::Error;

/// Fallback message when the store returns a failure without a parseable
/// message body.
pub const DEFAULT_FAILURE_MESSAGE: &str = "store request failed";

/// Errors surfaced by the store client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store error ({status}): {message}")]
    Api {
        /// HTTP status returned by the store.
        status: u16,
        /// Message from the store's error body, or the fixed default.
        message: String,
    },

    /// The response body did not match the expected row shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Client-side configuration problem.
    #[error("config error: {0}")]
    Config(String),
}

impl StoreError {
    /// The store-reported message for API failures, the display string
    /// otherwise. Callers that only forward "the store's message" use this.
    pub fn store_message(&self) -> String {
        match self {
            StoreError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status_and_message() {
        let err = StoreError::Api {
            status: 409,
            message: "duplicate key value violates unique constraint".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("409"));
        assert!(display.contains("duplicate key"));
    }

    #[test]
    fn store_message_prefers_api_body() {
        let err = StoreError::Api {
            status: 500,
            message: "relation does not exist".to_string(),
        };
        assert_eq!(err.store_message(), "relation does not exist");

        let err = StoreError::Config("missing endpoint".to_string());
        assert_eq!(err.store_message(), "config error: missing endpoint");
    }
}
