//! Store client configuration.
//!
//! Configuration is loaded from environment variables with development
//! defaults, in the same shape as the rest of the workspace config
//! structs.

use std::time::Duration;

/// Configuration for the remote table store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base endpoint of the store (project URL, no trailing path).
    pub url: String,

    /// Public (anonymous) API key. Sent as `apikey` on every request and
    /// used as the bearer credential when no user token is available.
    pub anon_key: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Upper bound applied to caller-supplied page sizes. The store
    /// itself accepts arbitrarily large ranges; this cap is enforced
    /// client-side.
    pub max_page_size: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            timeout: Duration::from_secs(30),
            max_page_size: 100,
        }
    }
}

impl StoreConfig {
    /// Create a store configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TUTORA_STORE_URL`: Base endpoint (default: http://localhost:54321)
    /// - `TUTORA_STORE_ANON_KEY`: Public API key (default: empty)
    /// - `TUTORA_STORE_TIMEOUT_SECS`: Request timeout (default: 30)
    /// - `TUTORA_STORE_MAX_PAGE_SIZE`: Page-size cap (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("TUTORA_STORE_URL").unwrap_or(defaults.url),
            anon_key: std::env::var("TUTORA_STORE_ANON_KEY").unwrap_or(defaults.anon_key),
            timeout: Duration::from_secs(
                std::env::var("TUTORA_STORE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_page_size: std::env::var("TUTORA_STORE_MAX_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_page_size),
        }
    }

    /// Full URL for a table under the store's REST surface.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }

    /// Clamp a caller-supplied page size to the configured cap.
    pub fn clamp_page_size(&self, limit: i64) -> i64 {
        limit.clamp(1, self.max_page_size)
    }
}
