//! Transport seam between query building and the network.
//!
//! [`QueryBuilder`](crate::query::QueryBuilder) assembles a
//! [`StoreRequest`]; a [`StoreTransport`] carries it to the store and
//! hands back the raw [`StoreResponse`]. Production uses the
//! reqwest-backed [`HttpTransport`]; tests substitute a recording mock.

use crate::config::StoreConfig;
use crate::error::StoreResult;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP method subset the store protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMethod {
    /// Reads (select).
    Get,
    /// Inserts.
    Post,
    /// Updates.
    Patch,
}

impl StoreMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMethod::Get => "GET",
            StoreMethod::Post => "POST",
            StoreMethod::Patch => "PATCH",
        }
    }
}

/// A fully assembled store request: one table, one round trip.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub method: StoreMethod,
    pub table: String,
    /// Query parameters, unencoded; the transport encodes them.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl StoreRequest {
    /// Look up a header by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a query parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response from the store, before success/error interpretation.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` when the store returned no body.
    pub body: Value,
    /// Raw `Content-Range` header, when present (exact-count reads).
    pub content_range: Option<String>,
}

impl StoreResponse {
    /// A 200 response with the given JSON body.
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            content_range: None,
        }
    }

    /// A 201 response with no body (`return=minimal` writes).
    pub fn created() -> Self {
        Self {
            status: 201,
            body: Value::Null,
            content_range: None,
        }
    }
}

/// Executes assembled requests against the store.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    async fn send(&self, request: StoreRequest) -> StoreResult<StoreResponse>;
}

// ============================================================================
// REQWEST TRANSPORT
// ============================================================================

/// Production transport over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    config: StoreConfig,
}

impl HttpTransport {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl StoreTransport for HttpTransport {
    async fn send(&self, request: StoreRequest) -> StoreResult<StoreResponse> {
        let url = self.config.table_url(&request.table);
        let mut builder = match request.method {
            StoreMethod::Get => self.http.get(&url),
            StoreMethod::Post => self.http.post(&url),
            StoreMethod::Patch => self.http.patch(&url),
        };

        builder = builder.query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            method = request.method.as_str(),
            table = %request.table,
            "dispatching store request"
        );

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) => Value::String(text),
            }
        };

        Ok(StoreResponse {
            status,
            body,
            content_range,
        })
    }
}
