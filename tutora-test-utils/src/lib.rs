//! Tutora Test Utilities
//!
//! Centralized test infrastructure for the Tutora workspace:
//! - A recording mock transport for the store client
//! - Session and row fixtures for common scenarios
//! - A recording view invalidator

// Re-export core types for convenience
pub use tutora_core::{
    Companion, CompanionId, CompanionRow, Entitlement, NewCompanionRow, NewSessionRow,
    NoopInvalidator, Session, SessionWithCompanion, UserId, ViewInvalidator,
};
pub use tutora_store::{
    AnonAccess, StaticToken, StoreClient, StoreConfig, StoreError, StoreMethod, StoreRequest,
    StoreResponse, StoreResult, StoreTransport, TokenProvider,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// Transport double that records every request and replays queued
/// responses in order. When the queue runs dry it answers with an empty
/// 200, so read-only tests don't need to enqueue anything.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<StoreResult<StoreResponse>>>,
    requests: Mutex<Vec<StoreRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a raw response.
    pub fn enqueue(&self, response: StoreResponse) {
        self.responses.lock().expect("lock").push_back(Ok(response));
    }

    /// Queue a successful response with the given JSON rows.
    pub fn enqueue_rows(&self, rows: Value) {
        self.enqueue(StoreResponse::ok(rows));
    }

    /// Queue a store failure with the given status and message body.
    pub fn enqueue_failure(&self, status: u16, message: &str) {
        self.enqueue(StoreResponse {
            status,
            body: json!({ "message": message }),
            content_range: None,
        });
    }

    /// Queue a transport-level failure.
    pub fn enqueue_transport_error(&self, message: &str) {
        self.responses
            .lock()
            .expect("lock")
            .push_back(Err(StoreError::Config(message.to_string())));
    }

    /// Everything sent through this transport so far.
    pub fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().expect("lock").clone()
    }

    /// The most recent request, panicking when none was sent.
    pub fn last_request(&self) -> StoreRequest {
        self.requests
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("a request was sent")
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }
}

#[async_trait]
impl StoreTransport for MockTransport {
    async fn send(&self, request: StoreRequest) -> StoreResult<StoreResponse> {
        self.requests.lock().expect("lock").push(request);
        self.responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok(StoreResponse::ok(json!([]))))
    }
}

/// A store client wired to the given mock transport, with a test config
/// and anonymous token access.
pub fn mock_store_client(transport: Arc<MockTransport>) -> StoreClient {
    StoreClient::with_transport(test_store_config(), Arc::new(AnonAccess), transport)
}

/// Store config used across tests: local endpoint, test key, default cap.
pub fn test_store_config() -> StoreConfig {
    StoreConfig {
        url: "http://localhost:54321".to_string(),
        anon_key: "test-anon-key".to_string(),
        ..StoreConfig::default()
    }
}

// ============================================================================
// RECORDING INVALIDATOR
// ============================================================================

/// View invalidator that records every invalidated path.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    paths: Mutex<Vec<String>>,
}

impl RecordingInvalidator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().expect("lock").clone()
    }
}

impl ViewInvalidator for RecordingInvalidator {
    fn invalidate(&self, path: &str) {
        self.paths.lock().expect("lock").push(path.to_string());
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A session with no entitlements.
pub fn free_session(user_id: &str) -> Session {
    Session::new(user_id)
}

/// A session on the pro plan.
pub fn pro_session(user_id: &str) -> Session {
    Session::with_entitlements(user_id, vec![Entitlement::plan("pro")])
}

/// A session holding a companion-count feature flag.
pub fn feature_session(user_id: &str, feature: &str) -> Session {
    Session::with_entitlements(user_id, vec![Entitlement::feature(feature)])
}

/// A persisted-schema companion row as JSON, the way the store returns it.
pub fn companion_row_json(id: Uuid, name: &str, author: &str, bookmark: bool) -> Value {
    json!({
        "id": id,
        "Name": name,
        "Subject": "science",
        "Topic": "Neural Networks",
        "Voice": "female",
        "Style": "casual",
        "Duration": 30,
        "Author": author,
        "Bookmark": bookmark,
    })
}

/// A `session_history` row with its companion embedded, as returned by
/// the relation select.
pub fn session_row_json(companion: Value) -> Value {
    json!({ "companions": companion })
}
