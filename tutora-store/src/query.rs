//! Per-table query assembly.
//!
//! A [`QueryBuilder`] accumulates one store request: the verb, the filter
//! predicates, ordering, the row range, and the `Prefer` negotiation.
//! Terminal methods resolve the bearer credential, dispatch through the
//! transport, split success from failure, and deserialize rows.

use crate::error::{StoreError, StoreResult, DEFAULT_FAILURE_MESSAGE};
use crate::token::TokenProvider;
use crate::transport::{StoreMethod, StoreRequest, StoreResponse, StoreTransport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Sort direction for `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

impl OrderDirection {
    fn suffix(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "asc",
            OrderDirection::Descending => "desc",
        }
    }
}

/// One operand of an `or=(...)` filter group.
#[derive(Debug, Clone, PartialEq)]
pub struct OrFilter {
    pub column: String,
    pub operator: String,
    pub value: String,
}

impl OrFilter {
    /// Case-insensitive partial match operand.
    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: "ilike".to_string(),
            value: pattern.into(),
        }
    }

    /// Equality operand.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: "eq".to_string(),
            value: value.into(),
        }
    }

    fn render(&self) -> String {
        format!("{}.{}.{}", self.column, self.operator, or_operand(&self.value))
    }
}

/// Values inside an `or=` group must not break the comma-separated list;
/// the store's documented escape is double-quoting.
fn or_operand(value: &str) -> String {
    if value.contains(',') || value.contains('(') || value.contains(')') || value.contains('"') {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Builder for a single-table store request.
#[must_use = "a query does nothing until fetched or executed"]
pub struct QueryBuilder {
    transport: Arc<dyn StoreTransport>,
    tokens: Arc<dyn TokenProvider>,
    anon_key: String,
    table: String,
    method: StoreMethod,
    query: Vec<(String, String)>,
    prefer: Vec<String>,
    range: Option<(i64, i64)>,
    body: Option<Value>,
}

impl QueryBuilder {
    pub(crate) fn new(
        transport: Arc<dyn StoreTransport>,
        tokens: Arc<dyn TokenProvider>,
        anon_key: String,
        table: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            tokens,
            anon_key,
            table: table.into(),
            method: StoreMethod::Get,
            query: Vec::new(),
            prefer: Vec::new(),
            range: None,
            body: None,
        }
    }

    // ========================================================================
    // VERBS
    // ========================================================================

    /// Select the given columns (embedded relations use the
    /// `alias:fk_column(*)` form). After `insert`, also requests the
    /// written rows back (`return=representation`).
    pub fn select(mut self, columns: &str) -> Self {
        self.query.push(("select".to_string(), columns.to_string()));
        if self.method == StoreMethod::Post {
            self.prefer.retain(|p| p != "return=minimal");
            self.prefer.push("return=representation".to_string());
        }
        self
    }

    /// Insert one row. Returns no rows unless followed by [`select`].
    ///
    /// [`select`]: QueryBuilder::select
    pub fn insert<T: Serialize>(mut self, row: &T) -> StoreResult<Self> {
        self.method = StoreMethod::Post;
        self.body = Some(serde_json::to_value(row)?);
        self.prefer.push("return=minimal".to_string());
        Ok(self)
    }

    /// Update the rows matched by the filters. Returns no rows.
    pub fn update<T: Serialize>(mut self, changes: &T) -> StoreResult<Self> {
        self.method = StoreMethod::Patch;
        self.body = Some(serde_json::to_value(changes)?);
        self.prefer.push("return=minimal".to_string());
        Ok(self)
    }

    // ========================================================================
    // FILTERS, ORDERING, PAGINATION
    // ========================================================================

    /// Require `column = value`.
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.query
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Require a case-insensitive partial match on `column`.
    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.query
            .push((column.to_string(), format!("ilike.{}", pattern)));
        self
    }

    /// Require at least one of the given operands to hold.
    pub fn or(mut self, filters: &[OrFilter]) -> Self {
        let rendered: Vec<String> = filters.iter().map(OrFilter::render).collect();
        self.query
            .push(("or".to_string(), format!("({})", rendered.join(","))));
        self
    }

    /// Order by `column`.
    pub fn order(mut self, column: &str, direction: OrderDirection) -> Self {
        self.query
            .push(("order".to_string(), format!("{}.{}", column, direction.suffix())));
        self
    }

    /// Request the inclusive row range `[from, to]`.
    pub fn range(mut self, from: i64, to: i64) -> Self {
        self.range = Some((from, to));
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, limit: i64) -> Self {
        self.query.push(("limit".to_string(), limit.to_string()));
        self
    }

    /// Ask the store for an exact total alongside the rows; the total
    /// arrives in the `Content-Range` response header.
    pub fn count_exact(mut self) -> Self {
        self.prefer.push("count=exact".to_string());
        self
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    /// Assemble the wire request with the given bearer credential.
    fn request(&self, bearer: Option<&str>) -> StoreRequest {
        let mut headers = vec![
            ("apikey".to_string(), self.anon_key.clone()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", bearer.unwrap_or(&self.anon_key)),
            ),
        ];
        if !self.prefer.is_empty() {
            headers.push(("Prefer".to_string(), self.prefer.join(",")));
        }
        if let Some((from, to)) = self.range {
            headers.push(("Range-Unit".to_string(), "items".to_string()));
            headers.push(("Range".to_string(), format!("{}-{}", from, to)));
        }

        StoreRequest {
            method: self.method,
            table: self.table.clone(),
            query: self.query.clone(),
            headers,
            body: self.body.clone(),
        }
    }

    async fn dispatch(self) -> StoreResult<StoreResponse> {
        let token = self.tokens.access_token().await;
        let request = self.request(token.as_deref());
        let table = request.table.clone();
        let response = self.transport.send(request).await?;

        if !(200..300).contains(&response.status) {
            let message = response
                .body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                .to_string();
            tracing::error!(status = response.status, table = %table, %message, "store request failed");
            return Err(StoreError::Api {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    /// Execute and deserialize the returned rows. An empty or absent body
    /// is an empty list, never an error.
    pub async fn fetch<T: DeserializeOwned>(self) -> StoreResult<Vec<T>> {
        let response = self.dispatch().await?;
        rows_from(response.body)
    }

    /// Execute and deserialize rows plus the exact total, when the store
    /// reported one.
    pub async fn fetch_with_count<T: DeserializeOwned>(self) -> StoreResult<(Vec<T>, Option<u64>)> {
        let response = self.dispatch().await?;
        let total = response
            .content_range
            .as_deref()
            .and_then(content_range_total);
        Ok((rows_from(response.body)?, total))
    }

    /// Execute a write whose returned body (if any) is discarded.
    pub async fn execute(self) -> StoreResult<()> {
        self.dispatch().await.map(|_| ())
    }
}

fn rows_from<T: DeserializeOwned>(body: Value) -> StoreResult<Vec<T>> {
    match body {
        Value::Null => Ok(Vec::new()),
        body => Ok(serde_json::from_value(body)?),
    }
}

/// Total from a `Content-Range` header (`0-9/57`, `*/57`). A `*` total
/// means the store did not count.
fn content_range_total(header: &str) -> Option<u64> {
    header
        .rsplit('/')
        .next()
        .filter(|total| *total != "*")
        .and_then(|total| total.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{AnonAccess, StaticToken};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Minimal transport double: records the request, replays one canned
    /// response. The workspace-wide mock lives in tutora-test-utils; this
    /// crate keeps its own to avoid depending on downstream crates.
    struct CannedTransport {
        response: StoreResult<StoreResponse>,
        seen: Mutex<Vec<StoreRequest>>,
    }

    impl CannedTransport {
        fn replying(response: StoreResponse) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(response),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> StoreRequest {
            self.seen.lock().expect("lock").last().cloned().expect("a request was sent")
        }
    }

    #[async_trait]
    impl StoreTransport for CannedTransport {
        async fn send(&self, request: StoreRequest) -> StoreResult<StoreResponse> {
            self.seen.lock().expect("lock").push(request);
            match &self.response {
                Ok(response) => Ok(response.clone()),
                Err(_) => Err(StoreError::Config("canned failure".to_string())),
            }
        }
    }

    fn builder(transport: Arc<CannedTransport>) -> QueryBuilder {
        QueryBuilder::new(
            transport,
            Arc::new(AnonAccess),
            "anon-key".to_string(),
            "companions",
        )
    }

    #[test]
    fn filters_render_as_query_pairs() {
        let transport = CannedTransport::replying(StoreResponse::ok(json!([])));
        let request = builder(transport)
            .select("*")
            .ilike("Subject", "%math%")
            .or(&[
                OrFilter::ilike("Topic", "%algebra%"),
                OrFilter::ilike("Name", "%algebra%"),
            ])
            .request(None);

        assert_eq!(request.param("select"), Some("*"));
        assert_eq!(request.param("Subject"), Some("ilike.%math%"));
        assert_eq!(
            request.param("or"),
            Some("(Topic.ilike.%algebra%,Name.ilike.%algebra%)")
        );
    }

    #[test]
    fn or_operands_with_commas_are_quoted() {
        let rendered = OrFilter::ilike("Topic", "%rates, ratios%").render();
        assert_eq!(rendered, "Topic.ilike.\"%rates, ratios%\"");
    }

    #[test]
    fn range_becomes_inclusive_row_headers() {
        let transport = CannedTransport::replying(StoreResponse::ok(json!([])));
        let request = builder(transport).select("*").range(10, 19).request(None);

        assert_eq!(request.header("Range-Unit"), Some("items"));
        assert_eq!(request.header("Range"), Some("10-19"));
    }

    #[test]
    fn insert_then_select_requests_representation() -> StoreResult<()> {
        let transport = CannedTransport::replying(StoreResponse::ok(json!([])));
        let request = builder(transport)
            .insert(&json!({"Name": "Codey"}))?
            .select("*")
            .request(None);

        assert_eq!(request.method, StoreMethod::Post);
        assert_eq!(request.header("Prefer"), Some("return=representation"));
        assert_eq!(request.body, Some(json!({"Name": "Codey"})));
        Ok(())
    }

    #[test]
    fn bare_insert_requests_minimal_return() -> StoreResult<()> {
        let transport = CannedTransport::replying(StoreResponse::created());
        let request = builder(transport)
            .insert(&json!({"companion_id": "c1", "user_id": "u1"}))?
            .request(None);

        assert_eq!(request.method, StoreMethod::Post);
        assert_eq!(request.header("Prefer"), Some("return=minimal"));
        Ok(())
    }

    #[test]
    fn update_is_a_patch_with_minimal_return() -> StoreResult<()> {
        let transport = CannedTransport::replying(StoreResponse::created());
        let request = builder(transport)
            .update(&json!({"Bookmark": true}))?
            .eq("id", "abc")
            .request(None);

        assert_eq!(request.method, StoreMethod::Patch);
        assert_eq!(request.param("id"), Some("eq.abc"));
        assert_eq!(request.header("Prefer"), Some("return=minimal"));
        Ok(())
    }

    #[test]
    fn count_exact_joins_prefer_directives() -> StoreResult<()> {
        let transport = CannedTransport::replying(StoreResponse::ok(json!([])));
        let request = builder(transport).select("id").count_exact().request(None);

        assert_eq!(request.header("Prefer"), Some("count=exact"));
        Ok(())
    }

    #[test]
    fn bearer_falls_back_to_anon_key() {
        let transport = CannedTransport::replying(StoreResponse::ok(json!([])));
        let request = builder(transport.clone()).select("*").request(None);
        assert_eq!(request.header("Authorization"), Some("Bearer anon-key"));
        assert_eq!(request.header("apikey"), Some("anon-key"));

        let request = builder(transport).select("*").request(Some("user-jwt"));
        assert_eq!(request.header("Authorization"), Some("Bearer user-jwt"));
        assert_eq!(request.header("apikey"), Some("anon-key"));
    }

    #[tokio::test]
    async fn dispatch_resolves_token_from_provider() -> StoreResult<()> {
        let transport = CannedTransport::replying(StoreResponse::ok(json!([])));
        let query = QueryBuilder::new(
            transport.clone(),
            Arc::new(StaticToken::new("minted-jwt")),
            "anon-key".to_string(),
            "companions",
        );
        let rows: Vec<Value> = query.select("*").fetch().await?;
        assert!(rows.is_empty());

        let sent = transport.last_request();
        assert_eq!(sent.header("Authorization"), Some("Bearer minted-jwt"));
        Ok(())
    }

    #[tokio::test]
    async fn failure_body_message_is_surfaced() {
        let transport = CannedTransport::replying(StoreResponse {
            status: 403,
            body: json!({"message": "permission denied for table companions"}),
            content_range: None,
        });
        let result: StoreResult<Vec<Value>> = builder(transport).select("*").fetch().await;

        match result {
            Err(StoreError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "permission denied for table companions");
            }
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn failure_without_message_uses_default() {
        let transport = CannedTransport::replying(StoreResponse {
            status: 500,
            body: Value::Null,
            content_range: None,
        });
        let result: StoreResult<Vec<Value>> = builder(transport).select("*").fetch().await;

        match result {
            Err(StoreError::Api { message, .. }) => {
                assert_eq!(message, DEFAULT_FAILURE_MESSAGE);
            }
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn fetch_with_count_parses_content_range() -> StoreResult<()> {
        let transport = CannedTransport::replying(StoreResponse {
            status: 200,
            body: json!([]),
            content_range: Some("*/57".to_string()),
        });
        let (rows, total): (Vec<Value>, Option<u64>) =
            builder(transport).select("id").count_exact().fetch_with_count().await?;

        assert!(rows.is_empty());
        assert_eq!(total, Some(57));
        Ok(())
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(content_range_total("0-9/57"), Some(57));
        assert_eq!(content_range_total("*/203"), Some(203));
        assert_eq!(content_range_total("0-9/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn null_body_reads_as_empty_list() -> StoreResult<()> {
        let transport = CannedTransport::replying(StoreResponse::created());
        let rows: Vec<Value> = builder(transport).select("*").fetch().await?;
        assert!(rows.is_empty());
        Ok(())
    }
}
