//! The companion quota gate.
//!
//! Entitlements are evaluated in order: the pro plan allows without a
//! count check, the 3- and 10-companion feature flags set the quota, and
//! no entitlement means a quota of zero. The count comes from the
//! store's exact total, with the returned row count as fallback.

use serde_json::json;
use std::sync::Arc;
use tutora_data::{Companions, DataResult};
use tutora_test_utils::{
    feature_session, free_session, mock_store_client, pro_session, MockTransport, StoreResponse,
};
use uuid::Uuid;

fn companions(transport: Arc<MockTransport>) -> Companions {
    Companions::new(mock_store_client(transport))
}

/// An exact-count response: no row bodies needed, total in Content-Range.
fn counted(total: u64) -> StoreResponse {
    StoreResponse {
        status: 200,
        body: json!([]),
        content_range: Some(format!("*/{}", total)),
    }
}

#[tokio::test]
async fn pro_plan_allows_without_a_count_check() -> DataResult<()> {
    let transport = MockTransport::new();
    let allowed = companions(transport.clone())
        .can_create(&pro_session("user_pro"))
        .await?;

    assert!(allowed);
    assert_eq!(transport.request_count(), 0, "no store round trip");
    Ok(())
}

#[tokio::test]
async fn three_limit_at_three_owned_is_denied() -> DataResult<()> {
    let transport = MockTransport::new();
    transport.enqueue(counted(3));

    let session = feature_session("user_3", "3_companion_limit");
    assert!(!companions(transport).can_create(&session).await?);
    Ok(())
}

#[tokio::test]
async fn three_limit_at_two_owned_is_allowed() -> DataResult<()> {
    let transport = MockTransport::new();
    transport.enqueue(counted(2));

    let session = feature_session("user_3", "3_companion_limit");
    assert!(companions(transport).can_create(&session).await?);
    Ok(())
}

#[tokio::test]
async fn ten_limit_boundary() -> DataResult<()> {
    let transport = MockTransport::new();
    transport.enqueue(counted(9));
    transport.enqueue(counted(10));

    let session = feature_session("user_10", "10_companion_limit");
    let handle = companions(transport);
    assert!(handle.can_create(&session).await?);
    assert!(!handle.can_create(&session).await?);
    Ok(())
}

#[tokio::test]
async fn no_entitlement_is_denied_even_with_nothing_owned() -> DataResult<()> {
    let transport = MockTransport::new();
    transport.enqueue(counted(0));

    let allowed = companions(transport.clone())
        .can_create(&free_session("user_free"))
        .await?;

    assert!(!allowed);
    assert_eq!(transport.request_count(), 1, "the count is still consulted");
    Ok(())
}

#[tokio::test]
async fn count_falls_back_to_row_length_when_total_is_absent() -> DataResult<()> {
    let transport = MockTransport::new();
    transport.enqueue_rows(json!([
        { "id": Uuid::new_v4() },
        { "id": Uuid::new_v4() },
        { "id": Uuid::new_v4() },
    ]));

    let session = feature_session("user_3", "3_companion_limit");
    assert!(!companions(transport).can_create(&session).await?);
    Ok(())
}

#[tokio::test]
async fn count_query_asks_for_an_exact_owner_scoped_total() -> DataResult<()> {
    let transport = MockTransport::new();
    transport.enqueue(counted(1));

    let session = feature_session("user_3", "3_companion_limit");
    companions(transport.clone()).can_create(&session).await?;

    let request = transport.last_request();
    assert_eq!(request.table, "companions");
    assert_eq!(request.param("select"), Some("id"));
    assert_eq!(request.param("Author"), Some("eq.user_3"));
    assert_eq!(request.header("Prefer"), Some("count=exact"));
    Ok(())
}
