//! The companion access operations.

use crate::error::{DataError, DataResult};
use crate::types::{CompanionFilter, CreateCompanionRequest};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tutora_core::{
    Companion, CompanionId, CompanionRow, NewCompanionRow, NewSessionRow, NoopInvalidator,
    Session, SessionWithCompanion, UserId, ViewInvalidator,
};
use tutora_store::{OrFilter, OrderDirection, StoreClient};

/// Table holding companion records.
pub const COMPANIONS_TABLE: &str = "companions";

/// Table linking users to the companions they have run sessions with.
pub const SESSION_HISTORY_TABLE: &str = "session_history";

/// Embedded-relation select surfacing the companion behind a history row.
const SESSION_COMPANION_SELECT: &str = "companions:companion_id(*)";

/// Plan granting unlimited companions.
const PRO_PLAN: &str = "pro";

/// Feature flags granting fixed companion quotas.
const THREE_COMPANION_FEATURE: &str = "3_companion_limit";
const TEN_COMPANION_FEATURE: &str = "10_companion_limit";

/// Default page size for listings.
const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Serialize)]
struct BookmarkChange {
    #[serde(rename = "Bookmark")]
    bookmark: bool,
}

/// Quota derived from a caller's entitlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quota {
    Unlimited,
    Limited(u64),
}

/// The caller's companion quota, evaluated in entitlement order.
fn companion_quota(session: &Session) -> Quota {
    if session.has_plan(PRO_PLAN) {
        Quota::Unlimited
    } else if session.has_feature(THREE_COMPANION_FEATURE) {
        Quota::Limited(3)
    } else if session.has_feature(TEN_COMPANION_FEATURE) {
        Quota::Limited(10)
    } else {
        Quota::Limited(0)
    }
}

/// Handle for companion and session-history operations.
///
/// Cheap to clone. Wraps a [`StoreClient`] and the presentation layer's
/// [`ViewInvalidator`]; holds no mutable state of its own.
#[derive(Clone)]
pub struct Companions {
    store: StoreClient,
    invalidator: Arc<dyn ViewInvalidator>,
}

impl Companions {
    /// Create a handle with no presentation layer attached.
    pub fn new(store: StoreClient) -> Self {
        Self::with_invalidator(store, Arc::new(NoopInvalidator))
    }

    /// Create a handle that notifies the given invalidator after
    /// mutating writes.
    pub fn with_invalidator(store: StoreClient, invalidator: Arc<dyn ViewInvalidator>) -> Self {
        Self { store, invalidator }
    }

    // ========================================================================
    // CREATE
    // ========================================================================

    /// Create a companion owned by the session's user.
    ///
    /// The author is taken from the session and the bookmark flag is
    /// written as `false`, regardless of anything in the request payload.
    pub async fn create(
        &self,
        session: &Session,
        request: &CreateCompanionRequest,
    ) -> DataResult<Companion> {
        let row = NewCompanionRow {
            name: request.name.clone(),
            subject: request.subject.clone(),
            topic: request.topic.clone(),
            voice: request.voice.clone(),
            style: request.style.clone(),
            duration: request.duration,
            author: session.user_id.clone(),
            bookmark: false,
        };

        let rows: Vec<CompanionRow> = self
            .store
            .table(COMPANIONS_TABLE)
            .insert(&row)?
            .select("*")
            .fetch()
            .await?;

        rows.into_iter()
            .next()
            .map(Companion::from)
            .ok_or(DataError::CreateFailed)
    }

    // ========================================================================
    // LISTINGS
    // ========================================================================

    /// List companions, optionally filtered by subject and/or topic,
    /// paginated by inclusive row range.
    ///
    /// With both filters, the subject must match AND the topic term must
    /// match the topic or the name; a lone filter applies its clause
    /// alone. An empty page is an empty list, never an error.
    pub async fn list(&self, filter: &CompanionFilter) -> DataResult<Vec<Companion>> {
        let limit = self
            .store
            .config()
            .clamp_page_size(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE));
        let page = filter.page.unwrap_or(1).max(1);

        let mut query = self.store.table(COMPANIONS_TABLE).select("*");
        match (filter.subject_term(), filter.topic_term()) {
            (Some(subject), Some(topic)) => {
                query = query
                    .ilike("Subject", &contains(subject))
                    .or(&topic_or_name(topic));
            }
            (Some(subject), None) => {
                query = query.ilike("Subject", &contains(subject));
            }
            (None, Some(topic)) => {
                query = query.or(&topic_or_name(topic));
            }
            (None, None) => {}
        }

        let rows: Vec<CompanionRow> = query
            .range((page - 1) * limit, page * limit - 1)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(Companion::from).collect())
    }

    /// Look up a single companion.
    ///
    /// A missing row is `Ok(None)`; a store failure is an error, the
    /// same as every other operation here.
    pub async fn get(&self, id: CompanionId) -> DataResult<Option<Companion>> {
        let rows: Vec<CompanionRow> = self
            .store
            .table(COMPANIONS_TABLE)
            .select("*")
            .eq("id", id)
            .fetch()
            .await?;
        Ok(rows.into_iter().next().map(Companion::from))
    }

    /// All companions authored by the given user. No pagination; bounded
    /// only by the store.
    pub async fn list_by_author(&self, user_id: &UserId) -> DataResult<Vec<Companion>> {
        let rows: Vec<CompanionRow> = self
            .store
            .table(COMPANIONS_TABLE)
            .select("*")
            .eq("Author", user_id)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(Companion::from).collect())
    }

    // ========================================================================
    // SESSION HISTORY
    // ========================================================================

    /// Append a session-history row linking the session's user to the
    /// companion. The store assigns the timestamp.
    pub async fn record_session(
        &self,
        session: &Session,
        companion_id: CompanionId,
    ) -> DataResult<()> {
        let row = NewSessionRow {
            companion_id,
            user_id: session.user_id.clone(),
        };
        self.store
            .table(SESSION_HISTORY_TABLE)
            .insert(&row)?
            .execute()
            .await?;
        Ok(())
    }

    /// The companions behind the most recent sessions, store-wide.
    pub async fn recent_sessions(&self, limit: Option<i64>) -> DataResult<Vec<Companion>> {
        self.session_listing(None, limit).await
    }

    /// The companions behind the given user's most recent sessions.
    pub async fn user_sessions(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
    ) -> DataResult<Vec<Companion>> {
        self.session_listing(Some(user_id), limit).await
    }

    async fn session_listing(
        &self,
        user_id: Option<&UserId>,
        limit: Option<i64>,
    ) -> DataResult<Vec<Companion>> {
        let limit = self
            .store
            .config()
            .clamp_page_size(limit.unwrap_or(DEFAULT_PAGE_SIZE));

        let mut query = self
            .store
            .table(SESSION_HISTORY_TABLE)
            .select(SESSION_COMPANION_SELECT);
        if let Some(user_id) = user_id {
            query = query.eq("user_id", user_id);
        }

        let rows: Vec<SessionWithCompanion> = query
            .order("created_at", OrderDirection::Descending)
            .limit(limit)
            .fetch()
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Companion::from(row.companions))
            .collect())
    }

    // ========================================================================
    // QUOTA GATE
    // ========================================================================

    /// Whether the session's user may create another companion.
    ///
    /// Pro-plan callers are allowed without a count check. Otherwise the
    /// quota comes from the companion-limit feature flags (no flag means
    /// a quota of zero) and the caller's current companion count is
    /// taken from the store's exact count, falling back to the returned
    /// row count when the store omits a total.
    pub async fn can_create(&self, session: &Session) -> DataResult<bool> {
        let limit = match companion_quota(session) {
            Quota::Unlimited => return Ok(true),
            Quota::Limited(limit) => limit,
        };

        let (rows, total): (Vec<Value>, Option<u64>) = self
            .store
            .table(COMPANIONS_TABLE)
            .select("id")
            .count_exact()
            .eq("Author", &session.user_id)
            .fetch_with_count()
            .await?;

        let count = total.unwrap_or(rows.len() as u64);
        Ok(count < limit)
    }

    // ========================================================================
    // BOOKMARKS
    // ========================================================================

    /// Set the bookmark flag on a companion, then invalidate the view at
    /// `path`. A no-op for unauthenticated callers.
    pub async fn add_bookmark(
        &self,
        session: Option<&Session>,
        id: CompanionId,
        path: &str,
    ) -> DataResult<()> {
        self.set_bookmark(session, id, path, true).await
    }

    /// Clear the bookmark flag on a companion, then invalidate the view
    /// at `path`. A no-op for unauthenticated callers.
    pub async fn remove_bookmark(
        &self,
        session: Option<&Session>,
        id: CompanionId,
        path: &str,
    ) -> DataResult<()> {
        self.set_bookmark(session, id, path, false).await
    }

    async fn set_bookmark(
        &self,
        session: Option<&Session>,
        id: CompanionId,
        path: &str,
        bookmark: bool,
    ) -> DataResult<()> {
        if session.is_none() {
            return Ok(());
        }

        self.store
            .table(COMPANIONS_TABLE)
            .update(&BookmarkChange { bookmark })?
            .eq("id", id)
            .execute()
            .await?;

        tracing::debug!(companion_id = %id, %path, bookmark, "bookmark updated, invalidating view");
        self.invalidator.invalidate(path);
        Ok(())
    }

    /// All bookmarked companions.
    ///
    /// The bookmark flag is store-wide, not per-viewer, so this listing
    /// is identical for every caller; the owner argument exists for
    /// call-site compatibility and is not applied as a filter.
    pub async fn bookmarked(&self, _user_id: &UserId) -> DataResult<Vec<Companion>> {
        let rows: Vec<CompanionRow> = self
            .store
            .table(COMPANIONS_TABLE)
            .select("*")
            .eq("Bookmark", true)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(Companion::from).collect())
    }
}

fn contains(term: &str) -> String {
    format!("%{}%", term)
}

fn topic_or_name(topic: &str) -> [OrFilter; 2] {
    [
        OrFilter::ilike("Topic", contains(topic)),
        OrFilter::ilike("Name", contains(topic)),
    ]
}
