//! Tutora Core - Entity Types
//!
//! Pure data structures with no behavior beyond conversions. All other
//! crates depend on this. The persisted schema uses PascalCase column
//! names while the application schema is camelCase; the mapping between
//! the two lives here, in one place, as the `CompanionRow` /
//! `NewCompanionRow` serde mirrors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Companion identifier. Assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanionId(pub Uuid);

impl CompanionId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CompanionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for CompanionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Caller identifier issued by the identity provider. Opaque to this
/// layer; stored verbatim in the `Author` and `user_id` columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// COMPANION (application schema)
// ============================================================================

/// A tutoring companion as the application sees it.
///
/// `author` is set once at creation from the caller's authenticated
/// identity and is never mutated by the data layer. The only mutable
/// attribute is `bookmarked`, flipped by the bookmark toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Companion {
    pub id: CompanionId,
    pub name: String,
    pub subject: String,
    pub topic: String,
    pub voice: String,
    pub style: String,
    /// Session length in minutes.
    pub duration: i64,
    pub author: UserId,
    pub bookmarked: bool,
}

// ============================================================================
// COMPANION ROWS (persisted schema)
// ============================================================================

/// A row of the `companions` table, exactly as the store persists it.
///
/// This struct is the schema mapping: every persisted column name appears
/// here once, as a serde rename, and both serialization directions go
/// through it. Keep it in sync with the table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionRow {
    pub id: CompanionId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Voice")]
    pub voice: String,
    #[serde(rename = "Style")]
    pub style: String,
    #[serde(rename = "Duration")]
    pub duration: i64,
    #[serde(rename = "Author")]
    pub author: UserId,
    /// Rows predating the bookmark column may carry NULL here.
    #[serde(rename = "Bookmark", default, deserialize_with = "nullable_flag")]
    pub bookmark: bool,
}

fn nullable_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl From<CompanionRow> for Companion {
    fn from(row: CompanionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            subject: row.subject,
            topic: row.topic,
            voice: row.voice,
            style: row.style,
            duration: row.duration,
            author: row.author,
            bookmarked: row.bookmark,
        }
    }
}

impl From<Companion> for CompanionRow {
    fn from(companion: Companion) -> Self {
        Self {
            id: companion.id,
            name: companion.name,
            subject: companion.subject,
            topic: companion.topic,
            voice: companion.voice,
            style: companion.style,
            duration: companion.duration,
            author: companion.author,
            bookmark: companion.bookmarked,
        }
    }
}

/// Insert payload for the `companions` table. The store assigns `id`;
/// `Bookmark` is always written as `false` on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompanionRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Voice")]
    pub voice: String,
    #[serde(rename = "Style")]
    pub style: String,
    #[serde(rename = "Duration")]
    pub duration: i64,
    #[serde(rename = "Author")]
    pub author: UserId,
    #[serde(rename = "Bookmark")]
    pub bookmark: bool,
}

// ============================================================================
// SESSION HISTORY ROWS
// ============================================================================

/// Insert payload for the `session_history` table. `created_at` is
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSessionRow {
    pub companion_id: CompanionId,
    pub user_id: UserId,
}

/// A `session_history` row with its companion embedded, as returned by
/// the `companions:companion_id(*)` select. History listings surface
/// only the embedded companion; the linking row itself is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWithCompanion {
    pub companions: CompanionRow,
}

// ============================================================================
// CALLER CONTEXT
// ============================================================================

/// A plan or feature flag attached to a caller by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entitlement {
    Plan(String),
    Feature(String),
}

impl Entitlement {
    pub fn plan(name: impl Into<String>) -> Self {
        Self::Plan(name.into())
    }

    pub fn feature(name: impl Into<String>) -> Self {
        Self::Feature(name.into())
    }
}

/// The authenticated caller, passed explicitly into every operation that
/// needs identity. Operations never consult ambient request state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Identity-provider user id of the caller.
    pub user_id: UserId,

    /// Plan and feature entitlements granted to the caller.
    pub entitlements: Vec<Entitlement>,
}

impl Session {
    /// Create a session with no entitlements.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            entitlements: Vec::new(),
        }
    }

    /// Create a session with the given entitlements.
    pub fn with_entitlements(
        user_id: impl Into<UserId>,
        entitlements: Vec<Entitlement>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            entitlements,
        }
    }

    /// Check a single entitlement.
    pub fn has(&self, check: &Entitlement) -> bool {
        self.entitlements.contains(check)
    }

    /// Check for a plan entitlement by name.
    pub fn has_plan(&self, plan: &str) -> bool {
        self.entitlements
            .iter()
            .any(|e| matches!(e, Entitlement::Plan(p) if p == plan))
    }

    /// Check for a feature flag by name.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.entitlements
            .iter()
            .any(|e| matches!(e, Entitlement::Feature(f) if f == feature))
    }
}

// ============================================================================
// VIEW INVALIDATION CONTRACT
// ============================================================================

/// Hook into the presentation layer's cache: after a mutating write, the
/// data layer asks for the view identified by `path` to be re-fetched and
/// re-rendered. Implemented by the hosting framework; the library ships
/// only the no-op.
pub trait ViewInvalidator: Send + Sync {
    fn invalidate(&self, path: &str);
}

/// Discards invalidation requests. For contexts with no presentation
/// layer attached.
#[derive(Debug, Clone, Default)]
pub struct NoopInvalidator;

impl ViewInvalidator for NoopInvalidator {
    fn invalidate(&self, _path: &str) {}
}
