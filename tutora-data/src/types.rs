//! Request and filter types for the access operations.

use serde::{Deserialize, Serialize};

/// Payload for creating a companion. The author and the bookmark flag
/// are not part of the payload: the author always comes from the
/// caller's session, and new companions are never bookmarked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanionRequest {
    pub name: String,
    pub subject: String,
    pub topic: String,
    pub voice: String,
    pub style: String,
    /// Session length in minutes.
    pub duration: i64,
}

/// Filters and pagination for the companion listing.
///
/// `page` is 1-indexed. Both filter strings are case-insensitive partial
/// matches; an empty string counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanionFilter {
    /// Page size; defaults to 10, clamped to the configured cap.
    pub limit: Option<i64>,
    /// 1-indexed page number; defaults to 1.
    pub page: Option<i64>,
    /// Matches the subject column alone.
    pub subject: Option<String>,
    /// Matches the topic column or the companion name.
    pub topic: Option<String>,
}

impl CompanionFilter {
    /// Subject filter, with empty strings treated as absent.
    pub fn subject_term(&self) -> Option<&str> {
        self.subject.as_deref().filter(|s| !s.is_empty())
    }

    /// Topic filter, with empty strings treated as absent.
    pub fn topic_term(&self) -> Option<&str> {
        self.topic.as_deref().filter(|s| !s.is_empty())
    }
}
