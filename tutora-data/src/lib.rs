//! Tutora Data - Companion Access Module
//!
//! Stateless operations over the `companions` and `session_history`
//! tables: create, list/search, single lookup, per-owner listing,
//! session-history append and listings, the bookmark toggles, and the
//! entitlement-driven quota gate.
//!
//! Every operation is a pass-through to the remote store; filtering,
//! ordering, and pagination are delegated to it. Caller identity is an
//! explicit [`Session`](tutora_core::Session) parameter, never ambient
//! state.

pub mod companions;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use companions::Companions;
pub use error::{DataError, DataResult};
pub use types::{CompanionFilter, CreateCompanionRequest};
