//! Wire types for the runs-query endpoint.
//!
//! [`PageRequest`] is the POST body sent per page; [`PageResponse`] is
//! what comes back. The continuation token is opaque: the engine only
//! ever asks whether one is present.

use serde::{Deserialize, Serialize};

/// Opaque pagination token returned by the API.
///
/// The internal structure is never interpreted; presence means "more
/// pages exist". An empty string on the wire counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap a raw token value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Requested sort direction for the replication key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending by replication key. Required for cursor stability:
    /// combined with a fixed filter it guarantees no record is skipped
    /// across pages.
    #[default]
    Asc,
    /// Descending. Not used by the extractor; kept for wire fidelity.
    Desc,
}

/// POST body for one page of the runs-query endpoint.
///
/// Everything except `cursor` is fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Session (project) scopes to query.
    pub session: Vec<String>,
    /// Filter predicate, e.g. `eq(is_root, true)`.
    pub filter: String,
    /// Page size limit.
    pub limit: u32,
    /// Sort direction for the replication key.
    pub order: SortOrder,
    /// Always `false`: the extractor walks every page.
    pub skip_pagination: bool,
    /// Field-selection list; the single source of truth for what a
    /// response record may contain.
    pub select: Vec<String>,
    /// Continuation token from the previous page, absent on page one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<ContinuationToken>,
}

/// Cursor block at the fixed response path `cursors.next`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursors {
    /// Token for the next page; null or missing when exhausted.
    #[serde(default)]
    pub next: Option<ContinuationToken>,
}

/// One page of raw records from the runs-query endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Raw result envelope entries, untyped until projection.
    #[serde(default)]
    pub runs: Vec<serde_json::Value>,
    /// Pagination cursor block.
    #[serde(default)]
    pub cursors: Cursors,
}

impl PageResponse {
    /// The next continuation token, normalizing null, missing, and
    /// empty-string to `None`.
    #[must_use]
    pub fn next_token(&self) -> Option<&ContinuationToken> {
        self.cursors.next.as_ref().filter(|t| !t.as_str().is_empty())
    }
}
