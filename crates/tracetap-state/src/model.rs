//! State backend model types.
//!
//! Pure data types shared by [`StateBackend`](crate::StateBackend)
//! implementations and their callers.

use serde::{Deserialize, Serialize};

/// Opaque stream name (e.g. `"runs"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamName(String);

impl StreamName {
    /// Create a new stream name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for StreamName {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Terminal status of an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate statistics for a finished extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub records_emitted: u64,
    pub pages_fetched: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Snapshot of a persisted watermark for a (stream, replication key) pair.
///
/// `value` is stored as opaque text; the bookmark resolver decides
/// whether it parses. `updated_at` is an ISO-8601 UTC string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkState {
    /// Replication key column (e.g. `"start_time"`).
    pub replication_key: String,
    /// Last-seen value of the replication key.
    pub value: String,
    /// ISO-8601 UTC timestamp of when this watermark was last written.
    pub updated_at: String,
}
