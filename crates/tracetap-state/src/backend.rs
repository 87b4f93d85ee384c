//! State backend trait definition.
//!
//! [`StateBackend`] defines the storage contract for stream watermarks
//! and run history. The engine reads the watermark once at run start
//! and writes updated values as records are processed; flushing and
//! durability are the backend's concern.

use crate::error;
use crate::model::{RunStats, RunStatus, StreamName, WatermarkState};

/// Storage contract for extractor state.
///
/// Implementations must be `Send + Sync` for use behind `&dyn StateBackend`.
pub trait StateBackend: Send + Sync {
    /// Read the persisted watermark for a (stream, replication key) pair.
    ///
    /// Returns `Ok(None)` when no watermark has been persisted yet.
    /// The stored value is returned verbatim, even if it no longer
    /// parses as an instant; interpreting it is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn get_watermark(
        &self,
        stream: &StreamName,
        replication_key: &str,
    ) -> error::Result<Option<WatermarkState>>;

    /// Upsert the watermark for a (stream, replication key) pair.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn set_watermark(
        &self,
        stream: &StreamName,
        replication_key: &str,
        value: &str,
    ) -> error::Result<()>;

    /// Begin a new extraction run, returning its unique ID.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn start_run(&self, stream: &StreamName) -> error::Result<i64>;

    /// Finalize an extraction run with status and aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats)
        -> error::Result<()>;
}
