//! Extraction error model.
//!
//! Every fatal error identifies the stage that failed (bookmark
//! resolution, page fetch, projection, checkpoint, sink) so operators
//! can tell transport trouble from data trouble at a glance.

use tracetap_state::StateError;

use crate::transport::TransportError;

/// Fatal errors terminating an extraction run.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Invalid extractor configuration, detected before any work starts.
    #[error("invalid config: {0}")]
    Config(String),

    /// Reading persisted state during bookmark resolution failed.
    #[error("bookmark resolution failed: {0}")]
    Bookmark(#[source] StateError),

    /// A page fetch failed at the transport layer. Never retried here;
    /// the persisted watermark stays at the last fully-processed record
    /// so the next run resumes safely.
    #[error("page fetch failed: {0}")]
    PageFetch(#[from] TransportError),

    /// A record came back without a required field, which means the API
    /// broke its contract.
    #[error("record projection failed: missing required field '{0}'")]
    MissingField(&'static str),

    /// A record was present but could not be projected into the
    /// declared shape.
    #[error("record projection failed: {0}")]
    Projection(String),

    /// Persisting a checkpoint failed.
    #[error("checkpoint update failed: {0}")]
    State(#[from] StateError),

    /// Recording run history failed.
    #[error("run history update failed: {0}")]
    RunHistory(#[source] StateError),

    /// The downstream sink rejected a record.
    #[error("sink write failed: {0}")]
    Sink(#[source] anyhow::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
