//! Incremental extraction engine for LangSmith run/trace records.
//!
//! The engine resolves a resume watermark, builds a root-run filter,
//! walks the cursor-paginated runs-query endpoint, projects each raw
//! envelope entry into a typed [`RunRecord`](tracetap_types::record::RunRecord),
//! and checkpoints the watermark as records are emitted. Resumption is
//! at-least-once: the inclusive filter boundary may duplicate records
//! across runs but never drops them.

pub mod bookmark;
pub mod config;
pub mod cursor;
pub mod error;
pub mod extract;
pub mod filter;
pub mod project;
pub mod sink;
pub mod transport;

pub use config::ExtractorConfig;
pub use error::ExtractError;
pub use extract::{Extractor, RunSummary};
pub use sink::RecordSink;
pub use transport::{HttpTransport, PageTransport};

/// Name of the single stream this extractor serves.
pub const STREAM_NAME: &str = "runs";

/// Replication key used for incremental extraction.
pub const REPLICATION_KEY: &str = "start_time";
