//! Shared data model for the tracetap extractor.
//!
//! Pure data types used by the engine, state, and CLI crates: the
//! [`Watermark`](watermark::Watermark) resume point, the
//! [`RunRecord`](record::RunRecord) output shape, and the page
//! request/response wire types.

pub mod record;
pub mod watermark;
pub mod wire;
