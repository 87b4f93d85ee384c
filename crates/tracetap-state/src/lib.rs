//! Checkpoint persistence for the tracetap extractor.
//!
//! Provides the [`StateBackend`] trait and a [`SqliteStateBackend`]
//! implementation for watermark tracking and run history.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod model;
pub mod sqlite;

pub use backend::StateBackend;
pub use error::StateError;
pub use sqlite::SqliteStateBackend;
