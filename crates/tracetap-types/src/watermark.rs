//! Watermark type for incremental extraction resume points.
//!
//! A [`Watermark`] marks the replication-key instant at which the next
//! run resumes. It always compares by instant, never by string, and
//! renders in one canonical UTC form so filters and persisted state
//! stay byte-stable across runs.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical second-precision UTC rendering (`2025-06-01T12:00:00Z`).
const CANONICAL_FMT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Naive timestamp form returned by the API for some fields
/// (`2025-06-01T12:00:00.123456`, implicitly UTC).
const NAIVE_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A watermark could not be parsed as an ISO-8601 instant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid watermark '{input}': not an ISO-8601 instant")]
pub struct ParseWatermarkError {
    /// The rejected input, verbatim.
    pub input: String,
}

/// Replication-key instant marking the resume point for extraction.
///
/// Sub-second precision is kept internally for comparisons but the
/// canonical rendering truncates to whole seconds. Truncation rounds
/// down, so an inclusive `gte` filter built from the rendering can
/// only re-fetch records, never skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// Parse an ISO-8601 instant.
    ///
    /// Accepts RFC-3339 (`Z` suffix or numeric offset) and the naive
    /// `YYYY-MM-DDTHH:MM:SS[.ffffff]` form, which is taken as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ParseWatermarkError`] for anything else.
    pub fn parse(input: &str) -> Result<Self, ParseWatermarkError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, NAIVE_FMT) {
            return Ok(Self(naive.and_utc()));
        }
        Err(ParseWatermarkError {
            input: input.to_string(),
        })
    }

    /// Wrap an already-typed UTC instant.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// The underlying instant.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical second-precision UTC string (`YYYY-MM-DDTHH:MM:SSZ`).
    #[must_use]
    pub fn canonical(&self) -> String {
        self.0.format(CANONICAL_FMT).to_string()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FMT))
    }
}

impl Serialize for Watermark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for Watermark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
