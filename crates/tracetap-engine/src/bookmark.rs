//! Bookmark resolution: where does this run start?
//!
//! The starting watermark is decided once per run by consulting, in
//! priority order: the run-scoped cache, persisted checkpoint state,
//! the configured `start_time`, and finally a computed lookback
//! default. Malformed values at any step degrade with a warning and
//! fall through; only state backend failures are fatal.

use chrono::{DateTime, Duration, Utc};
use tracetap_state::model::StreamName;
use tracetap_state::StateBackend;
use tracetap_types::watermark::Watermark;

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::{REPLICATION_KEY, STREAM_NAME};

/// Lookback window for the computed default bookmark.
pub const LOOKBACK_HOURS: i64 = 36;

/// Run-scoped mutable state, owned by exactly one run.
///
/// Holds the once-resolved bookmark so later resolutions within the
/// same run are pure reads. The watermark used to build the filter is
/// fixed for the run even as later records are observed.
#[derive(Debug, Default)]
pub struct RunContext {
    bookmark: Option<Watermark>,
}

impl RunContext {
    /// Fresh context with no cached bookmark.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached bookmark, if one has been resolved this run.
    #[must_use]
    pub fn bookmark(&self) -> Option<&Watermark> {
        self.bookmark.as_ref()
    }
}

/// Resolves the starting watermark for a run.
pub struct BookmarkResolver<'a> {
    config: &'a ExtractorConfig,
    state: &'a dyn StateBackend,
}

impl<'a> BookmarkResolver<'a> {
    /// Build a resolver over the given config and persisted state.
    #[must_use]
    pub fn new(config: &'a ExtractorConfig, state: &'a dyn StateBackend) -> Self {
        Self { config, state }
    }

    /// Resolve the starting watermark, caching it in `ctx`.
    ///
    /// Idempotent within a run: a second call returns the cached value
    /// even if persisted state has moved in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Bookmark`] if persisted state cannot be
    /// read. Malformed persisted or configured values are never fatal.
    pub fn resolve(&self, ctx: &mut RunContext) -> Result<Watermark> {
        if let Some(cached) = ctx.bookmark {
            return Ok(cached);
        }
        let resolved = self.resolve_uncached(Utc::now())?;
        ctx.bookmark = Some(resolved);
        Ok(resolved)
    }

    fn resolve_uncached(&self, now: DateTime<Utc>) -> Result<Watermark> {
        let stream = StreamName::new(STREAM_NAME);
        if let Some(persisted) = self
            .state
            .get_watermark(&stream, REPLICATION_KEY)
            .map_err(ExtractError::Bookmark)?
        {
            match Watermark::parse(&persisted.value) {
                Ok(watermark) => {
                    tracing::info!(watermark = %watermark, "Bookmark from persisted state");
                    return Ok(watermark);
                }
                Err(_) => {
                    tracing::warn!(
                        value = persisted.value,
                        "Persisted watermark is not a valid instant, treating as absent"
                    );
                }
            }
        }

        if let Some(configured) = self.config.start_time.as_deref() {
            match Watermark::parse(configured) {
                Ok(watermark) => {
                    tracing::info!(watermark = %watermark, "Bookmark from configured start_time");
                    return Ok(watermark);
                }
                Err(_) => {
                    tracing::warn!(
                        start_time = configured,
                        "Invalid start_time in config, falling back to {LOOKBACK_HOURS}h default"
                    );
                }
            }
        }

        let fallback = Self::default_bookmark(now);
        tracing::info!(watermark = %fallback, "Bookmark defaulted to now - {LOOKBACK_HOURS}h");
        Ok(fallback)
    }

    /// Computed default: `now` minus the lookback window.
    fn default_bookmark(now: DateTime<Utc>) -> Watermark {
        Watermark::from_datetime(now - Duration::hours(LOOKBACK_HOURS))
    }
}
