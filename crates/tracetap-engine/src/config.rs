//! Extractor configuration.

use serde::Deserialize;

use crate::error::ExtractError;
use crate::transport::DEFAULT_BASE_URL;

/// Default page size for the runs-query endpoint.
pub const DEFAULT_PAGE_SIZE: u32 = 80;

/// Upper bound the API accepts for one page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// How often the watermark is persisted during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointGranularity {
    /// After every emitted record (finest resume point).
    #[default]
    Record,
    /// After each page (fewer state writes, coarser resume point).
    Page,
}

/// What to do when a record is missing a required field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Terminate the run. A missing required field means the API broke
    /// its contract, so this is the default.
    #[default]
    Fail,
    /// Log at warn level and drop the record. Deviates from fail-fast;
    /// opt-in only.
    Skip,
}

/// Configuration for one extractor instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// API key for the tracing service (secret).
    pub api_key: String,
    /// Session (project) scope to extract from.
    pub session_id: String,
    /// Optional ISO-8601 override for the default bookmark. Unparseable
    /// values degrade to the lookback default with a warning.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Records per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Base URL of the tracing API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Pause between page fetches, for staying under API rate limits.
    #[serde(default)]
    pub throttle_ms: u64,
    /// Watermark persistence granularity.
    #[serde(default)]
    pub checkpoint: CheckpointGranularity,
    /// Malformed-record handling.
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ExtractorConfig {
    /// Build a config with defaults for everything but the required keys.
    #[must_use]
    pub fn new(api_key: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            session_id: session_id.into(),
            start_time: None,
            page_size: DEFAULT_PAGE_SIZE,
            base_url: DEFAULT_BASE_URL.to_string(),
            throttle_ms: 0,
            checkpoint: CheckpointGranularity::default(),
            on_malformed: MalformedPolicy::default(),
        }
    }

    /// Validate required keys and bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Config`] when a required key is empty or
    /// `page_size` is out of range. An unparseable `start_time` is not
    /// an error here: it degrades during bookmark resolution.
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.api_key.is_empty() {
            return Err(ExtractError::Config("api_key must not be empty".into()));
        }
        if self.session_id.is_empty() {
            return Err(ExtractError::Config("session_id must not be empty".into()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ExtractError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}
