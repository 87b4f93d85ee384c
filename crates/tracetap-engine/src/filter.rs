//! Filter and page-request construction.
//!
//! One run gets one predicate and one field-selection list; only the
//! continuation token varies across its pages. Ascending order by the
//! replication key plus the fixed filter is what guarantees no record
//! is skipped across pages.

use tracetap_types::watermark::Watermark;
use tracetap_types::wire::{PageRequest, SortOrder};

use crate::config::ExtractorConfig;

/// Predicate restricting extraction to root-level runs. Child runs are
/// excluded from direct extraction; they are reachable only through
/// their root's lineage identifiers.
const ROOT_ONLY: &str = "eq(is_root, true)";

/// Field-selection list sent with every page request; the single source
/// of truth for what a response record may contain.
pub const SELECTED_FIELDS: &[&str] = &[
    "id",
    "name",
    "run_type",
    "start_time",
    "end_time",
    "status",
    "error",
    "extra",
    "events",
    "inputs",
    "inputs_preview",
    "inputs_s3_urls",
    "inputs_or_signed_url",
    "outputs",
    "outputs_preview",
    "outputs_s3_urls",
    "outputs_or_signed_url",
    "s3_urls",
    "error_or_signed_url",
    "events_or_signed_url",
    "extra_or_signed_url",
    "serialized_or_signed_url",
    "parent_run_id",
    "session_id",
    "serialized",
    "reference_example_id",
    "reference_dataset_id",
    "total_tokens",
    "prompt_tokens",
    "prompt_token_details",
    "completion_tokens",
    "completion_token_details",
    "total_cost",
    "prompt_cost",
    "prompt_cost_details",
    "completion_cost",
    "completion_cost_details",
    "price_model_id",
    "first_token_time",
    "trace_id",
    "dotted_order",
    "last_queued_at",
    "feedback_stats",
    "child_run_ids",
    "parent_run_ids",
    "tags",
    "in_dataset",
    "app_path",
    "share_token",
    "trace_tier",
    "trace_first_received_at",
    "ttl_seconds",
    "trace_upgrade",
    "thread_id",
    "trace_min_max_start_time",
];

/// Build the query predicate for one run.
///
/// Always requires root-level runs; with a watermark, adds an inclusive
/// `gte` bound on the replication key. Inclusive so that restart-safe
/// replay duplicates the boundary record instead of dropping it;
/// downstream deduplication by unique id is the consumer's job.
#[must_use]
pub fn build_filter(watermark: Option<&Watermark>) -> String {
    match watermark {
        Some(w) => format!(
            "and({ROOT_ONLY}, gte({}, \"{}\"))",
            crate::REPLICATION_KEY,
            w.canonical()
        ),
        None => ROOT_ONLY.to_string(),
    }
}

/// Assemble the per-run page request template (no continuation token).
#[must_use]
pub fn build_page_request(config: &ExtractorConfig, watermark: Option<&Watermark>) -> PageRequest {
    PageRequest {
        session: vec![config.session_id.clone()],
        filter: build_filter(watermark),
        limit: config.page_size,
        order: SortOrder::Asc,
        skip_pagination: false,
        select: SELECTED_FIELDS.iter().map(ToString::to_string).collect(),
        cursor: None,
    }
}
