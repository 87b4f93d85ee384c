//! Normalized run record emitted by the extractor.
//!
//! The field set is fixed: two required fields plus the declared
//! optional superset. Keys selected from the API but not modeled here
//! land in one explicit extension map instead of an open-ended bag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::watermark::{ParseWatermarkError, Watermark};

/// One normalized run/trace entry.
///
/// `start_time` and `trace_id` are required; everything else passes
/// through verbatim when present. Lineage identifiers
/// (`parent_run_id`, `child_run_ids`) are never resolved, only carried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Replication key: when the run started, verbatim instant text.
    pub start_time: String,
    /// Trace this run belongs to.
    pub trace_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_run_ids: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_stats: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_token_details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_cost_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_cost_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_model_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_token_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_min_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_max_start_time: Option<String>,

    /// Selected-but-unmodeled keys, preserved for round-trip fidelity.
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extension: BTreeMap<String, Value>,
}

impl RunRecord {
    /// Parse the replication key into a typed [`Watermark`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseWatermarkError`] if `start_time` is not an
    /// ISO-8601 instant.
    pub fn watermark(&self) -> Result<Watermark, ParseWatermarkError> {
        Watermark::parse(&self.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_record() {
        let rec: RunRecord = serde_json::from_value(serde_json::json!({
            "start_time": "2025-06-01T12:00:00Z",
            "trace_id": "t-1"
        }))
        .unwrap();
        assert_eq!(rec.trace_id, "t-1");
        assert!(rec.name.is_none());
        assert!(rec.extension.is_empty());
    }

    #[test]
    fn absent_optionals_are_not_serialized() {
        let rec = RunRecord {
            start_time: "2025-06-01T12:00:00Z".into(),
            trace_id: "t-1".into(),
            ..RunRecord::default()
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn unmodeled_keys_land_in_extension() {
        let rec: RunRecord = serde_json::from_value(serde_json::json!({
            "start_time": "2025-06-01T12:00:00Z",
            "trace_id": "t-1",
            "dotted_order": "20250601T120000.t-1",
            "app_path": "/o/1/projects/p/2"
        }))
        .unwrap();
        assert_eq!(rec.extension.len(), 2);
        assert_eq!(rec.extension["dotted_order"], "20250601T120000.t-1");

        // Round-trips back out through serialization.
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["app_path"], "/o/1/projects/p/2");
    }

    #[test]
    fn typed_fields_pass_through() {
        let rec: RunRecord = serde_json::from_value(serde_json::json!({
            "start_time": "2025-06-01T12:00:00.123456",
            "trace_id": "t-1",
            "name": "chain",
            "total_tokens": 1200,
            "total_cost": 0.0042,
            "tags": ["prod", 7],
            "inputs": {"question": "hi"}
        }))
        .unwrap();
        assert_eq!(rec.name.as_deref(), Some("chain"));
        assert_eq!(rec.total_tokens, Some(1200));
        assert_eq!(rec.tags.as_ref().unwrap().len(), 2);
        assert_eq!(rec.inputs.as_ref().unwrap()["question"], "hi");
    }

    #[test]
    fn watermark_parses_replication_key() {
        let rec = RunRecord {
            start_time: "2025-06-01T12:00:00.512001".into(),
            trace_id: "t-1".into(),
            ..RunRecord::default()
        };
        assert_eq!(rec.watermark().unwrap().canonical(), "2025-06-01T12:00:00Z");
    }
}
