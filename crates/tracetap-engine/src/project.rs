//! Record projection: raw API envelope entry to typed [`RunRecord`].
//!
//! Required fields must be present and non-null; their absence is an
//! API contract violation. Declared fields pass through untransformed;
//! anything else lands in the record's extension map.

use serde_json::Value;
use tracetap_types::record::RunRecord;

use crate::error::{ExtractError, Result};
use crate::REPLICATION_KEY;

/// Fields that must be present and non-null on every record.
const REQUIRED_FIELDS: [&str; 2] = [REPLICATION_KEY, "trace_id"];

/// Project one raw record into the declared record shape.
///
/// # Errors
///
/// Returns [`ExtractError::MissingField`] naming the first required
/// field that is absent or null, or [`ExtractError::Projection`] when
/// the entry is not an object or a declared field has the wrong shape.
pub fn project(raw: Value) -> Result<RunRecord> {
    let Some(object) = raw.as_object() else {
        return Err(ExtractError::Projection(format!(
            "expected a JSON object, got {raw}"
        )));
    };
    for field in REQUIRED_FIELDS {
        match object.get(field) {
            None | Some(Value::Null) => return Err(ExtractError::MissingField(field)),
            Some(_) => {}
        }
    }
    serde_json::from_value(raw).map_err(|err| ExtractError::Projection(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projects_full_record() {
        let record = project(json!({
            "start_time": "2025-06-01T12:00:00.100000",
            "trace_id": "t-1",
            "id": "r-1",
            "name": "agent-step",
            "run_type": "chain",
            "status": "success",
            "total_tokens": 431,
            "parent_run_id": null,
            "child_run_ids": ["c-1", "c-2"],
            "dotted_order": "20250601T120000.r-1"
        }))
        .unwrap();

        assert_eq!(record.trace_id, "t-1");
        assert_eq!(record.name.as_deref(), Some("agent-step"));
        assert_eq!(record.total_tokens, Some(431));
        assert_eq!(record.child_run_ids.as_ref().unwrap().len(), 2);
        // Null optionals stay absent, unmodeled keys are kept aside.
        assert!(record.parent_run_id.is_none());
        assert_eq!(record.extension["dotted_order"], "20250601T120000.r-1");
    }

    #[test]
    fn missing_trace_id_names_the_field() {
        let err = project(json!({"start_time": "2025-06-01T12:00:00Z"})).unwrap_err();
        match err {
            ExtractError::MissingField(field) => assert_eq!(field, "trace_id"),
            other => panic!("expected MissingField, got {other}"),
        }
    }

    #[test]
    fn missing_start_time_names_the_field() {
        let err = project(json!({"trace_id": "t-1"})).unwrap_err();
        match err {
            ExtractError::MissingField(field) => assert_eq!(field, "start_time"),
            other => panic!("expected MissingField, got {other}"),
        }
    }

    #[test]
    fn null_required_field_counts_as_missing() {
        let err = project(json!({
            "start_time": "2025-06-01T12:00:00Z",
            "trace_id": null
        }))
        .unwrap_err();
        assert!(matches!(err, ExtractError::MissingField("trace_id")));
    }

    #[test]
    fn non_object_entry_is_a_projection_error() {
        let err = project(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, ExtractError::Projection(_)));
    }

    #[test]
    fn wrongly_shaped_declared_field_is_a_projection_error() {
        let err = project(json!({
            "start_time": "2025-06-01T12:00:00Z",
            "trace_id": "t-1",
            "total_tokens": "not-a-number"
        }))
        .unwrap_err();
        assert!(matches!(err, ExtractError::Projection(_)));
    }
}
