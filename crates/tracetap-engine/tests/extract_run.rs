//! End-to-end extraction runs against a scripted transport and an
//! in-memory state backend.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use tracetap_engine::config::{CheckpointGranularity, MalformedPolicy};
use tracetap_engine::sink::VecSink;
use tracetap_engine::transport::{PageTransport, TransportError};
use tracetap_engine::{ExtractorConfig, Extractor, REPLICATION_KEY, STREAM_NAME};
use tracetap_state::model::{RunStats, RunStatus, StreamName, WatermarkState};
use tracetap_state::{SqliteStateBackend, StateBackend, StateError};
use tracetap_types::watermark::Watermark;
use tracetap_types::wire::{PageRequest, PageResponse};

/// Replays a fixed script of page responses, recording every request.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<PageResponse, TransportError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<PageResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageTransport for ScriptedTransport {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted")
    }
}

fn run_json(trace_id: &str, start_time: &str) -> serde_json::Value {
    json!({
        "id": format!("run-{trace_id}"),
        "trace_id": trace_id,
        "start_time": start_time,
        "name": "step",
        "status": "success"
    })
}

fn page(
    runs: Vec<serde_json::Value>,
    next: Option<&str>,
) -> Result<PageResponse, TransportError> {
    Ok(serde_json::from_value(json!({"runs": runs, "cursors": {"next": next}})).unwrap())
}

fn config_with_start(start_time: &str) -> ExtractorConfig {
    let mut config = ExtractorConfig::new("key", "sess-1");
    config.start_time = Some(start_time.into());
    config
}

fn persisted_watermark(backend: &SqliteStateBackend) -> Option<String> {
    backend
        .get_watermark(&StreamName::new(STREAM_NAME), REPLICATION_KEY)
        .unwrap()
        .map(|w| w.value)
}

#[tokio::test]
async fn two_page_run_emits_in_order_and_checkpoints() {
    let transport = ScriptedTransport::new(vec![
        page(
            vec![
                run_json("t-1", "2025-06-01T12:00:00Z"),
                run_json("t-2", "2025-06-01T12:05:00Z"),
                run_json("t-3", "2025-06-01T12:10:00Z"),
            ],
            Some("tok-2"),
        ),
        page(
            vec![
                run_json("t-4", "2025-06-01T12:15:00Z"),
                run_json("t-5", "2025-06-01T12:20:00Z"),
            ],
            None,
        ),
    ]);
    let backend = SqliteStateBackend::in_memory().unwrap();
    let extractor = Extractor::new(
        config_with_start("2025-06-01T00:00:00Z"),
        &transport,
        &backend,
    )
    .unwrap();

    let mut sink = VecSink::new();
    let summary = extractor.run(&mut sink).await.unwrap();

    assert_eq!(summary.records, 5);
    assert_eq!(summary.pages, 2);
    assert_eq!(
        summary.last_watermark.unwrap().canonical(),
        "2025-06-01T12:20:00Z"
    );

    let ids: Vec<_> = sink.records().iter().map(|r| r.trace_id.as_str()).collect();
    assert_eq!(ids, ["t-1", "t-2", "t-3", "t-4", "t-5"]);

    assert_eq!(
        persisted_watermark(&backend).as_deref(),
        Some("2025-06-01T12:20:00Z")
    );

    // Page requests share everything but the continuation token.
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].cursor.is_none());
    assert_eq!(requests[1].cursor.as_ref().unwrap().as_str(), "tok-2");
    let mut first = requests[0].clone();
    first.cursor = requests[1].cursor.clone();
    assert_eq!(first, requests[1]);
}

#[tokio::test]
async fn resumes_from_persisted_watermark_with_inclusive_filter() {
    let backend = SqliteStateBackend::in_memory().unwrap();
    backend
        .set_watermark(
            &StreamName::new(STREAM_NAME),
            REPLICATION_KEY,
            "2025-06-01T12:00:00Z",
        )
        .unwrap();

    let transport = ScriptedTransport::new(vec![page(
        vec![
            // Boundary record re-fetched: inclusive gte duplicates, never drops.
            run_json("t-1", "2025-06-01T12:00:00Z"),
            run_json("t-2", "2025-06-01T12:30:00Z"),
        ],
        None,
    )]);
    // Config override present but lower priority than persisted state.
    let extractor = Extractor::new(
        config_with_start("2025-01-01T00:00:00Z"),
        &transport,
        &backend,
    )
    .unwrap();

    let mut sink = VecSink::new();
    extractor.run(&mut sink).await.unwrap();

    let requests = transport.requests();
    assert_eq!(
        requests[0].filter,
        "and(eq(is_root, true), gte(start_time, \"2025-06-01T12:00:00Z\"))"
    );

    // Nothing below the checkpoint is ever emitted.
    let floor = Watermark::parse("2025-06-01T12:00:00Z").unwrap();
    assert!(sink
        .records()
        .iter()
        .all(|r| r.watermark().unwrap() >= floor));
}

#[tokio::test]
async fn default_bookmark_is_lookback_window() {
    let transport = ScriptedTransport::new(vec![page(vec![], None)]);
    let backend = SqliteStateBackend::in_memory().unwrap();
    let extractor = Extractor::new(ExtractorConfig::new("key", "sess-1"), &transport, &backend)
        .unwrap();

    let mut sink = VecSink::new();
    extractor.run(&mut sink).await.unwrap();

    let filter = transport.requests()[0].filter.clone();
    let prefix = "and(eq(is_root, true), gte(start_time, \"";
    assert!(filter.starts_with(prefix), "got: {filter}");
    let rendered = &filter[prefix.len()..filter.len() - "\"))".len()];
    let bookmark = Watermark::parse(rendered).unwrap();

    let expected = chrono::Utc::now() - chrono::Duration::hours(36);
    let drift = (bookmark.as_datetime() - expected).num_seconds().abs();
    assert!(drift < 60, "bookmark {rendered} drifted {drift}s from now-36h");
}

#[tokio::test]
async fn malformed_record_fails_fast_by_default() {
    let transport = ScriptedTransport::new(vec![page(
        vec![
            run_json("t-1", "2025-06-01T12:00:00Z"),
            json!({"start_time": "2025-06-01T12:05:00Z"}), // no trace_id
            run_json("t-3", "2025-06-01T12:10:00Z"),
        ],
        None,
    )]);
    let backend = SqliteStateBackend::in_memory().unwrap();
    let extractor = Extractor::new(
        config_with_start("2025-06-01T00:00:00Z"),
        &transport,
        &backend,
    )
    .unwrap();

    let mut sink = VecSink::new();
    let err = extractor.run(&mut sink).await.unwrap_err();
    assert!(err.to_string().contains("missing required field 'trace_id'"));

    // The record before the bad one was emitted and checkpointed.
    assert_eq!(sink.records().len(), 1);
    assert_eq!(
        persisted_watermark(&backend).as_deref(),
        Some("2025-06-01T12:00:00Z")
    );
}

#[tokio::test]
async fn skip_policy_drops_malformed_and_continues() {
    let transport = ScriptedTransport::new(vec![page(
        vec![
            run_json("t-1", "2025-06-01T12:00:00Z"),
            json!({"start_time": "2025-06-01T12:05:00Z"}),
            run_json("t-3", "2025-06-01T12:10:00Z"),
        ],
        None,
    )]);
    let backend = SqliteStateBackend::in_memory().unwrap();
    let mut config = config_with_start("2025-06-01T00:00:00Z");
    config.on_malformed = MalformedPolicy::Skip;
    let extractor = Extractor::new(config, &transport, &backend).unwrap();

    let mut sink = VecSink::new();
    let summary = extractor.run(&mut sink).await.unwrap();

    assert_eq!(summary.records, 2);
    let ids: Vec<_> = sink.records().iter().map(|r| r.trace_id.as_str()).collect();
    assert_eq!(ids, ["t-1", "t-3"]);
    assert_eq!(
        persisted_watermark(&backend).as_deref(),
        Some("2025-06-01T12:10:00Z")
    );
}

#[tokio::test]
async fn transport_failure_keeps_last_processed_checkpoint() {
    let transport = ScriptedTransport::new(vec![
        page(
            vec![
                run_json("t-1", "2025-06-01T12:00:00Z"),
                run_json("t-2", "2025-06-01T12:05:00Z"),
            ],
            Some("tok-2"),
        ),
        Err(TransportError::Status {
            status: 503,
            body: "unavailable".into(),
        }),
    ]);
    let backend = SqliteStateBackend::in_memory().unwrap();
    let extractor = Extractor::new(
        config_with_start("2025-06-01T00:00:00Z"),
        &transport,
        &backend,
    )
    .unwrap();

    let mut sink = VecSink::new();
    let err = extractor.run(&mut sink).await.unwrap_err();
    assert!(err.to_string().starts_with("page fetch failed"));

    // Resume point is the last fully-processed record.
    assert_eq!(sink.records().len(), 2);
    assert_eq!(
        persisted_watermark(&backend).as_deref(),
        Some("2025-06-01T12:05:00Z")
    );
}

#[tokio::test]
async fn page_granularity_checkpoints_once_per_page() {
    let transport = ScriptedTransport::new(vec![
        page(
            vec![
                run_json("t-1", "2025-06-01T12:00:00Z"),
                run_json("t-2", "2025-06-01T12:05:00Z"),
            ],
            Some("tok-2"),
        ),
        page(vec![run_json("t-3", "2025-06-01T12:10:00Z")], None),
    ]);
    let backend = SqliteStateBackend::in_memory().unwrap();
    let mut config = config_with_start("2025-06-01T00:00:00Z");
    config.checkpoint = CheckpointGranularity::Page;
    let extractor = Extractor::new(config, &transport, &backend).unwrap();

    let mut sink = VecSink::new();
    let summary = extractor.run(&mut sink).await.unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(
        persisted_watermark(&backend).as_deref(),
        Some("2025-06-01T12:10:00Z")
    );
}

/// Backend that cannot record run history.
struct NoHistoryBackend;

impl StateBackend for NoHistoryBackend {
    fn get_watermark(
        &self,
        _stream: &StreamName,
        _replication_key: &str,
    ) -> Result<Option<WatermarkState>, StateError> {
        Ok(None)
    }

    fn set_watermark(
        &self,
        _stream: &StreamName,
        _replication_key: &str,
        _value: &str,
    ) -> Result<(), StateError> {
        Ok(())
    }

    fn start_run(&self, _stream: &StreamName) -> Result<i64, StateError> {
        Err(StateError::LockPoisoned)
    }

    fn complete_run(
        &self,
        _run_id: i64,
        _status: RunStatus,
        _stats: &RunStats,
    ) -> Result<(), StateError> {
        Ok(())
    }
}

#[tokio::test]
async fn start_run_failure_is_labeled_run_history() {
    let transport = ScriptedTransport::new(vec![]);
    let backend = NoHistoryBackend;
    let extractor = Extractor::new(
        config_with_start("2025-06-01T00:00:00Z"),
        &transport,
        &backend,
    )
    .unwrap();

    let err = extractor.run(&mut VecSink::new()).await.unwrap_err();
    assert!(
        err.to_string().starts_with("run history update failed"),
        "got: {err}"
    );
    // Fails before any page is requested.
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn rerun_after_completion_resumes_from_final_watermark() {
    let backend = SqliteStateBackend::in_memory().unwrap();

    let first = ScriptedTransport::new(vec![page(
        vec![run_json("t-1", "2025-06-01T12:00:00Z")],
        None,
    )]);
    let extractor = Extractor::new(
        config_with_start("2025-06-01T00:00:00Z"),
        &first,
        &backend,
    )
    .unwrap();
    extractor.run(&mut VecSink::new()).await.unwrap();

    let second = ScriptedTransport::new(vec![page(vec![], None)]);
    let extractor = Extractor::new(
        config_with_start("2025-06-01T00:00:00Z"),
        &second,
        &backend,
    )
    .unwrap();
    extractor.run(&mut VecSink::new()).await.unwrap();

    assert!(second.requests()[0]
        .filter
        .contains("gte(start_time, \"2025-06-01T12:00:00Z\")"));
}
