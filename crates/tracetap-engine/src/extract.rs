//! Extraction orchestrator.
//!
//! Composes bookmark resolution, filter construction, pagination, and
//! projection into one sequential run: records flow to the sink in API
//! order while the watermark advances behind them. A cancelled or
//! failed run resumes from the last checkpointed watermark; the
//! inclusive filter boundary means replay duplicates, never drops.

use std::time::Instant;

use tokio::time::{sleep, Duration};
use tracetap_state::model::{RunStats, RunStatus, StreamName};
use tracetap_state::StateBackend;
use tracetap_types::watermark::Watermark;

use crate::bookmark::{BookmarkResolver, RunContext};
use crate::config::{CheckpointGranularity, ExtractorConfig, MalformedPolicy};
use crate::cursor::Paginator;
use crate::error::{ExtractError, Result};
use crate::filter;
use crate::project::project;
use crate::sink::RecordSink;
use crate::transport::PageTransport;
use crate::{REPLICATION_KEY, STREAM_NAME};

/// Outcome of one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Records emitted to the sink.
    pub records: u64,
    /// Pages fetched from the API.
    pub pages: u64,
    /// Highest watermark observed and persisted, if any record arrived.
    pub last_watermark: Option<Watermark>,
    /// Wall-clock duration of the run.
    pub duration_secs: f64,
}

/// Mutable counters threaded through a run so failures still report
/// how far they got.
#[derive(Debug, Default)]
struct Progress {
    records: u64,
    pages: u64,
    last_watermark: Option<Watermark>,
}

/// Drives one stream's extraction from resolved bookmark to exhaustion.
pub struct Extractor<'a, T: PageTransport> {
    config: ExtractorConfig,
    transport: &'a T,
    state: &'a dyn StateBackend,
}

impl<'a, T: PageTransport> Extractor<'a, T> {
    /// Build an extractor, validating the config up front.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Config`] for missing required keys or an
    /// out-of-range page size.
    pub fn new(
        config: ExtractorConfig,
        transport: &'a T,
        state: &'a dyn StateBackend,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            state,
        })
    }

    /// Run one extraction to exhaustion, writing every record to `sink`.
    ///
    /// Not restartable mid-run: re-invoke with fresh state to resume
    /// from the last checkpoint.
    ///
    /// # Errors
    ///
    /// Returns the stage-labeled [`ExtractError`] that terminated the
    /// run. Run history is finalized either way.
    pub async fn run<S: RecordSink>(&self, sink: &mut S) -> Result<RunSummary> {
        let stream = StreamName::new(STREAM_NAME);
        let started = Instant::now();
        let run_id = self
            .state
            .start_run(&stream)
            .map_err(ExtractError::RunHistory)?;

        let mut progress = Progress::default();
        let outcome = self.run_inner(sink, &stream, &mut progress).await;

        let stats = RunStats {
            records_emitted: progress.records,
            pages_fetched: progress.pages,
            error_message: outcome.as_ref().err().map(ToString::to_string),
        };
        let status = if outcome.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        if let Err(state_err) = self.state.complete_run(run_id, status, &stats) {
            // The run's own outcome is the one worth surfacing.
            tracing::warn!(error = %state_err, run_id, "Failed to finalize run history");
        }

        outcome?;
        Ok(RunSummary {
            records: progress.records,
            pages: progress.pages,
            last_watermark: progress.last_watermark,
            duration_secs: started.elapsed().as_secs_f64(),
        })
    }

    async fn run_inner<S: RecordSink>(
        &self,
        sink: &mut S,
        stream: &StreamName,
        progress: &mut Progress,
    ) -> Result<()> {
        let mut ctx = RunContext::new();
        let resolver = BookmarkResolver::new(&self.config, self.state);
        let watermark = resolver.resolve(&mut ctx)?;
        tracing::info!(watermark = %watermark, stream = %stream, "Starting extraction");

        // Filter, page size, and field selection are fixed from here;
        // pagination only ever swaps the continuation token.
        let template = filter::build_page_request(&self.config, Some(&watermark));
        let mut paginator = Paginator::new(self.transport, template);

        while let Some(raw_records) = paginator.next_page().await? {
            progress.pages = paginator.pages_fetched();

            for raw in raw_records {
                let record = match project(raw) {
                    Ok(record) => record,
                    Err(err) => {
                        self.handle_malformed(err)?;
                        continue;
                    }
                };
                let record_watermark = match record.watermark() {
                    Ok(w) => w,
                    Err(err) => {
                        self.handle_malformed(ExtractError::Projection(format!(
                            "invalid replication key value: {err}"
                        )))?;
                        continue;
                    }
                };

                sink.write(&record).map_err(ExtractError::Sink)?;
                progress.records += 1;
                self.advance_watermark(stream, progress, record_watermark)?;
            }

            if self.config.checkpoint == CheckpointGranularity::Page {
                if let Some(w) = progress.last_watermark {
                    self.state
                        .set_watermark(stream, REPLICATION_KEY, &w.canonical())?;
                }
            }

            if self.config.throttle_ms > 0 && !paginator.is_done() {
                sleep(Duration::from_millis(self.config.throttle_ms)).await;
            }
        }

        tracing::info!(
            records = progress.records,
            pages = progress.pages,
            "Extraction complete"
        );
        Ok(())
    }

    /// Advance the run watermark, monotonically non-decreasing.
    ///
    /// Ascending source ordering makes a backwards replication key an
    /// API anomaly; it is logged and the checkpoint holds its ground.
    fn advance_watermark(
        &self,
        stream: &StreamName,
        progress: &mut Progress,
        observed: Watermark,
    ) -> Result<()> {
        match progress.last_watermark {
            Some(current) if observed < current => {
                tracing::warn!(
                    observed = %observed,
                    current = %current,
                    "Replication key went backwards, keeping current watermark"
                );
                return Ok(());
            }
            _ => progress.last_watermark = Some(observed),
        }
        if self.config.checkpoint == CheckpointGranularity::Record {
            self.state
                .set_watermark(stream, REPLICATION_KEY, &observed.canonical())?;
        }
        Ok(())
    }

    /// Apply the configured malformed-record policy.
    fn handle_malformed(&self, err: ExtractError) -> Result<()> {
        match self.config.on_malformed {
            MalformedPolicy::Fail => Err(err),
            MalformedPolicy::Skip => {
                tracing::warn!(error = %err, "Skipping malformed record");
                Ok(())
            }
        }
    }
}
