//! Downstream sink boundary.
//!
//! The engine hands every projected record to a [`RecordSink`]; what
//! happens to it after that (stdout, files, a warehouse loader) is the
//! consumer's business.

use tracetap_types::record::RunRecord;

/// Consumer of the normalized record stream.
pub trait RecordSink {
    /// Accept one record, in emission order.
    ///
    /// # Errors
    ///
    /// Any error is fatal for the run; the watermark stays at the last
    /// record that was both written and checkpointed.
    fn write(&mut self, record: &RunRecord) -> anyhow::Result<()>;
}

/// Sink that buffers records in memory. Useful for tests and probes.
#[derive(Debug, Default)]
pub struct VecSink {
    records: Vec<RunRecord>,
}

impl VecSink {
    /// Empty buffer sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records collected so far, in emission order.
    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }
}

impl RecordSink for VecSink {
    fn write(&mut self, record: &RunRecord) -> anyhow::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
