//! JSON-lines record sink.

use std::io::Write;

use anyhow::{Context, Result};
use tracetap_engine::RecordSink;
use tracetap_types::record::RunRecord;

/// Writes one JSON object per line to any [`Write`] target.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails to flush.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush record sink")
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write(&mut self, record: &RunRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .context("Failed to serialize record")?;
        self.writer
            .write_all(b"\n")
            .context("Failed to write record")?;
        Ok(())
    }
}
