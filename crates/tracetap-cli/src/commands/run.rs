use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracetap_engine::{Extractor, HttpTransport};
use tracetap_state::SqliteStateBackend;

use crate::config;
use crate::sink::JsonLinesSink;

/// Execute the `run` command: extract records and print a summary.
pub async fn execute(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let config = config::parse_config(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    let backend = SqliteStateBackend::open(&config.state_path)
        .with_context(|| format!("Failed to open state db: {}", config.state_path.display()))?;
    let transport = HttpTransport::new(&config.extractor.base_url, &config.extractor.api_key);

    tracing::info!(
        session_id = config.extractor.session_id,
        page_size = config.extractor.page_size,
        state = %config.state_path.display(),
        "Starting extraction run"
    );

    let extractor = Extractor::new(config.extractor, &transport, &backend)?;

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = JsonLinesSink::new(writer);

    let summary = extractor.run(&mut sink).await?;
    sink.flush()?;

    eprintln!("Extraction completed.");
    eprintln!("  Records emitted: {}", summary.records);
    eprintln!("  Pages fetched:   {}", summary.pages);
    match summary.last_watermark {
        Some(w) => eprintln!("  Watermark:       {w}"),
        None => eprintln!("  Watermark:       (unchanged, no records)"),
    }
    eprintln!("  Duration:        {:.2}s", summary.duration_secs);
    if summary.records > 0 && summary.duration_secs > 0.0 {
        eprintln!(
            "  Throughput:      {:.0} records/sec",
            summary.records as f64 / summary.duration_secs
        );
    }

    Ok(())
}
