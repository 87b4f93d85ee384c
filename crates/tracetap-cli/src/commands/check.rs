use std::path::Path;

use anyhow::{Context, Result};
use tracetap_engine::transport::PageTransport;
use tracetap_engine::{filter, HttpTransport, REPLICATION_KEY, STREAM_NAME};
use tracetap_state::model::StreamName;
use tracetap_state::{SqliteStateBackend, StateBackend};

use crate::config;

/// Execute the `check` command: validate config, state, and API reachability.
pub async fn execute(config_path: &Path) -> Result<()> {
    let config = config::parse_config(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    config.extractor.validate()?;
    println!("Config:            OK");

    let backend = SqliteStateBackend::open(&config.state_path)
        .with_context(|| format!("Failed to open state db: {}", config.state_path.display()))?;
    match backend.get_watermark(&StreamName::new(STREAM_NAME), REPLICATION_KEY)? {
        Some(state) => println!("State backend:     OK (watermark {})", state.value),
        None => println!("State backend:     OK (no watermark persisted)"),
    }

    // One-record probe against the real endpoint, base filter only.
    let transport = HttpTransport::new(&config.extractor.base_url, &config.extractor.api_key);
    let mut probe = filter::build_page_request(&config.extractor, None);
    probe.limit = 1;
    let response = transport
        .fetch_page(&probe)
        .await
        .context("API connectivity check failed")?;
    println!(
        "API connectivity:  OK ({} record(s) on probe page)",
        response.runs.len()
    );

    println!("\nAll checks passed.");
    Ok(())
}
