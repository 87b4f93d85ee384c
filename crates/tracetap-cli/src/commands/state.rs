use std::path::Path;

use anyhow::{Context, Result};
use tracetap_engine::{REPLICATION_KEY, STREAM_NAME};
use tracetap_state::model::StreamName;
use tracetap_state::{SqliteStateBackend, StateBackend};

use crate::config;

/// Execute the `state` command: show the persisted watermark.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = config::parse_config(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    let backend = SqliteStateBackend::open(&config.state_path)
        .with_context(|| format!("Failed to open state db: {}", config.state_path.display()))?;

    match backend.get_watermark(&StreamName::new(STREAM_NAME), REPLICATION_KEY)? {
        Some(state) => {
            println!("stream:          {STREAM_NAME}");
            println!("replication_key: {}", state.replication_key);
            println!("watermark:       {}", state.value);
            println!("updated_at:      {}", state.updated_at);
        }
        None => println!("No watermark persisted for stream '{STREAM_NAME}'."),
    }

    Ok(())
}
