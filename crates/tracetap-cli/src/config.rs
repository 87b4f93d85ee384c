//! Extractor YAML config parsing with environment variable substitution.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracetap_engine::ExtractorConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// CLI-level configuration: the extractor config plus local concerns.
#[derive(Debug, Deserialize)]
pub struct CliConfig {
    /// Engine configuration (api_key, session_id, paging, policies).
    #[serde(flatten)]
    pub extractor: ExtractorConfig,
    /// Where the SQLite state database lives.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".tracetap/state.db")
}

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// Lets the config file reference `${LANGSMITH_API_KEY}` instead of
/// embedding the secret.
///
/// # Errors
///
/// Returns an error if any referenced environment variable is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                missing.push(var_name.to_string());
            }
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result)
}

/// Parse a config YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_config_str(yaml_str: &str) -> Result<CliConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: CliConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse extractor config YAML")?;
    Ok(config)
}

/// Parse a config YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_config(path: &Path) -> Result<CliConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
}
