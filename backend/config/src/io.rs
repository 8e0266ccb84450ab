//! Config file location and loading.

use crate::schema::PinforgeConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the pinforge config directory.
/// Priority: `PINFORGE_CONFIG_DIR` env > `~/.pinforge/` > `./.pinforge`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PINFORGE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".pinforge"))
        .unwrap_or_else(|| PathBuf::from(".pinforge"))
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<PinforgeConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(PinforgeConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse YAML text; an empty document yields the default config.
pub fn parse_config(raw: &str) -> Result<PinforgeConfig> {
    if raw.trim().is_empty() {
        return Ok(PinforgeConfig::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}
