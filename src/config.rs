//! Configuration file handling.
//!
//! Config lives at `~/.davka/config.json`. Every field has a serde default
//! so a partial file (or none at all) still yields a working agent; the only
//! value without a sensible default is the sync endpoint, which the caller
//! must check before wiring the HTTP client.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Agent configuration, deserialized from `~/.davka/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch sync endpoint, e.g. "https://api.example.cz/api/sync/batch".
    pub sync_endpoint: String,
    /// Lightweight URL probed to detect connectivity.
    pub probe_url: String,
    /// Seconds between connectivity probes.
    pub probe_interval_secs: u64,
    /// Seconds between opportunistic sync passes when nothing else wakes
    /// the runner.
    pub sync_interval_secs: u64,
    /// Per-request timeout for the batch endpoint.
    pub request_timeout_secs: u64,
    /// Business-logic rejections tolerated before an entry is dropped.
    pub max_retries: u32,
    /// Override for the state directory (defaults to `~/.davka/state`).
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_endpoint: String::new(),
            probe_url: "https://www.gstatic.com/generate_204".to_string(),
            probe_interval_secs: 30,
            sync_interval_secs: 300,
            request_timeout_secs: 15,
            max_retries: 3,
            state_dir: None,
        }
    }
}

/// Canonical config file path (`~/.davka/config.json`).
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".davka").join("config.json"))
}

/// Resolve the state directory, creating it if missing.
pub fn state_dir(config: &Config) -> Result<PathBuf, String> {
    let dir = match &config.state_dir {
        Some(dir) => dir.clone(),
        None => {
            let home = dirs::home_dir().ok_or("Could not find home directory")?;
            home.join(".davka").join("state")
        }
    };
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create state dir: {}", e))?;
    }
    Ok(dir)
}

/// Load config from disk. A missing file yields defaults; a malformed file
/// is an error so a typo never silently reverts the agent to defaults.
pub fn load_config() -> Result<Config, String> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }
    let content =
        fs::read_to_string(&path).map_err(|e| format!("Failed to read config: {}", e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Write config to disk, creating `~/.davka/` on first run.
pub fn save_config(config: &Config) -> Result<(), String> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
    }
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))
}
