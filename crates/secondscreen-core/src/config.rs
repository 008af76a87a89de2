//! Configuration resolution for SecondScreen.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/secondscreen/settings.json`)
//! 3. Project config (`.secondscreen/settings.json`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! Config files may be partial: only the keys they name override the layer
//! below.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secondscreen_proto::methods::DEFAULT_ROUTER_NAME;

use crate::error::{Error, Result};

/// Complete SecondScreen configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Presentation manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Router name used when a caller omits one.
    pub default_router_name: String,
    /// Well-known entrypoint started in every new execution context.
    pub entrypoint: String,
    /// Upper bound for constructing and starting one execution context.
    pub context_start_timeout_ms: u64,
    /// Capacity of the readiness channel from surfaces back to the manager.
    pub ready_channel_capacity: usize,
    /// Capacity of the outbound notification channel.
    pub notification_capacity: usize,
    /// Buffered display events per subscriber before new ones are dropped.
    pub event_buffer: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            default_router_name: DEFAULT_ROUTER_NAME.to_string(),
            entrypoint: "secondaryDisplayMain".to_string(),
            context_start_timeout_ms: 5_000,
            ready_channel_capacity: 32,
            notification_capacity: 64,
            event_buffer: 64,
        }
    }
}

impl PresentationConfig {
    pub const fn context_start_timeout(&self) -> Duration {
        Duration::from_millis(self.context_start_timeout_ms)
    }
}

/// Daemon-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub log_level: String,
    pub log_json: bool,
    /// External displays the simulated platform starts with.
    pub simulated_displays: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            simulated_displays: 1,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut layered = serde_json::to_value(Config::default())?;

    if let Some(global_path) = global_config_path()
        && global_path.exists()
    {
        merge_json(&mut layered, read_config_value(&global_path)?);
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".secondscreen").join("settings.json");
        if project_path.exists() {
            merge_json(&mut layered, read_config_value(&project_path)?);
        }
    }

    let mut config: Config = serde_json::from_value(layered)
        .map_err(|e| Error::Config(format!("Invalid merged configuration: {e}")))?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load a single config file layered over the built-in defaults.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let mut layered = serde_json::to_value(Config::default())?;
    merge_json(&mut layered, read_config_value(path)?);
    serde_json::from_value(layered).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("secondscreen").join("settings.json"))
}

fn read_config_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Recursively overlay `overlay` onto `base`; objects merge, everything else replaces.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `SECONDSCREEN_*` overrides read through `lookup`.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("SECONDSCREEN_LOG_LEVEL") {
        config.daemon.log_level = val;
    }
    if let Some(val) = lookup("SECONDSCREEN_LOG_JSON") {
        config.daemon.log_json = matches!(val.as_str(), "1" | "true" | "yes");
    }
    if let Some(n) = lookup("SECONDSCREEN_SIMULATED_DISPLAYS").and_then(|v| v.parse().ok()) {
        config.daemon.simulated_displays = n;
    }
    if let Some(val) = lookup("SECONDSCREEN_DEFAULT_ROUTER") {
        config.presentation.default_router_name = val;
    }
    if let Some(val) = lookup("SECONDSCREEN_ENTRYPOINT") {
        config.presentation.entrypoint = val;
    }
    if let Some(n) = lookup("SECONDSCREEN_CONTEXT_START_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.presentation.context_start_timeout_ms = n;
    }
}
