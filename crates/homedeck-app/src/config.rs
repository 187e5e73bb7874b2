//! Plugin configuration (`homedeck.toml`).
//!
//! The file is optional. A missing file gives the defaults; a file that
//! cannot be read or parsed is logged and also gives the defaults, so a bad
//! edit never keeps the plugin from starting.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use homedeck_cloud::DEFAULT_BASE_URL;
use homedeck_core::logging::DEFAULT_FILTER;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "homedeck.toml";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const MIN_POLL_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub api: ApiSettings,
    pub polling: PollingSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Overall request timeout. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl PollingSettings {
    /// Poll period, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    /// `EnvFilter` directives; `HOMEDECK_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("log"),
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

/// Load the configuration at `path`, falling back to defaults.
///
/// Called before logging is initialized, so problems are returned as a
/// warning message for the caller to log once the subscriber is up.
pub fn load_config(path: &Path) -> (PluginConfig, Option<String>) {
    if !path.exists() {
        return (PluginConfig::default(), None);
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => (config, None),
            Err(e) => (
                PluginConfig::default(),
                Some(format!("Failed to parse {}: {}", path.display(), e)),
            ),
        },
        Err(e) => (
            PluginConfig::default(),
            Some(format!("Failed to read {}: {}", path.display(), e)),
        ),
    }
}
