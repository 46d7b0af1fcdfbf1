//! Persisted host settings (`config/livechat-replay.json`).
//!
//! Loads and saves the user's configuration with defaults for anything
//! missing.  The API key is deliberately not part of it; the host reads it
//! from the command line or the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::EventMap;

/// Default polling interval in milliseconds.
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 5000;

/// Default chat line template.
pub const DEFAULT_CHAT_FORMAT: &str = "%author%: %message%";

/// Intervals below this risk exhausting the API quota.
pub const SAFE_INTERVAL_FLOOR: Duration = Duration::from_secs(5);

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`AppConfig`]
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Config could not be rendered as JSON
    #[error("failed to serialize config: {0}")]
    Serialize(serde_json::Error),

    /// Failed to write config file
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Video whose live chat is polled.
    pub video_id: Option<String>,
    /// Interval used until the origin advises one.
    pub polling_interval_ms: u64,
    /// Template for chat lines.
    pub chat_format: String,
    /// Whether released chat is shown at all.
    pub show_chat: bool,
    /// Actions triggered per event type.
    pub event_mappings: EventMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            video_id: None,
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
            chat_format: DEFAULT_CHAT_FORMAT.to_string(),
            show_chat: true,
            event_mappings: EventMap::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(write_err)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// Warning to show when the interval is below [`SAFE_INTERVAL_FLOOR`].
    pub fn interval_warning(&self) -> Option<String> {
        (self.polling_interval() < SAFE_INTERVAL_FLOOR).then(|| {
            format!(
                "polling interval {}ms is below {}s and may exceed the API quota",
                self.polling_interval_ms,
                SAFE_INTERVAL_FLOOR.as_secs()
            )
        })
    }
}

/// Default location of the config file, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config").join("livechat-replay.json")
}
