//! Configuration management for brook.
//!
//! Configuration is read from `~/.config/brook/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{de, Deserialize, Deserializer};

use crate::daemon::{format_interval, parse_interval};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub reader: ReaderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the feed service API.
    pub api_url: String,
    pub api_token: Option<String>,
    /// Minimum time between two manual sync attempts.
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_interval")]
    pub background_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api/".to_string(),
            api_token: None,
            debounce_ms: 500,
            request_timeout_secs: 10,
            background_interval: Duration::from_secs(30 * 60),
        }
    }
}

impl SyncConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// How long an article must stay open before it is marked read.
    pub mark_read_delay_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            mark_read_delay_ms: 2000,
        }
    }
}

impl ReaderConfig {
    pub fn mark_read_delay(&self) -> Duration {
        Duration::from_millis(self.mark_read_delay_ms)
    }
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_interval(&s)
        .map(Duration::from_secs)
        .map_err(de::Error::custom)
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/brook/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("brook").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        let defaults = SyncConfig::default();
        format!(
            r##"# brook configuration

[sync]
# Base URL of the feed service API
api_url = "{api_url}"

# Bearer token sent with every request (optional)
# api_token = ""

# Minimum time between two manual syncs (milliseconds)
debounce_ms = {debounce_ms}

# HTTP request timeout (seconds)
request_timeout_secs = {timeout}

# How often `brook watch` syncs in the background ("45s", "30m", "1h", "1d")
background_interval = "{interval}"

[reader]
# Time an article must stay open before it is marked as read (milliseconds)
mark_read_delay_ms = {delay}
"##,
            api_url = defaults.api_url,
            debounce_ms = defaults.debounce_ms,
            timeout = defaults.request_timeout_secs,
            interval = format_interval(defaults.background_interval.as_secs()),
            delay = ReaderConfig::default().mark_read_delay_ms,
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.sync.api_url, "http://localhost:8080/api/");
        assert_eq!(config.sync.debounce_window(), Duration::from_millis(500));
        assert_eq!(config.sync.background_interval, Duration::from_secs(1800));
        assert_eq!(config.reader.mark_read_delay(), Duration::from_millis(2000));
        assert!(config.sync.api_token.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r#"
[sync]
api_url = "https://feeds.example.com/api/v1/"
background_interval = "1h"
"#;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.sync.api_url, "https://feeds.example.com/api/v1/");
        assert_eq!(config.sync.background_interval, Duration::from_secs(3600));
        // Defaults
        assert_eq!(config.sync.debounce_ms, 500);
        assert_eq!(config.reader.mark_read_delay_ms, 2000);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.sync.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let content = r#"
[sync]
background_interval = "soon"
"#;
        assert_err!(toml::from_str::<Config>(content));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brook").join("config.toml");

        let config = assert_ok!(Config::load_from(&path));
        assert!(path.exists());
        assert_eq!(config.sync.debounce_ms, 500);

        let reloaded = assert_ok!(Config::load_from(&path));
        assert_eq!(reloaded.sync.api_url, config.sync.api_url);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync\napi_url = ").unwrap();

        let err = assert_err!(Config::load_from(&path));
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
