//! Station hardware configuration (`config.json`).
//!
//! The scanner setup utility writes `scanner_com_port`; everything else has
//! defaults so a file holding only that key still loads.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollSettings {
    pub weight_poll_ms: u64,
    pub scanner_poll_ms: u64,
    pub status_check_secs: u64,
    pub query_timeout_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            weight_poll_ms: 500,
            scanner_poll_ms: 100,
            status_check_secs: 10,
            query_timeout_ms: 2000,
        }
    }
}

impl PollSettings {
    pub fn weight_interval(&self) -> Duration {
        Duration::from_millis(self.weight_poll_ms)
    }

    pub fn scanner_interval(&self) -> Duration {
        Duration::from_millis(self.scanner_poll_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_check_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HardwareConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_com_port: Option<String>,
    #[serde(default)]
    pub polling: PollSettings,
}

impl HardwareConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        log::debug!("Loaded hardware config from {}", path.display());
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Saved hardware config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_file_with_only_scanner_port() {
        let config: HardwareConfig = serde_json::from_str(r#"{"scanner_com_port": "COM7"}"#).unwrap();
        assert_eq!(config.scanner_com_port.as_deref(), Some("COM7"));
        assert_eq!(config.polling, PollSettings::default());
    }

    #[test]
    fn partial_polling_section_keeps_other_defaults() {
        let config: HardwareConfig =
            serde_json::from_str(r#"{"polling": {"weight_poll_ms": 250}}"#).unwrap();
        assert_eq!(config.polling.weight_interval(), Duration::from_millis(250));
        assert_eq!(config.polling.status_interval(), Duration::from_secs(10));
        assert!(config.scanner_com_port.is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = HardwareConfig {
            scanner_com_port: Some("/dev/rfcomm0".to_string()),
            ..HardwareConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(HardwareConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HardwareConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, HardwareConfig::default());
        assert!(HardwareConfig::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(HardwareConfig::load_or_default(&path), Err(ConfigError::ParseError(_))));
    }
}
