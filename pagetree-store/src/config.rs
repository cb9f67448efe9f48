//! Configuration management.

use pagetree_core::FetchOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_config_dir, default_data_dir};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Options used by `fetch` when no preset is given.
    #[serde(default)]
    pub fetch: FetchOptions,
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Node database used when none is given on the command line.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Extra PEM root certificate trusted for HTTPS.
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,
}

fn default_database() -> PathBuf {
    default_data_dir().join("pagetree.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            log_level: default_log_level(),
            ca_bundle: None,
        }
    }
}

impl AppConfig {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.json")
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config
            .fetch
            .validate()
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.general.database.ends_with("pagetree.db"));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"general": {"log_level": "debug"}, "fetch": {"threads": 8}}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(config.general.ca_bundle.is_none());
        assert_eq!(config.fetch.threads, 8);
        assert_eq!(config.fetch.module, "generic");
    }

    #[test]
    fn test_invalid_fetch_defaults_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"fetch": {"threads": 99}}"#).unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.general.ca_bundle = Some(PathBuf::from("/etc/ssl/extra.pem"));
        config.fetch.requests_per_minute = 30;
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }
}
