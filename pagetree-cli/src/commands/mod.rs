//! CLI command implementations.

pub mod config;
pub mod delete;
pub mod extract;
pub mod fetch;
pub mod init;
pub mod modules;
pub mod seed;
pub mod tree;

use anyhow::{Context, Result};
use pagetree_store::{AppConfig, TreeStore};
use std::path::PathBuf;

use crate::Cli;

/// Returns the configuration file the command should use.
pub fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(AppConfig::default_path)
}

/// Loads the configuration, falling back to defaults when the file is missing.
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = config_path(cli);
    AppConfig::load_from(&path).with_context(|| format!("loading {}", path.display()))
}

/// Returns the database file the command should use.
pub fn database_path(cli: &Cli, config: &AppConfig) -> PathBuf {
    cli.db.clone().unwrap_or_else(|| config.general.database.clone())
}

/// Opens the node database, creating it if needed.
pub fn open_store(cli: &Cli, config: &AppConfig) -> Result<TreeStore> {
    let path = database_path(cli, config);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    TreeStore::open(&path).with_context(|| format!("opening {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nested").join("crawl.db");
        let config = dir.path().join("config.json");
        let cli = Cli::parse_from([
            "pagetree",
            "--db",
            db.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "modules",
        ]);

        let loaded = load_config(&cli).unwrap();
        assert_eq!(loaded, AppConfig::default());
        assert_eq!(database_path(&cli, &loaded), db);

        let store = open_store(&cli, &loaded).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(db.exists());
    }

    #[test]
    fn test_database_falls_back_to_config() {
        let cli = Cli::parse_from(["pagetree", "modules"]);
        let mut config = AppConfig::default();
        config.general.database = PathBuf::from("/tmp/elsewhere.db");
        assert_eq!(database_path(&cli, &config), PathBuf::from("/tmp/elsewhere.db"));
    }
}
