//! File persistence helpers.
//!
//! JSON files (configuration, fetch presets) are written atomically and
//! readable only by the owner, since presets may carry access tokens.

use pagetree_core::FetchOptions;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/PageTree`
/// - Linux: `~/.config/pagetree`
/// - Windows: `%APPDATA%\pagetree`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support").join("PageTree"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .map(|c| c.join("pagetree"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default data directory (node databases).
///
/// - Linux: `~/.local/share/pagetree`
/// - macOS: `~/Library/Application Support/PageTree`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("pagetree"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default preset directory.
pub fn default_preset_dir() -> PathBuf {
    default_config_dir().join("presets")
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets owner-only file permissions (0o600) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = tokio::fs::metadata(path).await?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0600", "Set restrictive permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Saves data to a JSON file.
///
/// Creates parent directories, writes atomically (temp file + rename) and
/// restricts permissions on Unix.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    set_restrictive_permissions(&temp_path).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;

    Ok(data)
}

/// Loads data from a JSON file, returning default if missing or invalid.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path).await {
        Ok(data) => data,
        Err(e) => {
            if !matches!(e, StoreError::Io(_)) {
                warn!(path = %path.display(), error = %e, "Failed to load, using defaults");
            }
            T::default()
        }
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Loads a fetch preset and checks it can start a run.
pub async fn load_preset(path: &Path) -> Result<FetchOptions, StoreError> {
    let options: FetchOptions = load_json(path).await?;
    options
        .validate()
        .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), module = %options.module, "Loaded preset");
    Ok(options)
}

/// Saves a fetch preset.
pub async fn save_preset(path: &Path, options: &FetchOptions) -> Result<(), StoreError> {
    save_json(path, options).await?;
    info!(path = %path.display(), module = %options.module, "Saved preset");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
