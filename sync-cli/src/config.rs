//! Scene document and sync configuration files for viewer-sync.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use viewer_sync_core::{Scene, SyncConfig};

/// Default scene document, relative to the working directory.
pub const DEFAULT_SCENE: &str = "viewer-sync.json";

/// Name of the per-user config file.
const CONFIG_FILE: &str = "viewer-sync.toml";

/// Load a scene document.
pub fn load_scene(path: &Path) -> Result<Scene> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!(
            "No scene at {}. Run 'viewer-sync init' first.",
            path.display()
        )
    })?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid scene document {}", path.display()))
}

/// Save a scene document.
pub fn save_scene(scene: &Scene, path: &Path) -> Result<()> {
    let contents = serde_json::to_string_pretty(scene)?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to save scene {}", path.display()))
}

/// Load the sync configuration.
///
/// An explicit path must exist. Without one the per-user config file is
/// used when present, otherwise the built-in defaults.
pub fn load_sync_config(explicit: Option<&Path>) -> Result<SyncConfig> {
    if let Some(path) = explicit {
        return SyncConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    match user_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Using config {}", path.display());
            SyncConfig::load(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        _ => Ok(SyncConfig::default()),
    }
}

/// Where the per-user config file lives, if a home directory is known.
fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "viewer-sync", "viewer-sync")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
