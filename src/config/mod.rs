//! Configuration module for searchable-rs
//!
//! Handles loading settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing::info;

/// Global settings instance
static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Initialize global settings
pub fn init(settings: Settings) -> Result<&'static Settings> {
    SETTINGS
        .set(settings)
        .map_err(|_| anyhow::anyhow!("Settings already initialized"))?;
    get().ok_or_else(|| anyhow::anyhow!("Settings not initialized"))
}

/// Get a reference to the global settings
pub fn get() -> Option<&'static Settings> {
    SETTINGS.get()
}

/// Candidate settings file locations, in lookup order
pub fn settings_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(path) = std::env::var("SEARCHABLE_SETTINGS_PATH") {
        paths.push(PathBuf::from(path));
    }

    paths.push(PathBuf::from("settings.yml"));
    paths.push(PathBuf::from("config/settings.yml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("searchable-rs").join("settings.yml"));
    }

    paths
}

/// Load settings from the first file found, falling back to defaults.
///
/// Environment overrides are applied last.
pub fn load() -> Result<Settings> {
    let mut settings = match settings_paths().into_iter().find(|p| p.exists()) {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };

    settings.merge_env();
    Ok(settings)
}
