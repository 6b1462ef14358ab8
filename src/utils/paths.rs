//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.
//! Everything lives under `~/.insight-desk/`.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Insight Desk directory (~/.insight-desk/)
pub fn insight_desk_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".insight-desk"))
}

/// Get the config file path (~/.insight-desk/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(insight_desk_dir()?.join("config.json"))
}

/// Get the dashboard layouts directory (~/.insight-desk/layouts/)
pub fn layouts_dir() -> AppResult<PathBuf> {
    Ok(insight_desk_dir()?.join("layouts"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Insight Desk directory, creating if it doesn't exist
pub fn ensure_insight_desk_dir() -> AppResult<PathBuf> {
    let path = insight_desk_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Get the layouts directory, creating if it doesn't exist
pub fn ensure_layouts_dir() -> AppResult<PathBuf> {
    let path = layouts_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
