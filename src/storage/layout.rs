//! Layout Persistence
//!
//! Stores one dashboard layout per user as `<user_id>.json` in a directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::layout::LayoutConfiguration;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{ensure_dir, ensure_layouts_dir};

/// File-backed store of dashboard layouts
#[derive(Debug, Clone)]
pub struct LayoutStore {
    dir: PathBuf,
}

impl LayoutStore {
    /// Store rooted at the default layouts directory
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            dir: ensure_layouts_dir()?,
        })
    }

    /// Store rooted at an explicit directory
    pub fn with_dir(dir: PathBuf) -> AppResult<Self> {
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> AppResult<PathBuf> {
        let safe = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && user_id != "."
            && user_id != "..";
        if !safe {
            return Err(AppError::validation(format!("invalid userId: '{}'", user_id)));
        }
        Ok(self.dir.join(format!("{}.json", user_id)))
    }

    /// Save a layout, stamping `updatedAt` (and `createdAt` on first save).
    /// Returns the stored record.
    pub fn save(&self, mut config: LayoutConfiguration, now_ms: i64) -> AppResult<LayoutConfiguration> {
        config.validate().map_err(AppError::validation)?;
        let path = self.path_for(&config.user_id)?;

        if config.created_at == 0 {
            config.created_at = now_ms;
        }
        config.updated_at = now_ms;

        let content = serde_json::to_string_pretty(&config)?;
        fs::write(&path, content)?;
        tracing::debug!(
            "[LayoutStore] Saved layout for {} ({} items)",
            config.user_id,
            config.items.len()
        );
        Ok(config)
    }

    /// Load a user's layout, `None` if nothing was saved
    pub fn load(&self, user_id: &str) -> AppResult<Option<LayoutConfiguration>> {
        let path = self.path_for(user_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let config: LayoutConfiguration = serde_json::from_str(&content)?;
        Ok(Some(config))
    }

    /// Load a user's layout or fall back to the default one
    pub fn load_or_default(&self, user_id: &str) -> AppResult<LayoutConfiguration> {
        Ok(self
            .load(user_id)?
            .unwrap_or_else(|| LayoutConfiguration::default_for(user_id)))
    }

    /// Delete a user's layout. Returns whether one existed.
    pub fn delete(&self, user_id: &str) -> AppResult<bool> {
        let path = self.path_for(user_id)?;
        if path.exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
