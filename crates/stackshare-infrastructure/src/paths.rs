//! Path management for stackshare files.
//!
//! Paths are resolved via AppPaths from the version-migrate crate, with
//! explicit overrides for the CLI flags and for tests.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/stackshare/        # Config directory
//! └── config.toml              # StackshareConfig
//!
//! ~/.local/share/stackshare/   # Data directory
//! └── stack-state.json         # Durable store record
//! ```

use std::path::PathBuf;

use version_migrate::AppPaths;

use stackshare_core::error::{Result, StackError};

const APP_NAME: &str = "stackshare";

/// Resolved locations for config and data.
#[derive(Debug, Clone, Default)]
pub struct StackPaths {
    data_dir_override: Option<PathBuf>,
    config_file_override: Option<PathBuf>,
}

impl StackPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores data under `dir` instead of the platform data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir_override = Some(dir.into());
        self
    }

    /// Reads configuration from `path` instead of `<config_dir>/config.toml`.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file_override = Some(path.into());
        self
    }

    fn app_paths() -> AppPaths {
        AppPaths::new(APP_NAME)
    }

    pub fn config_dir(&self) -> Result<PathBuf> {
        Self::app_paths()
            .config_dir()
            .map_err(|e| StackError::config(format!("Cannot resolve config directory: {}", e)))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir_override {
            return Ok(dir.clone());
        }
        Self::app_paths()
            .data_dir()
            .map_err(|e| StackError::config(format!("Cannot resolve data directory: {}", e)))
    }

    pub fn config_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config_file_override {
            return Ok(path.clone());
        }
        Ok(self.config_dir()?.join("config.toml"))
    }
}
