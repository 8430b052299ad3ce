//! Configuration service implementation.
//!
//! Loads [`StackshareConfig`] from `config.toml` (see [`StackPaths`]) and
//! caches it. A missing file yields the defaults; a malformed one is an error
//! so a typo never silently reverts settings.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use stackshare_core::config::StackshareConfig;
use stackshare_core::error::{Result, StackError};

use crate::paths::StackPaths;

/// Configuration service that loads and caches the configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: StackPaths,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<StackshareConfig>>>,
}

impl ConfigService {
    pub fn new(paths: StackPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service that reads a specific file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self::new(StackPaths::new().with_config_file(path))
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<StackshareConfig> {
        {
            let read_lock = self
                .config
                .read()
                .map_err(|e| StackError::internal(format!("config cache poisoned: {}", e)))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        {
            let mut write_lock = self
                .config
                .write()
                .map_err(|e| StackError::internal(format!("config cache poisoned: {}", e)))?;
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    fn load_config(&self) -> Result<StackshareConfig> {
        let path = self.paths.config_file()?;
        if !path.exists() {
            tracing::debug!("No config at {}; using defaults", path.display());
            return Ok(StackshareConfig::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            StackError::io(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            StackError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(StackPaths::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));
        assert_eq!(service.get_config().unwrap(), StackshareConfig::default());
    }

    #[test]
    fn test_loads_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[share]\nbase_url = \"https://example.test/s\"\n").unwrap();

        let service = ConfigService::with_path(&path);
        assert_eq!(
            service.get_config().unwrap().share.base_url,
            "https://example.test/s"
        );

        fs::write(&path, "[share]\nbase_url = \"https://changed.test/s\"\n").unwrap();
        assert_eq!(
            service.get_config().unwrap().share.base_url,
            "https://example.test/s"
        );

        service.invalidate_cache();
        assert_eq!(
            service.get_config().unwrap().share.base_url,
            "https://changed.test/s"
        );
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[share\nbroken").unwrap();

        let err = ConfigService::with_path(&path).get_config().unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }
}
