//! File-backed key-value store with atomic writes.
//!
//! Each key maps to `{dir}/{key}.json`. Writes go through a uniquely named
//! temporary file in the same directory, are fsynced, then renamed over the
//! target, so a reader sees either the old value or the new one.
//!
//! Writers of a key take an exclusive `flock` on `{dir}/{key}.lock` (Unix).
//! The lock file is never deleted, so every writer locks the same inode.
//! Readers never take it.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write as IoWrite};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use stackshare_core::error::{Result, StackError};
use stackshare_core::storage::KeyValueStore;

/// [`KeyValueStore`] that keeps one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    const EXTENSION: &'static str = "json";

    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file backing `key`, rejecting keys that could escape `dir`.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StackError::invalid_input(format!(
                "invalid storage key '{}'",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.{}", key, Self::EXTENSION)))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                StackError::io(format!(
                    "Failed to create storage directory '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StackError::io(format!(
                "Failed to read '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        self.ensure_dir()?;

        let _lock = FileLock::acquire(&path)?;

        // Write to a temporary file in the same directory
        let mut tmp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            StackError::io(format!(
                "Failed to create temp file in '{}': {}",
                self.dir.display(),
                e
            ))
        })?;
        tmp_file.write_all(value)?;

        // Ensure data is written to disk
        tmp_file.as_file().sync_all()?;

        // Atomic rename; the temp file is removed if this fails
        tmp_file.persist(&path).map_err(|e| {
            StackError::io(format!("Failed to replace '{}': {}", path.display(), e.error))
        })?;

        tracing::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _lock = FileLock::acquire(&path)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StackError::io(format!(
                "Failed to remove '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Exclusive writer lock on `{key}.lock`, released when dropped.
struct FileLock {
    _file: File,
}

impl FileLock {
    /// Acquires an exclusive lock next to `path`, blocking until it is free.
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| StackError::io(format!("Failed to acquire lock: {}", e)))?;
        }

        // Closing the handle releases the lock; the file stays for the next writer.
        Ok(FileLock { _file: file })
    }
}
