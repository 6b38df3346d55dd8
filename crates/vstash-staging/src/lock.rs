//! Cross-process advisory lock on a sibling lock file
//!
//! Acquisition blocks until the lock is free; there is no timeout. The lock
//! is released when the guard is dropped, on every exit path.

use crate::error::StoreError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock held for the guard's lifetime
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the exclusive lock on `path` is held
    ///
    /// Creates the lock file (and its parent directory) if needed.
    ///
    /// # Errors
    /// `StoreError::Io` if the lock file cannot be opened,
    /// `StoreError::Lock` if locking fails
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io_error(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StoreError::io_error(path, e))?;

        tracing::debug!(path = %path.display(), "waiting for file lock");
        FileExt::lock_exclusive(&file).map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "file lock acquired");

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Lock file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release file lock");
        }
    }
}
