//! Errors for the local remote snapshot

use std::path::PathBuf;
use vstash_staging::StoreError;

/// Errors loading or saving the local remote
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// IO error on the snapshot file
    #[error("io error on {path}: {source}")]
    Io {
        /// Snapshot path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file cannot be decoded
    #[error("remote snapshot {path} is corrupt: {source}")]
    Corrupt {
        /// Snapshot path
        path: PathBuf,
        /// Decode failure
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot cannot be encoded
    #[error("cannot encode remote snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// Cross-process lock on the snapshot could not be taken
    #[error(transparent)]
    Lock(#[from] StoreError),
}

impl SnapshotError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
