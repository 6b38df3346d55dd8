//! Error types for the staging store

use crate::entry::Namespace;
use std::path::PathBuf;

/// Errors from staging store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing staged under this key
    #[error("{namespace} {name} is not staged")]
    NotStaged {
        /// Namespace looked in
        namespace: Namespace,
        /// Resource name
        name: String,
    },

    /// Staging file exists but cannot be decoded
    #[error("staging file {path} is corrupt: {source}")]
    Corrupt {
        /// Staging file path
        path: PathBuf,
        /// Decode failure
        #[source]
        source: serde_json::Error,
    },

    /// Staging file written by a newer schema
    #[error("staging file {path} has unsupported schema version {found} (supported: {supported})")]
    UnsupportedSchema {
        /// Staging file path
        path: PathBuf,
        /// Version in the file
        found: u32,
        /// Highest version understood
        supported: u32,
    },

    /// IO error reading or writing the staging file
    #[error("io error on {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Cross-process lock could not be taken
    #[error("cannot lock {path}: {source}")]
    Lock {
        /// Lock file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// State could not be encoded
    #[error("cannot encode staging state: {0}")]
    Encode(#[source] serde_json::Error),

    /// No home directory to derive the default location from
    #[error("could not find home directory")]
    NoHomeDir,
}

impl StoreError {
    /// Create not-staged error
    pub fn not_staged(namespace: Namespace, name: impl Into<String>) -> Self {
        Self::NotStaged {
            namespace,
            name: name.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this is the recoverable not-staged condition
    #[inline]
    #[must_use]
    pub fn is_not_staged(&self) -> bool {
        matches!(self, Self::NotStaged { .. })
    }
}

/// Result type alias for staging operations
pub type StoreResult<T> = Result<T, StoreError>;
