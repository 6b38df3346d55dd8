//! Error types for the diff/push pipeline

use crate::key::StagedKey;
use vstash_backend::SnapshotError;
use vstash_staging::{Namespace, StoreError};
use vstash_version::{BackendError, ParseError, ResolveError};

/// Errors from pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Staging store failure, including not-staged
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Specifier could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Specifier could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// No strategy registered for a namespace
    #[error("no backend configured for {0}")]
    NoBackend(Namespace),

    /// Backend call failed
    #[error("{operation} {key}: {source}")]
    Backend {
        /// Affected key
        key: StagedKey,
        /// Attempted operation
        operation: &'static str,
        /// Backend failure
        #[source]
        source: BackendError,
    },

    /// Shared remote could not be locked, reloaded, or saved
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Some fetches of a bulk diff failed; the other keys were still compared
    #[error("{} of {total} fetches failed, first: {first}", .failed.len())]
    BulkFetch {
        /// Keys whose fetch failed, sorted
        failed: Vec<StagedKey>,
        /// Number of keys fetched
        total: usize,
        /// First failure in key order
        #[source]
        first: Box<PipelineError>,
    },

    /// Blocking store or remote task did not complete
    #[error("background task failed: {0}")]
    Blocking(#[source] tokio::task::JoinError),

    /// Some pushes of a bulk push failed; the rest were committed
    #[error("{failed} of {total} pushes failed")]
    PushFailed {
        /// Failed pushes
        failed: usize,
        /// Attempted pushes
        total: usize,
    },
}

impl PipelineError {
    /// Wrap a backend failure with context
    pub fn backend(key: StagedKey, operation: &'static str, source: BackendError) -> Self {
        Self::Backend {
            key,
            operation,
            source,
        }
    }

    /// Check if nothing was staged for the requested key
    #[inline]
    #[must_use]
    pub fn is_not_staged(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_staged())
    }

    /// Check if the condition should be reported as a warning, not a failure
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_not_staged()
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_staged_is_recoverable() {
        let err = PipelineError::from(StoreError::not_staged(Namespace::Param, "/a"));
        assert!(err.is_not_staged());
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "param /a is not staged");
    }

    #[test]
    fn backend_error_carries_context() {
        let err = PipelineError::backend(
            StagedKey::new(Namespace::Secret, "db"),
            "push",
            BackendError::AccessDenied("nope".into()),
        );
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "push secret db: access denied: nope");
    }

    #[test]
    fn bulk_fetch_message() {
        let key = StagedKey::new(Namespace::Param, "/a");
        let err = PipelineError::BulkFetch {
            failed: vec![key.clone()],
            total: 3,
            first: Box::new(PipelineError::backend(key, "fetch", BackendError::Timeout)),
        };
        assert_eq!(err.to_string(), "1 of 3 fetches failed, first: fetch param /a: operation timed out");
    }
}
