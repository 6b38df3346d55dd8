//! Error types for specifier parsing and version resolution
//!
//! Provides error handling for:
//! - Parse operations (text → `VersionSpec`)
//! - Resolution (`VersionSpec` → concrete revision)
//! - Backend access (transport/auth failures, wrapped with context)

use crate::spec::AbsoluteIdentifier;

/// Errors while parsing a version specifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input was empty after trimming
    #[error("empty version specifier")]
    EmptySpec,

    /// A marker or shift begins at index 0
    #[error("version specifier has no resource name: '{0}'")]
    EmptyName(String),

    /// Marker present but its value is missing or malformed
    #[error("invalid version token '{token}': {reason}")]
    InvalidVersionToken {
        /// Offending token as written
        token: String,
        /// Why it was rejected
        reason: String,
    },

    /// `~` directly followed by a letter
    #[error("ambiguous specifier '{input}': '~' at position {position} is followed by a letter")]
    AmbiguousSpecifier {
        /// Trimmed input
        input: String,
        /// Byte offset of the `~`
        position: usize,
    },

    /// Unrecognised characters after the marker/shift run
    #[error("unexpected trailing characters '{rest}' in '{input}'")]
    TrailingGarbage {
        /// Trimmed input
        input: String,
        /// Unconsumed remainder
        rest: String,
    },
}

impl ParseError {
    /// Create invalid token error
    pub(crate) fn invalid_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersionToken {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a backend capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Resource (or requested revision) does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource already exists (create on an existing name)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Caller lacks permission
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Request rejected by the backend
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Deadline elapsed
    #[error("operation timed out")]
    Timeout,

    /// Run was cancelled
    #[error("operation cancelled")]
    Cancelled,
}

impl BackendError {
    /// Check if this is a not-found condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors while resolving a specifier against a backend
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Empty history or backend not-found
    #[error("resource not found: {name}")]
    ResourceNotFound {
        /// Resource name
        name: String,
    },

    /// Absolute identifier absent from the history
    #[error("version {absolute} not found in history of {name}")]
    AbsoluteNotInHistory {
        /// Resource name
        name: String,
        /// Identifier that was looked for
        absolute: AbsoluteIdentifier,
    },

    /// Shift goes past the oldest revision
    #[error("shift ~{0} is out of range")]
    ShiftOutOfRange(u32),

    /// Underlying backend failure
    #[error("{operation} {name}: {source}")]
    Backend {
        /// Resource name
        name: String,
        /// Attempted operation
        operation: &'static str,
        /// Backend failure
        #[source]
        source: BackendError,
    },
}

impl ResolveError {
    /// Wrap a backend failure with context
    pub fn backend(name: impl Into<String>, operation: &'static str, source: BackendError) -> Self {
        Self::Backend {
            name: name.into(),
            operation,
            source,
        }
    }

    /// Check if the resource is missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::EmptyName("#3".to_string());
        assert_eq!(err.to_string(), "version specifier has no resource name: '#3'");
    }

    #[test]
    fn shift_out_of_range_display() {
        assert_eq!(ResolveError::ShiftOutOfRange(5).to_string(), "shift ~5 is out of range");
    }

    #[test]
    fn backend_error_carries_context() {
        let err = ResolveError::backend("/a", "get history", BackendError::Timeout);
        assert_eq!(err.to_string(), "get history /a: operation timed out");
    }

    #[test]
    fn not_found_predicates() {
        assert!(BackendError::NotFound("x".into()).is_not_found());
        assert!(!BackendError::Timeout.is_not_found());
        assert!(ResolveError::ResourceNotFound { name: "x".into() }.is_not_found());
    }
}
