//! Backend read capability consumed by the resolver
//!
//! Backends expose two reads: a point lookup and full history enumeration.
//! Shifts are never resolved server-side, so the resolver only asks for the
//! history when a specifier actually carries one.

use crate::error::BackendError;
use crate::spec::AbsoluteIdentifier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identity of one stored revision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordVersion {
    /// Ordinal version
    Numeric(i64),
    /// Backend-assigned version id
    Opaque(String),
}

impl RecordVersion {
    /// Absolute identifier pinning exactly this revision
    #[must_use]
    pub fn to_absolute(&self) -> AbsoluteIdentifier {
        match self {
            Self::Numeric(n) => AbsoluteIdentifier::Numeric(*n),
            Self::Opaque(id) => AbsoluteIdentifier::OpaqueId(id.clone()),
        }
    }
}

impl Display for RecordVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "#{n}"),
            Self::Opaque(id) => write!(f, "#{id}"),
        }
    }
}

/// One historical revision of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Revision identity
    pub version: RecordVersion,
    /// Labels currently attached to this revision
    #[serde(default)]
    pub labels: Vec<String>,
    /// Stored value
    pub value: String,
    /// Creation time, when the backend reports one
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl VersionRecord {
    /// Create record without labels
    #[inline]
    #[must_use]
    pub fn new(version: RecordVersion, value: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            version,
            labels: Vec::new(),
            value: value.into(),
            created_at,
        }
    }

    /// Attach labels
    #[inline]
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Whether this record is the one `absolute` pins
    #[must_use]
    pub fn matches(&self, absolute: &AbsoluteIdentifier) -> bool {
        match (absolute, &self.version) {
            (AbsoluteIdentifier::Numeric(n), RecordVersion::Numeric(v)) => n == v,
            (AbsoluteIdentifier::OpaqueId(id), RecordVersion::Opaque(v)) => id == v,
            (AbsoluteIdentifier::Label(label), _) => self.labels.iter().any(|l| l == label),
            _ => false,
        }
    }
}

/// Point lookup forms understood by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointLookup {
    /// Latest revision of a plain name
    Latest(String),
    /// Combined name-and-version form built by [`VersionedResourceReader::qualify`]
    Qualified(String),
    /// Revision currently carrying a label (resolved server-side)
    Labeled {
        /// Resource name
        name: String,
        /// Stage label
        label: String,
    },
}

/// Read access to versioned resources
#[async_trait]
pub trait VersionedResourceReader: Send + Sync {
    /// Build the backend's combined "name at version" addressing form
    ///
    /// Only called for numeric and opaque identifiers.
    fn qualify(&self, name: &str, absolute: &AbsoluteIdentifier) -> String {
        format!("{name}:{}", absolute.value())
    }

    /// Fetch one revision
    ///
    /// # Errors
    /// `BackendError::NotFound` when the resource or revision is missing
    async fn get(&self, lookup: &PointLookup) -> Result<VersionRecord, BackendError>;

    /// Enumerate every revision, in no particular order
    ///
    /// # Errors
    /// `BackendError::NotFound` when the resource is missing
    async fn history(&self, name: &str) -> Result<Vec<VersionRecord>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_record_matches() {
        let record = VersionRecord::new(RecordVersion::Numeric(3), "v", None);
        assert!(record.matches(&AbsoluteIdentifier::Numeric(3)));
        assert!(!record.matches(&AbsoluteIdentifier::Numeric(4)));
        assert!(!record.matches(&AbsoluteIdentifier::OpaqueId("3".into())));
    }

    #[test]
    fn label_matches_any_attached_label() {
        let record = VersionRecord::new(RecordVersion::Opaque("abc".into()), "v", None)
            .with_labels(vec!["current".into()]);
        assert!(record.matches(&AbsoluteIdentifier::Label("current".into())));
        assert!(!record.matches(&AbsoluteIdentifier::Label("previous".into())));
        assert!(record.matches(&AbsoluteIdentifier::OpaqueId("abc".into())));
    }

    #[test]
    fn record_version_display() {
        assert_eq!(RecordVersion::Numeric(7).to_string(), "#7");
    }

    #[test]
    fn record_version_pins_itself() {
        let record = VersionRecord::new(RecordVersion::Opaque("abc".into()), "v", None);
        assert!(record.matches(&record.version.to_absolute()));
    }
}
