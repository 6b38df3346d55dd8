//! Staged resource key

use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use vstash_staging::Namespace;

/// Namespace and name of one resource
///
/// Orders by namespace, then name; bulk output follows this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StagedKey {
    /// Namespace
    pub namespace: Namespace,
    /// Resource name
    pub name: String,
}

impl StagedKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }
}

impl Display for StagedKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.namespace, self.name)
    }
}
