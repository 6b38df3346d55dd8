//! On-disk staging document
//!
//! JSON shape:
//! ```json
//! {
//!   "version": 1,
//!   "param":  { "/app/db/url": { "operation": "update", "value": "...", "staged_at": "..." } },
//!   "secret": { "db-creds": { "operation": "delete", "delete_options": { "force": true } } }
//! }
//! ```

use crate::entry::{Namespace, StagingEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Entries of one namespace, keyed by resource name
pub type NamespaceEntries = BTreeMap<String, StagingEntry>;

/// Whole staging document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingState {
    /// Document schema version
    #[serde(rename = "version", default = "default_schema_version")]
    pub schema_version: u32,
    /// Entries per namespace
    #[serde(flatten)]
    pub by_service: BTreeMap<Namespace, NamespaceEntries>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl StagingState {
    /// Empty state with every namespace initialised
    #[must_use]
    pub fn new() -> Self {
        let mut state = Self {
            schema_version: SCHEMA_VERSION,
            by_service: BTreeMap::new(),
        };
        state.normalize();
        state
    }

    /// Ensure every namespace has a (possibly empty) map
    pub fn normalize(&mut self) {
        for ns in Namespace::ALL {
            self.by_service.entry(ns).or_default();
        }
    }

    /// Entries of `namespace`
    #[must_use]
    pub fn namespace(&self, namespace: Namespace) -> Option<&NamespaceEntries> {
        self.by_service.get(&namespace)
    }

    /// Mutable entries of `namespace`, created on demand
    pub fn namespace_mut(&mut self, namespace: Namespace) -> &mut NamespaceEntries {
        self.by_service.entry(namespace).or_default()
    }

    /// Number of entries in `scope` (all namespaces when `None`)
    #[must_use]
    pub fn count(&self, scope: Option<Namespace>) -> usize {
        self.by_service
            .iter()
            .filter(|(ns, _)| scope.map_or(true, |s| s == **ns))
            .map(|(_, entries)| entries.len())
            .sum()
    }

    /// Whether nothing is staged anywhere
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count(None) == 0
    }
}

impl Default for StagingState {
    fn default() -> Self {
        Self::new()
    }
}
