//! Tag change resolution
//!
//! Tag flags arrive as an ordered list of add/remove operations. For each key
//! the operation with the highest index wins; every override is reported so
//! the caller can warn about it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Display, Formatter};

/// Single tag operation as given by the user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagOp {
    /// Set `key` to `value`
    Add {
        /// Tag key
        key: String,
        /// Tag value
        value: String,
    },
    /// Remove `key`
    Remove {
        /// Tag key
        key: String,
    },
}

impl TagOp {
    /// Add operation
    #[inline]
    #[must_use]
    pub fn add(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Add {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Remove operation
    #[inline]
    #[must_use]
    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }

    /// Key this operation touches
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Add { key, .. } | Self::Remove { key } => key,
        }
    }
}

impl Display for TagOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { key, value } => write!(f, "add {key}={value}"),
            Self::Remove { key } => write!(f, "remove {key}"),
        }
    }
}

/// Net effect of a tag operation list
///
/// A key never appears in both `add` and `remove`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChange {
    /// Tags to add or overwrite
    pub add: BTreeMap<String, String>,
    /// Tag keys to remove
    pub remove: BTreeSet<String>,
}

impl TagChange {
    /// Whether nothing changes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// One operation overridden by a later one on the same key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConflict {
    /// Index and operation that won
    pub winner: (usize, TagOp),
    /// Index and operation that was discarded
    pub loser: (usize, TagOp),
}

impl Display for TagConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tag '{}': '{}' (#{}) overrides '{}' (#{})",
            self.winner.1.key(),
            self.winner.1,
            self.winner.0 + 1,
            self.loser.1,
            self.loser.0 + 1
        )
    }
}

/// Resolve `ops` into a [`TagChange`], reporting every override
#[must_use]
pub fn resolve_tag_ops(ops: &[TagOp]) -> (TagChange, Vec<TagConflict>) {
    let mut latest: HashMap<&str, usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for (index, op) in ops.iter().enumerate() {
        if let Some(previous) = latest.insert(op.key(), index) {
            let conflict = TagConflict {
                winner: (index, op.clone()),
                loser: (previous, ops[previous].clone()),
            };
            tracing::warn!("{conflict}");
            conflicts.push(conflict);
        }
    }

    let mut change = TagChange::default();
    for index in latest.into_values() {
        match &ops[index] {
            TagOp::Add { key, value } => {
                change.add.insert(key.clone(), value.clone());
            }
            TagOp::Remove { key } => {
                change.remove.insert(key.clone());
            }
        }
    }
    (change, conflicts)
}
