//! Staged entry types
//!
//! A [`StagingEntry`] records one pending create/update/delete intent for a
//! single resource. Entries are replaced wholesale when re-staged.

use crate::tags::TagChange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Top-level grouping of resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Hierarchical parameter store
    Param,
    /// Secrets vault
    Secret,
}

impl Namespace {
    /// Every namespace, in storage order
    pub const ALL: [Namespace; 2] = [Namespace::Param, Namespace::Secret];

    /// Stable key used in the staging file
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Param => "param",
            Self::Secret => "secret",
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "param" => Ok(Self::Param),
            "secret" => Ok(Self::Secret),
            other => Err(format!("unknown namespace: {other}")),
        }
    }
}

/// Kind of pending change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// New resource
    Create,
    /// New revision of an existing resource
    Update,
    /// Remove the resource
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Backend-specific delete options
///
/// Only the secret backend honours these; the parameter backend deletes
/// immediately regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Delete without a recovery window
    #[serde(default)]
    pub force: bool,
    /// Days the resource stays recoverable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_window_days: Option<u32>,
}

impl DeleteOptions {
    /// Immediate, unrecoverable delete
    #[inline]
    #[must_use]
    pub fn force() -> Self {
        Self {
            force: true,
            recovery_window_days: None,
        }
    }

    /// Recoverable delete with a window of `days`
    #[inline]
    #[must_use]
    pub fn recoverable(days: u32) -> Self {
        Self {
            force: false,
            recovery_window_days: Some(days),
        }
    }
}

/// One pending change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingEntry {
    /// Change kind
    pub operation: Operation,
    /// New value (empty for deletes)
    #[serde(default)]
    pub value: String,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags to add or overwrite
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Tag keys to remove
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub untag_keys: BTreeSet<String>,
    /// When the change was staged
    pub staged_at: DateTime<Utc>,
    /// Delete options (deletes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_options: Option<DeleteOptions>,
}

impl StagingEntry {
    fn new(operation: Operation, value: String) -> Self {
        Self {
            operation,
            value,
            description: None,
            tags: BTreeMap::new(),
            untag_keys: BTreeSet::new(),
            staged_at: Utc::now(),
            delete_options: None,
        }
    }

    /// Stage a new resource
    #[inline]
    #[must_use]
    pub fn create(value: impl Into<String>) -> Self {
        Self::new(Operation::Create, value.into())
    }

    /// Stage a new revision
    #[inline]
    #[must_use]
    pub fn update(value: impl Into<String>) -> Self {
        Self::new(Operation::Update, value.into())
    }

    /// Stage a delete
    #[inline]
    #[must_use]
    pub fn delete(options: Option<DeleteOptions>) -> Self {
        let mut entry = Self::new(Operation::Delete, String::new());
        entry.delete_options = options;
        entry
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With tag changes
    #[inline]
    #[must_use]
    pub fn with_tags(mut self, change: TagChange) -> Self {
        self.tags = change.add;
        self.untag_keys = change.remove;
        self
    }

    /// Tag changes carried by this entry
    #[must_use]
    pub fn tag_change(&self) -> TagChange {
        TagChange {
            add: self.tags.clone(),
            remove: self.untag_keys.clone(),
        }
    }

    /// Value on the staged side of a diff
    ///
    /// Deletes compare against the empty string.
    #[inline]
    #[must_use]
    pub fn staged_value(&self) -> &str {
        match self.operation {
            Operation::Delete => "",
            Operation::Create | Operation::Update => &self.value,
        }
    }
}
