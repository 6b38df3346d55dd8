//! Per-backend capability traits
//!
//! The pipeline never inspects which backend it talks to. Everything that
//! differs between backends (type preservation on update, recoverable
//! deletes, addressing grammar) lives behind [`Strategy`].

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Display, Formatter};
use vstash_staging::{DeleteOptions, Namespace, Operation, TagChange};
use vstash_version::{BackendError, BackendGrammar, PointLookup, VersionRecord, VersionedResourceReader};

/// Tag access on a resource
#[async_trait]
pub trait Tagger: Send + Sync {
    /// Current tags
    ///
    /// # Errors
    /// `BackendError::NotFound` when the resource is missing
    async fn get_tags(&self, name: &str) -> Result<BTreeMap<String, String>, BackendError>;

    /// Add or overwrite tags
    ///
    /// # Errors
    /// `BackendError::NotFound` when the resource is missing
    async fn add_tags(&self, name: &str, tags: &BTreeMap<String, String>) -> Result<(), BackendError>;

    /// Remove tag keys; unknown keys are ignored
    ///
    /// # Errors
    /// `BackendError::NotFound` when the resource is missing
    async fn remove_tags(&self, name: &str, keys: &BTreeSet<String>) -> Result<(), BackendError>;
}

/// Whether an upsert creates a resource or adds a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// Resource must not exist yet
    Create,
    /// Resource must exist
    Update,
}

impl UpsertMode {
    /// Mode for a staged operation, `None` for deletes
    #[must_use]
    pub fn for_operation(operation: Operation) -> Option<Self> {
        match operation {
            Operation::Create => Some(Self::Create),
            Operation::Update => Some(Self::Update),
            Operation::Delete => None,
        }
    }
}

impl Display for UpsertMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
        })
    }
}

/// Everything besides the value that an upsert carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMetadata {
    /// Create or update
    pub mode: UpsertMode,
    /// New description, unchanged when `None`
    pub description: Option<String>,
    /// Tags applied after the value is written
    pub tags: TagChange,
}

impl PushMetadata {
    /// Metadata with no description or tag changes
    #[inline]
    #[must_use]
    pub fn new(mode: UpsertMode) -> Self {
        Self {
            mode,
            description: None,
            tags: TagChange::default(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// With tag changes
    #[inline]
    #[must_use]
    pub fn with_tags(mut self, tags: TagChange) -> Self {
        self.tags = tags;
        self
    }
}

/// Push/fetch behaviour of one backend kind
#[async_trait]
pub trait Strategy: Send + Sync + Debug {
    /// Namespace this strategy serves
    fn namespace(&self) -> Namespace;

    /// Specifier grammar of this backend
    fn grammar(&self) -> BackendGrammar;

    /// Read access used by the resolver
    fn reader(&self) -> &dyn VersionedResourceReader;

    /// Tag access
    fn tagger(&self) -> &dyn Tagger;

    /// Latest revision, `None` when the resource does not exist
    ///
    /// # Errors
    /// Any backend failure other than not-found
    async fn fetch_current(&self, name: &str) -> Result<Option<VersionRecord>, BackendError> {
        match self.reader().get(&PointLookup::Latest(name.to_string())).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `value` as a new resource or revision, then apply tag changes
    ///
    /// # Errors
    /// `BackendError::AlreadyExists` / `NotFound` when `metadata.mode` does
    /// not match the resource's existence, or any backend failure
    async fn push_upsert(&self, name: &str, value: &str, metadata: &PushMetadata) -> Result<(), BackendError>;

    /// Delete the resource
    ///
    /// # Errors
    /// `BackendError::NotFound` when the resource is missing, or any backend
    /// failure
    async fn push_delete(&self, name: &str, options: Option<&DeleteOptions>) -> Result<(), BackendError>;
}

/// Apply `change` through `tagger`: additions first, then removals
///
/// # Errors
/// The first tagger failure
pub async fn apply_tag_change(tagger: &dyn Tagger, name: &str, change: &TagChange) -> Result<(), BackendError> {
    if !change.add.is_empty() {
        tagger.add_tags(name, &change.add).await?;
    }
    if !change.remove.is_empty() {
        tagger.remove_tags(name, &change.remove).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_mode_for_operation() {
        assert_eq!(UpsertMode::for_operation(Operation::Create), Some(UpsertMode::Create));
        assert_eq!(UpsertMode::for_operation(Operation::Update), Some(UpsertMode::Update));
        assert_eq!(UpsertMode::for_operation(Operation::Delete), None);
    }

    #[test]
    fn metadata_builders() {
        let mut tags = TagChange::default();
        tags.remove.insert("old".into());
        let meta = PushMetadata::new(UpsertMode::Update)
            .with_description(Some("db url".into()))
            .with_tags(tags.clone());
        assert_eq!(meta.description.as_deref(), Some("db url"));
        assert_eq!(meta.tags, tags);
    }
}
