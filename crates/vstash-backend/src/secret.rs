//! In-memory secrets vault
//!
//! Revisions carry opaque ids. The `current` label marks the latest revision
//! and `previous` the one before it; both move on every write. Deletes are
//! either immediate (`force`) or scheduled after a recovery window, during
//! which the secret can no longer be read or written.

use crate::clock::next_timestamp;
use crate::strategy::{apply_tag_change, PushMetadata, Strategy, Tagger, UpsertMode};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;
use vstash_staging::{DeleteOptions, Namespace};
use vstash_version::{
    BackendError, BackendGrammar, PointLookup, RecordVersion, VersionRecord, VersionedResourceReader,
};

/// Label of the latest revision
pub const LABEL_CURRENT: &str = "current";
/// Label of the revision before the latest
pub const LABEL_PREVIOUS: &str = "previous";

/// Shortest allowed recovery window in days
pub const MIN_RECOVERY_WINDOW_DAYS: u32 = 7;
/// Longest allowed recovery window in days
pub const MAX_RECOVERY_WINDOW_DAYS: u32 = 30;
/// Recovery window used when none is given
pub const DEFAULT_RECOVERY_WINDOW_DAYS: u32 = 30;

/// One stored revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRevision {
    /// Opaque version id
    pub id: String,
    /// Stored value
    pub value: String,
    /// Write time
    pub created_at: DateTime<Utc>,
    /// Stage labels currently attached
    #[serde(default)]
    pub labels: Vec<String>,
}

impl SecretRevision {
    fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A secret with its full history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Revisions, oldest first
    pub revisions: Vec<SecretRevision>,
    /// When a scheduled deletion takes effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_date: Option<DateTime<Utc>>,
}

impl Secret {
    fn new() -> Self {
        Self {
            description: None,
            tags: BTreeMap::new(),
            revisions: Vec::new(),
            deletion_date: None,
        }
    }

    fn labeled(&self, label: &str) -> Option<&SecretRevision> {
        self.revisions.iter().find(|r| r.has_label(label))
    }

    /// Append a revision and move the stage labels onto it
    fn push_revision(&mut self, value: &str) -> String {
        let created_at = next_timestamp(self.revisions.last().map(|r| r.created_at));
        for revision in &mut self.revisions {
            revision.labels.retain(|l| l != LABEL_PREVIOUS);
            if let Some(pos) = revision.labels.iter().position(|l| l == LABEL_CURRENT) {
                revision.labels[pos] = LABEL_PREVIOUS.to_string();
            }
        }
        let id = Uuid::new_v4().to_string();
        self.revisions.push(SecretRevision {
            id: id.clone(),
            value: value.to_string(),
            created_at,
            labels: vec![LABEL_CURRENT.to_string()],
        });
        id
    }
}

fn to_record(revision: &SecretRevision) -> VersionRecord {
    VersionRecord::new(
        RecordVersion::Opaque(revision.id.clone()),
        revision.value.clone(),
        Some(revision.created_at),
    )
    .with_labels(revision.labels.clone())
}

fn scheduled_for_deletion(name: &str) -> BackendError {
    BackendError::InvalidRequest(format!("secret {name} is scheduled for deletion"))
}

/// Secret backend
#[derive(Debug, Default)]
pub struct SecretStore {
    secrets: RwLock<BTreeMap<String, Secret>>,
}

impl SecretStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `secrets`
    #[must_use]
    pub fn from_secrets(secrets: BTreeMap<String, Secret>) -> Self {
        Self {
            secrets: RwLock::new(secrets),
        }
    }

    /// Swap in `secrets`, dropping everything held now
    pub fn replace(&self, secrets: BTreeMap<String, Secret>) {
        *self.secrets.write() = secrets;
    }

    /// Copy of every secret
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Secret> {
        self.secrets.read().clone()
    }

    /// Write a revision directly, creating the secret if needed
    ///
    /// Returns the new version id.
    pub fn put(&self, name: &str, value: &str) -> String {
        self.secrets
            .write()
            .entry(name.to_string())
            .or_insert_with(Secret::new)
            .push_revision(value)
    }

    /// Scheduled deletion date, if any
    #[must_use]
    pub fn deletion_date(&self, name: &str) -> Option<DateTime<Utc>> {
        self.secrets.read().get(name).and_then(|s| s.deletion_date)
    }

    /// Run `f` on a live (not scheduled for deletion) secret
    fn with_live<T>(&self, name: &str, f: impl FnOnce(&Secret) -> Result<T, BackendError>) -> Result<T, BackendError> {
        let secrets = self.secrets.read();
        let secret = secrets
            .get(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        if secret.deletion_date.is_some() {
            return Err(scheduled_for_deletion(name));
        }
        f(secret)
    }

    fn with_live_mut<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Secret) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut secrets = self.secrets.write();
        let secret = secrets
            .get_mut(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        if secret.deletion_date.is_some() {
            return Err(scheduled_for_deletion(name));
        }
        f(secret)
    }
}

#[async_trait]
impl VersionedResourceReader for SecretStore {
    async fn get(&self, lookup: &PointLookup) -> Result<VersionRecord, BackendError> {
        tracing::debug!(?lookup, "get secret");
        let (name, found) = match lookup {
            PointLookup::Latest(name) => {
                let found = self.with_live(name, |s| Ok(s.labeled(LABEL_CURRENT).map(to_record)))?;
                (name.as_str(), found)
            }
            PointLookup::Labeled { name, label } => {
                let found = self.with_live(name, |s| Ok(s.labeled(label).map(to_record)))?;
                (name.as_str(), found)
            }
            PointLookup::Qualified(qualified) => {
                let (name, id) = qualified.rsplit_once(':').unwrap_or((qualified.as_str(), ""));
                let found = self.with_live(name, |s| {
                    Ok(s.revisions.iter().find(|r| r.id == id).map(to_record))
                })?;
                (name, found)
            }
        };
        found.ok_or_else(|| BackendError::NotFound(format!("{name}: no such version")))
    }

    async fn history(&self, name: &str) -> Result<Vec<VersionRecord>, BackendError> {
        tracing::debug!(name, "get secret history");
        self.with_live(name, |s| Ok(s.revisions.iter().map(to_record).collect()))
    }
}

#[async_trait]
impl Tagger for SecretStore {
    async fn get_tags(&self, name: &str) -> Result<BTreeMap<String, String>, BackendError> {
        self.with_live(name, |s| Ok(s.tags.clone()))
    }

    async fn add_tags(&self, name: &str, tags: &BTreeMap<String, String>) -> Result<(), BackendError> {
        self.with_live_mut(name, |s| {
            s.tags.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        })
    }

    async fn remove_tags(&self, name: &str, keys: &BTreeSet<String>) -> Result<(), BackendError> {
        self.with_live_mut(name, |s| {
            s.tags.retain(|k, _| !keys.contains(k));
            Ok(())
        })
    }
}

#[async_trait]
impl Strategy for SecretStore {
    fn namespace(&self) -> Namespace {
        Namespace::Secret
    }

    fn grammar(&self) -> BackendGrammar {
        BackendGrammar::secret()
    }

    fn reader(&self) -> &dyn VersionedResourceReader {
        self
    }

    fn tagger(&self) -> &dyn Tagger {
        self
    }

    async fn push_upsert(&self, name: &str, value: &str, metadata: &PushMetadata) -> Result<(), BackendError> {
        let apply = |secret: &mut Secret| {
            if let Some(description) = &metadata.description {
                secret.description = Some(description.clone());
            }
            secret.push_revision(value)
        };

        let id = match metadata.mode {
            UpsertMode::Create => {
                let mut secrets = self.secrets.write();
                if secrets.contains_key(name) {
                    return Err(BackendError::AlreadyExists(name.to_string()));
                }
                apply(secrets.entry(name.to_string()).or_insert_with(Secret::new))
            }
            UpsertMode::Update => self.with_live_mut(name, |s| Ok(apply(s)))?,
        };
        tracing::info!(name, version_id = %id, mode = %metadata.mode, "secret written");

        apply_tag_change(self, name, &metadata.tags).await
    }

    async fn push_delete(&self, name: &str, options: Option<&DeleteOptions>) -> Result<(), BackendError> {
        let options = options.copied().unwrap_or_default();
        if options.force {
            if options.recovery_window_days.is_some() {
                return Err(BackendError::InvalidRequest(
                    "force delete cannot be combined with a recovery window".to_string(),
                ));
            }
            self.secrets
                .write()
                .remove(name)
                .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
            tracing::info!(name, "secret deleted");
            return Ok(());
        }

        let days = options.recovery_window_days.unwrap_or(DEFAULT_RECOVERY_WINDOW_DAYS);
        if !(MIN_RECOVERY_WINDOW_DAYS..=MAX_RECOVERY_WINDOW_DAYS).contains(&days) {
            return Err(BackendError::InvalidRequest(format!(
                "recovery window must be between {MIN_RECOVERY_WINDOW_DAYS} and {MAX_RECOVERY_WINDOW_DAYS} days, got {days}"
            )));
        }
        let deletion_date = Utc::now() + Duration::days(i64::from(days));
        self.with_live_mut(name, |s| {
            s.deletion_date = Some(deletion_date);
            Ok(())
        })?;
        tracing::info!(name, %deletion_date, "secret scheduled for deletion");
        Ok(())
    }
}
