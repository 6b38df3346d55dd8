//! In-memory hierarchical parameter store
//!
//! Revisions are numbered from 1. Each parameter keeps its type across
//! updates: an update reads the existing parameter first and writes the new
//! revision with the same type. Deletes are immediate and ignore delete
//! options.

use crate::clock::next_timestamp;
use crate::strategy::{apply_tag_change, PushMetadata, Strategy, Tagger, UpsertMode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use vstash_staging::{DeleteOptions, Namespace};
use vstash_version::{
    BackendError, BackendGrammar, PointLookup, RecordVersion, VersionRecord, VersionedResourceReader,
};

/// Value classification of a parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Plain string
    #[default]
    String,
    /// Comma-separated list
    StringList,
    /// Encrypted string
    SecureString,
}

impl Display for ParameterType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "String",
            Self::StringList => "StringList",
            Self::SecureString => "SecureString",
        })
    }
}

/// One stored revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRevision {
    /// Ordinal version, starting at 1
    pub version: i64,
    /// Stored value
    pub value: String,
    /// Write time
    pub created_at: DateTime<Utc>,
}

/// A parameter with its full history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Type, preserved across updates
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Revisions, oldest first
    pub revisions: Vec<ParameterRevision>,
}

impl Parameter {
    fn latest(&self) -> Option<&ParameterRevision> {
        self.revisions.last()
    }

    fn push_revision(&mut self, value: &str) -> i64 {
        let version = self.latest().map_or(1, |r| r.version + 1);
        let created_at = next_timestamp(self.latest().map(|r| r.created_at));
        self.revisions.push(ParameterRevision {
            version,
            value: value.to_string(),
            created_at,
        });
        version
    }
}

fn to_record(revision: &ParameterRevision) -> VersionRecord {
    VersionRecord::new(
        RecordVersion::Numeric(revision.version),
        revision.value.clone(),
        Some(revision.created_at),
    )
}

/// Parameter backend
#[derive(Debug, Default)]
pub struct ParameterStore {
    parameters: RwLock<BTreeMap<String, Parameter>>,
}

impl ParameterStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `parameters`
    #[must_use]
    pub fn from_parameters(parameters: BTreeMap<String, Parameter>) -> Self {
        Self {
            parameters: RwLock::new(parameters),
        }
    }

    /// Swap in `parameters`, dropping everything held now
    pub fn replace(&self, parameters: BTreeMap<String, Parameter>) {
        *self.parameters.write() = parameters;
    }

    /// Copy of every parameter
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Parameter> {
        self.parameters.read().clone()
    }

    /// Write a revision directly, creating the parameter with `param_type`
    /// if needed
    ///
    /// Returns the new version number.
    pub fn put(&self, name: &str, param_type: ParameterType, value: &str) -> i64 {
        let mut parameters = self.parameters.write();
        let parameter = parameters.entry(name.to_string()).or_insert_with(|| Parameter {
            param_type,
            description: None,
            tags: BTreeMap::new(),
            revisions: Vec::new(),
        });
        parameter.push_revision(value)
    }

    /// Type of an existing parameter
    ///
    /// # Errors
    /// `BackendError::NotFound` when the parameter is missing
    pub fn parameter_type(&self, name: &str) -> Result<ParameterType, BackendError> {
        self.parameters
            .read()
            .get(name)
            .map(|p| p.param_type)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    /// Description of an existing parameter
    #[must_use]
    pub fn description(&self, name: &str) -> Option<String> {
        self.parameters.read().get(name).and_then(|p| p.description.clone())
    }

    fn lookup(&self, name: &str, version: Option<i64>) -> Result<VersionRecord, BackendError> {
        let parameters = self.parameters.read();
        let parameter = parameters
            .get(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        let revision = match version {
            None => parameter.latest(),
            Some(v) => parameter.revisions.iter().find(|r| r.version == v),
        };
        revision
            .map(to_record)
            .ok_or_else(|| BackendError::NotFound(format!("{name}:{}", version.unwrap_or_default())))
    }
}

#[async_trait]
impl VersionedResourceReader for ParameterStore {
    async fn get(&self, lookup: &PointLookup) -> Result<VersionRecord, BackendError> {
        tracing::debug!(?lookup, "get parameter");
        match lookup {
            PointLookup::Latest(name) => self.lookup(name, None),
            PointLookup::Qualified(qualified) => match qualified.rsplit_once(':') {
                Some((name, version)) => {
                    let version = version
                        .parse::<i64>()
                        .map_err(|_| BackendError::InvalidRequest(format!("invalid version in {qualified}")))?;
                    self.lookup(name, Some(version))
                }
                None => self.lookup(qualified, None),
            },
            PointLookup::Labeled { name, label } => Err(BackendError::InvalidRequest(format!(
                "parameter {name} cannot be addressed by label '{label}'"
            ))),
        }
    }

    async fn history(&self, name: &str) -> Result<Vec<VersionRecord>, BackendError> {
        tracing::debug!(name, "get parameter history");
        let parameters = self.parameters.read();
        let parameter = parameters
            .get(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        Ok(parameter.revisions.iter().map(to_record).collect())
    }
}

#[async_trait]
impl Tagger for ParameterStore {
    async fn get_tags(&self, name: &str) -> Result<BTreeMap<String, String>, BackendError> {
        self.parameters
            .read()
            .get(name)
            .map(|p| p.tags.clone())
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    async fn add_tags(&self, name: &str, tags: &BTreeMap<String, String>) -> Result<(), BackendError> {
        let mut parameters = self.parameters.write();
        let parameter = parameters
            .get_mut(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        parameter
            .tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn remove_tags(&self, name: &str, keys: &BTreeSet<String>) -> Result<(), BackendError> {
        let mut parameters = self.parameters.write();
        let parameter = parameters
            .get_mut(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        parameter.tags.retain(|k, _| !keys.contains(k));
        Ok(())
    }
}

#[async_trait]
impl Strategy for ParameterStore {
    fn namespace(&self) -> Namespace {
        Namespace::Param
    }

    fn grammar(&self) -> BackendGrammar {
        BackendGrammar::parameter()
    }

    fn reader(&self) -> &dyn VersionedResourceReader {
        self
    }

    fn tagger(&self) -> &dyn Tagger {
        self
    }

    async fn push_upsert(&self, name: &str, value: &str, metadata: &PushMetadata) -> Result<(), BackendError> {
        let version = {
            let mut parameters = self.parameters.write();
            let parameter = match metadata.mode {
                UpsertMode::Create => {
                    if parameters.contains_key(name) {
                        return Err(BackendError::AlreadyExists(name.to_string()));
                    }
                    parameters.entry(name.to_string()).or_insert_with(|| Parameter {
                        param_type: ParameterType::default(),
                        description: None,
                        tags: BTreeMap::new(),
                        revisions: Vec::new(),
                    })
                }
                UpsertMode::Update => parameters
                    .get_mut(name)
                    .ok_or_else(|| BackendError::NotFound(name.to_string()))?,
            };
            if let Some(description) = &metadata.description {
                parameter.description = Some(description.clone());
            }
            parameter.push_revision(value)
        };
        tracing::info!(name, version, mode = %metadata.mode, "parameter written");

        apply_tag_change(self, name, &metadata.tags).await
    }

    async fn push_delete(&self, name: &str, _options: Option<&DeleteOptions>) -> Result<(), BackendError> {
        self.parameters
            .write()
            .remove(name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        tracing::info!(name, "parameter deleted");
        Ok(())
    }
}
