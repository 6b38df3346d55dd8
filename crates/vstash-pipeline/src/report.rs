//! Results returned by pipeline operations

use crate::diff::RenderedDiff;
use crate::error::PipelineError;
use crate::key::StagedKey;
use crate::warning::Warning;
use serde::Serialize;
use vstash_staging::Operation;

/// Result of comparing two values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiffOutcome {
    /// Values differ
    Changed(RenderedDiff),
    /// Values are the same (after formatting, if requested)
    Identical,
}

impl DiffOutcome {
    /// Whether the values are the same
    #[inline]
    #[must_use]
    pub fn is_identical(&self) -> bool {
        matches!(self, Self::Identical)
    }

    /// Rendered diff, if the values differ
    #[must_use]
    pub fn rendered(&self) -> Option<&RenderedDiff> {
        match self {
            Self::Changed(diff) => Some(diff),
            Self::Identical => None,
        }
    }
}

/// Staged entry compared against the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDiff {
    /// Compared key
    pub key: StagedKey,
    /// Staged operation
    pub operation: Operation,
    /// Comparison result
    pub outcome: DiffOutcome,
}

/// Key whose live value could not be fetched; the entry stays staged
#[derive(Debug)]
pub struct FetchFailure {
    /// Key that failed
    pub key: StagedKey,
    /// Why
    pub error: PipelineError,
}

/// Result of a staged diff
///
/// A bulk diff keeps going past failed fetches: every key that could be
/// fetched is compared, and the failures are collected in `failed`.
#[derive(Debug, Default, Serialize)]
pub struct DiffReport {
    /// Entries still staged, in key order
    pub diffs: Vec<ItemDiff>,
    /// Entries removed because they matched the remote
    pub unstaged: Vec<StagedKey>,
    /// Warnings raised along the way
    pub warnings: Vec<Warning>,
    /// Fetch failures, in key order
    #[serde(skip)]
    pub failed: Vec<FetchFailure>,
}

impl DiffReport {
    /// Number of keys compared or attempted
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.diffs.len() + self.unstaged.len() + self.failed.len()
    }

    /// Whether every fetch went through
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Overall error when any fetch failed, carrying the first failure
    ///
    /// Drains `failed`; a second call returns `None`.
    pub fn take_error(&mut self) -> Option<PipelineError> {
        let total = self.total();
        let mut failures = std::mem::take(&mut self.failed).into_iter();
        let first = failures.next()?;
        let mut failed = vec![first.key];
        failed.extend(failures.map(|f| f.key));
        Some(PipelineError::BulkFetch {
            failed,
            total,
            first: Box::new(first.error),
        })
    }
}

/// Result of comparing two resolved versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    /// Rendered left specifier
    pub left: String,
    /// Rendered right specifier
    pub right: String,
    /// Comparison result
    pub outcome: DiffOutcome,
    /// Warnings raised along the way
    pub warnings: Vec<Warning>,
}

/// Push that did not go through; the entry stays staged
#[derive(Debug)]
pub struct PushFailure {
    /// Key that failed
    pub key: StagedKey,
    /// Why
    pub error: PipelineError,
}

/// Result of a bulk push
#[derive(Debug, Default)]
pub struct PushSummary {
    /// Committed and unstaged, in push order
    pub pushed: Vec<(StagedKey, Operation)>,
    /// Still staged, in push order
    pub failed: Vec<PushFailure>,
}

impl PushSummary {
    /// Number of attempted pushes
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.pushed.len() + self.failed.len()
    }

    /// Whether every push went through
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Overall error when any push failed
    #[must_use]
    pub fn error(&self) -> Option<PipelineError> {
        (!self.is_success()).then(|| PipelineError::PushFailed {
            failed: self.failed.len(),
            total: self.total(),
        })
    }
}
