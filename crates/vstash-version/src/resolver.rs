//! Version resolver
//!
//! Turns a [`VersionSpec`] into one concrete revision.
//!
//! - No shift: a single point lookup. Numeric and opaque identifiers are
//!   turned into the backend's qualified form here; labels are passed through
//!   and resolved server-side.
//! - With shift: the full history is fetched, sorted newest-first, and the
//!   record `shift` places after the base is returned.

use crate::error::{BackendError, ResolveError};
use crate::reader::{PointLookup, RecordVersion, VersionRecord, VersionedResourceReader};
use crate::spec::{AbsoluteIdentifier, VersionSpec};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Concrete revision a specifier resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Resource name
    pub name: String,
    /// Revision identity
    pub version: RecordVersion,
    /// Labels attached to the revision
    pub labels: Vec<String>,
    /// Stored value
    pub value: String,
    /// Creation time, when known
    pub created_at: Option<DateTime<Utc>>,
}

impl ResolvedVersion {
    fn from_record(name: &str, record: VersionRecord) -> Self {
        Self {
            name: name.to_string(),
            version: record.version,
            labels: record.labels,
            value: record.value,
            created_at: record.created_at,
        }
    }
}

/// Resolve `spec` against `reader`
///
/// # Errors
/// - `ResolveError::ResourceNotFound` for a missing resource or empty history
/// - `ResolveError::AbsoluteNotInHistory` when the pinned revision is absent
/// - `ResolveError::ShiftOutOfRange` when the shift passes the oldest revision
/// - `ResolveError::Backend` for any other backend failure
pub async fn resolve(
    spec: &VersionSpec,
    reader: &dyn VersionedResourceReader,
) -> Result<ResolvedVersion, ResolveError> {
    if !spec.needs_history() {
        let lookup = match &spec.absolute {
            None => PointLookup::Latest(spec.name.clone()),
            Some(AbsoluteIdentifier::Label(label)) => PointLookup::Labeled {
                name: spec.name.clone(),
                label: label.clone(),
            },
            Some(absolute) => PointLookup::Qualified(reader.qualify(&spec.name, absolute)),
        };
        tracing::debug!(spec = %spec, ?lookup, "point lookup");

        let record = reader
            .get(&lookup)
            .await
            .map_err(|e| not_found_or(&spec.name, "get", e))?;
        return Ok(ResolvedVersion::from_record(&spec.name, record));
    }

    let history = sorted_history(&spec.name, reader).await?;
    tracing::debug!(spec = %spec, revisions = history.len(), "resolving shift");

    let base = match &spec.absolute {
        None => 0,
        Some(absolute) => history
            .iter()
            .position(|r| r.matches(absolute))
            .ok_or_else(|| ResolveError::AbsoluteNotInHistory {
                name: spec.name.clone(),
                absolute: absolute.clone(),
            })?,
    };

    let target = base + spec.shift as usize;
    let record = history
        .into_iter()
        .nth(target)
        .ok_or(ResolveError::ShiftOutOfRange(spec.shift))?;
    Ok(ResolvedVersion::from_record(&spec.name, record))
}

/// Full history of `name`, newest first
///
/// Records without a creation time sort after every dated record and keep
/// their relative input order.
///
/// # Errors
/// `ResolveError::ResourceNotFound` for a missing resource or empty history
pub async fn sorted_history(
    name: &str,
    reader: &dyn VersionedResourceReader,
) -> Result<Vec<VersionRecord>, ResolveError> {
    let mut history = reader
        .history(name)
        .await
        .map_err(|e| not_found_or(name, "get history", e))?;
    if history.is_empty() {
        return Err(ResolveError::ResourceNotFound {
            name: name.to_string(),
        });
    }
    sort_newest_first(&mut history);
    Ok(history)
}

/// Stable sort by `created_at` descending, undated records last
pub fn sort_newest_first(records: &mut [VersionRecord]) {
    records.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn not_found_or(name: &str, operation: &'static str, err: BackendError) -> ResolveError {
    if err.is_not_found() {
        ResolveError::ResourceNotFound {
            name: name.to_string(),
        }
    } else {
        ResolveError::backend(name, operation, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    /// Reader over a fixed history, counting calls
    struct FixedReader {
        records: Vec<VersionRecord>,
        history_calls: AtomicUsize,
        last_lookup: Mutex<Option<PointLookup>>,
    }

    impl FixedReader {
        fn new(records: Vec<VersionRecord>) -> Self {
            Self {
                records,
                history_calls: AtomicUsize::new(0),
                last_lookup: Mutex::new(None),
            }
        }

        fn last_lookup(&self) -> Option<PointLookup> {
            self.last_lookup.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VersionedResourceReader for FixedReader {
        async fn get(&self, lookup: &PointLookup) -> Result<VersionRecord, BackendError> {
            *self.last_lookup.lock().unwrap() = Some(lookup.clone());
            let found = match lookup {
                PointLookup::Latest(_) => self.records.last(),
                PointLookup::Qualified(q) => {
                    let (_, v) = q.rsplit_once(':').unwrap();
                    self.records
                        .iter()
                        .find(|r| r.version == RecordVersion::Numeric(v.parse().unwrap()))
                }
                PointLookup::Labeled { label, .. } => {
                    self.records.iter().find(|r| r.labels.contains(label))
                }
            };
            found.cloned().ok_or_else(|| BackendError::NotFound("x".into()))
        }

        async fn history(&self, _name: &str) -> Result<Vec<VersionRecord>, BackendError> {
            self.history_calls.fetch_add(1, AtomicOrdering::SeqCst);
            // reversed to prove the resolver sorts
            Ok(self.records.iter().rev().cloned().collect())
        }
    }

    fn at(minute: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).single()
    }

    /// v1, v2, v3 oldest to newest
    fn three_versions() -> Vec<VersionRecord> {
        (1..=3)
            .map(|n| VersionRecord::new(RecordVersion::Numeric(n), format!("v{n}"), at(n as u32)))
            .collect()
    }

    #[tokio::test]
    async fn latest_uses_point_lookup() {
        let reader = FixedReader::new(three_versions());
        let resolved = resolve(&VersionSpec::latest("/p"), &reader).await.unwrap();
        assert_eq!(resolved.value, "v3");
        assert_eq!(reader.history_calls.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(reader.last_lookup(), Some(PointLookup::Latest("/p".into())));
    }

    #[tokio::test]
    async fn numeric_without_shift_is_qualified() {
        let reader = FixedReader::new(three_versions());
        let spec = VersionSpec::latest("/p").at(AbsoluteIdentifier::Numeric(2));
        let resolved = resolve(&spec, &reader).await.unwrap();
        assert_eq!(resolved.value, "v2");
        assert_eq!(reader.last_lookup(), Some(PointLookup::Qualified("/p:2".into())));
    }

    #[tokio::test]
    async fn absolute_plus_shift() {
        let reader = FixedReader::new(three_versions());
        let spec = VersionSpec::latest("/p")
            .at(AbsoluteIdentifier::Numeric(3))
            .shifted(2);
        let resolved = resolve(&spec, &reader).await.unwrap();
        assert_eq!(resolved.value, "v1");
        assert_eq!(reader.history_calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shift_from_latest() {
        let reader = FixedReader::new(three_versions());
        let resolved = resolve(&VersionSpec::latest("/p").shifted(1), &reader).await.unwrap();
        assert_eq!(resolved.version, RecordVersion::Numeric(2));
    }

    #[tokio::test]
    async fn shift_out_of_range() {
        let reader = FixedReader::new(vec![VersionRecord::new(RecordVersion::Numeric(1), "v1", at(1))]);
        let err = resolve(&VersionSpec::latest("/p").shifted(5), &reader)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::ShiftOutOfRange(5)));
    }

    #[tokio::test]
    async fn absolute_missing_from_history() {
        let reader = FixedReader::new(three_versions());
        let spec = VersionSpec::latest("/p")
            .at(AbsoluteIdentifier::Numeric(9))
            .shifted(1);
        let err = resolve(&spec, &reader).await.unwrap_err();
        assert!(matches!(err, ResolveError::AbsoluteNotInHistory { .. }));
    }

    #[tokio::test]
    async fn empty_history_is_not_found() {
        let reader = FixedReader::new(Vec::new());
        let err = resolve(&VersionSpec::latest("/p").shifted(1), &reader)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn undated_records_sort_last_and_stay_stable() {
        let mut records = vec![
            VersionRecord::new(RecordVersion::Numeric(1), "a", None),
            VersionRecord::new(RecordVersion::Numeric(2), "b", at(1)),
            VersionRecord::new(RecordVersion::Numeric(3), "c", None),
            VersionRecord::new(RecordVersion::Numeric(4), "d", at(5)),
        ];
        sort_newest_first(&mut records);
        let order: Vec<_> = records.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(order, vec!["d", "b", "a", "c"]);
    }
}
