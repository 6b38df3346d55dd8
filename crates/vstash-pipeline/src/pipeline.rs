//! Diff/push pipeline
//!
//! Connects the staging store to the backends through their [`Strategy`].
//! Every backend call of one pipeline goes through the same [`RunContext`],
//! so a single deadline or cancellation covers the whole run.

use crate::context::RunContext;
use crate::diff::{Comparison, RenderedDiff};
use crate::error::{PipelineError, PipelineResult};
use crate::fanout::{fetch_current_all, DEFAULT_MAX_CONCURRENCY};
use crate::key::StagedKey;
use crate::report::{DiffOutcome, DiffReport, FetchFailure, ItemDiff, PushFailure, PushSummary, VersionDiff};
use crate::warning::{Side, Warning};
use std::collections::BTreeMap;
use std::sync::Arc;
use vstash_backend::{Backends, Durable, PushMetadata, Strategy, UpsertMode};
use vstash_staging::{FileLock, Namespace, Operation, StagingEntry, Store};
use vstash_version::{parse, resolve, BackendGrammar, ResolvedVersion, VersionRecord, VersionSpec};

/// Diff and push staged changes
#[derive(Debug, Clone)]
pub struct Pipeline {
    store: Arc<Store>,
    backends: Backends,
    durable: Option<Arc<dyn Durable>>,
    ctx: RunContext,
    max_concurrency: usize,
    json: bool,
}

impl Pipeline {
    /// Pipeline over `store` and `backends` with default settings
    #[must_use]
    pub fn new(store: Arc<Store>, backends: Backends) -> Self {
        Self {
            store,
            backends,
            durable: None,
            ctx: RunContext::background(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            json: false,
        }
    }

    /// With run context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, ctx: RunContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// With a remote shared between processes
    ///
    /// Pushes then run under its lock and are persisted before the entry
    /// is unstaged.
    #[inline]
    #[must_use]
    pub fn with_durable(mut self, durable: Arc<dyn Durable>) -> Self {
        self.durable = Some(durable);
        self
    }

    /// With fan-out ceiling
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// With JSON-aware comparison
    #[inline]
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Staging store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Strategy for `namespace`
    ///
    /// # Errors
    /// `PipelineError::NoBackend` if none is registered
    pub fn strategy(&self, namespace: Namespace) -> PipelineResult<Arc<dyn Strategy>> {
        self.backends
            .get(namespace)
            .ok_or(PipelineError::NoBackend(namespace))
    }

    /// Compare one staged entry with the remote
    ///
    /// Identical entries are reported, not unstaged.
    ///
    /// # Errors
    /// `NotStaged` (recoverable), a missing backend, or the fetch failure
    pub async fn diff_one(&self, namespace: Namespace, name: &str) -> PipelineResult<DiffReport> {
        let key = StagedKey::new(namespace, name);
        let entry = self.store.get(namespace, name)?;
        let strategy = self.strategy(namespace)?;

        let current = self
            .ctx
            .run(strategy.fetch_current(name))
            .await
            .map_err(|e| PipelineError::backend(key.clone(), "fetch", e))?;

        let (item, warning) = self.compare(key, &entry, current.as_ref(), &strategy.grammar());
        Ok(DiffReport {
            diffs: vec![item],
            warnings: warning.into_iter().collect(),
            ..DiffReport::default()
        })
    }

    /// Compare every staged entry in `scope` with the remote
    ///
    /// Live values are fetched concurrently. A failed fetch does not stop
    /// the others: every fetched key is compared, and failures are listed
    /// in [`DiffReport::failed`] for the caller to report after the diffs.
    /// Entries identical to the remote are unstaged with one warning each.
    ///
    /// # Errors
    /// Store errors or a missing backend for a staged namespace
    pub async fn diff_all(&self, scope: Option<Namespace>) -> PipelineResult<DiffReport> {
        let staged = self.store.list(scope)?;

        let mut grammars = BTreeMap::new();
        let mut entries = BTreeMap::new();
        let mut items = Vec::new();
        for (namespace, by_name) in staged {
            let strategy = self.strategy(namespace)?;
            grammars.insert(namespace, strategy.grammar());
            for (name, entry) in by_name {
                let key = StagedKey::new(namespace, name);
                items.push((key.clone(), Arc::clone(&strategy)));
                entries.insert(key, entry);
            }
        }

        let fetched = fetch_current_all(&self.ctx, items, self.max_concurrency).await;

        let mut report = DiffReport::default();
        for (key, result) in fetched {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    let error = PipelineError::backend(key.clone(), "fetch", e);
                    tracing::warn!(%key, %error, "fetch failed");
                    report.failed.push(FetchFailure { key, error });
                    continue;
                }
            };
            let (Some(entry), Some(grammar)) = (entries.remove(&key), grammars.get(&key.namespace)) else {
                continue;
            };
            let (item, warning) = self.compare(key, &entry, record.as_ref(), grammar);
            report.warnings.extend(warning);

            if item.outcome.is_identical() {
                self.commit(&item.key).await?;
                report.warnings.push(
                    Warning::AutoUnstaged {
                        key: item.key.clone(),
                    }
                    .raise(),
                );
                report.unstaged.push(item.key);
            } else {
                report.diffs.push(item);
            }
        }
        Ok(report)
    }

    /// Compare two versions of a resource
    ///
    /// `right` defaults to the latest revision of `left`'s resource. Equal
    /// values raise a warning suggesting a shifted comparison.
    ///
    /// # Errors
    /// Parse or resolve errors, or a missing backend
    pub async fn diff_versions(
        &self,
        namespace: Namespace,
        left: &str,
        right: Option<&str>,
    ) -> PipelineResult<VersionDiff> {
        let strategy = self.strategy(namespace)?;
        let grammar = strategy.grammar();

        let left = parse(left, &grammar)?;
        let right = match right {
            Some(text) => parse(text, &grammar)?,
            None => VersionSpec::latest(left.name.clone()),
        };

        let left_version = self.resolve(namespace, &left, strategy.as_ref()).await?;
        let right_version = self.resolve(namespace, &right, strategy.as_ref()).await?;

        let left_label = pinned_label(&left_version, &grammar);
        let right_label = pinned_label(&right_version, &grammar);
        let comparison = Comparison::prepare(
            &left.name,
            &left_version.value,
            &right_version.value,
            self.json,
            (Side::Left, Side::Right),
        );

        let mut warnings: Vec<Warning> = comparison.warning.iter().cloned().collect();
        let outcome = if comparison.is_identical() {
            warnings.push(
                Warning::IdenticalVersions {
                    left: left_label.clone(),
                    right: right_label.clone(),
                    hint: VersionSpec::latest(left.name.clone()).shifted(1).render(&grammar),
                }
                .raise(),
            );
            DiffOutcome::Identical
        } else {
            DiffOutcome::Changed(RenderedDiff {
                text: comparison.render(&left_label, &right_label),
                old_label: left_label.clone(),
                new_label: right_label.clone(),
            })
        };

        Ok(VersionDiff {
            left: left_label,
            right: right_label,
            outcome,
            warnings,
        })
    }

    /// Push one staged entry and unstage it on success
    ///
    /// On failure the entry stays staged; pushing again retries.
    ///
    /// # Errors
    /// `NotStaged` (recoverable), a missing backend, or the backend failure
    pub async fn push(&self, namespace: Namespace, name: &str) -> PipelineResult<Operation> {
        let key = StagedKey::new(namespace, name);
        let strategy = self.strategy(namespace)?;
        let _remote = self.lock_remote().await?;
        let entry = self.store.get(namespace, name)?;

        let pushed = self.push_entry(&key, &entry, strategy.as_ref()).await;
        // a failed push may still have changed part of the remote
        self.persist_remote().await?;
        pushed?;
        self.commit(&key).await?;
        Ok(entry.operation)
    }

    /// Push every staged entry in `scope`, one at a time in key order
    ///
    /// Each success is committed immediately; failures stay staged and are
    /// listed in the summary.
    ///
    /// # Errors
    /// Store errors, a missing backend for a staged namespace (checked
    /// before anything is pushed), or a remote that cannot be saved
    pub async fn push_all(&self, scope: Option<Namespace>) -> PipelineResult<PushSummary> {
        let _remote = self.lock_remote().await?;
        let staged = self.store.list(scope)?;
        let strategies = staged
            .keys()
            .map(|ns| self.strategy(*ns).map(|s| (*ns, s)))
            .collect::<PipelineResult<BTreeMap<_, _>>>()?;

        let mut summary = PushSummary::default();
        for (namespace, by_name) in staged {
            let Some(strategy) = strategies.get(&namespace) else {
                continue;
            };
            for (name, entry) in by_name {
                let key = StagedKey::new(namespace, name);
                let pushed = self.push_entry(&key, &entry, strategy.as_ref()).await;
                self.persist_remote().await?;
                let pushed = match pushed {
                    Ok(()) => self.commit(&key).await,
                    Err(e) => Err(e),
                };
                match pushed {
                    Ok(()) => summary.pushed.push((key, entry.operation)),
                    Err(error) => {
                        tracing::warn!(%key, %error, "push failed");
                        summary.failed.push(PushFailure { key, error });
                    }
                }
            }
        }
        tracing::info!(
            pushed = summary.pushed.len(),
            failed = summary.failed.len(),
            "push finished"
        );
        Ok(summary)
    }

    async fn push_entry(&self, key: &StagedKey, entry: &StagingEntry, strategy: &dyn Strategy) -> PipelineResult<()> {
        let call = async {
            match UpsertMode::for_operation(entry.operation) {
                Some(mode) => {
                    let metadata = PushMetadata::new(mode)
                        .with_description(entry.description.clone())
                        .with_tags(entry.tag_change());
                    strategy.push_upsert(&key.name, &entry.value, &metadata).await
                }
                None => strategy.push_delete(&key.name, entry.delete_options.as_ref()).await,
            }
        };
        self.ctx
            .run(call)
            .await
            .map_err(|e| PipelineError::backend(key.clone(), "push", e))?;
        tracing::info!(%key, operation = %entry.operation, "pushed");
        Ok(())
    }

    /// Lock a shared remote and reload it; `None` without one
    ///
    /// The lock is released when the returned guard drops.
    async fn lock_remote(&self) -> PipelineResult<Option<FileLock>> {
        let Some(durable) = self.durable.clone() else {
            return Ok(None);
        };
        let lock = tokio::task::spawn_blocking(move || durable.lock())
            .await
            .map_err(PipelineError::Blocking)??;
        Ok(Some(lock))
    }

    async fn persist_remote(&self) -> PipelineResult<()> {
        let Some(durable) = self.durable.clone() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || durable.persist())
            .await
            .map_err(PipelineError::Blocking)??;
        Ok(())
    }

    /// Unstage after a successful push or an identical diff
    ///
    /// Runs on the blocking pool since it waits on the cross-process lock.
    async fn commit(&self, key: &StagedKey) -> PipelineResult<()> {
        let store = Arc::clone(&self.store);
        let owned = key.clone();
        let result = tokio::task::spawn_blocking(move || store.unstage(owned.namespace, &owned.name))
            .await
            .map_err(PipelineError::Blocking)?;
        match result {
            Ok(_) => Ok(()),
            // unstaged by someone else meanwhile
            Err(e) if e.is_not_staged() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve(
        &self,
        namespace: Namespace,
        spec: &VersionSpec,
        strategy: &dyn Strategy,
    ) -> PipelineResult<ResolvedVersion> {
        let resolved = self
            .ctx
            .run(async { Ok(resolve(spec, strategy.reader()).await) })
            .await
            .map_err(|e| PipelineError::backend(StagedKey::new(namespace, spec.name.clone()), "resolve", e))??;
        Ok(resolved)
    }

    fn compare(
        &self,
        key: StagedKey,
        entry: &StagingEntry,
        current: Option<&VersionRecord>,
        grammar: &BackendGrammar,
    ) -> (ItemDiff, Option<Warning>) {
        let remote = current.map_or("", |r| r.value.as_str());
        let comparison = Comparison::prepare(
            &key.name,
            remote,
            entry.staged_value(),
            self.json,
            (Side::Remote, Side::Staged),
        );

        let outcome = if comparison.is_identical() {
            DiffOutcome::Identical
        } else {
            let old_label = match current {
                Some(record) => format!(
                    "{} (remote)",
                    VersionSpec::latest(key.name.clone())
                        .at(record.version.to_absolute())
                        .render(grammar)
                ),
                None => format!("{} (not found)", key.name),
            };
            let new_label = format!("{} (staged for {})", key.name, entry.operation);
            DiffOutcome::Changed(RenderedDiff {
                text: comparison.render(&old_label, &new_label),
                old_label,
                new_label,
            })
        };

        let item = ItemDiff {
            key,
            operation: entry.operation,
            outcome,
        };
        (item, comparison.warning)
    }
}

fn pinned_label(version: &ResolvedVersion, grammar: &BackendGrammar) -> String {
    VersionSpec::latest(version.name.clone())
        .at(version.version.to_absolute())
        .render(grammar)
}
