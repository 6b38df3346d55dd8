//! Testing utilities for the vstash workspace
//!
//! Shared fixtures: throwaway staging stores, seeded backends, and strategy
//! wrappers that inject failures or latency.

#![allow(missing_docs)]

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vstash_backend::{Backends, ParameterStore, ParameterType, PushMetadata, SecretStore, Strategy, Tagger};
use vstash_staging::{DeleteOptions, Namespace, Store};
use vstash_version::{BackendError, BackendGrammar, VersionRecord, VersionedResourceReader};

/// Staging store in a fresh temp directory; keep the `TempDir` alive
pub fn temp_store() -> (TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::new(dir.path().join("stage.json")));
    (dir, store)
}

/// Temp store plus both in-memory backends
pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<Store>,
    pub parameters: Arc<ParameterStore>,
    pub secrets: Arc<SecretStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let (dir, store) = temp_store();
        Self {
            dir,
            store,
            parameters: Arc::new(ParameterStore::new()),
            secrets: Arc::new(SecretStore::new()),
        }
    }

    /// Write string revisions of a parameter, oldest first
    pub fn with_parameter(self, name: &str, values: &[&str]) -> Self {
        for value in values {
            self.parameters.put(name, ParameterType::String, value);
        }
        self
    }

    /// Write revisions of a secret, oldest first
    pub fn with_secret(self, name: &str, values: &[&str]) -> Self {
        for value in values {
            self.secrets.put(name, value);
        }
        self
    }

    pub fn backends(&self) -> Backends {
        Backends::new()
            .with(self.parameters.clone())
            .with(self.secrets.clone())
    }

    /// Backends with the parameter strategy replaced by `strategy`
    pub fn backends_with(&self, strategy: Arc<dyn Strategy>) -> Backends {
        self.backends().with(strategy)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Strategy wrapper failing every call that touches selected names
#[derive(Debug)]
pub struct FlakyStrategy {
    inner: Arc<dyn Strategy>,
    failing: BTreeSet<String>,
}

impl FlakyStrategy {
    pub fn new(inner: Arc<dyn Strategy>) -> Self {
        Self {
            inner,
            failing: BTreeSet::new(),
        }
    }

    pub fn fail_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    fn check(&self, name: &str) -> Result<(), BackendError> {
        if self.failing.contains(name) {
            Err(BackendError::Transport(format!("injected failure for {name}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Strategy for FlakyStrategy {
    fn namespace(&self) -> Namespace {
        self.inner.namespace()
    }

    fn grammar(&self) -> BackendGrammar {
        self.inner.grammar()
    }

    fn reader(&self) -> &dyn VersionedResourceReader {
        self.inner.reader()
    }

    fn tagger(&self) -> &dyn Tagger {
        self.inner.tagger()
    }

    async fn fetch_current(&self, name: &str) -> Result<Option<VersionRecord>, BackendError> {
        self.check(name)?;
        self.inner.fetch_current(name).await
    }

    async fn push_upsert(&self, name: &str, value: &str, metadata: &PushMetadata) -> Result<(), BackendError> {
        self.check(name)?;
        self.inner.push_upsert(name, value, metadata).await
    }

    async fn push_delete(&self, name: &str, options: Option<&DeleteOptions>) -> Result<(), BackendError> {
        self.check(name)?;
        self.inner.push_delete(name, options).await
    }
}

/// Strategy wrapper delaying fetches and recording peak concurrency
#[derive(Debug)]
pub struct DelayedStrategy {
    inner: Arc<dyn Strategy>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl DelayedStrategy {
    pub fn new(inner: Arc<dyn Strategy>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Highest number of fetches seen in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Strategy for DelayedStrategy {
    fn namespace(&self) -> Namespace {
        self.inner.namespace()
    }

    fn grammar(&self) -> BackendGrammar {
        self.inner.grammar()
    }

    fn reader(&self) -> &dyn VersionedResourceReader {
        self.inner.reader()
    }

    fn tagger(&self) -> &dyn Tagger {
        self.inner.tagger()
    }

    async fn fetch_current(&self, name: &str) -> Result<Option<VersionRecord>, BackendError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.fetch_current(name).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn push_upsert(&self, name: &str, value: &str, metadata: &PushMetadata) -> Result<(), BackendError> {
        self.inner.push_upsert(name, value, metadata).await
    }

    async fn push_delete(&self, name: &str, options: Option<&DeleteOptions>) -> Result<(), BackendError> {
        self.inner.push_delete(name, options).await
    }
}
