//! Strategy registry
//!
//! Built once at startup; the pipeline looks strategies up by namespace and
//! never branches on the concrete backend.

use crate::strategy::Strategy;
use std::collections::BTreeMap;
use std::sync::Arc;
use vstash_staging::Namespace;

/// One strategy per namespace
#[derive(Debug, Clone, Default)]
pub struct Backends {
    strategies: BTreeMap<Namespace, Arc<dyn Strategy>>,
}

impl Backends {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` under its own namespace, replacing any previous one
    #[inline]
    #[must_use]
    pub fn with(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Register `strategy` under its own namespace
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(strategy.namespace(), strategy);
    }

    /// Strategy for `namespace`
    #[must_use]
    pub fn get(&self, namespace: Namespace) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(&namespace).cloned()
    }

    /// Registered namespaces, in order
    pub fn namespaces(&self) -> impl Iterator<Item = Namespace> + '_ {
        self.strategies.keys().copied()
    }
}
