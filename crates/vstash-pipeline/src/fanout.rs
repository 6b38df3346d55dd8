//! Bounded fan-out of live-value fetches
//!
//! Every key is fetched independently with at most `max_concurrency` calls
//! in flight. A failing key does not stop its siblings. Results come back
//! sorted by key whatever order the fetches finished in. Dropping the
//! returned future drops every in-flight fetch with it.

use crate::context::RunContext;
use crate::key::StagedKey;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use vstash_backend::Strategy;
use vstash_version::{BackendError, VersionRecord};

/// Default ceiling on simultaneous backend calls
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Outcome of one fetch
pub type Fetched = (StagedKey, Result<Option<VersionRecord>, BackendError>);

/// Fetch the current revision of every key
pub async fn fetch_current_all(
    ctx: &RunContext,
    items: Vec<(StagedKey, Arc<dyn Strategy>)>,
    max_concurrency: usize,
) -> Vec<Fetched> {
    let limit = max_concurrency.max(1);
    tracing::debug!(keys = items.len(), limit, "fetching current values");

    let mut results: Vec<Fetched> = stream::iter(items)
        .map(|(key, strategy)| async move {
            let result = ctx.run(strategy.fetch_current(&key.name)).await;
            if let Err(e) = &result {
                tracing::debug!(%key, error = %e, "fetch failed");
            }
            (key, result)
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vstash_backend::ParameterStore;
    use vstash_staging::Namespace;
    use vstash_test_utils::{DelayedStrategy, FlakyStrategy};

    #[tokio::test]
    async fn sorted_regardless_of_completion_order() {
        let inner = Arc::new(ParameterStore::new());
        for name in ["/a", "/b", "/c"] {
            inner.put(name, vstash_backend::ParameterType::String, name);
        }
        // earlier keys finish last
        let items = ["/a", "/b", "/c"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let delay = Duration::from_millis(30 - 10 * i as u64);
                let strategy: Arc<dyn Strategy> = Arc::new(DelayedStrategy::new(inner.clone(), delay));
                (StagedKey::new(Namespace::Param, *name), strategy)
            })
            .collect();

        let results = fetch_current_all(&RunContext::background(), items, 10).await;
        let names: Vec<_> = results.iter().map(|(k, _)| k.name.as_str()).collect();
        assert_eq!(names, ["/a", "/b", "/c"]);
        assert!(results.iter().all(|(_, r)| r.as_ref().unwrap().is_some()));
    }

    #[tokio::test]
    async fn failure_is_captured_per_key() {
        let inner = Arc::new(ParameterStore::new());
        inner.put("/ok", vstash_backend::ParameterType::String, "v");
        let flaky: Arc<dyn Strategy> = Arc::new(FlakyStrategy::new(inner.clone()).fail_on("/bad"));

        let items = vec![
            (StagedKey::new(Namespace::Param, "/bad"), Arc::clone(&flaky)),
            (StagedKey::new(Namespace::Param, "/ok"), Arc::clone(&flaky)),
            (StagedKey::new(Namespace::Param, "/missing"), flaky),
        ];
        let results = fetch_current_all(&RunContext::background(), items, 2).await;

        assert!(results[0].1.is_err());
        assert!(results[1].1.as_ref().unwrap().is_none());
        assert_eq!(results[2].1.as_ref().unwrap().as_ref().unwrap().value, "v");
    }

    #[tokio::test]
    async fn cancelled_context_fails_every_fetch() {
        let inner = Arc::new(ParameterStore::new());
        inner.put("/a", vstash_backend::ParameterType::String, "v");
        let (ctx, handle) = RunContext::new();
        handle.cancel();

        let strategy: Arc<dyn Strategy> = inner;
        let results = fetch_current_all(&ctx, vec![(StagedKey::new(Namespace::Param, "/a"), strategy)], 10).await;
        assert_eq!(results[0].1, Err(BackendError::Cancelled));
    }
}
