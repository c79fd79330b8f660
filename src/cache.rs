// SPDX-License-Identifier: MPL-2.0

//! Shared in-flight lookup cache for the walker (§4.D, §5 Shared-resource policy).
//!
//! Keyed by `(name, version-range canonical form, framework)`, this guarantees at-most-one
//! concurrent [`Provider::find_library`](crate::provider::Provider::find_library) per key:
//! concurrent duplicate requests await the first caller's result rather than re-issuing the
//! lookup. The cache is scoped to a single walk (owned by the [`Walker`](crate::graph::walker)),
//! never process-global, per the Design Notes' guidance on global mutable caches.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::identity::NormalizedName;
use crate::provider::Framework;

/// The cache key: a library name, the canonical textual form of the requested range, and the
/// target framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    name: NormalizedName,
    range_canonical: String,
    framework: Framework,
}

impl LookupKey {
    /// Builds a key from the already-rendered canonical range form.
    pub fn new(name: NormalizedName, range_canonical: String, framework: Framework) -> Self {
        Self {
            name,
            range_canonical,
            framework,
        }
    }
}

/// A single-flight cache: the first caller for a key runs `init`, every other caller for the
/// same key awaits that same computation and receives a clone of its result.
pub struct LookupCache<T> {
    entries: DashMap<LookupKey, Arc<OnceCell<T>>>,
}

impl<T> Default for LookupCache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T: Clone> LookupCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, computing it via `init` if this is the first request
    /// for that key. Concurrent callers for the same key all await the same `init` invocation.
    pub async fn get_or_init<F, Fut>(&self, key: LookupKey, init: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            // Scope the dashmap guard so it is dropped before we `.await` below.
            let entry = self.entries.entry(key).or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };
        cell.get_or_init(init).await.clone()
    }

    /// Number of distinct keys seen so far (including in-flight ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has seen no keys yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(n: &str) -> LookupKey {
        LookupKey::new(n.into(), "[1.0.0, )".to_string(), Framework("net".into()))
    }

    #[tokio::test]
    async fn concurrent_requests_for_the_same_key_run_init_once() {
        let cache: LookupCache<u32> = LookupCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = &cache;
            let calls = Arc::clone(&calls);
            handles.push(async {
                cache
                    .get_or_init(key("A"), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        42
                    })
                    .await
            });
        }
        let results = futures::future::join_all(handles).await;
        assert!(results.iter().all(|&v| v == 42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let cache: LookupCache<u32> = LookupCache::new();
        let a = cache.get_or_init(key("A"), || async { 1 }).await;
        let b = cache.get_or_init(key("B"), || async { 2 }).await;
        assert_eq!((a, b), (1, 2));
        assert_eq!(cache.len(), 2);
    }
}
