//! LRU cache for fetched commit diffs.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::diff::{CommitDiff, DiffKey};
use crate::error::FetchError;

/// A finished diff fetch. In-flight fetches are tracked by the fetcher, not here.
#[derive(Clone, Debug)]
pub enum CachedDiff {
    Loaded(Arc<CommitDiff>),
    Failed(FetchError),
}

/// Thread-safe LRU cache keyed by commit and diff options.
pub struct DiffCache {
    cache: RwLock<LruCache<DiffKey, CachedDiff>>,
}

impl DiffCache {
    /// Create a new cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN.saturating_add(255));
        Self {
            cache: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Get a cached entry and mark it recently used.
    pub fn get(&self, key: &DiffKey) -> Option<CachedDiff> {
        self.cache.write().get(key).cloned()
    }

    /// Look without touching the recency order.
    pub fn peek(&self, key: &DiffKey) -> Option<CachedDiff> {
        self.cache.read().peek(key).cloned()
    }

    pub fn insert(&self, key: DiffKey, entry: CachedDiff) {
        self.cache.write().put(key, entry);
    }

    pub fn remove(&self, key: &DiffKey) {
        self.cache.write().pop(key);
    }

    /// Drop every entry for `commit`, whatever its diff options.
    pub fn invalidate_commit(&self, commit: &str) {
        let mut cache = self.cache.write();
        let keys: Vec<DiffKey> = cache
            .iter()
            .filter(|(k, _)| k.commit == commit)
            .map(|(k, _)| k.clone())
            .collect();
        for k in keys {
            cache.pop(&k);
        }
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }
}
