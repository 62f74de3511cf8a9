use std::{fmt::Debug, future::Future, hash::Hash, sync::Arc};

use dashmap::DashMap;
use tracing::debug;

use crate::models::Release;

/// Backing storage for a named cache.
///
/// Implementations must not fail: a store that cannot serve a read answers `None`, and a
/// store that cannot accept a write drops it.
pub trait CacheStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn put(&self, key: K, value: V);
    fn remove(&self, key: &K);
    fn clear(&self);
    fn len(&self) -> usize;
}

/// Process-local store. Once `max_entries` is reached new keys are not stored until the
/// cache is cleared.
pub struct MemoryStore<K, V> {
    entries: DashMap<K, V>,
    max_entries: usize,
}

impl<K: Eq + Hash, V> MemoryStore<K, V> {
    pub fn new(max_entries: usize) -> Self {
        Self { entries: DashMap::new(), max_entries }
    }
}

impl<K, V> CacheStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: K, value: V) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            return;
        }
        self.entries.insert(key, value);
    }

    fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Store used when caching is switched off: every read misses.
pub struct DisabledStore;

impl<K, V> CacheStore<K, V> for DisabledStore {
    fn get(&self, _key: &K) -> Option<V> {
        None
    }

    fn put(&self, _key: K, _value: V) {}

    fn remove(&self, _key: &K) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }
}

pub struct Cache<K, V> {
    name: &'static str,
    store: Arc<dyn CacheStore<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self { name: self.name, store: self.store.clone() }
    }
}

impl<K, V> Cache<K, V>
where
    K: Debug,
    V: Clone,
{
    pub fn new(name: &'static str, store: Arc<dyn CacheStore<K, V>>) -> Self {
        Self { name, store }
    }

    /// Read-through lookup. Only successful results are stored; concurrent misses on the same
    /// key may each run `compute`.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.store.get(&key) {
            debug!(cache = self.name, key = ?key, "cache hit");
            return Ok(value);
        }

        debug!(cache = self.name, key = ?key, "cache miss");
        let value = compute().await?;
        self.store.put(key, value.clone());
        Ok(value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.store.get(key)
    }

    pub fn evict(&self, key: &K) {
        debug!(cache = self.name, key = ?key, "evicting entry");
        self.store.remove(key);
    }

    pub fn evict_all(&self) {
        debug!(cache = self.name, "evicting all entries");
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The two caches fronting the release store: `release` by id, `releases` by list key.
#[derive(Clone)]
pub struct CacheManager {
    release: Cache<i32, Release>,
    releases: Cache<String, Vec<Release>>,
}

impl CacheManager {
    pub fn new(enabled: bool, max_entries: usize) -> Self {
        if enabled {
            Self {
                release: Cache::new("release", Arc::new(MemoryStore::new(max_entries))),
                releases: Cache::new("releases", Arc::new(MemoryStore::new(max_entries))),
            }
        } else {
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self {
            release: Cache::new("release", Arc::new(DisabledStore)),
            releases: Cache::new("releases", Arc::new(DisabledStore)),
        }
    }

    pub fn release(&self) -> &Cache<i32, Release> {
        &self.release
    }

    pub fn releases(&self) -> &Cache<String, Vec<Release>> {
        &self.releases
    }
}
