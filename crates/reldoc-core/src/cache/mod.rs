//! Adaptive-replacement document cache.
//!
//! Four `lru` lists: `t1` holds keys seen once recently, `t2` keys seen at
//! least twice, `b1`/`b2` remember keys recently evicted from each. A ghost
//! hit in `b1` grows the recency target `p`, one in `b2` shrinks it, so the
//! balance between recency and frequency follows the access pattern.

use crate::serialize::ContentHash;
use lru::LruCache;
use parking_lot::Mutex;
use std::{fmt, hash::Hash, num::NonZeroUsize, sync::Arc};

///
/// CachedDocument
/// Decoded document plus the bytes and hash it was decoded from.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CachedDocument<D> {
    pub document: D,
    pub bytes: Vec<u8>,
    pub hash: ContentHash,
}

/// Per-collection cache keyed by primary key.
pub type DocumentCache<D> = ArcCache<String, Arc<CachedDocument<D>>>;

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub capacity: usize,
    pub len: usize,
    pub recent: usize,
    pub frequent: usize,
    pub ghosts: usize,
    /// Current adaptive target size of the recent list.
    pub target: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    #[must_use]
    pub const fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

///
/// ArcCache
///

pub struct ArcCache<K, V> {
    state: Mutex<ArcState<K, V>>,
}

struct ArcState<K, V> {
    capacity: usize,
    p: usize,
    t1: LruCache<K, V>,
    t2: LruCache<K, V>,
    b1: LruCache<K, ()>,
    b2: LruCache<K, ()>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> ArcCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(ArcState {
                capacity: capacity.get(),
                p: 0,
                t1: LruCache::unbounded(),
                t2: LruCache::unbounded(),
                b1: LruCache::unbounded(),
                b2: LruCache::unbounded(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.t1.len() + state.t2.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        let state = self.state.lock();
        state.t1.contains(key) || state.t2.contains(key)
    }

    /// Look up `key`; a hit promotes it to the frequent list.
    pub fn get(&self, key: &K) -> Option<V> {
        self.state.lock().get(key)
    }

    /// Install or refresh `key`.
    pub fn insert(&self, key: K, value: V) {
        self.state.lock().insert(key, value);
    }

    /// Drop `key` and its ghost so a later insert starts cold.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        state.b1.pop(key);
        state.b2.pop(key);

        state.t1.pop(key).or_else(|| state.t2.pop(key))
    }

    /// Return the cached value or run `loader` and cache what it yields.
    ///
    /// The lock is not held while the loader runs; `Ok(None)` from the
    /// loader is passed through and nothing is cached.
    pub fn get_or_load<E, F>(&self, key: &K, loader: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Some(value));
        }

        let loaded = loader()?;
        if let Some(value) = &loaded {
            self.insert(key.clone(), value.clone());
        }

        Ok(loaded)
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.t1.clear();
        state.t2.clear();
        state.b1.clear();
        state.b2.clear();
        state.p = 0;
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();

        CacheStats {
            capacity: state.capacity,
            len: state.t1.len() + state.t2.len(),
            recent: state.t1.len(),
            frequent: state.t2.len(),
            ghosts: state.b1.len() + state.b2.len(),
            target: state.p,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }
}

impl<K, V> fmt::Debug for ArcCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl<K, V> ArcState<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn get(&mut self, key: &K) -> Option<V> {
        if let Some(value) = self.t1.pop(key) {
            self.t2.put(key.clone(), value.clone());
            self.hits += 1;
            return Some(value);
        }
        if let Some(value) = self.t2.get(key) {
            self.hits += 1;
            return Some(value.clone());
        }

        self.misses += 1;
        None
    }

    fn insert(&mut self, key: K, value: V) {
        let c = self.capacity;

        // resident: refresh and promote
        if self.t1.pop(&key).is_some() || self.t2.contains(&key) {
            self.t2.put(key, value);
            return;
        }

        // recently evicted from t1: favour recency
        if self.b1.contains(&key) {
            let delta = (self.b2.len() / self.b1.len()).max(1);
            self.p = (self.p + delta).min(c);
            self.replace(false);
            self.b1.pop(&key);
            self.t2.put(key, value);
            return;
        }

        // recently evicted from t2: favour frequency
        if self.b2.contains(&key) {
            let delta = (self.b1.len() / self.b2.len()).max(1);
            self.p = self.p.saturating_sub(delta);
            self.replace(true);
            self.b2.pop(&key);
            self.t2.put(key, value);
            return;
        }

        let l1 = self.t1.len() + self.b1.len();
        if l1 >= c {
            if self.t1.len() < c {
                self.b1.pop_lru();
                self.replace(false);
            } else if self.t1.pop_lru().is_some() {
                self.evictions += 1;
            }
        } else {
            let total = l1 + self.t2.len() + self.b2.len();
            if total >= c {
                if total >= 2 * c {
                    self.b2.pop_lru();
                }
                self.replace(false);
            }
        }

        self.t1.put(key, value);
    }

    // evict one resident entry into its ghost list
    fn replace(&mut self, hit_in_b2: bool) {
        if self.t1.len() + self.t2.len() < self.capacity {
            return;
        }

        let t1 = self.t1.len();
        let evict_recent = t1 > 0 && (t1 > self.p || (hit_in_b2 && t1 == self.p));

        let evicted = if evict_recent {
            self.t1.pop_lru().map(|(k, _)| self.b1.put(k, ()))
        } else {
            self.t2.pop_lru().map(|(k, _)| self.b2.put(k, ()))
        };

        if evicted.is_some() {
            self.evictions += 1;
        }
    }
}
