//! Query result caches
//!
//! The loader memoizes parsed rows per `(endpoint, query text)` through the
//! [`QueryCache`] trait. The cache is passed in explicitly; there is no
//! process-wide instance.
//!
//! Implementations here:
//! - [`MemoryCache`]: unbounded map, entries live as long as the cache
//! - [`LruQueryCache`]: bounded by entry count, least recently used evicted
//!
//! Thread-safe via interior mutability using parking_lot locks.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use cubefetch_client::Row;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};

/// Parsed rows shared between the cache and every reader.
pub type Rows = Arc<[Row]>;

/// Exact-match key: endpoint identity plus the full query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(endpoint: &str, query: &str) -> Self {
        Self(format!("{} - {}", endpoint, query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Synchronous key/value store for query results.
///
/// Implementations decide on eviction and expiry; the loader never removes
/// entries itself. Both methods take `&self` so one cache can serve many
/// concurrent batches.
pub trait QueryCache: Send + Sync {
    /// Look up rows for `key`.
    fn get(&self, key: &CacheKey) -> Option<Rows>;

    /// Store rows for `key`, replacing any previous entry.
    fn set(&self, key: CacheKey, rows: Rows);
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries written
    pub insertions: u64,
    /// Entries dropped to make room
    pub evictions: u64,
}

impl CacheMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Unbounded in-memory cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Rows>>,
    metrics: Mutex<CacheMetrics>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached queries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry. Metrics are kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Get a snapshot of cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.lock().clone()
    }
}

impl QueryCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Rows> {
        let rows = self.entries.read().get(key).cloned();
        self.metrics.lock().record_lookup(rows.is_some());
        rows
    }

    fn set(&self, key: CacheKey, rows: Rows) {
        self.entries.write().insert(key, rows);
        self.metrics.lock().insertions += 1;
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Inner state for LruQueryCache (protected by Mutex)
struct LruState {
    entries: LruCache<CacheKey, Rows>,
    metrics: CacheMetrics,
}

/// Entry-count bounded cache with LRU eviction.
///
/// `get` updates recency, so the lock is exclusive for reads as well.
pub struct LruQueryCache {
    capacity: NonZeroUsize,
    state: Mutex<LruState>,
}

impl LruQueryCache {
    /// Create a cache holding at most `capacity` queries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LruState {
                entries: LruCache::new(capacity),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Like [`new`](Self::new); `None` for a capacity of zero.
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(Self::new)
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Check presence without touching recency or metrics
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains(key)
    }

    /// Get a snapshot of cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }
}

impl QueryCache for LruQueryCache {
    fn get(&self, key: &CacheKey) -> Option<Rows> {
        let mut state = self.state.lock();
        let rows = state.entries.get(key).cloned();
        state.metrics.record_lookup(rows.is_some());
        rows
    }

    fn set(&self, key: CacheKey, rows: Rows) {
        let mut state = self.state.lock();
        // push returns the displaced pair; same key means an overwrite
        if let Some((old_key, _)) = state.entries.push(key.clone(), rows) {
            if old_key != key {
                state.metrics.evictions += 1;
            }
        }
        state.metrics.insertions += 1;
    }
}

impl fmt::Debug for LruQueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruQueryCache")
            .field("capacity", &self.capacity)
            .field("entries", &self.len())
            .finish()
    }
}
