//! Backing-map contracts for the concurrent LRU cache.
//!
//! A store owns the authoritative key → value mapping: it alone decides
//! whether a key is present. The cache's recency list only orders what the
//! store already holds. Stores never reject inserts; the cache keeps them
//! bounded by evicting.
//!
//! Two primitives beyond a plain map are required:
//!
//! - [`insert_if_absent`](ConcurrentStore::insert_if_absent) so two racing
//!   `put`s for the same key end up sharing one node.
//! - [`remove_if_same`](ConcurrentStore::remove_if_same) so eviction only
//!   removes a key that still maps to the exact node it inspected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    /// `insert_if_absent` calls that found the key already mapped.
    pub insert_conflicts: u64,
    pub removes: u64,
    /// Successful `remove_if_same` calls.
    pub conditional_removes: u64,
}

/// Relaxed atomic counters shared by the hash map stores.
#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    insert_conflicts: AtomicU64,
    removes: AtomicU64,
    conditional_removes: AtomicU64,
}

impl StoreCounters {
    pub(crate) fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            insert_conflicts: self.insert_conflicts.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            conditional_removes: self.conditional_removes.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_insert_conflict(&self) {
        self.insert_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_conditional_remove(&self) {
        self.conditional_removes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Thread-safe key → `Arc<V>` map with interior mutability.
pub trait ConcurrentStore<K, V>: Send + Sync {
    /// Fetch a value by key.
    fn get(&self, key: &K) -> Option<Arc<V>>;

    /// Check if a key exists.
    fn contains(&self, key: &K) -> bool;

    /// Current number of entries.
    fn len(&self) -> usize;

    /// Check if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map `key` to `value` unless it is already mapped.
    ///
    /// Returns `None` if `value` was stored, or the value that already
    /// occupies the key (which is left untouched).
    fn insert_if_absent(&self, key: K, value: Arc<V>) -> Option<Arc<V>>;

    /// Remove a value by key.
    fn remove(&self, key: &K) -> Option<Arc<V>>;

    /// Remove `key` only if it still maps to `expected` (pointer identity).
    fn remove_if_same(&self, key: &K, expected: &Arc<V>) -> bool;

    /// Snapshot of the keys currently mapped.
    fn keys(&self) -> Vec<K>
    where
        K: Clone;

    /// Snapshot the store's current metrics.
    fn metrics(&self) -> StoreMetrics {
        StoreMetrics::default()
    }
}

/// Factory trait for creating store instances.
///
/// `capacity` is a sizing hint; the created store must not enforce it.
pub trait StoreFactory<K, V> {
    type Store: ConcurrentStore<K, V>;

    /// Create a new, empty store.
    fn create(capacity: usize) -> Self::Store;
}
