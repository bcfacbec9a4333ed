//! HashMap-backed concurrent stores.
//!
//! ## Architecture
//! - Keys map to `Arc<V>` in an `FxHashMap` (or any `BuildHasher`).
//! - `ConcurrentHashMapStore` guards one map with a `parking_lot::RwLock`.
//! - `ShardedHashMapStore` spreads keys over N independently locked maps
//!   chosen by [`ShardSelector`], so unrelated keys rarely contend.
//!
//! ## Core Operations
//! - `get` / `contains`: read lock on one map.
//! - `insert_if_absent`: write lock + entry API; an occupied key is left as is.
//! - `remove` / `remove_if_same`: write lock on one map.
//! - `keys`: visits every shard.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::Arc;
//!
//! use cachewalk::store::hashmap::ShardedHashMapStore;
//! use cachewalk::store::traits::ConcurrentStore;
//!
//! let store: ShardedHashMapStore<u64, String> = ShardedHashMapStore::new(16, 4);
//! assert!(store.insert_if_absent(1, Arc::new("a".to_string())).is_none());
//! // second insert loses and gets the winner back
//! let winner = store.insert_if_absent(1, Arc::new("b".to_string())).unwrap();
//! assert_eq!(*winner, "a");
//! ```
//!
//! ## Thread Safety
//! Both stores are `Send + Sync` whenever `K`, `V` and the hasher are.
//! Lock hold times are a single hash map operation; no lock is held while
//! calling back into user code.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::ds::ShardSelector;
use crate::store::traits::{ConcurrentStore, StoreCounters, StoreFactory, StoreMetrics};

/// Concurrent store guarded by a single `RwLock`.
#[derive(Debug)]
pub struct ConcurrentHashMapStore<K, V, S = FxBuildHasher> {
    map: RwLock<HashMap<K, Arc<V>, S>>,
    metrics: StoreCounters,
}

impl<K, V> ConcurrentHashMapStore<K, V, FxBuildHasher>
where
    K: Eq + Hash,
{
    /// Create a store sized for `capacity` entries with the Fx hasher.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, FxBuildHasher)
    }
}

impl<K, V, S> ConcurrentHashMapStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Create a store with a custom hasher.
    pub fn with_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity_and_hasher(capacity, hasher)),
            metrics: StoreCounters::default(),
        }
    }
}

impl<K, V, S> ConcurrentStore<K, V> for ConcurrentHashMapStore<K, V, S>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        let found = self.map.read().get(key).cloned();
        self.metrics.record_lookup(found.is_some());
        found
    }

    fn contains(&self, key: &K) -> bool {
        self.map.read().contains_key(key)
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }

    fn insert_if_absent(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let mut map = self.map.write();
        match map.entry(key) {
            Entry::Occupied(entry) => {
                self.metrics.inc_insert_conflict();
                Some(Arc::clone(entry.get()))
            },
            Entry::Vacant(entry) => {
                entry.insert(value);
                self.metrics.inc_insert();
                None
            },
        }
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        let removed = self.map.write().remove(key);
        if removed.is_some() {
            self.metrics.inc_remove();
        }
        removed
    }

    fn remove_if_same(&self, key: &K, expected: &Arc<V>) -> bool {
        let mut map = self.map.write();
        match map.get(key) {
            Some(current) if Arc::ptr_eq(current, expected) => {
                map.remove(key);
                self.metrics.inc_conditional_remove();
                true
            },
            _ => false,
        }
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.map.read().keys().cloned().collect()
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}

impl<K, V> StoreFactory<K, V> for ConcurrentHashMapStore<K, V, FxBuildHasher>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    type Store = ConcurrentHashMapStore<K, V, FxBuildHasher>;

    fn create(capacity: usize) -> Self::Store {
        Self::new(capacity)
    }
}

/// Concurrent store with per-shard locking.
#[derive(Debug)]
pub struct ShardedHashMapStore<K, V, S = FxBuildHasher> {
    shards: Vec<RwLock<HashMap<K, Arc<V>, S>>>,
    selector: ShardSelector,
    size: AtomicUsize,
    metrics: StoreCounters,
}

impl<K, V> ShardedHashMapStore<K, V, FxBuildHasher>
where
    K: Eq + Hash,
{
    /// Create a sharded store sized for `capacity` entries.
    pub fn new(capacity: usize, shards: usize) -> Self {
        Self::with_hasher(capacity, shards, FxBuildHasher)
    }
}

impl<K, V, S> ShardedHashMapStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Create a sharded store with a custom per-shard hasher.
    pub fn with_hasher(capacity: usize, shards: usize, hasher: S) -> Self {
        let selector = ShardSelector::new(shards, 0);
        let per_shard = capacity.div_ceil(selector.shard_count());
        let shards = (0..selector.shard_count())
            .map(|_| RwLock::new(HashMap::with_capacity_and_hasher(per_shard, hasher.clone())))
            .collect();
        Self {
            shards,
            selector,
            size: AtomicUsize::new(0),
            metrics: StoreCounters::default(),
        }
    }

    /// Return the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &K) -> &RwLock<HashMap<K, Arc<V>, S>> {
        &self.shards[self.selector.shard_for_key(key)]
    }
}

impl<K, V, S> ConcurrentStore<K, V> for ShardedHashMapStore<K, V, S>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        let found = self.shard(key).read().get(key).cloned();
        self.metrics.record_lookup(found.is_some());
        found
    }

    fn contains(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    fn insert_if_absent(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let mut map = self.shard(&key).write();
        match map.entry(key) {
            Entry::Occupied(entry) => {
                self.metrics.inc_insert_conflict();
                Some(Arc::clone(entry.get()))
            },
            Entry::Vacant(entry) => {
                entry.insert(value);
                self.size.fetch_add(1, Ordering::AcqRel);
                self.metrics.inc_insert();
                None
            },
        }
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        let removed = self.shard(key).write().remove(key);
        if removed.is_some() {
            self.size.fetch_sub(1, Ordering::AcqRel);
            self.metrics.inc_remove();
        }
        removed
    }

    fn remove_if_same(&self, key: &K, expected: &Arc<V>) -> bool {
        let mut map = self.shard(key).write();
        match map.get(key) {
            Some(current) if Arc::ptr_eq(current, expected) => {
                map.remove(key);
                self.size.fetch_sub(1, Ordering::AcqRel);
                self.metrics.inc_conditional_remove();
                true
            },
            _ => false,
        }
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.len());
        for shard in &self.shards {
            keys.extend(shard.read().keys().cloned());
        }
        keys
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}

impl<K, V> StoreFactory<K, V> for ShardedHashMapStore<K, V, FxBuildHasher>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    type Store = ShardedHashMapStore<K, V, FxBuildHasher>;

    /// Create a store with one shard per available CPU.
    fn create(capacity: usize) -> Self::Store {
        Self::new(capacity, default_shard_count())
    }
}

/// One shard per available CPU, falling back to 1.
pub fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_basic_ops<S: ConcurrentStore<&'static str, String>>(store: S) {
        let v1 = Arc::new("v1".to_string());
        assert_eq!(store.insert_if_absent("k1", v1.clone()), None);
        assert_eq!(store.get(&"k1"), Some(v1.clone()));
        assert!(store.contains(&"k1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys(), vec!["k1"]);
        assert_eq!(store.remove(&"k1"), Some(v1));
        assert!(!store.contains(&"k1"));
        assert!(store.is_empty());
    }

    fn exercise_insert_if_absent<S: ConcurrentStore<u32, u32>>(store: S) {
        let first = Arc::new(1);
        let second = Arc::new(2);
        assert!(store.insert_if_absent(7, first.clone()).is_none());
        let winner = store.insert_if_absent(7, second).unwrap();
        assert!(Arc::ptr_eq(&winner, &first));
        assert_eq!(store.len(), 1);
        assert_eq!(*store.get(&7).unwrap(), 1);
    }

    fn exercise_remove_if_same<S: ConcurrentStore<u32, u32>>(store: S) {
        let original = Arc::new(10);
        let lookalike = Arc::new(10);
        store.insert_if_absent(1, original.clone());

        assert!(!store.remove_if_same(&1, &lookalike));
        assert!(store.contains(&1));
        assert!(store.remove_if_same(&1, &original));
        assert!(!store.contains(&1));
        assert!(!store.remove_if_same(&1, &original));
        assert_eq!(store.len(), 0);
        assert_eq!(store.metrics().conditional_removes, 1);
    }

    #[test]
    fn locked_store_basic_ops() {
        exercise_basic_ops(ConcurrentHashMapStore::new(4));
        exercise_insert_if_absent(ConcurrentHashMapStore::new(4));
        exercise_remove_if_same(ConcurrentHashMapStore::new(4));
    }

    #[test]
    fn sharded_store_basic_ops() {
        exercise_basic_ops(ShardedHashMapStore::new(4, 3));
        exercise_insert_if_absent(ShardedHashMapStore::new(4, 3));
        exercise_remove_if_same(ShardedHashMapStore::new(4, 3));
    }

    #[test]
    fn stores_do_not_enforce_capacity() {
        let store: ShardedHashMapStore<u32, u32> = ShardedHashMapStore::new(1, 2);
        for i in 0..10 {
            assert!(store.insert_if_absent(i, Arc::new(i)).is_none());
        }
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn sharded_keys_visit_every_shard() {
        let store: ShardedHashMapStore<u32, u32> = ShardedHashMapStore::new(64, 4);
        for i in 0..64 {
            store.insert_if_absent(i, Arc::new(i));
        }
        let mut keys = store.keys();
        keys.sort_unstable();
        assert_eq!(keys, (0..64).collect::<Vec<_>>());
        assert_eq!(store.len(), 64);
    }

    #[test]
    fn store_metrics_counts() {
        let store: ConcurrentHashMapStore<&str, u8> = ConcurrentHashMapStore::new(2);
        assert_eq!(store.metrics(), StoreMetrics::default());

        assert_eq!(store.get(&"missing"), None);
        store.insert_if_absent("k", Arc::new(1));
        store.insert_if_absent("k", Arc::new(2));
        store.get(&"k");
        store.remove(&"k");

        let metrics = store.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.inserts, 1);
        assert_eq!(metrics.insert_conflicts, 1);
        assert_eq!(metrics.removes, 1);
    }

    #[test]
    fn factory_creates_empty_stores() {
        let locked = <ConcurrentHashMapStore<u8, u8> as StoreFactory<u8, u8>>::create(8);
        let sharded = <ShardedHashMapStore<u8, u8> as StoreFactory<u8, u8>>::create(8);
        assert!(locked.is_empty());
        assert!(sharded.is_empty());
        assert_eq!(sharded.shard_count(), default_shard_count());
    }
}
