//! Concurrent LRU map with a single background recency walker.
//!
//! Lookups and writes go straight to a concurrent backing map; the LRU
//! bookkeeping is handed off to one dedicated thread through an event
//! queue. No caller ever takes a cache-wide lock or touches the recency list.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────── ConcurrentLruMap<K, V, S> ─────────────────────────────┐
//!   │                                                                                    │
//!   │   caller threads                                   walker thread                   │
//!   │   ──────────────                                   ─────────────                   │
//!   │   put / get / contains / remove                                                    │
//!   │        │                                                                           │
//!   │        ├──► store: Arc<S>  ◄──────── remove_if_same ──────┐                        │
//!   │        │    (authoritative: key → Arc<CacheNode>)         │                        │
//!   │        │                                                  │                        │
//!   │        └──► Sender<Event> ═══════ FIFO ══════► Walker { RecencyList, capacity }    │
//!   │             ADD / TOUCH / REMOVE                  head ◄── MRU … LRU ──► tail      │
//!   │                                                                                    │
//!   └────────────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! The store decides presence: `len`, `get`, `contains` and `keys` never wait
//! for the walker. The recency list trails the store by the depth of the
//! queue, so the cache can briefly hold more than `capacity` entries while a
//! burst of puts is being applied. Once the queue drains, `len() <= capacity`.
//! [`flush`](ConcurrentLruMap::flush) blocks until that point.
//!
//! ## Lifecycle
//!
//! The walker starts in the constructor and runs until
//! [`stop`](ConcurrentLruMap::stop), which signals it and joins the thread.
//! Dropping the map stops it as well. After a stop the map keeps serving
//! map-only operations but no longer orders or evicts anything.
//!
//! ## Example
//!
//! ```
//! use cachewalk::policy::concurrent_lru::ConcurrentLruMap;
//!
//! let cache: ConcurrentLruMap<&str, i32> = ConcurrentLruMap::new(3);
//! cache.put("a", 1);
//! cache.put("b", 2);
//! cache.put("c", 3);
//! cache.flush();
//!
//! assert_eq!(cache.get(&"a").as_deref(), Some(&1));
//! cache.put("d", 4);
//! cache.flush();
//!
//! // "b" was least recently used
//! assert!(!cache.contains(&"b"));
//! assert_eq!(cache.len(), 3);
//! cache.stop();
//! ```

pub mod node;
mod walker;

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use log::{debug, error};
use parking_lot::Mutex;

use crate::builder::{CacheBuilder, WalkerConfig};
use crate::ds::RecencyList;
use crate::error::ConfigError;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ConcurrentLruMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::ConcurrentLruMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{ConcurrentLruMetricsRecorder, MetricsReset, MetricsSnapshotProvider};
use crate::store::hashmap::ShardedHashMapStore;
use crate::store::traits::{ConcurrentStore, StoreFactory, StoreMetrics};
use crate::traits::ConcurrentCache;

pub use node::{CacheNode, Liveness};

use walker::{Event, Walker};

/// A [`ConcurrentLruMap`] over a single `RwLock`-guarded map.
pub type LockedLruMap<K, V> =
    ConcurrentLruMap<K, V, crate::store::hashmap::ConcurrentHashMapStore<K, CacheNode<K, V>>>;

/// Bounded concurrent cache evicting in least-recently-used order.
///
/// `S` is the backing map. The default shards keys across
/// [`available_parallelism`](std::thread::available_parallelism) locks.
pub struct ConcurrentLruMap<K, V, S = ShardedHashMapStore<K, CacheNode<K, V>>> {
    store: Arc<S>,
    capacity: usize,
    events: Sender<Event<K, V>>,
    running: Arc<AtomicBool>,
    walker: Mutex<Option<JoinHandle<()>>>,
    idle_poll: Duration,
    #[cfg(feature = "metrics")]
    metrics: Arc<ConcurrentLruMetrics>,
}

impl<K, V> ConcurrentLruMap<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a cache over the default sharded store.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or the walker thread cannot be spawned.
    /// Use [`try_new`](Self::try_new) to get a [`ConfigError`] instead.
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a cache over the default sharded store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero or the walker thread
    /// cannot be spawned.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        Self::try_with_factory::<ShardedHashMapStore<K, CacheNode<K, V>>>(capacity)
    }

    /// Starts a [`CacheBuilder`] for queue, walker and store tuning.
    pub fn builder(capacity: usize) -> CacheBuilder {
        CacheBuilder::new(capacity)
    }
}

impl<K, V, S> ConcurrentLruMap<K, V, S>
where
    K: Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: ConcurrentStore<K, CacheNode<K, V>> + 'static,
{
    /// Creates a cache over a caller-supplied store.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`new`](ConcurrentLruMap::new).
    pub fn with_store(capacity: usize, store: S) -> Self {
        match Self::try_with_store(capacity, store) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a cache over a caller-supplied store.
    ///
    /// The store should be empty; entries already in it are served but never
    /// ordered or evicted.
    pub fn try_with_store(capacity: usize, store: S) -> Result<Self, ConfigError> {
        Self::try_with_config(capacity, store, WalkerConfig::default())
    }

    /// Creates a cache whose store is built by `F`.
    ///
    /// ```
    /// use cachewalk::policy::concurrent_lru::{CacheNode, ConcurrentLruMap};
    /// use cachewalk::store::ConcurrentHashMapStore;
    ///
    /// type Store = ConcurrentHashMapStore<u32, CacheNode<u32, String>>;
    /// let cache: ConcurrentLruMap<u32, String, Store> = ConcurrentLruMap::with_factory::<Store>(16);
    /// cache.put(1, "one".to_string());
    /// assert!(cache.contains(&1));
    /// ```
    pub fn with_factory<F>(capacity: usize) -> Self
    where
        F: StoreFactory<K, CacheNode<K, V>, Store = S>,
    {
        match Self::try_with_factory::<F>(capacity) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Fallible form of [`with_factory`](Self::with_factory).
    pub fn try_with_factory<F>(capacity: usize) -> Result<Self, ConfigError>
    where
        F: StoreFactory<K, CacheNode<K, V>, Store = S>,
    {
        validate_capacity(capacity)?;
        Self::try_with_config(capacity, F::create(capacity), WalkerConfig::default())
    }

    pub(crate) fn try_with_config(
        capacity: usize,
        store: S,
        config: WalkerConfig,
    ) -> Result<Self, ConfigError> {
        validate_capacity(capacity)?;
        config.validate()?;

        let (tx, rx): (Sender<Event<K, V>>, Receiver<Event<K, V>>) = match config.queue_bound {
            Some(bound) => crossbeam_channel::bounded(bound),
            None => crossbeam_channel::unbounded(),
        };
        let store = Arc::new(store);
        let running = Arc::new(AtomicBool::new(true));
        #[cfg(feature = "metrics")]
        let metrics = Arc::new(ConcurrentLruMetrics::default());

        let walker = Walker {
            store: Arc::clone(&store),
            list: RecencyList::with_capacity(capacity),
            capacity,
            events: rx,
            running: Arc::clone(&running),
            idle_poll: config.idle_poll,
            #[cfg(feature = "metrics")]
            metrics: Arc::clone(&metrics),
        };
        let handle = thread::Builder::new()
            .name(config.walker_name)
            .spawn(move || walker.run())
            .map_err(|e| ConfigError::new(format!("failed to spawn walker thread: {}", e)))?;

        Ok(Self {
            store,
            capacity,
            events: tx,
            running,
            walker: Mutex::new(Some(handle)),
            idle_poll: config.idle_poll,
            #[cfg(feature = "metrics")]
            metrics,
        })
    }

    /// Maps `key` to `value`, replacing any current value.
    pub fn put(&self, key: K, value: V) {
        self.put_arc(key, Arc::new(value));
    }

    /// Maps `key` to an already shared value.
    ///
    /// Two racing puts for an absent key end up on one node: the loser
    /// writes its value into the winner's node instead of mapping its own.
    pub fn put_arc(&self, key: K, value: Arc<V>) {
        let mut value = value;
        loop {
            let existing = match self.store.get(&key) {
                Some(node) => node,
                None => {
                    let node = Arc::new(CacheNode::new(key.clone(), Arc::clone(&value)));
                    match self.store.insert_if_absent(key.clone(), Arc::clone(&node)) {
                        None => {
                            #[cfg(feature = "metrics")]
                            self.metrics.record_put_new();
                            self.enqueue(Event::Add(node));
                            return;
                        },
                        Some(winner) => winner,
                    }
                },
            };

            match existing.replace_value(value) {
                Ok(_) => {
                    #[cfg(feature = "metrics")]
                    self.metrics.record_put_update();
                    self.enqueue(Event::Touch(existing));
                    return;
                },
                // Retired between lookup and write; it is already unmapped.
                Err(back) => value = back,
            }
        }
    }

    /// Returns the value for `key` and marks the entry as recently used.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let hit = self
            .store
            .get(key)
            .and_then(|node| node.read_live().map(|value| (node, value)));

        match hit {
            Some((node, value)) => {
                #[cfg(feature = "metrics")]
                self.metrics.record_get_hit();
                self.enqueue(Event::Touch(node));
                Some(value)
            },
            None => {
                #[cfg(feature = "metrics")]
                self.metrics.record_get_miss();
                None
            },
        }
    }

    /// Checks for `key`. A present key counts as a use.
    pub fn contains(&self, key: &K) -> bool {
        match self.store.get(key) {
            Some(node) if node.read_live().is_some() => {
                self.enqueue(Event::Touch(node));
                true
            },
            _ => false,
        }
    }

    /// Removes `key`. Removing an absent key does nothing.
    pub fn remove(&self, key: &K) {
        if let Some(node) = self.store.remove(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_remove();
            self.enqueue(Event::Remove(node));
        }
    }

    /// Entries currently in the store. May exceed `capacity` until the walker
    /// catches up.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the mapped keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.store.keys()
    }

    /// Blocks until the walker has applied every event queued before this
    /// call and run an eviction sweep.
    ///
    /// Returns at once if the walker is stopped.
    pub fn flush(&self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if self.enqueue(Event::Flush(tx)) {
            self.await_reply(&rx);
        }
    }

    /// The walker's view of recency, most recently used first.
    ///
    /// Includes every event queued before the call. `None` once the walker
    /// has stopped.
    pub fn recency_order(&self) -> Option<Vec<K>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if !self.enqueue(Event::Snapshot(tx)) {
            return None;
        }
        self.await_reply(&rx)
    }

    /// Stops the walker and waits for its thread to exit.
    ///
    /// Events still queued are dropped. Concurrent callers all return only
    /// after the walker thread has exited; a later call is a no-op.
    pub fn stop(&self) {
        let mut walker = self.walker.lock();
        if self.running.swap(false, Ordering::AcqRel) {
            // Wake an idle walker; a full bounded queue is fine, the flag
            // is checked after every event.
            let _ = self.events.try_send(Event::Stop);
        }
        // The guard is held across the join so racing callers wait too.
        if let Some(handle) = walker.take() {
            if handle.join().is_err() {
                error!("recency walker panicked");
            }
        }
    }

    /// `true` until [`stop`](Self::stop) runs or the walker exits.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Counters kept by the backing store.
    pub fn store_metrics(&self) -> StoreMetrics {
        self.store.metrics()
    }

    /// Copies the cache counters.
    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> ConcurrentLruMetricsSnapshot {
        self.metrics.snapshot(self.len(), self.capacity)
    }

    fn enqueue(&self, event: Event<K, V>) -> bool {
        let mut event = event;
        loop {
            if !self.is_running() {
                debug!("walker stopped; dropping recency event");
                return false;
            }
            match self.events.send_timeout(event, self.idle_poll) {
                Ok(()) => return true,
                // Bounded queue is full; retry unless the walker went away.
                Err(SendTimeoutError::Timeout(back)) => event = back,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    fn await_reply<T>(&self, reply: &Receiver<T>) -> Option<T> {
        loop {
            match reply.recv_timeout(self.idle_poll) {
                Ok(value) => return Some(value),
                Err(RecvTimeoutError::Timeout) if self.is_running() => continue,
                Err(_) => return None,
            }
        }
    }
}

fn validate_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::new("capacity must be greater than zero"));
    }
    Ok(())
}

impl<K, V, S> Drop for ConcurrentLruMap<K, V, S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        let _ = self.events.try_send(Event::Stop);
        if let Some(handle) = self.walker.get_mut().take() {
            if handle.join().is_err() {
                error!("recency walker panicked");
            }
        }
    }
}

impl<K, V, S> fmt::Debug for ConcurrentLruMap<K, V, S>
where
    S: ConcurrentStore<K, CacheNode<K, V>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentLruMap")
            .field("capacity", &self.capacity)
            .field("len", &self.store.len())
            .field("queued", &self.events.len())
            .field("running", &self.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<K, V, S> ConcurrentCache<K, V> for ConcurrentLruMap<K, V, S>
where
    K: Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: ConcurrentStore<K, CacheNode<K, V>> + 'static,
{
    fn put(&self, key: K, value: V) {
        ConcurrentLruMap::put(self, key, value);
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        ConcurrentLruMap::get(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        ConcurrentLruMap::contains(self, key)
    }

    fn remove(&self, key: &K) {
        ConcurrentLruMap::remove(self, key);
    }

    fn len(&self) -> usize {
        ConcurrentLruMap::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsSnapshotProvider<ConcurrentLruMetricsSnapshot> for ConcurrentLruMap<K, V, S>
where
    K: Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    S: ConcurrentStore<K, CacheNode<K, V>> + 'static,
{
    fn snapshot(&self) -> ConcurrentLruMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsReset for ConcurrentLruMap<K, V, S> {
    fn reset_metrics(&self) {
        self.metrics.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::hashmap::ConcurrentHashMapStore;

    fn lru(capacity: usize) -> ConcurrentLruMap<&'static str, i32> {
        ConcurrentLruMap::new(capacity)
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = ConcurrentLruMap::<u8, u8>::try_new(0).unwrap_err();
        assert!(err.message().contains("capacity"));
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn new_panics_on_zero_capacity() {
        let _ = ConcurrentLruMap::<u8, u8>::new(0);
    }

    #[test]
    fn put_get_update() {
        let cache = lru(4);
        cache.put("a", 1);
        assert_eq!(cache.get(&"a").as_deref(), Some(&1));
        cache.put("a", 2);
        assert_eq!(cache.get(&"a").as_deref(), Some(&2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"missing"), None);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = lru(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        cache.flush();
        assert!(cache.get(&"a").is_some());
        cache.put("d", 4);
        cache.flush();

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&"b"));
        let mut keys = cache.keys();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "c", "d"]);
    }

    #[test]
    fn recency_order_tracks_touches() {
        let cache = lru(8);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        assert!(cache.contains(&"a"));
        assert_eq!(cache.recency_order(), Some(vec!["a", "c", "b"]));

        cache.put("b", 20);
        assert_eq!(cache.recency_order(), Some(vec!["b", "a", "c"]));

        cache.remove(&"a");
        assert_eq!(cache.recency_order(), Some(vec!["b", "c"]));
    }

    #[test]
    fn remove_is_idempotent() {
        let cache = lru(2);
        cache.put("a", 1);
        cache.remove(&"a");
        cache.remove(&"a");
        cache.remove(&"never");
        cache.flush();
        assert!(cache.is_empty());
        assert_eq!(cache.recency_order(), Some(vec![]));
    }

    #[test]
    fn reinsert_after_remove_gets_fresh_node() {
        let cache = lru(2);
        cache.put("a", 1);
        cache.remove(&"a");
        cache.put("a", 2);
        cache.flush();
        assert_eq!(cache.get(&"a").as_deref(), Some(&2));
        assert_eq!(cache.recency_order(), Some(vec!["a"]));
    }

    #[test]
    fn stop_is_idempotent_and_disables_walker() {
        let cache = lru(1);
        assert!(cache.is_running());
        cache.stop();
        cache.stop();
        assert!(!cache.is_running());

        cache.put("a", 1);
        cache.put("b", 2);
        cache.flush();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.recency_order(), None);
        assert_eq!(cache.get(&"a").as_deref(), Some(&1));
    }

    #[test]
    fn concurrent_stops_all_wait_for_walker_exit() {
        use std::sync::Barrier;

        for _ in 0..50 {
            let cache = Arc::new(lru(4));
            cache.put("a", 1);
            let barrier = Arc::new(Barrier::new(3));
            let handles: Vec<_> = (0..3)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        cache.stop();
                        // the walker's clone of the store is gone once it exits
                        assert_eq!(Arc::strong_count(&cache.store), 1);
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        }
    }

    #[test]
    fn locked_store_variant() {
        let cache: LockedLruMap<u32, u32> =
            ConcurrentLruMap::with_store(2, ConcurrentHashMapStore::new(2));
        for i in 0..10 {
            cache.put(i, i);
        }
        cache.flush();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.recency_order(), Some(vec![9, 8]));
    }

    #[test]
    fn bounded_queue_applies_backpressure() {
        let cache = CacheBuilder::new(4)
            .event_queue_bound(Some(1))
            .build::<u32, u32>();
        for i in 0..100 {
            cache.put(i, i);
        }
        cache.flush();
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn store_metrics_count_conflicts_and_conditional_removes() {
        let cache: ConcurrentLruMap<u32, u32> = ConcurrentLruMap::new(1);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.flush();
        let m = cache.store_metrics();
        assert_eq!(m.inserts, 2);
        assert_eq!(m.conditional_removes, 1);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn metrics_snapshot_counts_operations() {
        let cache = lru(2);
        cache.put("a", 1);
        cache.put("a", 2);
        let _ = cache.get(&"a");
        let _ = cache.get(&"z");
        cache.put("b", 3);
        cache.put("c", 4);
        cache.remove(&"c");
        cache.flush();

        let snap = cache.metrics_snapshot();
        assert_eq!(snap.puts_new, 3);
        assert_eq!(snap.puts_update, 1);
        assert_eq!(snap.get_hits, 1);
        assert_eq!(snap.get_misses, 1);
        assert_eq!(snap.removes, 1);
        assert_eq!(snap.capacity, 2);
        assert!(snap.len <= 2);
        assert!(snap.events_applied >= 6);

        cache.reset_metrics();
        let snap = cache.metrics_snapshot();
        assert_eq!(snap.puts_new, 0);
        assert_eq!(snap.get_hits, 0);
    }

    #[test]
    fn debug_reports_capacity() {
        let cache = lru(5);
        let text = format!("{:?}", cache);
        assert!(text.contains("capacity: 5"));
    }
}
