//! Builder for [`ConcurrentLruMap`] instances.
//!
//! Collects the knobs that [`ConcurrentLruMap::new`] leaves at their
//! defaults: the event queue bound, the walker thread's name and idle poll,
//! and the shard count of the default store.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use cachewalk::builder::CacheBuilder;
//!
//! let cache = CacheBuilder::new(100)
//!     .event_queue_bound(Some(1024))
//!     .walker_name("sessions-lru")
//!     .idle_poll(Duration::from_millis(20))
//!     .shards(8)
//!     .build::<u64, String>();
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1).as_deref().map(String::as_str), Some("hello"));
//! ```

use std::hash::Hash;
use std::time::Duration;

use crate::error::ConfigError;
use crate::policy::concurrent_lru::{CacheNode, ConcurrentLruMap};
use crate::store::hashmap::{default_shard_count, ShardedHashMapStore};
use crate::store::traits::ConcurrentStore;

/// How long the walker blocks on an empty queue before re-checking its
/// stop flag.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(100);

/// Thread name given to the walker unless overridden.
pub const DEFAULT_WALKER_NAME: &str = "cachewalk-walker";

/// Walker settings shared by every constructor.
#[derive(Debug, Clone)]
pub(crate) struct WalkerConfig {
    /// `None` for an unbounded queue.
    pub(crate) queue_bound: Option<usize>,
    pub(crate) walker_name: String,
    pub(crate) idle_poll: Duration,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            queue_bound: None,
            walker_name: DEFAULT_WALKER_NAME.to_string(),
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }
}

impl WalkerConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_bound == Some(0) {
            return Err(ConfigError::new("event queue bound must be greater than zero"));
        }
        if self.idle_poll.is_zero() {
            return Err(ConfigError::new("idle poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Builder for configuring a [`ConcurrentLruMap`].
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    capacity: usize,
    config: WalkerConfig,
    shards: Option<usize>,
}

impl CacheBuilder {
    /// Create a new cache builder with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            config: WalkerConfig::default(),
            shards: None,
        }
    }

    /// Bounds the event queue. Producers wait for room once it fills up.
    ///
    /// `None` (the default) leaves it unbounded.
    pub fn event_queue_bound(mut self, bound: Option<usize>) -> Self {
        self.config.queue_bound = bound;
        self
    }

    /// Names the walker thread.
    pub fn walker_name(mut self, name: impl Into<String>) -> Self {
        self.config.walker_name = name.into();
        self
    }

    /// Sets how often an idle walker and a producer blocked on a full queue
    /// re-check whether the cache was stopped.
    pub fn idle_poll(mut self, interval: Duration) -> Self {
        self.config.idle_poll = interval;
        self
    }

    /// Shard count for the default store. Defaults to available parallelism.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Builds a cache over the default sharded store.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. For a non-panicking
    /// alternative, use [`try_build`](Self::try_build).
    pub fn build<K, V>(self) -> ConcurrentLruMap<K, V>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        match self.try_build() {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds a cache over the default sharded store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the capacity, queue bound, idle poll or
    /// shard count is zero, or the walker thread cannot be spawned.
    ///
    /// # Example
    ///
    /// ```
    /// use cachewalk::builder::CacheBuilder;
    ///
    /// assert!(CacheBuilder::new(0).try_build::<u32, u32>().is_err());
    /// assert!(CacheBuilder::new(8).shards(0).try_build::<u32, u32>().is_err());
    /// assert!(CacheBuilder::new(8).try_build::<u32, u32>().is_ok());
    /// ```
    pub fn try_build<K, V>(self) -> Result<ConcurrentLruMap<K, V>, ConfigError>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        let shards = match self.shards {
            Some(0) => return Err(ConfigError::new("shard count must be greater than zero")),
            Some(shards) => shards,
            None => default_shard_count(),
        };
        let store = ShardedHashMapStore::new(self.capacity, shards);
        ConcurrentLruMap::try_with_config(self.capacity, store, self.config)
    }

    /// Builds a cache over `store`. The shard setting is ignored.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn build_with_store<K, V, S>(self, store: S) -> ConcurrentLruMap<K, V, S>
    where
        K: Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
        S: ConcurrentStore<K, CacheNode<K, V>> + 'static,
    {
        match self.try_build_with_store(store) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds a cache over `store`, returning an error on invalid
    /// configuration instead of panicking.
    pub fn try_build_with_store<K, V, S>(
        self,
        store: S,
    ) -> Result<ConcurrentLruMap<K, V, S>, ConfigError>
    where
        K: Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
        S: ConcurrentStore<K, CacheNode<K, V>> + 'static,
    {
        ConcurrentLruMap::try_with_config(self.capacity, store, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::hashmap::ConcurrentHashMapStore;

    #[test]
    fn defaults_validate() {
        assert!(WalkerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_queue_bound() {
        let err = CacheBuilder::new(4)
            .event_queue_bound(Some(0))
            .try_build::<u32, u32>()
            .unwrap_err();
        assert!(err.message().contains("queue bound"));
    }

    #[test]
    fn rejects_zero_idle_poll() {
        let err = CacheBuilder::new(4)
            .idle_poll(Duration::ZERO)
            .try_build::<u32, u32>()
            .unwrap_err();
        assert!(err.message().contains("idle poll"));
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn build_panics_on_zero_capacity() {
        let _ = CacheBuilder::new(0).build::<u32, u32>();
    }

    #[test]
    fn custom_walker_name_builds() {
        let cache = CacheBuilder::new(2).walker_name("named-walker").build::<u32, u32>();
        assert!(cache.is_running());
        cache.stop();
        assert!(!cache.is_running());
    }

    #[test]
    fn builds_with_custom_store() {
        let cache = CacheBuilder::new(2)
            .build_with_store::<u32, u32, _>(ConcurrentHashMapStore::new(2));
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(3, 3);
        cache.flush();
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&1));
    }
}
