//! Backing maps for the concurrent LRU cache.

pub mod hashmap;
pub mod traits;

pub use hashmap::{ConcurrentHashMapStore, ShardedHashMapStore};
pub use traits::{ConcurrentStore, StoreFactory, StoreMetrics};
