//! Deterministic key-to-shard mapping for sharded backing maps.
//!
//! Used by [`ShardedHashMapStore`](crate::store::hashmap::ShardedHashMapStore)
//! to pick the lock that guards a key.
//!
//! ## Architecture
//!
//! ```text
//!   Input Key
//!       │
//!       ▼
//!   ┌───────────────────────────────────────────────┐
//!   │  ShardSelector { shards: 4, seed: 42 }        │
//!   │                                               │
//!   │  1. FxHasher::default()                       │
//!   │  2. hash seed, then key                       │
//!   │  3. finish() % 4                              │
//!   └───────────────────────────────────────────────┘
//!       │
//!       ▼
//!   ┌─────────┬─────────┬─────────┬─────────┐
//!   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │
//!   └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use cachewalk::ds::ShardSelector;
//!
//! let selector = ShardSelector::new(4, 0);
//! let shard = selector.shard_for_key(&"user:123");
//! assert!(shard < 4);
//! assert_eq!(selector.shard_for_key(&"user:123"), shard);
//! ```

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Deterministic shard selector using a seeded hash.
///
/// The same `(key, seed, shards)` tuple always produces the same shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards with the given `seed`.
    ///
    /// The shard count is clamped to at least 1.
    ///
    /// ```
    /// use cachewalk::ds::ShardSelector;
    ///
    /// assert_eq!(ShardSelector::new(0, 0).shard_count(), 1);
    /// ```
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            seed,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a key to a shard index in `[0, shards)`.
    pub fn shard_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let mut hasher = FxHasher::default();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() % self.shards as u64) as usize
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector with seed 0.
    fn default() -> Self {
        Self::new(1, 0)
    }
}
