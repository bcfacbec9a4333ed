//! # Shared Traits
//!
//! Two small interfaces so callers can be written against "a concurrent
//! cache" or "a membership filter" without naming the concrete type.
//!
//! ```text
//!   ┌─────────────────────────────────────────┐     ┌─────────────────────────────────────┐
//!   │        ConcurrentCache<K, V>            │     │       MembershipFilter<T>           │
//!   │        : Send + Sync                    │     │       (T: ?Sized)                   │
//!   │                                         │     │                                     │
//!   │  put(&, K, V)                           │     │  insert(&, &T) → bool               │
//!   │  get(&, &K) → Option<Arc<V>>            │     │  might_contain(&, &T) → bool        │
//!   │  contains(&, &K) → bool                 │     │                                     │
//!   │  remove(&, &K)                          │     └──────────────────┬──────────────────┘
//!   │  len(&) → usize                         │                        │
//!   │  is_empty(&) → bool                     │                        ▼
//!   │  capacity(&) → usize                    │                  BloomFilter
//!   └──────────────────┬──────────────────────┘
//!                      │
//!                      ▼
//!          ConcurrentLruMap<K, V, S>
//! ```
//!
//! Every method takes `&self`: implementations synchronize internally, so
//! one instance can be shared behind an `Arc` without an outer lock.

use std::sync::Arc;

/// A bounded cache safe to share across threads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use cachewalk::policy::concurrent_lru::ConcurrentLruMap;
/// use cachewalk::traits::ConcurrentCache;
///
/// fn warm<C: ConcurrentCache<u64, String>>(cache: &C, data: &[(u64, &str)]) {
///     for (key, value) in data {
///         cache.put(*key, value.to_string());
///     }
/// }
///
/// let cache: Arc<ConcurrentLruMap<u64, String>> = Arc::new(ConcurrentLruMap::new(100));
/// let shared = Arc::clone(&cache);
/// thread::spawn(move || warm(&*shared, &[(1, "one"), (2, "two")]))
///     .join()
///     .unwrap();
/// assert_eq!(ConcurrentCache::len(&*cache), 2);
/// ```
pub trait ConcurrentCache<K, V>: Send + Sync {
    /// Maps `key` to `value`. May trigger eviction of other entries.
    fn put(&self, key: K, value: V);

    /// Returns the current value and counts the access.
    fn get(&self, key: &K) -> Option<Arc<V>>;

    /// Checks for `key`. Counts as an access for recency-based caches.
    fn contains(&self, key: &K) -> bool;

    /// Removes `key`; a no-op if it is absent.
    fn remove(&self, key: &K);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries the cache settles at once its pending work drains.
    fn capacity(&self) -> usize;
}

/// An approximate set answering "definitely absent" or "possibly present".
pub trait MembershipFilter<T: ?Sized> {
    /// Records `item`. Returns `false` if it was probably recorded already.
    fn insert(&self, item: &T) -> bool;

    /// `false` only if `item` was never inserted.
    fn might_contain(&self, item: &T) -> bool;
}
