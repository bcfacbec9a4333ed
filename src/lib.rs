//! cachewalk: a concurrent LRU map maintained by a background recency walker,
//! plus a Bloom filter.
//!
//! - [`policy::concurrent_lru::ConcurrentLruMap`]: get/put/remove go straight
//!   to a concurrent map; one walker thread keeps LRU order and evicts.
//! - [`filter::BloomFilter`]: fixed-size approximate membership set.
//!
//! ```
//! use cachewalk::prelude::*;
//!
//! let cache: ConcurrentLruMap<u32, &str> = ConcurrentLruMap::new(2);
//! cache.put(1, "one");
//! cache.put(2, "two");
//! cache.put(3, "three");
//! cache.flush();
//! assert_eq!(cache.len(), 2);
//!
//! let filter = BloomFilter::new(100);
//! filter.add("seen");
//! assert!(filter.contains("seen"));
//! ```

pub mod builder;
pub mod ds;
pub mod error;
pub mod filter;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod policy;
pub mod prelude;
pub mod store;
pub mod traits;

pub use crate::ds::{RecencyList, ShardSelector, SlotId};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::filter::{BloomFilter, FilterStatus};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::ConcurrentLruMetricsSnapshot;
pub use crate::policy::concurrent_lru::{CacheNode, ConcurrentLruMap, LockedLruMap};
