pub use crate::builder::CacheBuilder;
pub use crate::error::ConfigError;
pub use crate::filter::BloomFilter;
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::ConcurrentLruMetricsSnapshot;
pub use crate::policy::concurrent_lru::{ConcurrentLruMap, LockedLruMap};
pub use crate::store::{ConcurrentHashMapStore, ShardedHashMapStore};
pub use crate::traits::{ConcurrentCache, MembershipFilter};
