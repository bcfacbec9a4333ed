//! Cache policies.
//!
//! - [`concurrent_lru`]: bounded LRU map whose recency list is owned by a
//!   single background walker thread.

pub mod concurrent_lru;
