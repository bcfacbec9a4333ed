pub mod recency_list;
pub mod shard;

pub use recency_list::{RecencyIter, RecencyList, SlotId};
pub use shard::ShardSelector;
