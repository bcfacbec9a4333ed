//! Cache metrics: atomic recorders and point-in-time snapshots.

pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
