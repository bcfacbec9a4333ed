//! # Metrics Traits
//!
//! Recording and snapshotting are split so the cache hot path only ever
//! writes counters, while tests and benches read them through a provider.
//!
//! ```text
//!   caller threads ──► ConcurrentLruMetricsRecorder ◄── walker thread
//!                              │ (relaxed atomics)
//!                              ▼
//!                   MetricsSnapshotProvider<S>  ──► bench / test
//! ```
//!
//! Recorders take `&self`: both the callers and the walker hold the counters
//! behind an `Arc`, so there is no outer lock to lean on.

/// Counters written by cache callers (`get`/`put`/`remove`).
pub trait ConcurrentLruMetricsRecorder {
    fn record_get_hit(&self);
    fn record_get_miss(&self);
    fn record_put_new(&self);
    fn record_put_update(&self);
    fn record_remove(&self);
}

/// Counters written by the recency walker.
pub trait WalkerMetricsRecorder {
    fn record_event_applied(&self);
    fn record_stale_event(&self);
    fn record_eviction_sweep(&self);
    fn record_evicted_entry(&self);
    fn record_eviction_skip(&self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}
