use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::ConcurrentLruMetricsSnapshot;
use crate::metrics::traits::{ConcurrentLruMetricsRecorder, MetricsReset, WalkerMetricsRecorder};

/// Shared counters for a concurrent LRU map and its walker.
#[derive(Debug, Default)]
pub struct ConcurrentLruMetrics {
    pub get_hits: AtomicU64,
    pub get_misses: AtomicU64,
    pub puts_new: AtomicU64,
    pub puts_update: AtomicU64,
    pub removes: AtomicU64,
    pub events_applied: AtomicU64,
    pub stale_events: AtomicU64,
    pub eviction_sweeps: AtomicU64,
    pub evictions: AtomicU64,
    pub eviction_skips: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ConcurrentLruMetrics {
    /// Copies every counter; `len`/`capacity` are supplied by the cache.
    pub fn snapshot(&self, len: usize, capacity: usize) -> ConcurrentLruMetricsSnapshot {
        ConcurrentLruMetricsSnapshot {
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            puts_new: self.puts_new.load(Ordering::Relaxed),
            puts_update: self.puts_update.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            stale_events: self.stale_events.load(Ordering::Relaxed),
            eviction_sweeps: self.eviction_sweeps.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            eviction_skips: self.eviction_skips.load(Ordering::Relaxed),
            len,
            capacity,
        }
    }
}

impl ConcurrentLruMetricsRecorder for ConcurrentLruMetrics {
    fn record_get_hit(&self) {
        bump(&self.get_hits);
    }

    fn record_get_miss(&self) {
        bump(&self.get_misses);
    }

    fn record_put_new(&self) {
        bump(&self.puts_new);
    }

    fn record_put_update(&self) {
        bump(&self.puts_update);
    }

    fn record_remove(&self) {
        bump(&self.removes);
    }
}

impl WalkerMetricsRecorder for ConcurrentLruMetrics {
    fn record_event_applied(&self) {
        bump(&self.events_applied);
    }

    fn record_stale_event(&self) {
        bump(&self.stale_events);
    }

    fn record_eviction_sweep(&self) {
        bump(&self.eviction_sweeps);
    }

    fn record_evicted_entry(&self) {
        bump(&self.evictions);
    }

    fn record_eviction_skip(&self) {
        bump(&self.eviction_skips);
    }
}

impl MetricsReset for ConcurrentLruMetrics {
    fn reset_metrics(&self) {
        for counter in [
            &self.get_hits,
            &self.get_misses,
            &self.puts_new,
            &self.puts_update,
            &self.removes,
            &self.events_applied,
            &self.stale_events,
            &self.eviction_sweeps,
            &self.evictions,
            &self.eviction_skips,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_feed_snapshot() {
        let metrics = ConcurrentLruMetrics::default();
        metrics.record_get_hit();
        metrics.record_get_hit();
        metrics.record_get_miss();
        metrics.record_put_new();
        metrics.record_evicted_entry();
        metrics.record_eviction_skip();

        let snap = metrics.snapshot(3, 8);
        assert_eq!(snap.get_hits, 2);
        assert_eq!(snap.get_misses, 1);
        assert_eq!(snap.puts_new, 1);
        assert_eq!(snap.evictions, 1);
        assert_eq!(snap.eviction_skips, 1);
        assert_eq!(snap.len, 3);
        assert_eq!(snap.capacity, 8);
        assert!((snap.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn reset_zeroes_every_counter() {
        let metrics = ConcurrentLruMetrics::default();
        metrics.record_remove();
        metrics.record_stale_event();
        metrics.record_eviction_sweep();
        metrics.reset_metrics();
        assert_eq!(metrics.snapshot(0, 1), ConcurrentLruMetricsSnapshot {
            capacity: 1,
            ..Default::default()
        });
    }
}
