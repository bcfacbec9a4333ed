/// Point-in-time copy of a [`ConcurrentLruMap`](crate::policy::concurrent_lru::ConcurrentLruMap)'s counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrentLruMetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,

    pub puts_new: u64,
    pub puts_update: u64,
    pub removes: u64,

    pub events_applied: u64,
    pub stale_events: u64, // TOUCH/REMOVE/ADD for a node already retired

    pub eviction_sweeps: u64,
    pub evictions: u64,
    pub eviction_skips: u64, // candidates no longer mapped to the inspected node

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
}

impl ConcurrentLruMetricsSnapshot {
    /// Hits over total lookups; `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.get_hits + self.get_misses;
        if lookups == 0 {
            0.0
        } else {
            self.get_hits as f64 / lookups as f64
        }
    }
}
