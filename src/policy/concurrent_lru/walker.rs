//! The recency walker: sole owner of the recency list.
//!
//! Cache callers never touch the list. They push [`Event`]s onto a channel
//! and return; the walker thread drains that channel in FIFO order, splices
//! the list, and evicts from the LRU end whenever the store holds more than
//! `capacity` entries.
//!
//! ```text
//!   put / get / remove ──► Sender<Event> ──► Walker::run (one thread)
//!                                               │
//!                        ┌──────────────────────┼──────────────────────┐
//!                        ▼                      ▼                      ▼
//!                  ADD: push_front      TOUCH: move_to_front   REMOVE: unlink
//!                                               │
//!                                               ▼
//!                          evict: tail ──► head while store.len() > capacity
//! ```
//!
//! Eviction only commits through `remove_if_same`, so a candidate that a
//! racing caller already removed (or replaced after a remove) is skipped
//! rather than unlinked; that caller's own REMOVE event retires it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace};

use crate::ds::RecencyList;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ConcurrentLruMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::traits::WalkerMetricsRecorder;
use crate::policy::concurrent_lru::node::{CacheNode, Retired};
use crate::store::traits::ConcurrentStore;

type NodeRef<K, V> = Arc<CacheNode<K, V>>;

/// Messages consumed by the walker.
pub(crate) enum Event<K, V> {
    /// A freshly mapped node; link it at the head.
    Add(NodeRef<K, V>),
    /// A node was read or updated; move it to the head if still linked.
    Touch(NodeRef<K, V>),
    /// A node left the store; unlink and retire it.
    Remove(NodeRef<K, V>),
    /// Reply once every earlier event is applied and a sweep has run.
    Flush(Sender<()>),
    /// Reply with the keys from MRU to LRU.
    Snapshot(Sender<Vec<K>>),
    /// Wake-up sent by `stop`; the flag is what actually ends the loop.
    Stop,
}

/// Clears the running flag however the walker exits, panics included.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(crate) struct Walker<K, V, S> {
    pub(crate) store: Arc<S>,
    pub(crate) list: RecencyList<NodeRef<K, V>>,
    pub(crate) capacity: usize,
    pub(crate) events: Receiver<Event<K, V>>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) idle_poll: Duration,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Arc<ConcurrentLruMetrics>,
}

impl<K, V, S> Walker<K, V, S>
where
    K: Clone,
    S: ConcurrentStore<K, CacheNode<K, V>>,
{
    pub(crate) fn run(mut self) {
        let _guard = RunningGuard(Arc::clone(&self.running));
        info!("recency walker started (capacity={})", self.capacity);

        while self.running.load(Ordering::Acquire) {
            match self.events.recv_timeout(self.idle_poll) {
                Ok(Event::Stop) => break,
                Ok(event) => self.handle(event),
                // An idle wake-up is not a reason to exit; re-check the flag.
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if cfg!(debug_assertions) {
            if let Err(err) = self.list.check_invariants() {
                error!("recency list corrupted at shutdown: {}", err);
            }
        }
        info!(
            "recency walker stopped ({} linked, {} queued events dropped)",
            self.list.len(),
            self.events.len()
        );
    }

    fn handle(&mut self, event: Event<K, V>) {
        match event {
            Event::Add(node) => self.apply_add(node),
            Event::Touch(node) => self.apply_touch(&node),
            Event::Remove(node) => self.apply_remove(&node),
            Event::Flush(reply) => {
                self.evict();
                let _ = reply.send(());
                return;
            },
            Event::Snapshot(reply) => {
                let keys = self.list.iter().map(|node| node.key().clone()).collect();
                let _ = reply.send(keys);
                return;
            },
            Event::Stop => return,
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_event_applied();

        self.evict();
    }

    fn apply_add(&mut self, node: NodeRef<K, V>) {
        if !node.is_pending() {
            // REMOVE overtook this ADD (or a duplicate ADD slipped through).
            self.stale("add");
            return;
        }
        let slot = self.list.push_front(Arc::clone(&node));
        node.mark_linked(slot);
    }

    fn apply_touch(&mut self, node: &NodeRef<K, V>) {
        match node.linked_slot() {
            Some(slot) => {
                self.list.move_to_front(slot);
            },
            None => self.stale("touch"),
        }
    }

    fn apply_remove(&mut self, node: &NodeRef<K, V>) {
        match node.retire() {
            Retired::Linked(slot) => {
                self.list.remove(slot);
            },
            Retired::Pending => {},
            Retired::Stale => self.stale("remove"),
        }
    }

    fn stale(&self, kind: &str) {
        trace!("ignoring stale {} event", kind);
        #[cfg(feature = "metrics")]
        self.metrics.record_stale_event();
    }

    /// Evicts from the LRU end toward the head until the store is back at or
    /// under capacity, or the list runs out of candidates.
    fn evict(&mut self) {
        if self.store.len() <= self.capacity {
            return;
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_eviction_sweep();

        let mut evicted = 0usize;
        let mut skipped = 0usize;
        let mut cursor = self.list.back_id();
        while self.store.len() > self.capacity {
            let Some(slot) = cursor else { break };
            cursor = self.list.prev_id(slot);
            let Some(node) = self.list.get(slot).map(Arc::clone) else {
                break;
            };

            if self.store.remove_if_same(node.key(), &node) {
                self.list.remove(slot);
                node.retire();
                evicted += 1;
                #[cfg(feature = "metrics")]
                self.metrics.record_evicted_entry();
            } else {
                skipped += 1;
                #[cfg(feature = "metrics")]
                self.metrics.record_eviction_skip();
            }
        }

        debug!(
            "eviction sweep: evicted={} skipped={} len={} capacity={}",
            evicted,
            skipped,
            self.store.len(),
            self.capacity
        );
    }
}
