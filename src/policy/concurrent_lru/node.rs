//! Cache nodes shared between the backing map and the recency walker.
//!
//! A node is handed out as `Arc<CacheNode<K, V>>`: the store holds one
//! handle, the walker's recency list holds another, and queued events hold
//! short-lived ones. None of them owns list links; the list keeps those in
//! its own arena and the node only remembers which slot it occupies.
//!
//! ```text
//!   ┌──────────────────────── CacheNode<K, V> ────────────────────────┐
//!   │ key: K                       immutable                          │
//!   │ state: Mutex<NodeState<V>>   { value: Arc<V>, liveness }        │
//!   │ slot: AtomicUsize            walker-thread only                 │
//!   └─────────────────────────────────────────────────────────────────┘
//!
//!   Liveness:  Pending ──ADD──► Linked ──REMOVE / evict──► Unlinked
//!                 └──────────────REMOVE──────────────────────┘
//! ```
//!
//! Only the walker moves a node between liveness states. Callers read the
//! state (under the node lock) to decide whether a value is still valid and
//! whether an update landed on a retired node.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ds::SlotId;

const NO_SLOT: usize = usize::MAX;

/// Where a node is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Mapped in the store; its ADD has not been applied yet.
    Pending,
    /// Linked into the recency list.
    Linked,
    /// Unlinked by a REMOVE or an eviction. Queued events still pointing at
    /// the node are stale.
    Unlinked,
}

/// Outcome of retiring a node on the walker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retired {
    /// Was linked at `SlotId`; the caller must unlink that slot.
    Linked(SlotId),
    /// Retired before its ADD arrived; the ADD will be ignored.
    Pending,
    /// Already unlinked.
    Stale,
}

struct NodeState<V> {
    value: Arc<V>,
    liveness: Liveness,
}

/// One live cache entry.
pub struct CacheNode<K, V> {
    key: K,
    state: Mutex<NodeState<V>>,
    slot: AtomicUsize,
}

impl<K, V> CacheNode<K, V> {
    pub(crate) fn new(key: K, value: Arc<V>) -> Self {
        Self {
            key,
            state: Mutex::new(NodeState {
                value,
                liveness: Liveness::Pending,
            }),
            slot: AtomicUsize::new(NO_SLOT),
        }
    }

    /// The entry's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The entry's current value, whatever its liveness.
    pub fn value(&self) -> Arc<V> {
        Arc::clone(&self.state.lock().value)
    }

    /// Current liveness.
    pub fn liveness(&self) -> Liveness {
        self.state.lock().liveness
    }

    /// `true` once the walker has linked the node and until it unlinks it.
    pub fn is_alive(&self) -> bool {
        self.liveness() == Liveness::Linked
    }

    /// Value of a node that has not been retired.
    pub(crate) fn read_live(&self) -> Option<Arc<V>> {
        let state = self.state.lock();
        match state.liveness {
            Liveness::Unlinked => None,
            Liveness::Pending | Liveness::Linked => Some(Arc::clone(&state.value)),
        }
    }

    /// Swaps in `value` unless the node was retired, in which case `value`
    /// is handed back so the caller can retry against the store.
    pub(crate) fn replace_value(&self, value: Arc<V>) -> Result<Arc<V>, Arc<V>> {
        let mut state = self.state.lock();
        match state.liveness {
            Liveness::Unlinked => Err(value),
            Liveness::Pending | Liveness::Linked => Ok(std::mem::replace(&mut state.value, value)),
        }
    }

    // -- walker thread only ------------------------------------------------

    pub(crate) fn is_pending(&self) -> bool {
        self.liveness() == Liveness::Pending
    }

    pub(crate) fn mark_linked(&self, slot: SlotId) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.liveness, Liveness::Pending);
        self.slot.store(slot.index(), Ordering::Relaxed);
        state.liveness = Liveness::Linked;
    }

    pub(crate) fn linked_slot(&self) -> Option<SlotId> {
        let state = self.state.lock();
        match state.liveness {
            Liveness::Linked => Some(SlotId::from_index(self.slot.load(Ordering::Relaxed))),
            Liveness::Pending | Liveness::Unlinked => None,
        }
    }

    pub(crate) fn retire(&self) -> Retired {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut state.liveness, Liveness::Unlinked);
        match previous {
            Liveness::Linked => {
                let slot = self.slot.swap(NO_SLOT, Ordering::Relaxed);
                Retired::Linked(SlotId::from_index(slot))
            },
            Liveness::Pending => Retired::Pending,
            Liveness::Unlinked => Retired::Stale,
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for CacheNode<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheNode")
            .field("key", &self.key)
            .field("liveness", &self.liveness())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_is_pending_and_readable() {
        let node = CacheNode::new("k", Arc::new(1));
        assert_eq!(node.liveness(), Liveness::Pending);
        assert!(!node.is_alive());
        assert_eq!(node.read_live().as_deref(), Some(&1));
        assert_eq!(node.linked_slot(), None);
    }

    #[test]
    fn link_then_retire_returns_slot() {
        let node = CacheNode::new(1u8, Arc::new("v"));
        node.mark_linked(SlotId::from_index(5));
        assert!(node.is_alive());
        assert_eq!(node.linked_slot(), Some(SlotId::from_index(5)));

        assert_eq!(node.retire(), Retired::Linked(SlotId::from_index(5)));
        assert_eq!(node.liveness(), Liveness::Unlinked);
        assert_eq!(node.retire(), Retired::Stale);
        assert_eq!(node.linked_slot(), None);
    }

    #[test]
    fn retire_before_link_is_pending() {
        let node = CacheNode::new(1u8, Arc::new(0));
        assert_eq!(node.retire(), Retired::Pending);
        assert!(!node.is_pending());
        assert_eq!(node.read_live(), None);
    }

    #[test]
    fn replace_value_refuses_retired_node() {
        let node = CacheNode::new(1u8, Arc::new(10));
        let old = node.replace_value(Arc::new(20)).unwrap();
        assert_eq!(*old, 10);
        assert_eq!(*node.value(), 20);

        node.retire();
        let handed_back = node.replace_value(Arc::new(30)).unwrap_err();
        assert_eq!(*handed_back, 30);
        assert_eq!(*node.value(), 20);
    }
}
