//! Sentinel-bounded doubly linked list stored in a slot arena.
//!
//! The recency list orders live cache entries from most recently used (next
//! to the head sentinel) to least recently used (next to the tail sentinel).
//! Links are slot indices, not pointers, so splicing never needs `unsafe`
//! and a freed slot is simply recycled by the next `push_front`.
//!
//! ## Architecture
//!
//! ```text
//!   links (Vec<Link<T>>)
//!   ┌────────┬──────────────────────────────────────────────┐
//!   │ SlotId │ Link { prev, next, entry }                   │
//!   ├────────┼──────────────────────────────────────────────┤
//!   │ 0      │ HEAD sentinel { prev: 0, next: 3, None }     │
//!   │ 1      │ TAIL sentinel { prev: 2, next: 1, None }     │
//!   │ 2      │ { prev: 3, next: 1, entry: Some(B) }         │
//!   │ 3      │ { prev: 0, next: 2, entry: Some(A) }         │
//!   └────────┴──────────────────────────────────────────────┘
//!
//!   HEAD ─► [3: A] ◄──► [2: B] ◄── TAIL
//!           MRU          LRU
//! ```
//!
//! ## Operations
//! - `push_front(value)`: allocate a slot, splice after HEAD
//! - `move_to_front(id)`: detach + splice after HEAD
//! - `remove(id)`: detach + free slot
//! - `back_id()` / `prev_id(id)`: walk from the LRU end toward HEAD
//!
//! All of the above are O(1); `iter` and `check_invariants` are O(n).
//!
//! The sentinels occupy slots 0 and 1 for the lifetime of the list. They are
//! never returned by `back_id`, `prev_id` or `iter`, and `remove` /
//! `move_to_front` refuse them.
//!
//! `RecencyList` is single-threaded: the cache's walker thread
//! is its only owner.

use crate::error::InvariantError;

/// Stable handle to a slot in a [`RecencyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    /// Raw slot index.
    pub fn index(self) -> usize {
        self.0
    }

    /// Rebuilds a handle from a raw index previously obtained via
    /// [`index`](Self::index).
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

const HEAD: SlotId = SlotId(0);
const TAIL: SlotId = SlotId(1);
const SENTINELS: usize = 2;

#[derive(Debug)]
struct Link<T> {
    prev: SlotId,
    next: SlotId,
    entry: Option<T>,
}

impl<T> Link<T> {
    fn detached(id: SlotId, entry: Option<T>) -> Self {
        Self {
            prev: id,
            next: id,
            entry,
        }
    }
}

/// Doubly linked list with permanent head/tail sentinels.
#[derive(Debug)]
pub struct RecencyList<T> {
    links: Vec<Link<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> RecencyList<T> {
    /// Creates an empty list holding only the two sentinels.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut links = Vec::with_capacity(capacity + SENTINELS);
        links.push(Link {
            prev: HEAD,
            next: TAIL,
            entry: None,
        });
        links.push(Link {
            prev: HEAD,
            next: TAIL,
            entry: None,
        });
        Self {
            links,
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of entries (sentinels excluded).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no entries are linked.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `id` names a linked entry.
    pub fn contains(&self, id: SlotId) -> bool {
        id.0 >= SENTINELS
            && self
                .links
                .get(id.0)
                .map(|link| link.entry.is_some())
                .unwrap_or(false)
    }

    /// Returns the entry stored at `id`.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        if id.0 < SENTINELS {
            return None;
        }
        self.links.get(id.0).and_then(|link| link.entry.as_ref())
    }

    /// Most recently used entry id.
    pub fn front_id(&self) -> Option<SlotId> {
        let id = self.links[HEAD.0].next;
        (id != TAIL).then_some(id)
    }

    /// Least recently used entry id.
    pub fn back_id(&self) -> Option<SlotId> {
        let id = self.links[TAIL.0].prev;
        (id != HEAD).then_some(id)
    }

    /// The neighbour of `id` one step closer to the head, or `None` when `id`
    /// is the front entry (or not linked).
    pub fn prev_id(&self, id: SlotId) -> Option<SlotId> {
        if !self.contains(id) {
            return None;
        }
        let prev = self.links[id.0].prev;
        (prev != HEAD).then_some(prev)
    }

    /// Links `value` right after the head sentinel.
    pub fn push_front(&mut self, value: T) -> SlotId {
        let id = match self.free.pop() {
            Some(idx) => {
                self.links[idx].entry = Some(value);
                SlotId(idx)
            },
            None => {
                let id = SlotId(self.links.len());
                self.links.push(Link::detached(id, Some(value)));
                id
            },
        };
        self.attach_front(id);
        self.len += 1;
        id
    }

    /// Moves a linked entry right after the head sentinel.
    ///
    /// Returns `false` if `id` is not a linked entry.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.links[HEAD.0].next == id {
            return true;
        }
        self.detach(id);
        self.attach_front(id);
        true
    }

    /// Unlinks `id` and returns its entry; the slot becomes reusable.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        self.detach(id);
        let entry = self.links[id.0].entry.take();
        self.free.push(id.0);
        self.len -= 1;
        entry
    }

    /// Iterates entries from MRU to LRU.
    pub fn iter(&self) -> RecencyIter<'_, T> {
        RecencyIter {
            list: self,
            current: self.links[HEAD.0].next,
        }
    }

    /// Walks the list in both directions and checks every link.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.links[HEAD.0].entry.is_some() || self.links[TAIL.0].entry.is_some() {
            return Err(InvariantError::new("sentinel slot holds an entry"));
        }

        let mut count = 0usize;
        let mut prev = HEAD;
        let mut current = self.links[HEAD.0].next;
        while current != TAIL {
            let link = self
                .links
                .get(current.0)
                .ok_or_else(|| InvariantError::new(format!("link to missing slot {}", current.0)))?;
            if link.entry.is_none() {
                return Err(InvariantError::new(format!(
                    "free slot {} is reachable from head",
                    current.0
                )));
            }
            if link.prev != prev {
                return Err(InvariantError::new(format!(
                    "slot {} prev is {}, expected {}",
                    current.0, link.prev.0, prev.0
                )));
            }
            count += 1;
            if count > self.len {
                return Err(InvariantError::new("forward walk exceeds len (cycle?)"));
            }
            prev = current;
            current = link.next;
        }
        if self.links[TAIL.0].prev != prev {
            return Err(InvariantError::new("tail.prev does not point at the last entry"));
        }
        if count != self.len {
            return Err(InvariantError::new(format!(
                "forward walk found {} entries, len is {}",
                count, self.len
            )));
        }

        let mut backward = 0usize;
        let mut current = self.links[TAIL.0].prev;
        while current != HEAD {
            backward += 1;
            if backward > self.len {
                return Err(InvariantError::new("backward walk exceeds len (cycle?)"));
            }
            current = self.links[current.0].prev;
        }
        if backward != self.len {
            return Err(InvariantError::new(format!(
                "backward walk found {} entries, len is {}",
                backward, self.len
            )));
        }

        let occupied = self.links.len() - SENTINELS - self.free.len();
        if occupied != self.len {
            return Err(InvariantError::new(format!(
                "{} occupied slots but len is {}",
                occupied, self.len
            )));
        }
        Ok(())
    }

    fn detach(&mut self, id: SlotId) {
        let (prev, next) = {
            let link = &self.links[id.0];
            (link.prev, link.next)
        };
        self.links[prev.0].next = next;
        self.links[next.0].prev = prev;
        let link = &mut self.links[id.0];
        link.prev = id;
        link.next = id;
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_front = self.links[HEAD.0].next;
        {
            let link = &mut self.links[id.0];
            link.prev = HEAD;
            link.next = old_front;
        }
        self.links[old_front.0].prev = id;
        self.links[HEAD.0].next = id;
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over entries from MRU to LRU.
pub struct RecencyIter<'a, T> {
    list: &'a RecencyList<T>,
    current: SlotId,
}

impl<'a, T> Iterator for RecencyIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == TAIL {
            return None;
        }
        let link = &self.list.links[self.current.0];
        self.current = link.next;
        link.entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order<T: Copy>(list: &RecencyList<T>) -> Vec<T> {
        list.iter().copied().collect()
    }

    #[test]
    fn new_list_has_no_entries() {
        let list: RecencyList<u32> = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.front_id(), None);
        assert_eq!(list.back_id(), None);
        assert_eq!(list.iter().count(), 0);
        list.check_invariants().unwrap();
    }

    #[test]
    fn push_front_orders_mru_first() {
        let mut list = RecencyList::new();
        let a = list.push_front("a");
        list.push_front("b");
        let c = list.push_front("c");

        assert_eq!(order(&list), vec!["c", "b", "a"]);
        assert_eq!(list.front_id(), Some(c));
        assert_eq!(list.back_id(), Some(a));
        assert_eq!(list.len(), 3);
        list.check_invariants().unwrap();
    }

    #[test]
    fn move_to_front_from_tail_and_middle() {
        let mut list = RecencyList::new();
        let a = list.push_front("a");
        let b = list.push_front("b");
        list.push_front("c");

        assert!(list.move_to_front(a));
        assert_eq!(order(&list), vec!["a", "c", "b"]);
        assert!(list.move_to_front(b));
        assert_eq!(order(&list), vec!["b", "a", "c"]);
        // already at front
        assert!(list.move_to_front(b));
        assert_eq!(order(&list), vec!["b", "a", "c"]);
        list.check_invariants().unwrap();
    }

    #[test]
    fn remove_unlinks_and_recycles_slot() {
        let mut list = RecencyList::new();
        let a = list.push_front(1);
        let b = list.push_front(2);

        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.remove(a), None);
        assert!(!list.contains(a));
        assert_eq!(list.back_id(), Some(b));

        let c = list.push_front(3);
        assert_eq!(c.index(), a.index());
        assert_eq!(order(&list), vec![3, 2]);
        list.check_invariants().unwrap();
    }

    #[test]
    fn sentinels_are_never_entries() {
        let mut list = RecencyList::new();
        list.push_front(7);
        assert!(!list.contains(HEAD));
        assert!(!list.contains(TAIL));
        assert_eq!(list.get(HEAD), None);
        assert_eq!(list.remove(TAIL), None);
        assert!(!list.move_to_front(HEAD));
        assert_eq!(list.len(), 1);
        list.check_invariants().unwrap();
    }

    #[test]
    fn prev_id_walks_toward_head() {
        let mut list = RecencyList::new();
        let a = list.push_front('a');
        let b = list.push_front('b');
        let c = list.push_front('c');

        let mut walked = Vec::new();
        let mut cursor = list.back_id();
        while let Some(id) = cursor {
            walked.push(*list.get(id).unwrap());
            cursor = list.prev_id(id);
        }
        assert_eq!(walked, vec!['a', 'b', 'c']);
        assert_eq!(list.prev_id(c), None);
        assert_eq!(list.prev_id(a), Some(b));
    }

    #[test]
    fn invariants_hold_across_mixed_operations() {
        let mut list = RecencyList::with_capacity(16);
        let mut ids = Vec::new();
        for i in 0..16u32 {
            ids.push(list.push_front(i));
        }
        for (n, id) in ids.iter().enumerate() {
            if n % 3 == 0 {
                list.remove(*id);
            } else if n % 3 == 1 {
                list.move_to_front(*id);
            }
        }
        list.check_invariants().unwrap();
        assert_eq!(list.len(), 16 - 6);
    }
}
