//! Backing-container abstraction for a tracker's membership records.
//!
//! A [`Tracker`](crate::Tracker) is parameterized by a [`Store`]: the default
//! binding is `Vec<Entry<T>>` (append-ordered, cheap when detaching is rare),
//! and `BTreeSet<Entry<T>>` is supported as a uniqueness-enforcing ordered
//! set. The trait fixes the element type to [`Entry<T>`], so a mismatched
//! container instantiation is unrepresentable.
//!
//! # Invariants
//!
//! 1. Entry ids are unique within a store (ids are never reused).
//! 2. Every entry's weak slot points at a live trackable while the entry is
//!    stored.
//! 3. `contains` agrees with the container's [`Find`] strategy.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Weak;

use crate::lookup::Find;
use crate::trackable::Slot;

/// Identifier issued to a trackable each time it attaches. Never reused;
/// within one tracker, ids ascend in attach order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackedId(pub(crate) u64);

/// A non-owning membership record held by a tracker.
///
/// Compares and orders by id only, so an ordered store iterates in attach
/// order.
pub struct Entry<T: 'static> {
    pub(crate) id: TrackedId,
    pub(crate) slot: Weak<RefCell<Slot<T>>>,
}

impl<T> Entry<T> {
    pub(crate) fn new(id: TrackedId, slot: Weak<RefCell<Slot<T>>>) -> Self {
        Self { id, slot }
    }

    /// Lookup probe: compares equal to the live entry with the same id.
    pub(crate) fn probe(id: TrackedId) -> Self {
        Self {
            id,
            slot: Weak::new(),
        }
    }

    /// Id this entry was registered under.
    #[must_use]
    pub fn id(&self) -> TrackedId {
        self.id
    }
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slot: Weak::clone(&self.slot),
        }
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Container operations a tracker needs from its backing store.
///
/// `insert` appends (or inserts in order), `remove` erases by id, and
/// `contains` resolves through the container's [`Find`] strategy.
pub trait Store<T: 'static>: Default + Find<Member = Entry<T>> {
    /// Record a new member.
    fn insert(&mut self, entry: Entry<T>);

    /// Erase the member registered under `id`, returning its entry.
    fn remove(&mut self, id: TrackedId) -> Option<Entry<T>>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the stored entries, in container order.
    fn ids(&self) -> Vec<TrackedId>;

    /// Clone of every entry, in container order.
    fn snapshot(&self) -> Vec<Entry<T>>;

    /// Erase every entry in one step.
    fn clear(&mut self);

    /// Membership test by id.
    fn contains(&self, id: TrackedId) -> bool {
        self.find_member(&Entry::probe(id)).is_some()
    }
}

impl<T: 'static> Store<T> for Vec<Entry<T>> {
    fn insert(&mut self, entry: Entry<T>) {
        self.push(entry);
    }

    fn remove(&mut self, id: TrackedId) -> Option<Entry<T>> {
        let pos = self.iter().position(|entry| entry.id == id)?;
        Some(Vec::remove(self, pos))
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn ids(&self) -> Vec<TrackedId> {
        self.iter().map(|entry| entry.id).collect()
    }

    fn snapshot(&self) -> Vec<Entry<T>> {
        self.to_vec()
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }
}

impl<T: 'static> Store<T> for BTreeSet<Entry<T>> {
    fn insert(&mut self, entry: Entry<T>) {
        let fresh = BTreeSet::insert(self, entry);
        debug_assert!(fresh, "entry ids are never reused");
    }

    fn remove(&mut self, id: TrackedId) -> Option<Entry<T>> {
        self.take(&Entry::probe(id))
    }

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    fn ids(&self) -> Vec<TrackedId> {
        self.iter().map(|entry| entry.id).collect()
    }

    fn snapshot(&self) -> Vec<Entry<T>> {
        self.iter().cloned().collect()
    }

    fn clear(&mut self) {
        BTreeSet::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64) -> Entry<u8> {
        Entry::new(TrackedId(id), Weak::new())
    }

    // Both bindings go through the same exercise so their observable
    // behavior stays aligned.
    fn exercise<C: Store<u8>>() {
        let mut store = C::default();
        assert!(Store::is_empty(&store));

        Store::insert(&mut store, entry(1));
        Store::insert(&mut store, entry(2));
        Store::insert(&mut store, entry(3));
        assert_eq!(Store::len(&store), 3);
        assert!(store.contains(TrackedId(2)));
        assert!(!store.contains(TrackedId(9)));

        let removed = Store::remove(&mut store, TrackedId(2)).unwrap();
        assert_eq!(removed.id(), TrackedId(2));
        assert_eq!(Store::len(&store), 2);
        assert!(Store::remove(&mut store, TrackedId(2)).is_none());

        assert_eq!(store.ids(), vec![TrackedId(1), TrackedId(3)]);
        assert_eq!(store.snapshot().len(), 2);

        Store::clear(&mut store);
        assert!(Store::is_empty(&store));
    }

    #[test]
    fn vec_store_behaves() {
        exercise::<Vec<Entry<u8>>>();
    }

    #[test]
    fn btreeset_store_behaves() {
        exercise::<BTreeSet<Entry<u8>>>();
    }

    #[test]
    fn vec_preserves_append_order() {
        let mut store: Vec<Entry<u8>> = Vec::new();
        Store::insert(&mut store, entry(7));
        Store::insert(&mut store, entry(3));
        assert_eq!(store.ids(), vec![TrackedId(7), TrackedId(3)]);
    }

    #[test]
    fn btreeset_orders_by_id() {
        let mut store: BTreeSet<Entry<u8>> = BTreeSet::new();
        Store::insert(&mut store, entry(7));
        Store::insert(&mut store, entry(3));
        assert_eq!(store.ids(), vec![TrackedId(3), TrackedId(7)]);
    }

    #[test]
    fn probe_matches_live_entry() {
        let live = entry(5);
        let probe = Entry::<u8>::probe(TrackedId(5));
        assert_eq!(live, probe);
        assert_ne!(live, Entry::<u8>::probe(TrackedId(6)));
    }
}
