//! A value wrapper that can be attached to at most one tracker at a time and
//! detaches itself when dropped.
//!
//! # Identity
//!
//! Rust values move freely in memory, so a trackable's identity cannot be its
//! address. Every `Trackable` owns a heap slot (`Rc<RefCell<Slot<T>>>`); the
//! tracker holds `Weak` references to member slots. Moving a `Trackable` (or
//! its tracker) by value moves only the handle, so the attachment survives
//! moves with no rewiring and no notifications.
//!
//! # Invariants
//!
//! 1. The back-reference is `None` or names a tracker whose container holds
//!    this slot exactly once.
//! 2. The back-reference never keeps the tracker alive (`Weak`).
//! 3. The back-reference changes only through the attach/detach protocol.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::hooks::TrackHooks;
use crate::store::{Store, TrackedId};
use crate::tracker::{Tracker, TrackerCore, TrackerId};

pub(crate) type SlotRef<T> = Rc<RefCell<Slot<T>>>;

/// Shared cell behind every trackable: the payload plus the back-reference.
pub(crate) struct Slot<T: 'static> {
    pub(crate) value: T,
    pub(crate) back: Option<BackRef<T>>,
}

/// Non-owning link from a slot to its current tracker.
pub(crate) struct BackRef<T: 'static> {
    pub(crate) core: Weak<dyn TrackerCore<T>>,
    pub(crate) tracker: TrackerId,
    pub(crate) id: TrackedId,
}

impl<T> Clone for BackRef<T> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
            tracker: self.tracker,
            id: self.id,
        }
    }
}

/// A payload that a [`Tracker`](crate::Tracker) can track.
///
/// Created detached with [`Trackable::new`], or already attached through
/// [`Tracker::create`](crate::Tracker::create). The holder owns the payload
/// exclusively; the tracker never does. Dropping an attached `Trackable`
/// detaches it first, firing its tracker's `on_detach`.
pub struct Trackable<T: 'static> {
    slot: SlotRef<T>,
}

impl<T: 'static> Trackable<T> {
    /// Wrap `value`, starting detached.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot { value, back: None })),
        }
    }

    pub(crate) fn slot(&self) -> &SlotRef<T> {
        &self.slot
    }

    /// Borrow the payload.
    ///
    /// # Panics
    ///
    /// Panics if a [`value_mut`](Self::value_mut) guard is outstanding.
    #[must_use]
    pub fn value(&self) -> Ref<'_, T> {
        Ref::map(self.slot.borrow(), |slot| &slot.value)
    }

    /// Mutably borrow the payload.
    ///
    /// Do not hold the guard across tracker operations on this value; the
    /// detach path borrows the same cell and would panic.
    #[must_use]
    pub fn value_mut(&mut self) -> RefMut<'_, T> {
        RefMut::map(self.slot.borrow_mut(), |slot| &mut slot.value)
    }

    /// Identity of the tracker currently holding this value, if any.
    #[must_use]
    pub fn tracker_id(&self) -> Option<TrackerId> {
        self.slot.borrow().back.as_ref().map(|back| back.tracker)
    }

    /// Id this value is registered under, if attached. A fresh id is issued
    /// on every attach.
    #[must_use]
    pub fn tracked_id(&self) -> Option<TrackedId> {
        self.slot.borrow().back.as_ref().map(|back| back.id)
    }

    /// Whether this value is attached to any tracker.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.slot.borrow().back.is_some()
    }

    /// Whether this value is attached to no tracker.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        !self.is_attached()
    }

    /// Whether this value is attached to `tracker` specifically.
    #[must_use]
    pub fn is_attached_to<H, C>(&self, tracker: &Tracker<T, H, C>) -> bool
    where
        H: TrackHooks<T> + 'static,
        C: Store<T> + 'static,
    {
        self.tracker_id() == Some(tracker.id())
    }

    /// Detach from the current tracker, firing its `on_detach`.
    ///
    /// Returns `false` when already detached.
    pub fn detach(&self) -> bool {
        let back = self.slot.borrow().back.clone();
        let Some(back) = back else {
            return false;
        };
        let core = back
            .core
            .upgrade()
            .expect("tracker vanished without detaching its members");
        let detached = core.detach_entry(back.id);
        assert!(detached, "attached value missing from its tracker");
        true
    }
}

impl<T: Clone + 'static> Clone for Trackable<T> {
    /// Copy the payload. The copy starts detached, then joins the source's
    /// tracker through the attach path, firing `on_attach` (a copy is not a
    /// creation event).
    fn clone(&self) -> Self {
        let copy = Trackable::new(self.value().clone());
        let back = self.slot.borrow().back.clone();
        if let Some(back) = back {
            let core = back
                .core
                .upgrade()
                .expect("tracker vanished without detaching its members");
            core.adopt(Rc::clone(&copy.slot));
        }
        copy
    }

    /// Assign the payload; re-home the destination only when the trackers
    /// differ (detaching it first, then attaching to the source's tracker).
    fn clone_from(&mut self, source: &Self) {
        let value = source.value().clone();
        self.slot.borrow_mut().value = value;
        if self.tracker_id() != source.tracker_id() {
            self.detach();
            let back = source.slot.borrow().back.clone();
            if let Some(back) = back {
                let core = back
                    .core
                    .upgrade()
                    .expect("tracker vanished without detaching its members");
                core.adopt(Rc::clone(&self.slot));
            }
        }
    }
}

impl<T: 'static> Drop for Trackable<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Trackable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("Trackable")
            .field("value", &slot.value)
            .field("tracker", &slot.back.as_ref().map(|back| back.tracker))
            .finish()
    }
}

impl<T: 'static> From<T> for Trackable<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_starts_detached() {
        let t = Trackable::new(7);
        assert!(t.is_detached());
        assert!(!t.is_attached());
        assert_eq!(t.tracker_id(), None);
        assert_eq!(t.tracked_id(), None);
    }

    #[test]
    fn detach_when_detached_is_noop() {
        let t = Trackable::new("x");
        assert!(!t.detach());
        assert!(!t.detach());
    }

    #[test]
    fn payload_access() {
        let mut t = Trackable::new(String::from("abc"));
        assert_eq!(&*t.value(), "abc");
        t.value_mut().push('d');
        assert_eq!(&*t.value(), "abcd");
    }

    #[test]
    fn clone_of_detached_stays_detached() {
        let t = Trackable::new(5);
        let c = t.clone();
        assert!(c.is_detached());
        assert_eq!(*c.value(), 5);
    }

    #[test]
    fn from_wraps_detached() {
        let t: Trackable<i32> = 9.into();
        assert!(t.is_detached());
        assert_eq!(*t.value(), 9);
    }

    #[test]
    fn dropping_detached_value_is_fine() {
        let t = Trackable::new(vec![1, 2, 3]);
        drop(t);
    }

    #[test]
    fn debug_shows_value_and_tracker() {
        let t = Trackable::new(3);
        let s = format!("{t:?}");
        assert!(s.contains("3"));
        assert!(s.contains("tracker"));
    }
}
