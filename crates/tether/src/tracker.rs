//! The registry: creates values and keeps a live, queryable set of
//! non-owning references to the ones still attached.
//!
//! # Invariants
//!
//! 1. Every stored entry's slot carries a back-reference naming this tracker
//!    and that entry's id.
//! 2. Every slot naming this tracker appears in the container exactly once.
//! 3. Membership changes only through create/attach/detach/detach_all and
//!    the drops that funnel into them; the container and back-references are
//!    never mutated directly from outside.
//!
//! Breaking these from the outside is unreachable through the public API;
//! detecting a break inside the crate panics rather than recovering.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::hooks::{TrackHooks, TrackerQuery};
use crate::store::{Entry, Store, TrackedId};
use crate::trackable::{BackRef, SlotRef, Trackable};

/// Identity of a tracker instance, stable across moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackerId(pub(crate) u64);

// Process-wide counters keep both id spaces collision-free without any
// per-tracker coordination. The registry itself remains single-threaded.
static NEXT_TRACKER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TRACKED_ID: AtomicU64 = AtomicU64::new(1);

fn next_tracker_id() -> TrackerId {
    TrackerId(NEXT_TRACKER_ID.fetch_add(1, Ordering::Relaxed))
}

fn next_tracked_id() -> TrackedId {
    TrackedId(NEXT_TRACKED_ID.fetch_add(1, Ordering::Relaxed))
}

/// Tracker backed by the uniqueness-enforcing ordered set.
pub type OrderedTracker<T, H = ()> = Tracker<T, H, BTreeSet<Entry<T>>>;

/// Dyn seam between a trackable's back-reference and its tracker. Lets a
/// value detach from (or clone-attach to) whatever tracker holds it without
/// knowing that tracker's hook or container parameters.
pub(crate) trait TrackerCore<T: 'static> {
    /// Remove the entry registered under `id`, clear its slot's
    /// back-reference, and fire `on_detach`.
    fn detach_entry(&self, id: TrackedId) -> bool;

    /// Attach `slot` through the attach path, firing `on_attach`.
    fn adopt(&self, slot: SlotRef<T>);
}

struct Shared<T: 'static, H, C> {
    id: TrackerId,
    weak_self: Weak<Shared<T, H, C>>,
    // Entries and hooks live in separate cells so a hook can query the
    // container while it runs.
    entries: RefCell<C>,
    hooks: RefCell<H>,
    marker: PhantomData<Cell<T>>,
}

impl<T, H, C> Shared<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + 'static,
    C: Store<T> + 'static,
{
    /// Wire `slot` into this tracker and record the entry. No hook fires.
    fn connect(&self, slot: &SlotRef<T>) -> TrackedId {
        let id = next_tracked_id();
        {
            let mut borrowed = slot.borrow_mut();
            assert!(
                borrowed.back.is_none(),
                "connect on an already-attached value"
            );
            let core: Weak<dyn TrackerCore<T>> = self.weak_self.clone();
            borrowed.back = Some(BackRef {
                core,
                tracker: self.id,
                id,
            });
        }
        self.entries
            .borrow_mut()
            .insert(Entry::new(id, Rc::downgrade(slot)));
        id
    }

    /// Remove `id` from the container, clear its slot's back-reference, then
    /// fire `on_detach` with the entry already gone.
    fn detach_entry_inner(&self, id: TrackedId) -> bool {
        let entry = self.entries.borrow_mut().remove(id);
        let Some(entry) = entry else {
            return false;
        };
        let slot = live_slot(&entry);
        {
            let mut borrowed = slot.borrow_mut();
            let back = borrowed
                .back
                .take()
                .expect("tracked value lost its back-reference");
            assert!(
                back.tracker == self.id && back.id == id,
                "membership bookkeeping out of sync"
            );
        }
        let borrowed = slot.borrow();
        trace!(tracker = self.id.0, tracked = id.0, "detached");
        self.hooks.borrow_mut().on_detach(self, &borrowed.value);
        true
    }

    /// Detach every member, then clear the container in one step.
    ///
    /// Contract: every `on_detach` fires while the container still holds all
    /// entries, so an observer querying the tracker from inside a hook sees
    /// the pre-clear count, not a shrinking one.
    fn detach_all_inner(&self) {
        let members = self.entries.borrow().snapshot();
        trace!(tracker = self.id.0, members = members.len(), "detach_all");
        for entry in &members {
            let slot = live_slot(entry);
            slot.borrow_mut().back = None;
            let borrowed = slot.borrow();
            trace!(tracker = self.id.0, tracked = entry.id().0, "detached");
            self.hooks.borrow_mut().on_detach(self, &borrowed.value);
        }
        self.entries.borrow_mut().clear();
    }
}

/// Resolve an entry's slot, which must outlive its membership: a trackable
/// detaches itself before its slot can die.
fn live_slot<T: 'static>(entry: &Entry<T>) -> SlotRef<T> {
    entry
        .slot
        .upgrade()
        .expect("tracked entry outlived its value")
}

impl<T, H, C> TrackerQuery for Shared<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + 'static,
    C: Store<T> + 'static,
{
    fn id(&self) -> TrackerId {
        self.id
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn contains(&self, id: TrackedId) -> bool {
        self.entries.borrow().contains(id)
    }
}

impl<T, H, C> TrackerCore<T> for Shared<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + 'static,
    C: Store<T> + 'static,
{
    fn detach_entry(&self, id: TrackedId) -> bool {
        self.detach_entry_inner(id)
    }

    fn adopt(&self, slot: SlotRef<T>) {
        let id = self.connect(&slot);
        let borrowed = slot.borrow();
        trace!(tracker = self.id.0, tracked = id.0, "attached");
        self.hooks.borrow_mut().on_attach(self, &borrowed.value);
    }
}

/// Non-owning registry of [`Trackable`] values.
///
/// Parameterized by the payload `T`, the notification capability `H`
/// (default `()`: no hooks), and the backing container `C` (default
/// `Vec<Entry<T>>`; see [`OrderedTracker`] for the ordered-set binding).
///
/// A tracker never owns its members' memory: detaching — including the
/// detach-all a dropped tracker performs — leaves every member alive in its
/// holder's hands. Movable but not cloneable; moving it by value preserves
/// all memberships, and move-assigning over a tracker first detaches (and
/// notifies for) the members the destination held, via its drop.
pub struct Tracker<T, H = (), C = Vec<Entry<T>>>
where
    T: 'static,
    H: TrackHooks<T> + 'static,
    C: Store<T> + 'static,
{
    shared: Rc<Shared<T, H, C>>,
}

impl<T, H, C> Tracker<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + 'static,
    C: Store<T> + 'static,
{
    /// Empty tracker with the given notification handler.
    #[must_use]
    pub fn with_hooks(hooks: H) -> Self {
        Self::with_store(hooks, C::default())
    }

    /// Empty tracker with the given notification handler and a
    /// caller-supplied container.
    ///
    /// # Panics
    ///
    /// Panics if `store` already holds entries: members enter the container
    /// only through the attach protocol.
    #[must_use]
    pub fn with_store(hooks: H, store: C) -> Self {
        assert!(
            store.is_empty(),
            "tracker container must start empty"
        );
        let shared = Rc::new_cyclic(|weak_self| Shared {
            id: next_tracker_id(),
            weak_self: Weak::clone(weak_self),
            entries: RefCell::new(store),
            hooks: RefCell::new(hooks),
            marker: PhantomData,
        });
        Self { shared }
    }

    /// Identity of this tracker, stable for its whole lifetime.
    #[must_use]
    pub fn id(&self) -> TrackerId {
        self.shared.id
    }

    /// Construct `value` already attached to this tracker and hand back
    /// exclusive ownership. Fires `on_create`, never `on_attach`.
    pub fn create(&self, value: T) -> Trackable<T> {
        let trackable = Trackable::new(value);
        let id = self.shared.connect(trackable.slot());
        {
            let borrowed = trackable.slot().borrow();
            trace!(tracker = self.shared.id.0, tracked = id.0, "created");
            self.shared
                .hooks
                .borrow_mut()
                .on_create(&*self.shared, &borrowed.value);
        }
        trackable
    }

    /// Attach a value, firing `on_attach`.
    ///
    /// Returns `false` when `value` is already attached to this tracker. A
    /// value attached elsewhere is detached from there first, firing that
    /// tracker's `on_detach`.
    pub fn attach(&self, value: &Trackable<T>) -> bool {
        if self.is_attached(value) {
            return false;
        }
        value.detach();
        self.shared.adopt(Rc::clone(value.slot()));
        true
    }

    /// Detach a value, firing `on_detach`. The value itself stays alive.
    ///
    /// Returns `false` when `value` is not attached to this tracker
    /// (including when it is attached to a different one).
    pub fn detach(&self, value: &Trackable<T>) -> bool {
        if !self.is_attached(value) {
            return false;
        }
        let id = value.tracked_id().expect("attached value without an id");
        let detached = self.shared.detach_entry_inner(id);
        assert!(detached, "attached value missing from its tracker");
        true
    }

    /// Detach every member, firing `on_detach` for each, then clear the
    /// container in one step. Hooks fire while the tracker still reports the
    /// pre-clear size.
    pub fn detach_all(&self) {
        self.shared.detach_all_inner();
    }

    /// Whether `value` is attached to this tracker.
    #[must_use]
    pub fn is_attached(&self, value: &Trackable<T>) -> bool {
        value.tracker_id() == Some(self.shared.id)
    }

    /// Whether `value` is not attached to this tracker.
    #[must_use]
    pub fn is_detached(&self, value: &Trackable<T>) -> bool {
        !self.is_attached(value)
    }

    /// Number of attached members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.borrow().len()
    }

    /// Whether no members are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Membership test by id, resolved through the container's
    /// [`Find`](crate::lookup::Find) strategy.
    #[must_use]
    pub fn contains(&self, id: TrackedId) -> bool {
        self.shared.entries.borrow().contains(id)
    }

    /// Ids of the attached members, in container order. A snapshot: safe to
    /// iterate while detaching.
    #[must_use]
    pub fn tracked_ids(&self) -> Vec<TrackedId> {
        self.shared.entries.borrow().ids()
    }

    /// Run `f` over the payload of the member registered under `id`.
    pub fn with_value<R>(&self, id: TrackedId, f: impl FnOnce(&T) -> R) -> Option<R> {
        let slot = {
            let entries = self.shared.entries.borrow();
            let entry = entries.find_member(&Entry::probe(id))?;
            live_slot(entry)
        };
        let borrowed = slot.borrow();
        Some(f(&borrowed.value))
    }

    /// Borrow the notification handler, e.g. to read its counters.
    ///
    /// # Panics
    ///
    /// Any tracker operation that fires hooks panics while this guard is
    /// held.
    #[must_use]
    pub fn hooks(&self) -> Ref<'_, H> {
        self.shared.hooks.borrow()
    }

    /// Mutably borrow the notification handler.
    ///
    /// # Panics
    ///
    /// Any tracker operation that fires hooks panics while this guard is
    /// held.
    #[must_use]
    pub fn hooks_mut(&self) -> RefMut<'_, H> {
        self.shared.hooks.borrow_mut()
    }
}

impl<T, H, C> Tracker<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + Default + 'static,
    C: Store<T> + 'static,
{
    /// Empty tracker with a default-constructed notification handler.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hooks(H::default())
    }
}

impl<T, H, C> Default for Tracker<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + Default + 'static,
    C: Store<T> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, H, C> Drop for Tracker<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + 'static,
    C: Store<T> + 'static,
{
    /// Detaches (never destroys) every member, firing `on_detach` for each.
    fn drop(&mut self) {
        self.shared.detach_all_inner();
    }
}

impl<T, H, C> fmt::Debug for Tracker<T, H, C>
where
    T: 'static,
    H: TrackHooks<T> + 'static,
    C: Store<T> + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("id", &self.shared.id)
            .field("len", &self.len())
            .finish()
    }
}
