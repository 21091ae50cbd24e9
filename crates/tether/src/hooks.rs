//! Notification capability: the pluggable hook set a tracker fires on
//! create, attach, and detach.
//!
//! Hooks are synchronous side-effect observers (counters, caches, UI
//! bindings). They cannot veto an operation. Each invocation receives a
//! [`TrackerQuery`] view of the firing tracker, so a handler can observe the
//! registry mid-call; during `detach_all` that view still reports the
//! pre-clear count for every callback.

use crate::store::TrackedId;
use crate::tracker::TrackerId;

/// Read-only view of a tracker, handed to each hook invocation.
pub trait TrackerQuery {
    /// Identity of the firing tracker.
    fn id(&self) -> TrackerId;

    /// Number of members the container currently holds.
    fn len(&self) -> usize;

    /// Whether the tracker currently holds no members.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Membership test by id.
    fn contains(&self, id: TrackedId) -> bool;
}

/// Hook set invoked by a [`Tracker`](crate::Tracker).
///
/// All methods default to no-ops; implement only the ones you observe. The
/// unit type `()` is the hook-less handler.
///
/// Hooks must not call mutating tracker operations from inside a callback;
/// the tracker's interior cells are armed during dispatch and re-entry
/// panics.
pub trait TrackHooks<T> {
    /// After `create` constructs and attaches a value. Never fired by
    /// `attach`.
    fn on_create(&mut self, _tracker: &dyn TrackerQuery, _value: &T) {}

    /// After a value is attached by `attach` (including clone-attach).
    /// Never fired by `create`.
    fn on_attach(&mut self, _tracker: &dyn TrackerQuery, _value: &T) {}

    /// After a value is detached, whatever the path: explicit detach, drop,
    /// `detach_all`, or the tracker's own drop.
    fn on_detach(&mut self, _tracker: &dyn TrackerQuery, _value: &T) {}
}

/// Hook-less tracker.
impl<T> TrackHooks<T> for () {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl TrackHooks<u32> for Silent {}

    struct FakeQuery;

    impl TrackerQuery for FakeQuery {
        fn id(&self) -> TrackerId {
            TrackerId(0)
        }

        fn len(&self) -> usize {
            0
        }

        fn contains(&self, _id: TrackedId) -> bool {
            false
        }
    }

    #[test]
    fn default_hooks_are_noops() {
        let mut hooks = Silent;
        hooks.on_create(&FakeQuery, &1);
        hooks.on_attach(&FakeQuery, &2);
        hooks.on_detach(&FakeQuery, &3);
    }

    #[test]
    fn is_empty_follows_len() {
        assert!(FakeQuery.is_empty());
    }
}
