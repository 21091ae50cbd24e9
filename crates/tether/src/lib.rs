#![forbid(unsafe_code)]

//! Non-owning object registry with attach/detach lifecycle notifications.
//!
//! # Role
//!
//! `tether` is a factory/registry: a [`Tracker`] creates values and keeps a
//! live, queryable set of references to the ones still attached, without
//! owning them. A tracked value ([`Trackable`]) detaches itself when
//! dropped; a tracker detaches — never destroys — its members when it is
//! dropped. A pluggable hook set ([`TrackHooks`]) fires on create, attach,
//! and detach, which makes the registry usable as an observable
//! object-lifecycle hub (bookkeeping, caching, UI binding).
//!
//! # Primary responsibilities
//!
//! - **[`Tracker`]**: create/attach/detach/detach_all plus membership
//!   queries; parameterized by payload, hook set, and backing container.
//! - **[`Trackable`]**: payload wrapper holding an optional non-owning
//!   back-reference to its current tracker.
//! - **[`TrackHooks`]** / **[`TrackerQuery`]**: notification capability with
//!   a read-only mid-call view of the firing tracker.
//! - **[`Store`]** / **[`Find`]**: pluggable backing container with a
//!   compile-time choice between native and linear member lookup.
//!
//! Single-threaded by construction: the registry is built on `Rc`/`RefCell`
//! and is deliberately `!Send`.
//!
//! # Example
//!
//! ```
//! use tether::{Trackable, Tracker};
//!
//! let registry: Tracker<String> = Tracker::new();
//! let a = registry.create("alpha".to_string());
//! let b = Trackable::new("beta".to_string());
//!
//! assert!(registry.attach(&b));
//! assert_eq!(registry.len(), 2);
//!
//! drop(a); // detaches itself
//! assert_eq!(registry.len(), 1);
//! assert!(registry.is_attached(&b));
//! ```

pub mod hooks;
pub mod lookup;
pub mod store;
pub mod trackable;
pub mod tracker;

pub use hooks::{TrackHooks, TrackerQuery};
pub use lookup::Find;
pub use store::{Entry, Store, TrackedId};
pub use trackable::Trackable;
pub use tracker::{OrderedTracker, Tracker, TrackerId};
