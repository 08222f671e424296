#![forbid(unsafe_code)]

//! Change propagation primitives.
//!
//! - [`ValueObserver`]: anything that reacts to a watched value changing.
//! - [`Subscription`]: RAII guard that removes an observer on drop.
//! - [`BindingScope`]: the set of subscriptions a view holds.
//! - [`BindingObserver`]: pushes source values into a target field.
//! - [`ChangeHandlerObserver`]: queues or runs a named handler.
//! - [`CalculatedField`]: cached derived value with implicit dependency
//!   discovery through the [`ComputationStack`].
//!
//! # Architecture
//!
//! Everything is single-threaded and uses `Rc`/`Weak`. Observer lists are
//! snapshotted before notification, so observers may subscribe or
//! unsubscribe while being notified. A [`Visited`] set travels with each
//! externally triggered write and stops cyclic binding graphs.
//!
//! # Invariants
//!
//! 1. Observers are notified in registration order.
//! 2. An observer returning `false` from `notify` is removed after the round.
//! 3. Dropping a [`Subscription`] removes the observer before the next round.

pub mod binding;
pub mod calculated;
pub mod handler;
pub mod observer;

pub use binding::BindingObserver;
pub(crate) use binding::wire_binding;
pub use calculated::{CalculatedField, ComputationStack};
pub use handler::ChangeHandlerObserver;
pub use observer::{
    BindingScope, Observable, ObserverHost, ObserverId, ObserverList, Subscription, ValueObserver,
    Visited, subscribe,
};
