#![forbid(unsafe_code)]

//! Observer plumbing shared by fields, calculated fields and resources.
//!
//! An observer is anything that must be told "the value you watch changed".
//! Hosts keep observers in an [`ObserverList`] and hand out RAII
//! [`Subscription`]s; dropping the subscription deregisters the observer.
//!
//! # Invariants
//!
//! 1. Observers are notified in registration order.
//! 2. An observer whose `notify` returns `false` is removed after the
//!    current notification round.
//! 3. No `RefCell` borrow of the list is held while an observer runs, so
//!    observers may subscribe or unsubscribe re-entrantly.
//! 4. A [`Visited`] set lives for exactly one externally triggered write.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashSet;

/// Call-scoped set of fields already written during one propagation.
#[derive(Debug, Default)]
pub struct Visited {
    seen: AHashSet<usize>,
}

impl Visited {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `item`; returns `false` if it was already visited.
    pub fn insert<T>(&mut self, item: &T) -> bool {
        self.seen.insert(std::ptr::from_ref(item) as usize)
    }

    #[must_use]
    pub fn contains<T>(&self, item: &T) -> bool {
        self.seen.contains(&(std::ptr::from_ref(item) as usize))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Something that reacts to a watched value changing.
pub trait ValueObserver {
    /// React to a change. Returns `false` when the observer is no longer
    /// valid (e.g. its target was destroyed) and should be dropped.
    fn notify(&self, visited: &mut Visited) -> bool;
}

/// Registration counter handed out by an [`ObserverList`].
pub type ObserverId = u64;

/// Owner of an observer list that can drop registrations by id.
pub trait ObserverHost {
    fn remove_observer(&self, id: ObserverId);
}

/// A host backed by a single [`ObserverList`].
pub trait Observable: ObserverHost {
    fn observers(&self) -> &ObserverList;
}

/// Register `observer` on `host`, returning the guard that removes it.
pub fn subscribe<H: Observable + 'static>(host: &Rc<H>, observer: Rc<dyn ValueObserver>) -> Subscription {
    let id = host.observers().add(observer);
    Subscription::new(host, id)
}

/// Ordered observer registrations.
#[derive(Default)]
pub struct ObserverList {
    next_id: Cell<ObserverId>,
    entries: RefCell<Vec<(ObserverId, Rc<dyn ValueObserver>)>>,
}

impl ObserverList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Rc<dyn ValueObserver>) -> ObserverId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, observer));
        id
    }

    pub fn remove(&self, id: ObserverId) {
        self.entries.borrow_mut().retain(|(eid, _)| *eid != id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Notify every observer registered when the round starts.
    pub fn notify(&self, visited: &mut Visited) {
        let snapshot: Vec<(ObserverId, Rc<dyn ValueObserver>)> = self.entries.borrow().clone();
        let mut stale = Vec::new();
        for (id, observer) in snapshot {
            if !observer.notify(visited) {
                stale.push(id);
            }
        }
        if !stale.is_empty() {
            self.entries
                .borrow_mut()
                .retain(|(id, _)| !stale.contains(id));
        }
    }
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.len())
            .finish()
    }
}

/// RAII registration: dropping it removes the observer from its host.
///
/// Outliving the host is fine; the drop is then a no-op.
#[must_use = "dropping a Subscription deregisters the observer"]
pub struct Subscription {
    host: Weak<dyn ObserverHost>,
    id: ObserverId,
}

impl Subscription {
    pub fn new<H: ObserverHost + 'static>(host: &Rc<H>, id: ObserverId) -> Self {
        let host: Rc<dyn ObserverHost> = Rc::clone(host) as Rc<dyn ObserverHost>;
        Self {
            host: Rc::downgrade(&host),
            id,
        }
    }

    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Whether the host still exists.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.host.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(host) = self.host.upgrade() {
            host.remove_observer(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Subscriptions held on behalf of one view.
///
/// Dropping or clearing the scope disconnects everything it holds.
#[derive(Debug, Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release subscriptions, newest first.
    pub fn clear(&mut self) {
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: Cell<u32>,
        keep: bool,
    }

    impl ValueObserver for Counter {
        fn notify(&self, _visited: &mut Visited) -> bool {
            self.hits.set(self.hits.get() + 1);
            self.keep
        }
    }

    struct Host {
        list: ObserverList,
    }

    impl ObserverHost for Host {
        fn remove_observer(&self, id: ObserverId) {
            self.list.remove(id);
        }
    }

    impl Observable for Host {
        fn observers(&self) -> &ObserverList {
            &self.list
        }
    }

    fn counter(keep: bool) -> Rc<Counter> {
        Rc::new(Counter {
            hits: Cell::new(0),
            keep,
        })
    }

    #[test]
    fn invalid_observers_are_pruned_after_the_round() {
        let list = ObserverList::new();
        let keep = counter(true);
        let drop_me = counter(false);
        list.add(keep.clone());
        list.add(drop_me.clone());

        list.notify(&mut Visited::new());
        list.notify(&mut Visited::new());
        assert_eq!(keep.hits.get(), 2);
        assert_eq!(drop_me.hits.get(), 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn dropping_a_subscription_deregisters() {
        let host = Rc::new(Host {
            list: ObserverList::new(),
        });
        let sub = subscribe(&host, counter(true));
        assert!(sub.is_live());
        assert_eq!(host.list.len(), 1);
        drop(sub);
        assert!(host.list.is_empty());
    }

    #[test]
    fn subscription_outliving_host_is_inert() {
        let host = Rc::new(Host {
            list: ObserverList::new(),
        });
        let id = host.list.add(counter(true));
        let sub = Subscription::new(&host, id);
        drop(host);
        assert!(!sub.is_live());
    }

    #[test]
    fn scope_clear_releases_everything() {
        let host = Rc::new(Host {
            list: ObserverList::new(),
        });
        let mut scope = BindingScope::new();
        for _ in 0..3 {
            let id = host.list.add(counter(true));
            scope.hold(Subscription::new(&host, id));
        }
        assert_eq!(scope.len(), 3);
        scope.clear();
        assert!(scope.is_empty());
        assert!(host.list.is_empty());
    }

    #[test]
    fn visited_detects_revisits() {
        let a = 1u8;
        let b = 2u8;
        let mut visited = Visited::new();
        assert!(visited.insert(&a));
        assert!(visited.insert(&b));
        assert!(!visited.insert(&a));
        assert!(visited.contains(&b));
        assert_eq!(visited.len(), 2);
    }
}
