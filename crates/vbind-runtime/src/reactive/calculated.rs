#![forbid(unsafe_code)]

//! Calculated fields with implicit dependency discovery.
//!
//! A [`CalculatedField`] caches the result of a compute callback. While the
//! callback runs, the field sits on top of a shared [`ComputationStack`];
//! every field read during that time calls [`CalculatedField::track`] on the
//! top entry, which subscribes the calculated field to that source. When any
//! source changes the cache is invalidated and, unless another computation
//! is in flight, recomputed eagerly so listeners see the new value.
//!
//! # Invariants
//!
//! 1. Reading a clean field never invokes the compute callback.
//! 2. Each recompute drops the previous dependency subscriptions before
//!    discovering the new ones.
//! 3. A field never subscribes to itself, even if its callback reads it.
//! 4. Listeners are notified only when a refresh changes the cached value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use vbind_core::Value;

use super::observer::{
    Observable, ObserverHost, ObserverId, ObserverList, Subscription, ValueObserver, Visited,
    subscribe,
};

type ComputeFn = Box<dyn Fn() -> Value>;
type PushBackFn = Box<dyn Fn(Value)>;

// ---------------------------------------------------------------------------
// ComputationStack
// ---------------------------------------------------------------------------

/// Stack of calculated fields currently evaluating their callbacks.
///
/// One stack is shared by everything created from the same binding context.
#[derive(Clone, Default)]
pub struct ComputationStack {
    frames: Rc<RefCell<Vec<Weak<CalculatedField>>>>,
}

impl ComputationStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The innermost computation, if any.
    #[must_use]
    pub fn current(&self) -> Option<Rc<CalculatedField>> {
        self.frames.borrow().last().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    fn push(&self, field: Weak<CalculatedField>) {
        self.frames.borrow_mut().push(field);
    }

    fn pop(&self) {
        self.frames.borrow_mut().pop();
    }
}

impl fmt::Debug for ComputationStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationStack")
            .field("depth", &self.depth())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CalculatedField
// ---------------------------------------------------------------------------

struct Dependency {
    key: usize,
    _sub: Subscription,
}

/// A lazily recomputed value derived from other fields.
pub struct CalculatedField {
    this: Weak<CalculatedField>,
    stack: ComputationStack,
    compute: ComputeFn,
    push_back: Option<PushBackFn>,
    cached: RefCell<Value>,
    dirty: Cell<bool>,
    computing: Cell<bool>,
    recomputes: Cell<u64>,
    dependencies: RefCell<SmallVec<[Dependency; 4]>>,
    listeners: ObserverList,
}

impl CalculatedField {
    /// Create a dirty field; nothing is computed until the first read.
    pub fn new(
        stack: ComputationStack,
        compute: impl Fn() -> Value + 'static,
        push_back: Option<Box<dyn Fn(Value)>>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            stack,
            compute: Box::new(compute),
            push_back,
            cached: RefCell::new(Value::Null),
            dirty: Cell::new(true),
            computing: Cell::new(false),
            recomputes: Cell::new(0),
            dependencies: RefCell::new(SmallVec::new()),
            listeners: ObserverList::new(),
        })
    }

    /// Current value, recomputing first if dirty.
    ///
    /// A read from inside this field's own callback returns the previous
    /// cached value.
    pub fn value(&self) -> Value {
        if self.dirty.get() && !self.computing.get() {
            self.refresh();
        }
        self.cached.borrow().clone()
    }

    /// Push `value` back into the dependencies and invalidate.
    ///
    /// Without a push-back callback this only invalidates.
    pub fn set(&self, value: Value) {
        if let Some(push_back) = &self.push_back {
            push_back(value);
        }
        self.invalidate();
    }

    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Number of times the compute callback has run.
    #[must_use]
    pub fn recomputes(&self) -> u64 {
        self.recomputes.get()
    }

    /// Number of sources discovered by the last recompute.
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.dependencies.borrow().len()
    }

    /// Whether `other` is this very field.
    #[must_use]
    pub fn is_same(&self, other: &CalculatedField) -> bool {
        std::ptr::eq(self, other)
    }

    /// Subscribe to `source` for the computation in progress.
    pub fn track<H: Observable + 'static>(&self, source: &Rc<H>) {
        let key = Rc::as_ptr(source) as *const () as usize;
        if key == self.this.as_ptr() as *const () as usize
            || self.dependencies.borrow().iter().any(|d| d.key == key)
        {
            return;
        }
        let observer = Rc::new(DependencyObserver {
            field: self.this.clone(),
        });
        let sub = subscribe(source, observer);
        self.dependencies
            .borrow_mut()
            .push(Dependency { key, _sub: sub });
    }

    /// Run the compute callback; returns whether the cached value changed.
    fn refresh(&self) -> bool {
        let stale = std::mem::take(&mut *self.dependencies.borrow_mut());
        drop(stale);

        self.computing.set(true);
        self.stack.push(self.this.clone());
        let value = (self.compute)();
        self.stack.pop();
        self.computing.set(false);

        self.recomputes.set(self.recomputes.get() + 1);
        self.dirty.set(false);
        let previous = self.cached.replace(value);
        tracing::trace!(recomputes = self.recomputes.get(), "calculated field refreshed");
        previous != *self.cached.borrow()
    }

    fn dependency_changed(&self, visited: &mut Visited) {
        self.dirty.set(true);
        if self.computing.get() || !self.stack.is_empty() {
            return;
        }
        if self.refresh() {
            self.listeners.notify(visited);
        }
    }
}

impl ObserverHost for CalculatedField {
    fn remove_observer(&self, id: ObserverId) {
        self.listeners.remove(id);
    }
}

impl Observable for CalculatedField {
    fn observers(&self) -> &ObserverList {
        &self.listeners
    }
}

impl fmt::Debug for CalculatedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatedField")
            .field("cached", &*self.cached.borrow())
            .field("dirty", &self.dirty.get())
            .field("dependencies", &self.dependency_count())
            .field("recomputes", &self.recomputes.get())
            .finish()
    }
}

struct DependencyObserver {
    field: Weak<CalculatedField>,
}

impl ValueObserver for DependencyObserver {
    fn notify(&self, visited: &mut Visited) -> bool {
        match self.field.upgrade() {
            Some(field) => {
                field.dependency_changed(visited);
                true
            }
            None => false,
        }
    }
}
