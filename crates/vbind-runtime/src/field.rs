#![forbid(unsafe_code)]

//! Per-view field data.
//!
//! A [`FieldData`] binds one view and one path string to its resolved
//! [`FieldPathInfo`] and keeps the observers registered on that path. It is
//! created the first time a path is touched on a view and lives as long as
//! the view does.
//!
//! Depending on the resolved target a field either
//! - reads and writes a slot through the accessor chain (stored),
//! - fronts a [`CalculatedField`] owned by the view (calculated), or
//! - forwards to a field of another view reached through an owner-typed
//!   member (mapped). A mapped field relays change notifications from its
//!   target, so observers never need to know the redirection happened.
//!
//! # Invariants
//!
//! 1. A write notifies observers only when the converted value differs from
//!    the previous one.
//! 2. A field already present in the call's [`Visited`] set ignores the
//!    write and returns `None`. A write that fails conversion does not mark
//!    the field visited.
//! 3. Observers registered on a mapped field keep working when the owner
//!    member is reassigned, tracked or direct; the relay is rebuilt against
//!    the new target.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use vbind_core::{ConversionContext, FieldPathInfo, FieldValue, PathTarget, Value};

use crate::reactive::{
    CalculatedField, Observable, ObserverHost, ObserverId, ObserverList, Subscription,
    ValueObserver, Visited, subscribe,
};
use crate::view::{SetOptions, View, ViewInner};

struct MappedTarget {
    view: Weak<ViewInner>,
    field: Rc<FieldData>,
    _relay: Subscription,
}

/// One path on one view.
pub struct FieldData {
    this: Weak<FieldData>,
    owner: Weak<ViewInner>,
    info: Rc<FieldPathInfo>,
    observers: ObserverList,
    mapped: RefCell<Option<MappedTarget>>,
    calculated: RefCell<Option<Subscription>>,
}

impl FieldData {
    pub(crate) fn new(owner: &View, info: Rc<FieldPathInfo>) -> Rc<Self> {
        let field = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            owner: owner.downgrade(),
            info,
            observers: ObserverList::new(),
            mapped: RefCell::new(None),
            calculated: RefCell::new(None),
        });
        if let Some(calc) = calculated_of(owner, &field) {
            let relay = Rc::new(ChangeRelay {
                field: Rc::downgrade(&field),
            });
            field.calculated.replace(Some(subscribe(&calc, relay)));
        }
        field
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.info.path
    }

    #[must_use]
    pub fn info(&self) -> &FieldPathInfo {
        &self.info
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Register `observer`, establishing the mapped relay first if needed.
    pub fn observe(this: &Rc<Self>, observer: Rc<dyn ValueObserver>) -> Subscription {
        if this.info.is_mapped() {
            let _ = this.mapped_target();
        }
        subscribe(this, observer)
    }

    /// Current value, or `None` when an intermediate is null or the path
    /// cannot currently be followed.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        let owner = View::from_inner(self.owner.upgrade()?);
        match &self.info.target {
            PathTarget::Stored => owner.read_chain(&self.info.members),
            PathTarget::Calculated { .. } => calculated_of(&owner, self).map(|c| c.value()),
            PathTarget::Mapped { .. } => {
                let (_, field) = self.mapped_target()?;
                field.value()
            }
        }
    }

    /// Convert and store `value`. Returns the converted value, or `None` if
    /// the write was aborted or suppressed by the cycle guard.
    pub fn set_value(&self, value: Value, notify: bool, visited: &mut Visited) -> Option<Value> {
        if visited.contains(self) {
            tracing::trace!(path = %self.info.path, "field already visited in this propagation");
            return None;
        }
        let owner = View::from_inner(self.owner.upgrade()?);

        match &self.info.target {
            PathTarget::Mapped { target_path, .. } => {
                let Some((target, _)) = self.mapped_target() else {
                    tracing::debug!(view = %owner, path = %self.info.path, "mapped owner is not set; write dropped");
                    return None;
                };
                let options = SetOptions {
                    notify,
                    ..SetOptions::default()
                };
                let written = target.set_value_with(target_path, value, options, visited)?;
                visited.insert(self);
                Some(written)
            }
            PathTarget::Calculated { .. } => {
                let converted = self.convert(&owner, &value)?;
                let calc = calculated_of(&owner, self)?;
                visited.insert(self);
                calc.set(converted.clone());
                if notify {
                    owner.mark_set(&self.info.path);
                }
                Some(converted)
            }
            PathTarget::Stored => {
                let converted = self.convert(&owner, &value)?;
                let Some(previous) = owner.write_chain(&self.info.members, converted.clone()) else {
                    tracing::debug!(view = %owner, path = %self.info.path, "null intermediate; write dropped");
                    return None;
                };
                visited.insert(self);
                if notify {
                    owner.mark_set(&self.info.path);
                    if previous != converted {
                        self.changed(&owner, visited);
                    }
                } else if previous != converted {
                    owner.refresh_dependent_mappings(&self.info.path);
                }
                Some(converted)
            }
        }
    }

    /// Whether the path was ever written with notification enabled.
    #[must_use]
    pub fn is_set(&self) -> bool {
        let Some(owner) = self.owner.upgrade().map(View::from_inner) else {
            return false;
        };
        match &self.info.target {
            PathTarget::Mapped { target_path, .. } => self
                .mapped_target()
                .is_some_and(|(target, _)| target.is_set(target_path)),
            _ => owner.is_path_marked(&self.info.path),
        }
    }

    /// Drop the cached mapped target and resolve it again. Called when an
    /// owner member on the way to the target changes.
    pub(crate) fn refresh_mapping(&self) {
        let stale = self.mapped.borrow_mut().take();
        drop(stale);
        let _ = self.mapped_target();
    }

    pub(crate) fn detach(&self) {
        self.observers.clear();
        let mapped = self.mapped.borrow_mut().take();
        drop(mapped);
        let calculated = self.calculated.borrow_mut().take();
        drop(calculated);
    }

    pub(crate) fn notify_observers(&self, visited: &mut Visited) {
        self.observers.notify(visited);
    }

    fn changed(&self, owner: &View, visited: &mut Visited) {
        self.observers.notify(visited);
        owner.notify_dependents(&self.info.path, visited);
    }

    fn convert(&self, owner: &View, value: &Value) -> Option<Value> {
        let label = owner.to_string();
        let ctx = owner.context();
        let cx = ConversionContext {
            types: ctx.types(),
            owner: &label,
            path: &self.info.path,
        };
        match self.info.converter.convert(value, &cx) {
            Ok(converted) => Some(converted),
            Err(err) => {
                tracing::warn!(view = %label, path = %self.info.path, value = %value, error = %err, "conversion failed; write aborted");
                None
            }
        }
    }

    /// The view the owner member points at right now, and its field for
    /// the remainder of the path. The relay is rebuilt whenever the owner
    /// member no longer points at the cached view.
    fn mapped_target(&self) -> Option<(View, Rc<FieldData>)> {
        let PathTarget::Mapped { target_path, .. } = &self.info.target else {
            return None;
        };
        let owner = View::from_inner(self.owner.upgrade()?);
        let current = owner
            .read_chain(&self.info.members)
            .and_then(|v| v.as_owner().and_then(View::from_owner_ref))
            .filter(|target| !target.is_destroyed());
        let Some(target) = current else {
            let stale = self.mapped.borrow_mut().take();
            drop(stale);
            return None;
        };

        let cached = self
            .mapped
            .borrow()
            .as_ref()
            .filter(|m| Weak::ptr_eq(&m.view, &target.downgrade()))
            .map(|m| Rc::clone(&m.field));
        if let Some(field) = cached {
            return Some((target, field));
        }

        let field = target.field_data(target_path)?;
        let relay = Rc::new(ChangeRelay {
            field: self.this.clone(),
        });
        let sub = FieldData::observe(&field, relay);
        tracing::trace!(view = %owner, path = %self.info.path, target = %target, "mapped field resolved");
        let stale = self.mapped.replace(Some(MappedTarget {
            view: target.downgrade(),
            field: Rc::clone(&field),
            _relay: sub,
        }));
        drop(stale);
        Some((target, field))
    }
}

impl ObserverHost for FieldData {
    fn remove_observer(&self, id: ObserverId) {
        self.observers.remove(id);
    }
}

impl Observable for FieldData {
    fn observers(&self) -> &ObserverList {
        &self.observers
    }
}

impl fmt::Debug for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldData")
            .field("path", &self.info.path)
            .field("target", &self.info.target)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Forwards a change of an upstream value (a mapped target field or a
/// calculated field) to the observers of a local field.
struct ChangeRelay {
    field: Weak<FieldData>,
}

impl ValueObserver for ChangeRelay {
    fn notify(&self, visited: &mut Visited) -> bool {
        let Some(field) = self.field.upgrade() else {
            return false;
        };
        match field.owner.upgrade() {
            Some(owner) => {
                field.changed(&View::from_inner(owner), visited);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed handles
// ---------------------------------------------------------------------------

/// Typed handle to one path of a view.
///
/// The handle holds no value of its own; reads and writes go through the
/// view, so a handle can be recreated at any time without losing the view's
/// is-set bookkeeping.
pub struct Field<T> {
    view: View,
    path: Rc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> Field<T> {
    pub(crate) fn new(view: View, path: &str) -> Self {
        Self {
            view,
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Current value; `None` when unset, null or of another kind.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.view
            .get_value(&self.path)
            .and_then(|v| T::from_value(&v))
    }

    /// Tracked write: converts, stores and notifies observers.
    pub fn set(&self, value: T) -> bool {
        self.view.set_value(&self.path, value.into_value()).is_some()
    }

    /// Store without notifying anyone or marking the path as set.
    pub fn set_direct(&self, value: T) -> bool {
        self.view
            .set_value_with(&self.path, value.into_value(), SetOptions::DIRECT, &mut Visited::new())
            .is_some()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.view.is_set(&self.path)
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            path: Rc::clone(&self.path),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("view", &self.view)
            .field("path", &self.path)
            .finish()
    }
}

/// The calculated field behind a path, if the path names one.
pub(crate) fn calculated_of(owner: &View, field: &FieldData) -> Option<Rc<CalculatedField>> {
    match field.info.target {
        PathTarget::Calculated { index } => owner.calculated_at(index),
        _ => None,
    }
}
