#![forbid(unsafe_code)]

//! Views: the owners that host fields, bindings, state values and change
//! handlers.
//!
//! A [`View`] is a cheap handle (`Rc`) to one owner instance of a registered
//! class. Its slots hold member values by index; field paths are resolved
//! lazily into per-view [`FieldData`] entries the first time they are used.
//!
//! Markup-time declarations ([`View::add_value`], [`View::add_binding`],
//! [`View::add_state_value`], [`View::add_change_handler`]) are queued until
//! the propagation driver initializes the view. After that they are wired
//! immediately.
//!
//! # Invariants
//!
//! 1. `set_value` never notifies anyone before the written value is stored.
//! 2. Deferred change handlers are deduplicated per view and only run from
//!    [`View::trigger_change_handlers`].
//! 3. While the view is in the default state, tracked writes keep the
//!    default snapshot of every overridden path current.
//! 4. A destroyed view ignores writes and reports nothing as set.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::{AHashMap, AHashSet};
use vbind_core::types::STATE_MEMBER;
use vbind_core::{
    BindingError, BindingExpr, FieldValue, MemberAccess, OwnerRef, PathError, Value, expr,
};

use crate::class::{ClassInfo, HandlerFn};
use crate::context::BindingContext;
use crate::field::{Field, FieldData, calculated_of};
use crate::reactive::{
    BindingObserver, BindingScope, CalculatedField, ChangeHandlerObserver, Subscription,
    ValueObserver, Visited, wire_binding,
};
use crate::state::{StateTable, StateValue};

/// How a write is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetOptions {
    /// Refresh the default-state snapshot when in the default state.
    pub update_default_state: bool,
    /// Mark the path as set and notify observers on change.
    pub notify: bool,
}

impl SetOptions {
    /// Store only; used for initialization writes that must not cascade.
    pub const DIRECT: Self = Self {
        update_default_state: true,
        notify: false,
    };

    /// Writes performed by a state transition.
    pub const STATE: Self = Self {
        update_default_state: false,
        notify: true,
    };
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            update_default_state: true,
            notify: true,
        }
    }
}

enum Declaration {
    Value {
        path: Rc<str>,
        value: Value,
    },
    Binding {
        target: Rc<str>,
        expr: BindingExpr,
    },
    State {
        state: Rc<str>,
        path: Rc<str>,
        value: Value,
    },
    Handler {
        path: Rc<str>,
        handler: Rc<str>,
        immediate: bool,
    },
}

pub(crate) struct ViewInner {
    id: u64,
    name: Rc<str>,
    class: Rc<ClassInfo>,
    ctx: BindingContext,
    slots: RefCell<Vec<Value>>,
    parent: RefCell<Weak<ViewInner>>,
    logical_parent: RefCell<Weak<ViewInner>>,
    children: RefCell<Vec<View>>,
    fields: RefCell<AHashMap<Rc<str>, Rc<FieldData>>>,
    set_paths: RefCell<AHashSet<Rc<str>>>,
    pending: RefCell<BTreeSet<Rc<str>>>,
    handlers: RefCell<Vec<(Rc<str>, Rc<str>)>>,
    declarations: RefCell<Vec<Declaration>>,
    bindings: RefCell<Vec<Rc<BindingObserver>>>,
    scope: RefCell<BindingScope>,
    states: RefCell<StateTable>,
    calculated: RefCell<AHashMap<usize, Rc<CalculatedField>>>,
    initialized: Cell<bool>,
    destroyed: Cell<bool>,
}

/// Handle to a live owner.
#[derive(Clone)]
pub struct View(Rc<ViewInner>);

impl View {
    pub(crate) fn create(ctx: BindingContext, class: Rc<ClassInfo>, name: &str, parent: Option<&View>) -> Self {
        let id = ctx.next_view_id();
        let mut slots: Vec<Value> = class
            .descriptor
            .members()
            .iter()
            .map(|m| ctx.types().instantiate_member(m))
            .collect();
        if let Some(state) = slots.first_mut() {
            *state = Value::from(ctx.config().default_state.as_str());
        }
        let parent_weak = parent.map(View::downgrade).unwrap_or_default();

        let inner = Rc::new_cyclic(|this: &Weak<ViewInner>| ViewInner {
            id,
            name: name.into(),
            class: Rc::clone(&class),
            ctx: ctx.clone(),
            slots: RefCell::new(slots),
            parent: RefCell::new(parent_weak.clone()),
            logical_parent: RefCell::new(parent_weak),
            children: RefCell::new(Vec::new()),
            fields: RefCell::new(AHashMap::new()),
            set_paths: RefCell::new(AHashSet::new()),
            pending: RefCell::new(BTreeSet::new()),
            handlers: RefCell::new(Vec::new()),
            declarations: RefCell::new(Vec::new()),
            bindings: RefCell::new(Vec::new()),
            scope: RefCell::new(BindingScope::new()),
            states: RefCell::new(StateTable::default()),
            calculated: RefCell::new(calculated_fields(&ctx, &class, this)),
            initialized: Cell::new(false),
            destroyed: Cell::new(false),
        });
        let view = View(inner);
        if let Some(parent) = parent {
            parent.0.children.borrow_mut().push(view.clone());
        }
        tracing::trace!(view = %view, "view created");
        view
    }

    pub(crate) fn from_inner(inner: Rc<ViewInner>) -> Self {
        View(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<ViewInner> {
        Rc::downgrade(&self.0)
    }

    /// Recover a view from a value holding a reference to it.
    #[must_use]
    pub fn from_owner_ref(owner: &OwnerRef) -> Option<View> {
        owner.upgrade::<ViewInner>().map(View)
    }

    /// A non-owning value referring to this view, for owner-typed members.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let weak: Weak<dyn Any> = self.downgrade();
        Value::Owner(OwnerRef::new(Rc::clone(self.0.class.descriptor.name()), self.0.id, weak))
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.0.class.name()
    }

    #[must_use]
    pub fn context(&self) -> &BindingContext {
        &self.0.ctx
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // -----------------------------------------------------------------------
    // Tree
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn parent(&self) -> Option<View> {
        self.0.parent.borrow().upgrade().map(View)
    }

    /// The owner whose markup declared this view; defaults to the parent.
    #[must_use]
    pub fn logical_parent(&self) -> Option<View> {
        self.0.logical_parent.borrow().upgrade().map(View)
    }

    pub fn set_logical_parent(&self, owner: &View) {
        self.0.logical_parent.replace(owner.downgrade());
    }

    #[must_use]
    pub fn children(&self) -> Vec<View> {
        self.0.children.borrow().clone()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.0.initialized.get()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    /// Tear the view down with all its children.
    ///
    /// Every observer this view installed is disconnected and bindings that
    /// target it report themselves invalid on their next notification.
    pub fn destroy(&self) {
        if self.0.destroyed.replace(true) {
            return;
        }
        for child in self.children() {
            child.destroy();
        }
        self.0.children.borrow_mut().clear();

        self.0.scope.borrow_mut().clear();
        self.0.bindings.borrow_mut().clear();
        self.0.declarations.borrow_mut().clear();
        self.0.pending.borrow_mut().clear();
        let fields: Vec<Rc<FieldData>> = self.0.fields.borrow_mut().drain().map(|(_, f)| f).collect();
        for field in &fields {
            field.detach();
        }
        drop(fields);
        self.0.calculated.borrow_mut().clear();
        self.0.set_paths.borrow_mut().clear();

        if let Some(parent) = self.parent() {
            parent
                .0
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(&c.0, &self.0));
        }
        tracing::debug!(view = %self, "view destroyed");
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// Tracked write with a fresh propagation.
    pub fn set_value(&self, path: &str, value: impl Into<Value>) -> Option<Value> {
        self.set_value_with(path, value.into(), SetOptions::default(), &mut Visited::new())
    }

    /// Write `value` to `path`.
    ///
    /// Returns the converted value that was stored, or `None` when the path
    /// does not resolve, conversion fails, an intermediate is null, or the
    /// field was already written in this propagation (`visited`).
    pub fn set_value_with(
        &self,
        path: &str,
        value: Value,
        options: SetOptions,
        visited: &mut Visited,
    ) -> Option<Value> {
        if self.is_destroyed() {
            tracing::debug!(view = %self, path, "write to destroyed view ignored");
            return None;
        }
        let field = self.field_data(path)?;
        let converted = field.set_value(value, options.notify, visited)?;
        if options.update_default_state && self.in_default_state() {
            let default_state = &self.0.ctx.config().default_state;
            self.0
                .states
                .borrow_mut()
                .update_default(default_state, path, &converted);
        }
        Some(converted)
    }

    /// Read `path`; `None` when a value cannot be produced.
    ///
    /// Inside a calculated field's compute callback the read is recorded as
    /// a dependency of that field.
    #[must_use]
    pub fn get_value(&self, path: &str) -> Option<Value> {
        let field = self.field_data(path)?;
        self.track_read(&field);
        field.value()
    }

    /// Whether `path` has been written with notification enabled.
    #[must_use]
    pub fn is_set(&self, path: &str) -> bool {
        if self.is_destroyed() {
            return false;
        }
        self.field_data(path).is_some_and(|f| f.is_set())
    }

    /// Typed handle to `path`.
    #[must_use]
    pub fn field<T: FieldValue>(&self, path: &str) -> Option<Field<T>> {
        self.field_data(path)?;
        Some(Field::new(self.clone(), path))
    }

    /// Observe changes of `path`.
    pub fn observe(&self, path: &str, observer: Rc<dyn ValueObserver>) -> Option<Subscription> {
        let field = self.field_data(path)?;
        Some(FieldData::observe(&field, observer))
    }

    /// The calculated field behind member `name`.
    #[must_use]
    pub fn calculated_field(&self, name: &str) -> Option<Rc<CalculatedField>> {
        let index = self.0.class.descriptor.member_named(name)?.index;
        self.calculated_at(index)
    }

    // -----------------------------------------------------------------------
    // States
    // -----------------------------------------------------------------------

    /// The active state name.
    #[must_use]
    pub fn state(&self) -> String {
        let slots = self.0.slots.borrow();
        match slots.first().and_then(Value::as_str) {
            Some(state) => state.to_owned(),
            None => self.0.ctx.config().default_state.clone(),
        }
    }

    /// Switch to state `name`, applying its overrides and reverting every
    /// other overridden path to its default snapshot.
    pub fn set_state(&self, name: &str) {
        if self.is_destroyed() || self.state() == name {
            return;
        }
        tracing::debug!(view = %self, state = name, "state change");
        self.set_value_with(STATE_MEMBER, Value::from(name), SetOptions::STATE, &mut Visited::new());

        let default_state = self.0.ctx.config().default_state.clone();
        let values: Vec<(Rc<str>, Value)> = {
            let states = self.0.states.borrow();
            states
                .paths()
                .into_iter()
                .filter_map(|path| {
                    let value = states.resolve(&default_state, name, &path)?;
                    Some((path, value))
                })
                .collect()
        };
        for (path, value) in values {
            self.set_value_with(&path, value, SetOptions::STATE, &mut Visited::new());
        }
    }

    /// Every declared state value, including default snapshots.
    #[must_use]
    pub fn state_values(&self) -> Vec<StateValue> {
        self.0.states.borrow().entries().to_vec()
    }

    fn in_default_state(&self) -> bool {
        self.state() == self.0.ctx.config().default_state
    }

    // -----------------------------------------------------------------------
    // Markup-time declarations
    // -----------------------------------------------------------------------

    /// Assign a literal value declared in markup.
    pub fn add_value(&self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.is_initialized() {
            self.set_value(path, value);
            return;
        }
        self.0.declarations.borrow_mut().push(Declaration::Value {
            path: path.into(),
            value,
        });
    }

    /// Declare a binding of `target` on this view.
    ///
    /// The expression is parsed immediately; sources resolve against the
    /// logical parent unless marked local (`#`).
    pub fn add_binding(&self, target: &str, text: &str) -> Result<(), BindingError> {
        let expr = expr::parse(text)?;
        if self.is_initialized() {
            return wire_binding(self, target, &expr);
        }
        self.0.declarations.borrow_mut().push(Declaration::Binding {
            target: target.into(),
            expr,
        });
        Ok(())
    }

    /// Declare the value `path` takes while the view is in `state`.
    pub fn add_state_value(&self, state: &str, path: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.is_initialized() {
            self.register_state_value(state, path, value);
            return;
        }
        self.0.declarations.borrow_mut().push(Declaration::State {
            state: state.into(),
            path: path.into(),
            value,
        });
    }

    /// Run the class's change handler `handler` whenever `path` changes.
    ///
    /// Deferred handlers are queued and run by the next flush; immediate
    /// handlers run synchronously inside the notification.
    pub fn add_change_handler(&self, path: &str, handler: &str, immediate: bool) -> Result<(), BindingError> {
        if self.0.class.handler(handler).is_none() {
            return Err(BindingError::UnknownHandler {
                owner: self.to_string(),
                handler: handler.to_owned(),
            });
        }
        if self.is_initialized() {
            return self.wire_change_handler(path.into(), handler.into(), immediate);
        }
        self.0.declarations.borrow_mut().push(Declaration::Handler {
            path: path.into(),
            handler: handler.into(),
            immediate,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Change handlers
    // -----------------------------------------------------------------------

    /// Run every pending handler once. Returns how many ran.
    pub fn trigger_change_handlers(&self) -> usize {
        let pending = std::mem::take(&mut *self.0.pending.borrow_mut());
        for handler in &pending {
            self.invoke_handler(handler);
        }
        pending.len()
    }

    /// Queue the handlers of every path that is already set.
    pub fn queue_all_change_handlers(&self) {
        let handlers = self.0.handlers.borrow().clone();
        for (path, handler) in handlers {
            if self.is_set(&path) {
                self.queue_handler(&handler);
            }
        }
    }

    #[must_use]
    pub fn has_pending_handlers(&self) -> bool {
        !self.0.pending.borrow().is_empty()
    }

    /// Names of queued handlers, sorted.
    #[must_use]
    pub fn pending_handlers(&self) -> Vec<String> {
        self.0.pending.borrow().iter().map(|h| h.to_string()).collect()
    }

    pub(crate) fn queue_handler(&self, handler: &Rc<str>) {
        if self.is_destroyed() {
            return;
        }
        if self.0.pending.borrow_mut().insert(Rc::clone(handler)) {
            tracing::trace!(view = %self, handler = %handler, "change handler queued");
        }
    }

    pub(crate) fn handler_fn(&self, handler: &str) -> Option<HandlerFn> {
        self.0.class.handler(handler).cloned()
    }

    pub(crate) fn invoke_handler(&self, handler: &str) -> bool {
        let Some(callback) = self.handler_fn(handler) else {
            tracing::warn!(view = %self, handler, "change handler not found");
            return false;
        };
        self.run_handler(handler, &callback)
    }

    pub(crate) fn run_handler(&self, handler: &str, callback: &HandlerFn) -> bool {
        match callback(self) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(view = %self, handler, error = %err, "change handler failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Driver steps
    // -----------------------------------------------------------------------

    /// Apply literal values declared in markup.
    pub(crate) fn initialize_defaults(&self) -> Vec<BindingError> {
        let values: Vec<(Rc<str>, Value)> = {
            let mut declarations = self.0.declarations.borrow_mut();
            let mut values = Vec::new();
            declarations.retain(|d| match d {
                Declaration::Value { path, value } => {
                    values.push((Rc::clone(path), value.clone()));
                    false
                }
                _ => true,
            });
            values
        };

        let mut errors = Vec::new();
        for (path, value) in values {
            match self.resolve_field(&path) {
                Ok(_) => {
                    self.set_value(&path, value);
                }
                Err(err) => {
                    tracing::warn!(view = %self, path = %path, error = %err, "markup value rejected");
                    errors.push(err.into());
                }
            }
        }
        errors
    }

    /// Wire queued bindings, state values and change handlers.
    pub(crate) fn initialize_internal(&self) -> Vec<BindingError> {
        let declarations = std::mem::take(&mut *self.0.declarations.borrow_mut());
        let mut errors = Vec::new();
        for declaration in declarations {
            let result = match declaration {
                Declaration::Value { path, value } => {
                    self.set_value(&path, value);
                    Ok(())
                }
                Declaration::Binding { target, expr } => wire_binding(self, &target, &expr),
                Declaration::State { state, path, value } => {
                    self.register_state_value(&state, &path, value);
                    Ok(())
                }
                Declaration::Handler {
                    path,
                    handler,
                    immediate,
                } => self.wire_change_handler(path, handler, immediate),
            };
            if let Err(err) = result {
                tracing::warn!(view = %self, error = %err, "markup declaration rejected");
                errors.push(err);
            }
        }
        self.0.initialized.set(true);
        errors
    }

    pub(crate) fn run_initialize_hook(&self) {
        let Some(hook) = self.0.class.behavior.on_initialize.clone() else {
            return;
        };
        if let Err(err) = hook(self) {
            tracing::warn!(view = %self, error = %err, "initialize hook failed");
        }
    }

    /// Push every binding's current source value to its target once.
    /// Local two-way bindings go first in source-to-target direction.
    pub(crate) fn propagate_bindings(&self) {
        let mut bindings = self.bindings();
        bindings.sort_by_key(|b| !b.propagates_first());
        for binding in bindings {
            binding.notify(&mut Visited::new());
        }
    }

    pub(crate) fn hold(&self, sub: Subscription) {
        self.0.scope.borrow_mut().hold(sub);
    }

    pub(crate) fn push_binding(&self, binding: Rc<BindingObserver>) {
        self.0.bindings.borrow_mut().push(binding);
    }

    pub(crate) fn bindings(&self) -> Vec<Rc<BindingObserver>> {
        self.0.bindings.borrow().clone()
    }

    /// Number of binding observers declared on this view.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.0.bindings.borrow().len()
    }

    pub(crate) fn method(&self, name: &str) -> Option<crate::class::MethodFn> {
        self.0.class.method(name).cloned()
    }

    // -----------------------------------------------------------------------
    // Field plumbing
    // -----------------------------------------------------------------------

    /// Resolve `path`, logging failures by severity.
    pub(crate) fn field_data(&self, path: &str) -> Option<Rc<FieldData>> {
        match self.resolve_field(path) {
            Ok(field) => Some(field),
            Err(err) if err.is_severe() => {
                tracing::warn!(view = %self, path, error = %err, "field path does not resolve");
                None
            }
            Err(err) => {
                if self.0.ctx.config().log_retryable_failures {
                    tracing::warn!(view = %self, path, error = %err, "field path not resolvable yet");
                } else {
                    tracing::debug!(view = %self, path, error = %err, "field path not resolvable yet");
                }
                None
            }
        }
    }

    pub(crate) fn resolve_field(&self, path: &str) -> Result<Rc<FieldData>, PathError> {
        if let Some(field) = self.0.fields.borrow().get(path) {
            return Ok(Rc::clone(field));
        }
        let ctx = &self.0.ctx.inner;
        let probe = |members: &[MemberAccess]| self.read_chain(members).unwrap_or(Value::Null);
        let info = ctx
            .paths
            .resolve(&ctx.types, &ctx.converters, self.type_name(), path, &probe)?;
        let field = FieldData::new(self, info);
        self.0
            .fields
            .borrow_mut()
            .insert(path.into(), Rc::clone(&field));
        Ok(field)
    }

    pub(crate) fn read_chain(&self, members: &[MemberAccess]) -> Option<Value> {
        let (first, rest) = members.split_first()?;
        let mut current = self.0.slots.borrow().get(first.index).cloned()?;
        for access in rest {
            let record = current.as_record()?.clone();
            current = record.get(access.index)?;
        }
        Some(current)
    }

    /// Store `value` at the end of the chain; returns the previous value.
    pub(crate) fn write_chain(&self, members: &[MemberAccess], value: Value) -> Option<Value> {
        let (last, init) = members.split_last()?;
        if init.is_empty() {
            let mut slots = self.0.slots.borrow_mut();
            let slot = slots.get_mut(last.index)?;
            return Some(std::mem::replace(slot, value));
        }
        let holder = self.read_chain(init)?;
        holder.as_record()?.set(last.index, value)
    }

    pub(crate) fn mark_set(&self, path: &str) {
        let mut set_paths = self.0.set_paths.borrow_mut();
        if !set_paths.contains(path) {
            set_paths.insert(path.into());
        }
    }

    pub(crate) fn is_path_marked(&self, path: &str) -> bool {
        self.0.set_paths.borrow().contains(path)
    }

    pub(crate) fn calculated_at(&self, index: usize) -> Option<Rc<CalculatedField>> {
        self.0.calculated.borrow().get(&index).cloned()
    }

    /// Notify fields whose path runs through `path` (`A.B` when `A` changed).
    pub(crate) fn notify_dependents(&self, path: &str, visited: &mut Visited) {
        for field in self.dependents_of(path) {
            if field.info().is_mapped() {
                field.refresh_mapping();
            }
            field.notify_observers(visited);
        }
    }

    /// Re-target mapped fields under `path` without notifying anyone.
    pub(crate) fn refresh_dependent_mappings(&self, path: &str) {
        for field in self.dependents_of(path) {
            if field.info().is_mapped() {
                field.refresh_mapping();
            }
        }
    }

    fn dependents_of(&self, path: &str) -> Vec<Rc<FieldData>> {
        let mut dependents: Vec<Rc<FieldData>> = self
            .0
            .fields
            .borrow()
            .values()
            .filter(|f| f.info().depends_on(path))
            .cloned()
            .collect();
        dependents.sort_by(|a, b| a.path().cmp(b.path()));
        dependents
    }

    fn track_read(&self, field: &Rc<FieldData>) {
        let Some(current) = self.0.ctx.computations().current() else {
            return;
        };
        if calculated_of(self, field).is_some_and(|calc| calc.is_same(&current)) {
            return;
        }
        current.track(field);
    }

    fn register_state_value(&self, state: &str, path: &str, value: Value) {
        let default_state = self.0.ctx.config().default_state.clone();
        let current = self.get_value(path).unwrap_or(Value::Null);
        self.0
            .states
            .borrow_mut()
            .add(&default_state, state, path, value.clone(), || current);
        if state != default_state && self.state() == state {
            self.set_value_with(path, value, SetOptions::STATE, &mut Visited::new());
        }
    }

    fn wire_change_handler(&self, path: Rc<str>, handler: Rc<str>, immediate: bool) -> Result<(), BindingError> {
        let field = self.resolve_field(&path)?;
        let observer = Rc::new(ChangeHandlerObserver::new(self, Rc::clone(&handler), immediate));
        self.hold(FieldData::observe(&field, observer));
        self.0.handlers.borrow_mut().push((path, handler));
        Ok(())
    }
}

fn calculated_fields(
    ctx: &BindingContext,
    class: &ClassInfo,
    this: &Weak<ViewInner>,
) -> AHashMap<usize, Rc<CalculatedField>> {
    let mut fields = AHashMap::new();
    for member in class.descriptor.members().iter().filter(|m| m.calculated) {
        let Some(decl) = class.behavior.calculated.get(&member.name) else {
            continue;
        };
        let compute = Rc::clone(&decl.compute);
        let owner = this.clone();
        let push_back = decl.push_back.clone().map(|push| {
            let owner = this.clone();
            Box::new(move |value: Value| {
                if let Some(view) = owner.upgrade() {
                    push(&View(view), value);
                }
            }) as Box<dyn Fn(Value)>
        });
        let field = CalculatedField::new(
            ctx.computations().clone(),
            move || match owner.upgrade() {
                Some(view) => compute(&View(view)),
                None => Value::Null,
            },
            push_back,
        );
        fields.insert(member.index, field);
    }
    fields
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.name, self.0.id)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("class", &self.0.class.name())
            .field("state", &self.state())
            .field("fields", &self.0.fields.borrow().len())
            .field("destroyed", &self.0.destroyed.get())
            .finish()
    }
}
