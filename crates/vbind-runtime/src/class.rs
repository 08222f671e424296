#![forbid(unsafe_code)]

//! View classes: a type descriptor plus the behavior markup refers to by
//! name (change handlers, transform methods, calculated members and the
//! initialization hook).
//!
//! A class registered with a base inherits every behavior of the base;
//! entries declared on the derived class replace same-named base entries.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use vbind_core::{InvocationError, TypeDescriptor, Value, ValueType};

use crate::view::View;

/// Change handler invoked by name.
pub type HandlerFn = Rc<dyn Fn(&View) -> Result<(), InvocationError>>;

/// Instance transform method, callable from `$Method(...)` bindings.
pub type MethodFn = Rc<dyn Fn(&View, &[Value]) -> Result<Value, InvocationError>>;

/// Static transform, callable from `$Type.Method(...)` bindings.
pub type TransformFn = Rc<dyn Fn(&[Value]) -> Result<Value, InvocationError>>;

/// Initialization hook run once per view by the driver.
pub type HookFn = Rc<dyn Fn(&View) -> Result<(), InvocationError>>;

pub(crate) type ComputeFn = Rc<dyn Fn(&View) -> Value>;
pub(crate) type PushBackFn = Rc<dyn Fn(&View, Value)>;

#[derive(Clone)]
pub(crate) struct CalculatedDecl {
    pub(crate) compute: ComputeFn,
    pub(crate) push_back: Option<PushBackFn>,
}

/// Named behavior of a class, merged down the inheritance chain.
#[derive(Clone, Default)]
pub(crate) struct Behavior {
    pub(crate) handlers: AHashMap<Rc<str>, HandlerFn>,
    pub(crate) methods: AHashMap<Rc<str>, MethodFn>,
    pub(crate) calculated: AHashMap<Rc<str>, CalculatedDecl>,
    pub(crate) on_initialize: Option<HookFn>,
}

impl Behavior {
    /// `self` layered over `base`; entries of `self` win.
    fn over(self, base: &Behavior) -> Self {
        let mut merged = base.clone();
        merged.handlers.extend(self.handlers);
        merged.methods.extend(self.methods);
        merged.calculated.extend(self.calculated);
        if self.on_initialize.is_some() {
            merged.on_initialize = self.on_initialize;
        }
        merged
    }
}

/// Builder for a view type and its behaviors.
pub struct ViewClass {
    pub(crate) descriptor: TypeDescriptor,
    pub(crate) behavior: Behavior,
}

impl ViewClass {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::from_descriptor(TypeDescriptor::owner(name))
    }

    #[must_use]
    pub fn from_descriptor(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            behavior: Behavior::default(),
        }
    }

    #[must_use]
    pub fn extends(mut self, base: &str) -> Self {
        self.descriptor = self.descriptor.extends(base);
        self
    }

    #[must_use]
    pub fn member(mut self, name: &str, ty: ValueType) -> Self {
        self.descriptor = self.descriptor.member(name, ty);
        self
    }

    #[must_use]
    pub fn member_with_default(mut self, name: &str, ty: ValueType, default: impl Into<Value>) -> Self {
        self.descriptor = self.descriptor.member_with_default(name, ty, default.into());
        self
    }

    /// A boxed field; paths read and write through its implicit `Value`.
    #[must_use]
    pub fn container(mut self, name: &str, inner: ValueType, default: impl Into<Value>) -> Self {
        self.descriptor = self.descriptor.container(name, inner, default.into());
        self
    }

    /// A calculated member. Reads inside `compute` are discovered as
    /// dependencies; `push_back` receives values written to the member.
    #[must_use]
    pub fn calculated(
        mut self,
        name: &str,
        ty: ValueType,
        compute: impl Fn(&View) -> Value + 'static,
        push_back: Option<Box<dyn Fn(&View, Value)>>,
    ) -> Self {
        self.descriptor = self.descriptor.calculated(name, ty);
        self.behavior.calculated.insert(
            name.into(),
            CalculatedDecl {
                compute: Rc::new(compute),
                push_back: push_back.map(Rc::from),
            },
        );
        self
    }

    #[must_use]
    pub fn change_handler(
        mut self,
        name: &str,
        handler: impl Fn(&View) -> Result<(), InvocationError> + 'static,
    ) -> Self {
        self.behavior.handlers.insert(name.into(), Rc::new(handler));
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        method: impl Fn(&View, &[Value]) -> Result<Value, InvocationError> + 'static,
    ) -> Self {
        self.behavior.methods.insert(name.into(), Rc::new(method));
        self
    }

    #[must_use]
    pub fn on_initialize(
        mut self,
        hook: impl Fn(&View) -> Result<(), InvocationError> + 'static,
    ) -> Self {
        self.behavior.on_initialize = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewClass")
            .field("name", &self.descriptor.name())
            .field("handlers", &self.behavior.handlers.len())
            .field("methods", &self.behavior.methods.len())
            .field("calculated", &self.behavior.calculated.len())
            .finish()
    }
}

/// A registered class with base behavior merged in.
pub(crate) struct ClassInfo {
    pub(crate) descriptor: Rc<TypeDescriptor>,
    pub(crate) behavior: Behavior,
}

impl ClassInfo {
    pub(crate) fn new(descriptor: Rc<TypeDescriptor>, behavior: Behavior, base: Option<&ClassInfo>) -> Self {
        let behavior = match base {
            Some(base) => behavior.over(&base.behavior),
            None => behavior,
        };
        Self {
            descriptor,
            behavior,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub(crate) fn handler(&self, name: &str) -> Option<&HandlerFn> {
        self.behavior.handlers.get(name)
    }

    pub(crate) fn method(&self, name: &str) -> Option<&MethodFn> {
        self.behavior.methods.get(name)
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name())
            .field("members", &self.descriptor.members().len())
            .finish()
    }
}
