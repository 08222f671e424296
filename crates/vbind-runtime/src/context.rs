#![forbid(unsafe_code)]

//! The process-wide binding context.
//!
//! One context holds all shared binding state: the type registry, the path
//! cache, converters, static transforms, resource dictionaries, the
//! calculated-field computation stack and the configuration. A host builds one context at startup and creates every
//! view through it; dropping the last handle tears it down.
//!
//! ```ignore
//! let ctx = BindingContext::builder()
//!     .register_type(TypeDescriptor::record("Name")
//!         .member("FirstName", ValueType::Str))
//!     .register_view(ViewClass::new("Person")
//!         .member("Name", ValueType::Record("Name".into())))
//!     .build()?;
//! let person = ctx.create_view("Person", "ada", None)?;
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use vbind_core::{
    BindingConfig, BindingError, ConverterRegistry, InvocationError, PathResolver, RegistryError,
    TypeDescriptor, TypeKind, TypeName, TypeRegistry, Value, ValueConverter,
};

use crate::class::{ClassInfo, TransformFn, ViewClass};
use crate::reactive::ComputationStack;
use crate::resource::{Resource, ResourceDictionaries};
use crate::view::View;

pub(crate) struct ContextInner {
    pub(crate) config: BindingConfig,
    pub(crate) types: TypeRegistry,
    pub(crate) classes: AHashMap<TypeName, Rc<ClassInfo>>,
    pub(crate) converters: ConverterRegistry,
    pub(crate) paths: PathResolver,
    pub(crate) transforms: AHashMap<String, TransformFn>,
    pub(crate) resources: Rc<ResourceDictionaries>,
    pub(crate) computations: ComputationStack,
    next_view_id: Cell<u64>,
}

/// Shared handle to the binding context.
#[derive(Clone)]
pub struct BindingContext {
    pub(crate) inner: Rc<ContextInner>,
}

impl BindingContext {
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &BindingConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn types(&self) -> &TypeRegistry {
        &self.inner.types
    }

    #[must_use]
    pub fn resources(&self) -> &Rc<ResourceDictionaries> {
        &self.inner.resources
    }

    #[must_use]
    pub fn computations(&self) -> &ComputationStack {
        &self.inner.computations
    }

    /// Number of field paths resolved and cached so far.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.inner.paths.cached()
    }

    /// Whether `type_name` was registered as a view class.
    #[must_use]
    pub fn has_view_class(&self, type_name: &str) -> bool {
        self.inner.classes.contains_key(type_name)
    }

    /// Look up a static `Type.Method` transform.
    #[must_use]
    pub fn transform(&self, qualified: &str) -> Option<TransformFn> {
        self.inner.transforms.get(qualified).cloned()
    }

    /// Instantiate a view of a registered class.
    pub fn create_view(&self, type_name: &str, name: &str, parent: Option<&View>) -> Result<View, BindingError> {
        let class = self
            .inner
            .classes
            .get(type_name)
            .cloned()
            .ok_or_else(|| RegistryError::NotAnOwner(type_name.to_owned()))?;
        Ok(View::create(self.clone(), class, name, parent))
    }

    pub(crate) fn next_view_id(&self) -> u64 {
        let id = self.inner.next_view_id.get();
        self.inner.next_view_id.set(id + 1);
        id
    }
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("config", &self.inner.config)
            .field("classes", &self.inner.classes.len())
            .field("transforms", &self.inner.transforms.len())
            .field("cached_paths", &self.cached_paths())
            .finish()
    }
}

enum Registration {
    Type(TypeDescriptor),
    View(ViewClass),
}

/// Collects registrations; types must be registered after their base.
#[derive(Default)]
pub struct ContextBuilder {
    config: BindingConfig,
    registrations: Vec<Registration>,
    transforms: AHashMap<String, TransformFn>,
    converters: ConverterRegistry,
    resources: Vec<(String, Resource)>,
}

impl ContextBuilder {
    #[must_use]
    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a record, enum or behavior-less owner type.
    #[must_use]
    pub fn register_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.registrations.push(Registration::Type(descriptor));
        self
    }

    #[must_use]
    pub fn register_view(mut self, class: ViewClass) -> Self {
        self.registrations.push(Registration::View(class));
        self
    }

    /// Register a static transform under its `Type.Method` name.
    #[must_use]
    pub fn transform(
        mut self,
        qualified: &str,
        transform: impl Fn(&[Value]) -> Result<Value, InvocationError> + 'static,
    ) -> Self {
        self.transforms.insert(qualified.to_owned(), Rc::new(transform));
        self
    }

    /// Register a converter for a value-type key (`"bool"`, `"int"`, a type name).
    #[must_use]
    pub fn converter(mut self, key: &str, converter: Rc<dyn ValueConverter>) -> Self {
        self.converters.register(key, converter);
        self
    }

    #[must_use]
    pub fn resource(mut self, dictionary: &str, resource: Resource) -> Self {
        self.resources.push((dictionary.to_owned(), resource));
        self
    }

    pub fn build(self) -> Result<BindingContext, BindingError> {
        let mut types = TypeRegistry::new();
        let mut classes: AHashMap<TypeName, Rc<ClassInfo>> = AHashMap::new();

        for registration in self.registrations {
            let class = match registration {
                Registration::Type(desc) if desc.kind() != TypeKind::Owner => {
                    types.register(desc)?;
                    continue;
                }
                Registration::Type(desc) => ViewClass::from_descriptor(desc),
                Registration::View(class) => class,
            };
            if class.descriptor.kind() != TypeKind::Owner {
                return Err(RegistryError::NotAnOwner(class.name().to_owned()).into());
            }
            let base = class
                .descriptor
                .base()
                .and_then(|b| classes.get(b))
                .cloned();
            let descriptor = types.register(class.descriptor)?;
            let info = ClassInfo::new(Rc::clone(&descriptor), class.behavior, base.as_deref());
            tracing::debug!(class = %descriptor.name(), members = descriptor.members().len(), "registered view class");
            classes.insert(Rc::clone(descriptor.name()), Rc::new(info));
        }

        let resources = Rc::new(ResourceDictionaries::new(
            self.config.language.clone(),
            self.config.platform.clone(),
        ));
        for (dictionary, resource) in self.resources {
            resources.add_resource(&dictionary, resource);
        }

        Ok(BindingContext {
            inner: Rc::new(ContextInner {
                config: self.config,
                types,
                classes,
                converters: self.converters,
                paths: PathResolver::new(),
                transforms: self.transforms,
                resources,
                computations: ComputationStack::new(),
                next_view_id: Cell::new(1),
            }),
        })
    }
}

impl fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("registrations", &self.registrations.len())
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vbind_core::ValueType;

    #[test]
    fn builds_classes_in_registration_order() {
        let ctx = BindingContext::builder()
            .register_type(TypeDescriptor::enumeration("Align", ["Left", "Right"]))
            .register_view(ViewClass::new("Widget").member("Visible", ValueType::Bool))
            .register_view(ViewClass::new("Label").extends("Widget").member("Text", ValueType::Str))
            .register_type(TypeDescriptor::owner("Spacer").extends("Widget"))
            .build()
            .unwrap();
        assert!(ctx.has_view_class("Widget"));
        assert!(ctx.has_view_class("Label"));
        assert!(ctx.has_view_class("Spacer"));
        assert!(!ctx.has_view_class("Align"));
        let label = ctx.types().get("Label").unwrap();
        assert_eq!(label.members()[1].name.as_ref(), "Visible");
    }

    #[test]
    fn base_must_come_first() {
        let err = BindingContext::builder()
            .register_view(ViewClass::new("Label").extends("Widget"))
            .register_view(ViewClass::new("Widget"))
            .build()
            .unwrap_err();
        assert!(matches!(err, BindingError::Registry(RegistryError::UnknownBase { .. })));
    }

    #[test]
    fn unknown_view_class_is_an_error() {
        let ctx = BindingContext::builder().build().unwrap();
        assert!(ctx.create_view("Nope", "x", None).is_err());
    }

    #[test]
    fn view_ids_are_unique() {
        let ctx = BindingContext::builder()
            .register_view(ViewClass::new("Widget"))
            .build()
            .unwrap();
        let a = ctx.create_view("Widget", "a", None).unwrap();
        let b = ctx.create_view("Widget", "b", None).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
