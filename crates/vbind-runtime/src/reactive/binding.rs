#![forbid(unsafe_code)]

//! Binding observers: keep a target field derived from one or more sources.
//!
//! A binding expression (see [`vbind_core::expr`]) is wired into one
//! [`BindingObserver`] registered on every source. A single binding that is
//! not one-way also gets a second, reverse observer registered on the
//! target, so writes on either side reach the other. The shared
//! [`Visited`] set of the propagation stops the pair from ping-ponging.
//!
//! ```ignore
//! label.add_binding("Text", "{Name.FirstName}")?;          // two-way
//! label.add_binding("Text", "{=Count:D3} items")?;          // format string
//! label.add_binding("Visible", "$Fmt.Any({HasItems}, {!Empty})")?;
//! ```
//!
//! # Invariants
//!
//! 1. A failed evaluation is logged and leaves the binding registered.
//! 2. A binding whose target view is gone reports itself invalid.
//! 3. The forward observer of a two-way binding between fields of the same
//!    view propagates before the reverse one during initialization.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Source path unresolvable at wiring | `Err` from wiring, nothing registered |
//! | Unknown transform | `Err(BindingError::UnknownTransform)` |
//! | Transform returns `Err` | `warn!` naming sources and target; target untouched |
//! | Target conversion fails | logged by the target field; binding stays valid |

use std::fmt;
use std::rc::{Rc, Weak};

use vbind_core::{
    BindingError, BindingExpr, BindingKind, FormatTemplate, InvocationError, TransformRef, Value,
};

use super::observer::{ValueObserver, Visited};
use crate::class::TransformFn;
use crate::field::FieldData;
use crate::resource::ResourceDictionaries;
use crate::view::{SetOptions, View, ViewInner};

// ---------------------------------------------------------------------------
// Sources and targets
// ---------------------------------------------------------------------------

/// Where a binding reads one of its arguments.
pub(crate) enum BindingSource {
    Field {
        view: Weak<ViewInner>,
        label: String,
        path: Rc<str>,
        negate: bool,
    },
    Resource {
        resources: Rc<ResourceDictionaries>,
        dictionary: String,
        key: String,
        negate: bool,
    },
}

impl BindingSource {
    /// Current value; `None` when the source has none to offer.
    #[must_use]
    pub(crate) fn read(&self) -> Option<Value> {
        let (value, negate) = match self {
            Self::Field {
                view, path, negate, ..
            } => {
                let view = View::from_inner(view.upgrade()?);
                if view.is_destroyed() {
                    return None;
                }
                (view.get_value(path)?, *negate)
            }
            Self::Resource {
                resources,
                dictionary,
                key,
                negate,
            } => (resources.get_value(dictionary, key)?, *negate),
        };
        Some(if negate { value.negated() } else { value })
    }
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field {
                label, path, negate, ..
            } => write!(f, "{}{label}.{path}", if *negate { "!" } else { "" }),
            Self::Resource {
                dictionary, key, ..
            } => write!(f, "@{dictionary}.{key}"),
        }
    }
}

/// The field a binding writes.
pub(crate) struct BindingTarget {
    view: Weak<ViewInner>,
    label: String,
    path: Rc<str>,
}

impl BindingTarget {
    fn new(view: &View, path: &str) -> Self {
        Self {
            view: view.downgrade(),
            label: view.to_string(),
            path: path.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BindingObserver
// ---------------------------------------------------------------------------

/// One direction of a binding.
pub struct BindingObserver {
    kind: BindingKind,
    sources: Vec<BindingSource>,
    target: BindingTarget,
    transform: Option<TransformFn>,
    template: Option<FormatTemplate>,
    propagate_first: bool,
}

impl BindingObserver {
    #[must_use]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// Number of source arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.sources.len()
    }

    /// Whether initialization propagates this observer ahead of the others.
    #[must_use]
    pub fn propagates_first(&self) -> bool {
        self.propagate_first
    }

    /// `"a.X, b.Y -> c.Z"`, used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        let sources: Vec<String> = self.sources.iter().map(ToString::to_string).collect();
        format!(
            "{} -> {}.{}",
            sources.join(", "),
            self.target.label,
            self.target.path
        )
    }

    fn evaluate(&self) -> Result<Option<Value>, InvocationError> {
        match self.kind {
            BindingKind::Single => Ok(self.sources.first().and_then(BindingSource::read)),
            BindingKind::MultiTransform => {
                let transform = self
                    .transform
                    .as_ref()
                    .ok_or_else(|| InvocationError::new("no transform bound"))?;
                transform(&self.arguments()).map(Some)
            }
            BindingKind::MultiFormatString => {
                let template = self
                    .template
                    .as_ref()
                    .ok_or_else(|| InvocationError::new("no format template"))?;
                Ok(Some(Value::Str(template.render(&self.arguments()))))
            }
        }
    }

    fn arguments(&self) -> Vec<Value> {
        self.sources
            .iter()
            .map(|s| s.read().unwrap_or(Value::Null))
            .collect()
    }
}

impl ValueObserver for BindingObserver {
    fn notify(&self, visited: &mut Visited) -> bool {
        let Some(target) = self.target.view.upgrade().map(View::from_inner) else {
            return false;
        };
        if target.is_destroyed() {
            return false;
        }
        let value = match self.evaluate() {
            Ok(Some(value)) => value,
            Ok(None) => return true,
            Err(err) => {
                tracing::warn!(binding = %self.describe(), error = %err, "binding propagation failed");
                return true;
            }
        };
        if target
            .set_value_with(&self.target.path, value, SetOptions::default(), visited)
            .is_none()
        {
            tracing::trace!(binding = %self.describe(), "binding write had no effect");
        }
        true
    }
}

impl fmt::Debug for BindingObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingObserver")
            .field("kind", &self.kind)
            .field("binding", &self.describe())
            .field("propagate_first", &self.propagate_first)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

enum Registration {
    Field(Rc<FieldData>),
    Resource { dictionary: String, key: String },
}

/// Wire `expr` so that it keeps `target` on `view` up to date.
///
/// Subscriptions are held by `view`; destroying it disconnects the binding.
pub(crate) fn wire_binding(view: &View, target: &str, expr: &BindingExpr) -> Result<(), BindingError> {
    let ctx = view.context().clone();
    let target_field = view.resolve_field(target)?;
    let context_owner = view.logical_parent().unwrap_or_else(|| view.clone());

    let mut sources = Vec::with_capacity(expr.sources.len());
    let mut registrations = Vec::with_capacity(expr.sources.len());
    let mut first_owner: Option<View> = None;
    for source in &expr.sources {
        if let Some(resource) = &source.resource {
            let dictionary = resource
                .dictionary
                .clone()
                .unwrap_or_else(|| ctx.config().default_dictionary.clone());
            registrations.push(Registration::Resource {
                dictionary: dictionary.clone(),
                key: resource.key.clone(),
            });
            sources.push(BindingSource::Resource {
                resources: Rc::clone(ctx.resources()),
                dictionary,
                key: resource.key.clone(),
                negate: source.negate,
            });
            continue;
        }
        let owner = if source.local {
            view.clone()
        } else {
            context_owner.clone()
        };
        registrations.push(Registration::Field(owner.resolve_field(&source.path)?));
        sources.push(BindingSource::Field {
            view: owner.downgrade(),
            label: owner.to_string(),
            path: source.path.as_str().into(),
            negate: source.negate,
        });
        first_owner.get_or_insert(owner);
    }

    let transform = match &expr.transform {
        None => None,
        Some(TransformRef::Static { qualified }) => {
            Some(ctx.transform(qualified).ok_or_else(|| BindingError::UnknownTransform {
                owner: view.to_string(),
                name: qualified.clone(),
            })?)
        }
        Some(TransformRef::Method { name }) => Some(bind_method(&context_owner, name)?),
    };

    let two_way = expr.is_two_way();
    let local = first_owner.as_ref().is_some_and(|o| o.ptr_eq(view));
    let forward = Rc::new(BindingObserver {
        kind: expr.kind,
        sources,
        target: BindingTarget::new(view, target),
        transform,
        template: expr.template.clone(),
        propagate_first: two_way && local,
    });
    for registration in registrations {
        let sub = match registration {
            Registration::Field(field) => FieldData::observe(&field, forward.clone()),
            Registration::Resource { dictionary, key } => {
                ResourceDictionaries::register_observer(ctx.resources(), &dictionary, &key, forward.clone())
            }
        };
        view.hold(sub);
    }
    view.push_binding(Rc::clone(&forward));

    if two_way {
        if let (Some(owner), Some(source)) = (first_owner, expr.sources.first()) {
            let backward = Rc::new(BindingObserver {
                kind: BindingKind::Single,
                sources: vec![BindingSource::Field {
                    view: view.downgrade(),
                    label: view.to_string(),
                    path: target.into(),
                    negate: source.negate,
                }],
                target: BindingTarget::new(&owner, &source.path),
                transform: None,
                template: None,
                propagate_first: false,
            });
            view.hold(FieldData::observe(&target_field, backward.clone()));
            view.push_binding(backward);
        }
    }

    tracing::debug!(view = %view, binding = %forward.describe(), two_way, "binding wired");
    Ok(())
}

fn bind_method(owner: &View, name: &str) -> Result<TransformFn, BindingError> {
    let method = owner.method(name).ok_or_else(|| BindingError::UnknownTransform {
        owner: owner.to_string(),
        name: name.to_owned(),
    })?;
    let weak = owner.downgrade();
    Ok(Rc::new(move |args: &[Value]| {
        let owner = weak
            .upgrade()
            .map(View::from_inner)
            .ok_or_else(|| InvocationError::new("transform owner was destroyed"))?;
        method(&owner, args)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ViewClass;
    use crate::context::BindingContext;
    use crate::resource::Resource;
    use vbind_core::{BindingConfig, ValueType};

    fn ctx() -> BindingContext {
        BindingContext::builder()
            .config(BindingConfig::new().with_default_dictionary("Strings"))
            .register_view(
                ViewClass::new("Form")
                    .member("First", ValueType::Str)
                    .member("Last", ValueType::Str)
                    .member("Enabled", ValueType::Bool)
                    .method("Initials", |_, args| {
                        let initials: String = args
                            .iter()
                            .filter_map(|v| v.as_str().and_then(|s| s.chars().next()))
                            .collect();
                        Ok(Value::from(initials))
                    }),
            )
            .register_view(
                ViewClass::new("Label")
                    .member("Text", ValueType::Str)
                    .member("Disabled", ValueType::Bool)
                    .member("Count", ValueType::Int),
            )
            .transform("Text.Fail", |_| Err(InvocationError::new("always fails")))
            .resource("Strings", Resource::new("Title", "Welcome"))
            .build()
            .unwrap()
    }

    fn tree(ctx: &BindingContext) -> (View, View) {
        let form = ctx.create_view("Form", "form", None).unwrap();
        let label = ctx.create_view("Label", "label", Some(&form)).unwrap();
        form.initialize_internal();
        label.initialize_internal();
        (form, label)
    }

    #[test]
    fn single_binding_is_two_way() {
        let ctx = ctx();
        let (form, label) = tree(&ctx);
        label.add_binding("Text", "{First}").unwrap();
        assert_eq!(label.binding_count(), 2);

        form.set_value("First", "Ada");
        assert_eq!(label.get_value("Text"), Some(Value::from("Ada")));
        label.set_value("Text", "Grace");
        assert_eq!(form.get_value("First"), Some(Value::from("Grace")));
    }

    #[test]
    fn one_way_binding_has_no_reverse_observer() {
        let ctx = ctx();
        let (form, label) = tree(&ctx);
        label.add_binding("Text", "{=First}").unwrap();
        assert_eq!(label.binding_count(), 1);
        label.set_value("Text", "local");
        assert_eq!(form.get_value("First"), Some(Value::Null));
    }

    #[test]
    fn negated_binding_flips_in_both_directions() {
        let ctx = ctx();
        let (form, label) = tree(&ctx);
        label.add_binding("Disabled", "{!Enabled}").unwrap();
        form.set_value("Enabled", true);
        assert_eq!(label.get_value("Disabled"), Some(Value::Bool(false)));
        label.set_value("Disabled", true);
        assert_eq!(form.get_value("Enabled"), Some(Value::Bool(false)));
    }

    #[test]
    fn method_transform_resolves_on_the_logical_parent() {
        let ctx = ctx();
        let (form, label) = tree(&ctx);
        label.add_binding("Text", "$Initials({First}, {Last})").unwrap();
        form.set_value("First", "Ada");
        form.set_value("Last", "Lovelace");
        assert_eq!(label.get_value("Text"), Some(Value::from("AL")));
    }

    #[test]
    fn unknown_transform_is_reported() {
        let ctx = ctx();
        let (_form, label) = tree(&ctx);
        let err = label.add_binding("Text", "$Nope.Nothing({First})").unwrap_err();
        assert!(matches!(err, BindingError::UnknownTransform { .. }));
    }

    #[test]
    fn failing_transform_keeps_the_binding() {
        let ctx = ctx();
        let (form, label) = tree(&ctx);
        label.add_binding("Text", "$Text.Fail({First})").unwrap();
        form.set_value("First", "a");
        form.set_value("First", "b");
        assert_eq!(label.get_value("Text"), Some(Value::Null));
        assert_eq!(label.binding_count(), 1);
    }

    #[test]
    fn resource_reference_uses_the_default_dictionary() {
        let ctx = ctx();
        let (_form, label) = tree(&ctx);
        label.add_binding("Text", "{@Title}").unwrap();
        label.propagate_bindings();
        assert_eq!(label.get_value("Text"), Some(Value::from("Welcome")));
        ctx.resources().set_value("Strings", "Title", "Hello");
        assert_eq!(label.get_value("Text"), Some(Value::from("Hello")));
    }

    #[test]
    fn destroyed_target_drops_the_observer() {
        let ctx = ctx();
        let (form, label) = tree(&ctx);
        label.add_binding("Text", "{=First}").unwrap();
        let first = form.resolve_field("First").unwrap();
        assert_eq!(first.observer_count(), 1);
        label.destroy();
        assert_eq!(first.observer_count(), 0);
        assert_eq!(form.set_value("First", "x"), Some(Value::from("x")));
    }

    #[test]
    fn describe_lists_sources_and_target() {
        let ctx = ctx();
        let (_form, label) = tree(&ctx);
        label.add_binding("Text", "{First} {#Count}").unwrap();
        let bindings = label.bindings();
        assert_eq!(bindings[0].describe(), "form#1.First, label#2.Count -> label#2.Text");
    }
}
