#![forbid(unsafe_code)]

//! Live binding engine for vbind.
//!
//! Build a [`BindingContext`] once, create [`View`]s through it, declare
//! values, bindings, state values and change handlers on them, then hand the
//! root to [`initialize_tree`]. After that, writes through
//! [`View::set_value`] propagate synchronously and deferred change handlers
//! run whenever the host calls [`flush_tree`].
//!
//! ```ignore
//! let ctx = BindingContext::builder()
//!     .register_view(ViewClass::new("Form").member("First", ValueType::Str))
//!     .register_view(ViewClass::new("Label").member("Text", ValueType::Str))
//!     .build()?;
//! let form = ctx.create_view("Form", "form", None)?;
//! let label = ctx.create_view("Label", "label", Some(&form))?;
//! label.add_binding("Text", "Hello {First}")?;
//! initialize_tree(&form)?;
//! form.set_value("First", "Ada");
//! assert_eq!(label.get_value("Text"), Some("Hello Ada".into()));
//! ```

pub mod class;
pub mod context;
pub mod driver;
pub mod field;
pub mod reactive;
pub mod resource;
pub mod state;
pub mod tree;
pub mod view;

pub use class::{HandlerFn, HookFn, MethodFn, TransformFn, ViewClass};
pub use context::{BindingContext, ContextBuilder};
pub use driver::{InitReport, flush_tree, initialize_tree};
pub use field::{Field, FieldData};
pub use reactive::{
    BindingObserver, BindingScope, CalculatedField, ChangeHandlerObserver, ComputationStack,
    Subscription, ValueObserver, Visited,
};
pub use resource::{Resource, ResourceDictionaries};
pub use state::StateValue;
pub use view::{SetOptions, View};
