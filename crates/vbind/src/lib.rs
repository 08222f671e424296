#![forbid(unsafe_code)]

//! vbind: declarative view-model data binding.
//!
//! - [`core`]: values, the type registry, converters, path resolution and
//!   the binding expression grammar
//! - [`runtime`]: views, observers, calculated fields and the propagation
//!   driver
//!
//! Most hosts only need the [`prelude`].

pub use vbind_core as core;
pub use vbind_runtime as runtime;

pub use vbind_core::{BindingConfig, BindingError, Value, ValueType};
pub use vbind_runtime::{BindingContext, View, ViewClass, flush_tree, initialize_tree};

pub mod prelude {
    pub use vbind_core::{
        BindingConfig, BindingError, EnumValue, FieldValue, InvocationError, RecordRef,
        TypeDescriptor, Value, ValueType,
    };
    pub use vbind_runtime::{
        BindingContext, Field, InitReport, Resource, SetOptions, View, ViewClass, flush_tree,
        initialize_tree,
    };
}
