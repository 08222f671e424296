#![forbid(unsafe_code)]

//! Core data model for vbind view-model bindings.
//!
//! This crate has no notion of live views; it provides the pieces the
//! runtime composes:
//! - [`Value`] and [`TypeRegistry`] for dynamically typed owner and record state
//! - [`ConverterRegistry`] for coercing values to a field's declared type
//! - [`PathResolver`] for turning `"A.B.C"` into cached accessor chains
//! - [`expr`] for the binding expression grammar and [`FormatTemplate`]
//! - [`BindingConfig`] and the shared error types

pub mod config;
pub mod convert;
pub mod error;
pub mod expr;
pub mod format;
pub mod path;
pub mod types;
pub mod value;

pub use config::BindingConfig;
#[cfg(feature = "config")]
pub use config::ConfigError;
pub use convert::{ConversionContext, ConverterRegistry, ValueConverter};
pub use error::{
    BindingError, ConversionError, ExprError, InvocationError, PathError, PathErrorReason,
    RegistryError, Severity,
};
pub use expr::{BindingExpr, BindingKind, ResourceRef, SourceRef, TransformRef};
pub use format::{FormatSpec, FormatTemplate};
pub use path::{FieldPathInfo, MemberAccess, PathResolver, PathTarget};
pub use types::{MemberDescriptor, TypeDescriptor, TypeKind, TypeRegistry, ValueType};
pub use value::{EnumValue, FieldValue, OwnerRef, Record, RecordRef, TypeName, Value};
