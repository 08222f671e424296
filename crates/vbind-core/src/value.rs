#![forbid(unsafe_code)]

//! Dynamic values stored in view fields.
//!
//! A [`Value`] is what flows through bindings, converters and state tables.
//! Scalars compare by value; records and owner references compare by
//! identity, so replacing a nested object with a fresh instance counts as a
//! change even when every member is equal.
//!
//! # Invariants
//!
//! 1. `Value::Null` is the only "unset" value; it equals itself.
//! 2. `Record` and `Owner` equality is pointer identity.
//! 3. `Int(1) != Float(1.0)`: converters, not equality, bridge numeric kinds.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::types::ValueType;

/// Interned type name shared between descriptors and values.
pub type TypeName = Rc<str>;

/// A value held by a field, record slot, state table or resource.
#[derive(Clone, Default)]
pub enum Value {
    /// No value (null reference, unassigned optional).
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Enum(EnumValue),
    /// A nested plain object.
    Record(RecordRef),
    /// A non-owning reference to another owner (view).
    Owner(OwnerRef),
}

impl Value {
    /// Whether this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; ints widen to floats.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&RecordRef> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_owner(&self) -> Option<&OwnerRef> {
        match self {
            Self::Owner(o) => Some(o),
            _ => None,
        }
    }

    /// Name of the runtime type, used in diagnostics and `Any` resolution.
    #[must_use]
    pub fn type_label(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Enum(e) => &e.type_name,
            Self::Record(r) => r.type_name(),
            Self::Owner(o) => o.type_name(),
        }
    }

    /// The flipped boolean, or the value unchanged when it is not a bool.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Bool(b) => Self::Bool(!b),
            other => other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a.ptr_eq(b),
            (Self::Owner(a), Self::Owner(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Enum(e) => write!(f, "Enum({}::{})", e.type_name, e.variant),
            Self::Record(r) => write!(f, "Record({})", r.type_name()),
            Self::Owner(o) => write!(f, "Owner({}#{})", o.type_name(), o.id()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::Enum(e) => f.write_str(&e.variant),
            Self::Record(r) => write!(f, "<{}>", r.type_name()),
            Self::Owner(o) => write!(f, "<{}#{}>", o.type_name(), o.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Self::Enum(v)
    }
}

impl From<RecordRef> for Value {
    fn from(v: RecordRef) -> Self {
        Self::Record(v)
    }
}

impl From<OwnerRef> for Value {
    fn from(v: OwnerRef) -> Self {
        Self::Owner(v)
    }
}

/// A variant of a registered enum type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: TypeName,
    pub variant: Rc<str>,
}

impl EnumValue {
    #[must_use]
    pub fn new(type_name: impl Into<TypeName>, variant: impl Into<Rc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
        }
    }
}

/// Storage of a nested plain object: its type and one slot per member.
#[derive(Debug)]
pub struct Record {
    type_name: TypeName,
    slots: Vec<Value>,
}

impl Record {
    #[must_use]
    pub fn new(type_name: TypeName, slots: Vec<Value>) -> Self {
        Self { type_name, slots }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)
    }

    /// Replace a slot, returning the previous value.
    pub fn replace(&mut self, index: usize, value: Value) -> Option<Value> {
        self.slots
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Shared handle to a [`Record`]. Cloning shares the record.
#[derive(Clone)]
pub struct RecordRef {
    type_name: TypeName,
    inner: Rc<RefCell<Record>>,
}

impl RecordRef {
    #[must_use]
    pub fn new(record: Record) -> Self {
        Self {
            type_name: Rc::clone(&record.type_name),
            inner: Rc::new(RefCell::new(record)),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Read a slot by member index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.borrow().slot(index).cloned()
    }

    /// Write a slot by member index, returning the previous value.
    pub fn set(&self, index: usize, value: Value) -> Option<Value> {
        self.inner.borrow_mut().replace(index, value)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRef")
            .field("type_name", &self.type_name)
            .field("slots", &self.inner.borrow().len())
            .finish()
    }
}

/// Non-owning reference to an owner living in the runtime.
///
/// Owners are kept alive by their tree, never by the fields that point at
/// them, so a reference can outlive its target; [`OwnerRef::upgrade`] then
/// returns `None`.
#[derive(Clone)]
pub struct OwnerRef {
    type_name: TypeName,
    id: u64,
    target: Weak<dyn Any>,
}

impl OwnerRef {
    #[must_use]
    pub fn new(type_name: TypeName, id: u64, target: Weak<dyn Any>) -> Self {
        Self {
            type_name,
            id,
            target,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Recover the concrete owner, if it is still alive and of type `T`.
    #[must_use]
    pub fn upgrade<T: Any>(&self) -> Option<Rc<T>> {
        self.target.upgrade()?.downcast::<T>().ok()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }
}

impl fmt::Debug for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerRef")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .finish()
    }
}

/// Rust types that can be stored in a field through a typed handle.
pub trait FieldValue: Sized {
    /// The declared field type this Rust type maps to.
    fn value_type() -> ValueType;

    /// Extract from a stored value; `None` when the kinds differ or the
    /// value is null.
    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

impl FieldValue for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FieldValue for i64 {
    fn value_type() -> ValueType {
        ValueType::Int
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl FieldValue for i32 {
    fn value_type() -> ValueType {
        ValueType::Int
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| i32::try_from(i).ok())
    }

    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl FieldValue for f64 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FieldValue for f32 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float().map(|f| f as f32)
    }

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl FieldValue for String {
    fn value_type() -> ValueType {
        ValueType::Str
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }
}
