#![forbid(unsafe_code)]

//! Explicit type registry for owners, records and enums.
//!
//! Owner types register their members once at startup. Field paths are then
//! resolved against these descriptors instead of inspecting live objects,
//! and every member carries a stable slot index so accessors never look up
//! names on the hot path.
//!
//! # Invariants
//!
//! 1. A derived type's members start with its base's members, at the same
//!    indices, so an accessor resolved on a base type is valid on every
//!    derived instance.
//! 2. Member names are unique within a type (including inherited ones).
//! 3. Every owner type has a `State` member holding the active state name.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::RegistryError;
use crate::value::{EnumValue, Record, RecordRef, TypeName, Value};

/// Name of the implicit member every owner type carries.
pub const STATE_MEMBER: &str = "State";

/// Name of the single member of a field container.
pub const CONTAINER_VALUE: &str = "Value";

/// Declared type of a member.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Dynamically typed; traversal inspects the runtime value.
    Any,
    Bool,
    Int,
    Float,
    Str,
    Enum(TypeName),
    Record(TypeName),
    Owner(TypeName),
    /// A boxed field whose single `Value` member holds the payload.
    Container(Box<ValueType>),
}

impl ValueType {
    /// Key used to look up converters.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::Enum(name) | Self::Record(name) | Self::Owner(name) => name,
            Self::Container(inner) => inner.key(),
        }
    }

    /// The payload type, looking through containers.
    #[must_use]
    pub fn unboxed(&self) -> &ValueType {
        match self {
            Self::Container(inner) => inner.unboxed(),
            other => other,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container(inner) => write!(f, "Field<{inner}>"),
            other => f.write_str(other.key()),
        }
    }
}

/// What a registered type describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// An owner hosting fields, bindings and states.
    Owner,
    /// A plain nested object.
    Record,
    Enum,
}

/// One member of a record or owner type.
#[derive(Clone, Debug)]
pub struct MemberDescriptor {
    pub name: Rc<str>,
    pub ty: ValueType,
    /// Slot index inside the instance.
    pub index: usize,
    pub default: Value,
    /// Value is produced by a calculated field rather than stored.
    pub calculated: bool,
}

/// Structural description of a registered type.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    name: TypeName,
    kind: TypeKind,
    base: Option<TypeName>,
    members: Vec<MemberDescriptor>,
    variants: Vec<Rc<str>>,
}

impl TypeDescriptor {
    fn empty(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            members: Vec::new(),
            variants: Vec::new(),
        }
    }

    /// Start describing an owner type.
    #[must_use]
    pub fn owner(name: &str) -> Self {
        Self::empty(name, TypeKind::Owner)
    }

    /// Start describing a record type.
    #[must_use]
    pub fn record(name: &str) -> Self {
        Self::empty(name, TypeKind::Record)
    }

    /// Describe an enum with its variants in ordinal order.
    #[must_use]
    pub fn enumeration<I, S>(name: &str, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Rc<str>>,
    {
        let mut desc = Self::empty(name, TypeKind::Enum);
        desc.variants = variants.into_iter().map(Into::into).collect();
        desc
    }

    /// Inherit members from a previously registered type of the same kind.
    #[must_use]
    pub fn extends(mut self, base: &str) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add a member whose default is [`Value::Null`].
    #[must_use]
    pub fn member(self, name: &str, ty: ValueType) -> Self {
        self.member_with_default(name, ty, Value::Null)
    }

    #[must_use]
    pub fn member_with_default(mut self, name: &str, ty: ValueType, default: Value) -> Self {
        self.push_member(name, ty, default, false);
        self
    }

    /// Add a boxed field member (`Name` and `Name.Value` address the same payload).
    #[must_use]
    pub fn container(mut self, name: &str, inner: ValueType, default: Value) -> Self {
        self.push_member(name, ValueType::Container(Box::new(inner)), default, false);
        self
    }

    /// Add a member whose value comes from a calculated field.
    #[must_use]
    pub fn calculated(mut self, name: &str, ty: ValueType) -> Self {
        self.push_member(name, ty, Value::Null, true);
        self
    }

    fn push_member(&mut self, name: &str, ty: ValueType, default: Value, calculated: bool) {
        self.members.push(MemberDescriptor {
            name: name.into(),
            ty,
            index: 0,
            default,
            calculated,
        });
    }

    #[must_use]
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[must_use]
    pub fn base(&self) -> Option<&TypeName> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    #[must_use]
    pub fn member_named(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| &*m.name == name)
    }

    #[must_use]
    pub fn variants(&self) -> &[Rc<str>] {
        &self.variants
    }

    /// Look up a variant by name (case-insensitive) or ordinal.
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<EnumValue> {
        let found = self
            .variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(name))
            .or_else(|| name.parse::<usize>().ok().and_then(|i| self.variants.get(i)))?;
        Some(EnumValue::new(Rc::clone(&self.name), Rc::clone(found)))
    }
}

/// Registry of every type paths can be resolved against.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: AHashMap<TypeName, Rc<TypeDescriptor>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, flattening its base members and assigning slot
    /// indices. The base must already be registered.
    pub fn register(&mut self, desc: TypeDescriptor) -> Result<Rc<TypeDescriptor>, RegistryError> {
        if self.types.contains_key(&desc.name) {
            return Err(RegistryError::DuplicateType(desc.name.to_string()));
        }

        let mut members: Vec<MemberDescriptor> = match &desc.base {
            Some(base_name) => {
                let base = self
                    .types
                    .get(base_name)
                    .ok_or_else(|| RegistryError::UnknownBase {
                        type_name: desc.name.to_string(),
                        base: base_name.to_string(),
                    })?;
                if base.kind != desc.kind {
                    return Err(RegistryError::BaseKindMismatch {
                        type_name: desc.name.to_string(),
                        base: base_name.to_string(),
                    });
                }
                base.members.clone()
            }
            None if desc.kind == TypeKind::Owner => vec![MemberDescriptor {
                name: STATE_MEMBER.into(),
                ty: ValueType::Str,
                index: 0,
                default: Value::Null,
                calculated: false,
            }],
            None => Vec::new(),
        };

        for member in desc.members {
            if members.iter().any(|m| m.name == member.name) {
                return Err(RegistryError::DuplicateMember {
                    type_name: desc.name.to_string(),
                    member: member.name.to_string(),
                });
            }
            members.push(member);
        }
        for (index, member) in members.iter_mut().enumerate() {
            member.index = index;
        }

        let variants = match (&desc.base, desc.kind) {
            (Some(base), TypeKind::Enum) => {
                let mut all = self
                    .types
                    .get(base)
                    .map(|b| b.variants.clone())
                    .unwrap_or_default();
                all.extend(desc.variants);
                all
            }
            _ => desc.variants,
        };

        let registered = Rc::new(TypeDescriptor {
            name: Rc::clone(&desc.name),
            kind: desc.kind,
            base: desc.base,
            members,
            variants,
        });
        self.types
            .insert(Rc::clone(&registered.name), Rc::clone(&registered));
        Ok(registered)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rc<TypeDescriptor>> {
        self.types.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Whether a value of type `from` may be stored in a member typed `to`.
    #[must_use]
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        let mut current = Some(from);
        while let Some(name) = current {
            if name == to {
                return true;
            }
            current = self.types.get(name).and_then(|d| d.base.as_deref());
        }
        false
    }

    /// Instantiate the default value of a member: fresh containers are
    /// created for boxed fields, everything else copies the declared default.
    #[must_use]
    pub fn instantiate_member(&self, member: &MemberDescriptor) -> Value {
        match &member.ty {
            ValueType::Container(inner) => Value::Record(self.new_container(inner, member.default.clone())),
            _ => member.default.clone(),
        }
    }

    /// Create a record instance with every member at its default.
    pub fn new_record(&self, type_name: &str) -> Result<RecordRef, RegistryError> {
        let desc = self
            .types
            .get(type_name)
            .ok_or_else(|| RegistryError::UnknownType(type_name.to_owned()))?;
        if desc.kind != TypeKind::Record {
            return Err(RegistryError::NotARecord(type_name.to_owned()));
        }
        let slots = desc
            .members
            .iter()
            .map(|m| self.instantiate_member(m))
            .collect();
        Ok(RecordRef::new(Record::new(Rc::clone(&desc.name), slots)))
    }

    fn new_container(&self, inner: &ValueType, payload: Value) -> RecordRef {
        let name: TypeName = format!("Field<{inner}>").into();
        RecordRef::new(Record::new(name, vec![payload]))
    }
}
