#![forbid(unsafe_code)]

//! Value converters consulted when a value is written to a field.
//!
//! Every resolved field path carries one converter picked from its declared
//! type. Markup hands values over as strings, bindings hand over whatever the
//! source holds; the converter turns either into the field's representation
//! or reports a [`ConversionError`] so the write can be aborted.
//!
//! # Failure Modes
//!
//! | Input | Behavior |
//! |-------|----------|
//! | `Null` | Always converts to `Null` (clears the field) |
//! | Unparseable string | `ConversionError` with the attempted text |
//! | Float with a fraction, or outside the `i64` range, into an int | `ConversionError` |
//! | Record/owner of the wrong type | `ConversionError` |

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::ConversionError;
use crate::types::{TypeDescriptor, TypeKind, TypeRegistry, ValueType};
use crate::value::Value;

/// Ambient information available to a converter.
#[derive(Clone, Copy)]
pub struct ConversionContext<'a> {
    pub types: &'a TypeRegistry,
    /// Display name of the owner being written, for diagnostics.
    pub owner: &'a str,
    /// Field path being written.
    pub path: &'a str,
}

impl fmt::Debug for ConversionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionContext")
            .field("owner", &self.owner)
            .field("path", &self.path)
            .finish()
    }
}

/// String-to-value and value-to-value conversion for one field type.
pub trait ValueConverter: fmt::Debug {
    fn convert(&self, value: &Value, cx: &ConversionContext<'_>) -> Result<Value, ConversionError>;

    fn convert_to_string(&self, value: &Value) -> String {
        value.to_string()
    }
}

#[derive(Debug)]
pub struct BoolConverter;

impl ValueConverter for BoolConverter {
    fn convert(&self, value: &Value, _cx: &ConversionContext<'_>) -> Result<Value, ConversionError> {
        match value {
            Value::Null | Value::Bool(_) => Ok(value.clone()),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::Str(s) => match s.trim() {
                t if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(ConversionError::new("bool", s, "expected `true` or `false`")),
            },
            other => Err(mismatch("bool", other)),
        }
    }
}

#[derive(Debug)]
pub struct IntConverter;

impl ValueConverter for IntConverter {
    fn convert(&self, value: &Value, _cx: &ConversionContext<'_>) -> Result<Value, ConversionError> {
        match value {
            Value::Null | Value::Int(_) => Ok(value.clone()),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            Value::Float(f) if !f.is_finite() || *f < i64::MIN as f64 || *f >= i64::MAX as f64 => {
                Err(ConversionError::new("int", f.to_string(), "value is out of range"))
            }
            Value::Float(f) if f.fract() != 0.0 => {
                Err(ConversionError::new("int", f.to_string(), "value has a fractional part"))
            }
            Value::Float(f) => Ok(Value::Int(*f as i64)),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| ConversionError::new("int", s, e.to_string())),
            other => Err(mismatch("int", other)),
        }
    }
}

#[derive(Debug)]
pub struct FloatConverter;

impl ValueConverter for FloatConverter {
    fn convert(&self, value: &Value, _cx: &ConversionContext<'_>) -> Result<Value, ConversionError> {
        match value {
            Value::Null | Value::Float(_) => Ok(value.clone()),
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::Str(s) => {
                let trimmed = s.trim();
                let trimmed = trimmed.strip_suffix(['f', 'F']).unwrap_or(trimmed);
                trimmed
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| ConversionError::new("float", s, e.to_string()))
            }
            other => Err(mismatch("float", other)),
        }
    }
}

/// Accepts any scalar and stores its text form.
#[derive(Debug)]
pub struct StringConverter;

impl ValueConverter for StringConverter {
    fn convert(&self, value: &Value, _cx: &ConversionContext<'_>) -> Result<Value, ConversionError> {
        match value {
            Value::Null | Value::Str(_) => Ok(value.clone()),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Enum(_) => {
                Ok(Value::Str(value.to_string()))
            }
            other => Err(mismatch("string", other)),
        }
    }
}

/// Converter for a registered enum type.
#[derive(Debug)]
pub struct EnumConverter {
    desc: Rc<TypeDescriptor>,
}

impl EnumConverter {
    #[must_use]
    pub fn new(desc: Rc<TypeDescriptor>) -> Self {
        Self { desc }
    }
}

impl ValueConverter for EnumConverter {
    fn convert(&self, value: &Value, _cx: &ConversionContext<'_>) -> Result<Value, ConversionError> {
        let name = self.desc.name();
        match value {
            Value::Null => Ok(Value::Null),
            Value::Enum(e) if &e.type_name == name => Ok(value.clone()),
            Value::Str(s) => self
                .desc
                .variant(s.trim())
                .map(Value::Enum)
                .ok_or_else(|| ConversionError::new(name.to_string(), s, "no such variant")),
            Value::Int(i) => self
                .desc
                .variant(&i.to_string())
                .map(Value::Enum)
                .ok_or_else(|| ConversionError::new(name.to_string(), i.to_string(), "ordinal out of range")),
            other => Err(mismatch(name, other)),
        }
    }
}

/// Identity conversion for records and owner references, with a type check.
#[derive(Debug)]
pub struct ObjectConverter {
    ty: ValueType,
}

impl ObjectConverter {
    #[must_use]
    pub fn new(ty: ValueType) -> Self {
        Self { ty }
    }
}

impl ValueConverter for ObjectConverter {
    fn convert(&self, value: &Value, cx: &ConversionContext<'_>) -> Result<Value, ConversionError> {
        let expected = self.ty.key();
        let actual = match (value, &self.ty) {
            (Value::Null, _) => return Ok(Value::Null),
            (Value::Record(r), ValueType::Record(_)) => r.type_name(),
            (Value::Owner(o), ValueType::Owner(_)) => o.type_name(),
            (other, _) => return Err(mismatch(expected, other)),
        };
        if cx.types.is_assignable(actual, expected) {
            Ok(value.clone())
        } else {
            Err(ConversionError::new(expected, actual, "type is not assignable"))
        }
    }
}

/// Pass-through for `Any` members.
#[derive(Debug)]
pub struct AnyConverter;

impl ValueConverter for AnyConverter {
    fn convert(&self, value: &Value, _cx: &ConversionContext<'_>) -> Result<Value, ConversionError> {
        Ok(value.clone())
    }
}

fn mismatch(expected: &str, value: &Value) -> ConversionError {
    ConversionError::new(
        expected,
        format!("{value:?}"),
        format!("{} is not convertible", value.type_label()),
    )
}

/// Converters keyed by value-type name.
///
/// Custom converters registered for a key take precedence over the
/// built-ins; enums without an explicit converter get an [`EnumConverter`].
#[derive(Debug)]
pub struct ConverterRegistry {
    custom: AHashMap<String, Rc<dyn ValueConverter>>,
    bool_: Rc<dyn ValueConverter>,
    int: Rc<dyn ValueConverter>,
    float: Rc<dyn ValueConverter>,
    string: Rc<dyn ValueConverter>,
    any: Rc<dyn ValueConverter>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: AHashMap::new(),
            bool_: Rc::new(BoolConverter),
            int: Rc::new(IntConverter),
            float: Rc::new(FloatConverter),
            string: Rc::new(StringConverter),
            any: Rc::new(AnyConverter),
        }
    }

    /// Register a converter for a value-type key (see [`ValueType::key`]).
    pub fn register(&mut self, key: impl Into<String>, converter: Rc<dyn ValueConverter>) {
        self.custom.insert(key.into(), converter);
    }

    /// Pick the converter for a declared type.
    #[must_use]
    pub fn converter_for(&self, ty: &ValueType, types: &TypeRegistry) -> Rc<dyn ValueConverter> {
        let ty = ty.unboxed();
        if let Some(custom) = self.custom.get(ty.key()) {
            return Rc::clone(custom);
        }
        match ty {
            ValueType::Any | ValueType::Container(_) => Rc::clone(&self.any),
            ValueType::Bool => Rc::clone(&self.bool_),
            ValueType::Int => Rc::clone(&self.int),
            ValueType::Float => Rc::clone(&self.float),
            ValueType::Str => Rc::clone(&self.string),
            ValueType::Enum(name) => match types.get(name) {
                Some(desc) if desc.kind() == TypeKind::Enum => {
                    Rc::new(EnumConverter::new(Rc::clone(desc)))
                }
                _ => Rc::clone(&self.any),
            },
            ValueType::Record(_) | ValueType::Owner(_) => Rc::new(ObjectConverter::new(ty.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDescriptor;
    use crate::value::{EnumValue, Record, RecordRef};

    fn types() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register(TypeDescriptor::enumeration("Align", ["Left", "Right"]))
            .unwrap();
        reg.register(TypeDescriptor::record("Shape")).unwrap();
        reg.register(TypeDescriptor::record("Circle").extends("Shape"))
            .unwrap();
        reg
    }

    fn cx(types: &TypeRegistry) -> ConversionContext<'_> {
        ConversionContext {
            types,
            owner: "Test#1",
            path: "Field",
        }
    }

    #[test]
    fn numbers_parse_from_markup_strings() {
        let reg = types();
        let cx = cx(&reg);
        assert_eq!(FloatConverter.convert(&"2.5".into(), &cx), Ok(Value::Float(2.5)));
        assert_eq!(FloatConverter.convert(&"3f".into(), &cx), Ok(Value::Float(3.0)));
        assert_eq!(IntConverter.convert(&" 42 ".into(), &cx), Ok(Value::Int(42)));
        assert!(IntConverter.convert(&Value::Float(1.5), &cx).is_err());
        assert_eq!(IntConverter.convert(&Value::Float(2.0), &cx), Ok(Value::Int(2)));
        assert!(IntConverter.convert(&Value::Float(1e300), &cx).is_err());
        assert!(IntConverter.convert(&Value::Float(-1e19), &cx).is_err());
        assert!(IntConverter.convert(&Value::Float(f64::NAN), &cx).is_err());
        assert_eq!(
            IntConverter.convert(&Value::Float(-9_223_372_036_854_775_808.0), &cx),
            Ok(Value::Int(i64::MIN))
        );
    }

    #[test]
    fn bool_parsing_is_case_insensitive() {
        let reg = types();
        let cx = cx(&reg);
        assert_eq!(BoolConverter.convert(&"True".into(), &cx), Ok(Value::Bool(true)));
        let err = BoolConverter.convert(&"yes".into(), &cx).unwrap_err();
        assert_eq!(err.value, "yes");
    }

    #[test]
    fn null_always_converts() {
        let reg = types();
        let cx = cx(&reg);
        assert_eq!(IntConverter.convert(&Value::Null, &cx), Ok(Value::Null));
        assert_eq!(StringConverter.convert(&Value::Null, &cx), Ok(Value::Null));
    }

    #[test]
    fn strings_accept_scalars() {
        let reg = types();
        let cx = cx(&reg);
        assert_eq!(StringConverter.convert(&Value::Int(7), &cx), Ok(Value::from("7")));
        assert_eq!(
            StringConverter.convert(&Value::Enum(EnumValue::new("Align", "Left")), &cx),
            Ok(Value::from("Left"))
        );
    }

    #[test]
    fn enums_fall_back_to_generated_converter() {
        let reg = types();
        let conv = ConverterRegistry::new().converter_for(&ValueType::Enum("Align".into()), &reg);
        let cx = cx(&reg);
        assert_eq!(
            conv.convert(&"right".into(), &cx),
            Ok(Value::Enum(EnumValue::new("Align", "Right")))
        );
        assert!(conv.convert(&"Up".into(), &cx).is_err());
    }

    #[test]
    fn objects_check_assignability() {
        let reg = types();
        let cx = cx(&reg);
        let conv = ObjectConverter::new(ValueType::Record("Shape".into()));
        let circle = Value::Record(RecordRef::new(Record::new("Circle".into(), vec![])));
        assert!(conv.convert(&circle, &cx).is_ok());
        let narrow = ObjectConverter::new(ValueType::Record("Circle".into()));
        let shape = Value::Record(RecordRef::new(Record::new("Shape".into(), vec![])));
        assert!(narrow.convert(&shape, &cx).is_err());
    }

    #[test]
    fn custom_converters_take_precedence() {
        #[derive(Debug)]
        struct Upper;
        impl ValueConverter for Upper {
            fn convert(&self, value: &Value, _: &ConversionContext<'_>) -> Result<Value, ConversionError> {
                Ok(Value::Str(value.to_string().to_uppercase()))
            }
        }

        let reg = types();
        let mut converters = ConverterRegistry::new();
        converters.register("string", Rc::new(Upper));
        let conv = converters.converter_for(&ValueType::Str, &reg);
        assert_eq!(conv.convert(&"abc".into(), &cx(&reg)), Ok(Value::from("ABC")));
    }
}
