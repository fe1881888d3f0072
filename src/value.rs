//! Dynamic value representation for the generic object path.
//!
//! [`Value`] is the closed set of shapes that
//! [`SerializationWriter::write_object`](crate::SerializationWriter::write_object)
//! knows how to tag, and that
//! [`SerializationReader::read_object`](crate::SerializationReader::read_object)
//! produces. Anything outside that set travels as an [`Object`]: a shared handle to
//! a value encoded by a [`TypeSurrogate`](crate::TypeSurrogate) or by its own
//! [`OwnedDataSerializable`] implementation.
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use fast_serializer::{Decimal, Value};
//!
//! let flag = Value::from(true);
//! let count = Value::from(42i32);
//! let text = Value::from("hello");
//! let price = Value::from(Decimal::new(1999, 2).unwrap());
//! let samples = Value::from(vec![1i16, 2, 3]);
//! let missing = Value::from(None::<i32>);
//! assert!(missing.is_null());
//! ```
//!
//! ### Extracting Values
//!
//! ```rust
//! use fast_serializer::Value;
//!
//! let value = Value::from(42u16);
//! assert_eq!(value.as_i64(), Some(42));
//! assert_eq!(u16::try_from(value).unwrap(), 42);
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::rc::Rc;

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::bits::{BitArray, BitVector32};
use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::registry::OwnedDataSerializable;
use crate::time::{DateTime, TimeSpan};

/// A value that can be written with a single type tag.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    /// A database null, kept distinct from [`Value::Null`].
    DbNull,
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Char(char),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    DateTime(DateTime),
    TimeSpan(TimeSpan),
    Guid(Guid),
    String(String),
    BitArray(BitArray),
    BitVector32(BitVector32),
    ByteArray(Vec<u8>),
    SByteArray(Vec<i8>),
    CharArray(Vec<char>),
    BooleanArray(Vec<bool>),
    Int16Array(Vec<i16>),
    UInt16Array(Vec<u16>),
    Int32Array(Vec<i32>),
    UInt32Array(Vec<u32>),
    Int64Array(Vec<i64>),
    UInt64Array(Vec<u64>),
    SingleArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    DecimalArray(Vec<Decimal>),
    DateTimeArray(Vec<DateTime>),
    TimeSpanArray(Vec<TimeSpan>),
    GuidArray(Vec<Guid>),
    StringArray(Vec<Option<String>>),
    /// Heterogeneous elements; runs of nulls are compressed on the wire.
    ObjectArray(Vec<Value>),
    /// An object array whose element type name travels with it.
    TypedObjectArray {
        element_type: String,
        items: Vec<Value>,
    },
    /// Heterogeneous list written element by element.
    ArrayList(Vec<Value>),
    /// Ordered key/value pairs.
    Dictionary(Vec<(Value, Value)>),
    /// A named enumeration and its underlying integer.
    Enum {
        type_name: String,
        value: i64,
    },
    Object(Object),
}

impl Value {
    /// Returns `true` if the value is [`Value::Null`].
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for [`Value::Null`] and [`Value::DbNull`].
    #[inline]
    #[must_use]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::DbNull)
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// If the value is a boolean, returns it.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a string, returns a reference to it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fast_serializer::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::from(42).as_str(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant that fits in `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(i64::from(v)),
            Value::SByte(v) => Some(i64::from(v)),
            Value::Int16(v) => Some(i64::from(v)),
            Value::UInt16(v) => Some(i64::from(v)),
            Value::Int32(v) => Some(i64::from(v)),
            Value::UInt32(v) => Some(i64::from(v)),
            Value::Int64(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any numeric variant, converted to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Single(v) => Some(f64::from(v)),
            Value::Double(v) => Some(v),
            Value::Decimal(v) => Some(v.to_f64()),
            Value::UInt64(v) => Some(v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// The elements of an object array, typed object array or array list.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::ObjectArray(items)
            | Value::ArrayList(items)
            | Value::TypedObjectArray { items, .. } => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Name of the variant, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::DbNull => "DbNull",
            Value::Bool(_) => "Bool",
            Value::Byte(_) => "Byte",
            Value::SByte(_) => "SByte",
            Value::Char(_) => "Char",
            Value::Int16(_) => "Int16",
            Value::UInt16(_) => "UInt16",
            Value::Int32(_) => "Int32",
            Value::UInt32(_) => "UInt32",
            Value::Int64(_) => "Int64",
            Value::UInt64(_) => "UInt64",
            Value::Single(_) => "Single",
            Value::Double(_) => "Double",
            Value::Decimal(_) => "Decimal",
            Value::DateTime(_) => "DateTime",
            Value::TimeSpan(_) => "TimeSpan",
            Value::Guid(_) => "Guid",
            Value::String(_) => "String",
            Value::BitArray(_) => "BitArray",
            Value::BitVector32(_) => "BitVector32",
            Value::ByteArray(_) => "ByteArray",
            Value::SByteArray(_) => "SByteArray",
            Value::CharArray(_) => "CharArray",
            Value::BooleanArray(_) => "BooleanArray",
            Value::Int16Array(_) => "Int16Array",
            Value::UInt16Array(_) => "UInt16Array",
            Value::Int32Array(_) => "Int32Array",
            Value::UInt32Array(_) => "UInt32Array",
            Value::Int64Array(_) => "Int64Array",
            Value::UInt64Array(_) => "UInt64Array",
            Value::SingleArray(_) => "SingleArray",
            Value::DoubleArray(_) => "DoubleArray",
            Value::DecimalArray(_) => "DecimalArray",
            Value::DateTimeArray(_) => "DateTimeArray",
            Value::TimeSpanArray(_) => "TimeSpanArray",
            Value::GuidArray(_) => "GuidArray",
            Value::StringArray(_) => "StringArray",
            Value::ObjectArray(_) => "ObjectArray",
            Value::TypedObjectArray { .. } => "TypedObjectArray",
            Value::ArrayList(_) => "ArrayList",
            Value::Dictionary(_) => "Dictionary",
            Value::Enum { .. } => "Enum",
            Value::Object(_) => "Object",
        }
    }
}

#[derive(Clone)]
enum Repr {
    Owned(Rc<dyn OwnedDataSerializable>),
    Opaque(Rc<dyn Any>),
}

/// A shared handle to a value outside the built-in shapes.
///
/// Cloning an `Object` clones the handle, not the value. Two handles are equal
/// only when they point at the same instance, which is also the identity the
/// object token table uses.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::Object;
///
/// let a = Object::new(String::from("shared"));
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert_ne!(a, Object::new(String::from("shared")));
/// assert_eq!(b.downcast_ref::<String>().map(String::as_str), Some("shared"));
/// ```
#[derive(Clone)]
pub struct Object {
    type_name: Rc<str>,
    repr: Repr,
}

impl Object {
    /// Wraps a value that a registered surrogate knows how to encode.
    pub fn new<T: Any>(value: T) -> Self {
        Object::from_rc(Rc::new(value))
    }

    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Object {
            type_name: Rc::from(type_name::<T>()),
            repr: Repr::Opaque(value),
        }
    }

    /// Wraps a value that encodes itself.
    pub fn owned<T: OwnedDataSerializable>(value: T) -> Self {
        Object::from_owned_rc(Rc::new(value))
    }

    pub fn from_owned_rc<T: OwnedDataSerializable>(value: Rc<T>) -> Self {
        Object {
            type_name: Rc::from(type_name::<T>()),
            repr: Repr::Owned(value),
        }
    }

    pub(crate) fn from_boxed_owned(type_name: &str, value: Box<dyn OwnedDataSerializable>) -> Self {
        Object {
            type_name: Rc::from(type_name),
            repr: Repr::Owned(Rc::from(value)),
        }
    }

    /// The Rust type name captured when the handle was created, or the name read
    /// from the stream for decoded objects.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn as_any(&self) -> &dyn Any {
        match &self.repr {
            Repr::Owned(value) => (**value).as_any(),
            Repr::Opaque(value) => &**value,
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// The owned-data contract, when the value has one.
    #[must_use]
    pub fn as_owned(&self) -> Option<&dyn OwnedDataSerializable> {
        match &self.repr {
            Repr::Owned(value) => Some(&**value),
            Repr::Opaque(_) => None,
        }
    }

    /// True when both handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        self.handle() == other.handle()
    }

    /// Address of the shared instance, stable while any handle is alive.
    #[must_use]
    pub fn handle(&self) -> usize {
        match &self.repr {
            Repr::Owned(value) => Rc::as_ptr(value) as *const () as usize,
            Repr::Opaque(value) => Rc::as_ptr(value) as *const () as usize,
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({} @ {:#x})", self.type_name, self.handle())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        fn seq<S: Serializer, T: Serialize>(
            serializer: S,
            items: &[T],
        ) -> std::result::Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(items.len()))?;
            for item in items {
                seq.serialize_element(item)?;
            }
            seq.end()
        }

        match self {
            Value::Null | Value::DbNull => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Byte(v) => serializer.serialize_u8(*v),
            Value::SByte(v) => serializer.serialize_i8(*v),
            Value::Char(v) => serializer.serialize_char(*v),
            Value::Int16(v) => serializer.serialize_i16(*v),
            Value::UInt16(v) => serializer.serialize_u16(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::UInt32(v) => serializer.serialize_u32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::UInt64(v) => serializer.serialize_u64(*v),
            Value::Single(v) => serializer.serialize_f32(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Decimal(v) => serializer.collect_str(v),
            Value::DateTime(v) => serializer.collect_str(&format_datetime(v)),
            Value::TimeSpan(v) => serializer.serialize_i64(v.ticks()),
            Value::Guid(v) => serializer.collect_str(v),
            Value::String(v) => serializer.serialize_str(v),
            Value::BitArray(v) => seq(serializer, &v.iter().collect::<Vec<_>>()),
            Value::BitVector32(v) => serializer.serialize_u32(v.data()),
            Value::ByteArray(v) => serializer.serialize_bytes(v),
            Value::SByteArray(v) => seq(serializer, v),
            Value::CharArray(v) => seq(serializer, v),
            Value::BooleanArray(v) => seq(serializer, v),
            Value::Int16Array(v) => seq(serializer, v),
            Value::UInt16Array(v) => seq(serializer, v),
            Value::Int32Array(v) => seq(serializer, v),
            Value::UInt32Array(v) => seq(serializer, v),
            Value::Int64Array(v) => seq(serializer, v),
            Value::UInt64Array(v) => seq(serializer, v),
            Value::SingleArray(v) => seq(serializer, v),
            Value::DoubleArray(v) => seq(serializer, v),
            Value::DecimalArray(v) => {
                seq(serializer, &v.iter().map(ToString::to_string).collect::<Vec<_>>())
            }
            Value::DateTimeArray(v) => {
                seq(serializer, &v.iter().map(format_datetime).collect::<Vec<_>>())
            }
            Value::TimeSpanArray(v) => {
                seq(serializer, &v.iter().map(TimeSpan::ticks).collect::<Vec<_>>())
            }
            Value::GuidArray(v) => {
                seq(serializer, &v.iter().map(ToString::to_string).collect::<Vec<_>>())
            }
            Value::StringArray(v) => seq(serializer, v),
            Value::ObjectArray(items)
            | Value::ArrayList(items)
            | Value::TypedObjectArray { items, .. } => seq(serializer, items),
            Value::Dictionary(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Enum { value, .. } => serializer.serialize_i64(*value),
            Value::Object(object) => Err(S::Error::custom(format!(
                "{} has no serde representation",
                object.type_name()
            ))),
        }
    }
}

/// ISO 8601 text for a [`DateTime`], with a `Z` suffix for UTC values.
pub(crate) fn format_datetime(value: &DateTime) -> String {
    let text = value.to_naive().format("%Y-%m-%dT%H:%M:%S%.f").to_string();
    match value.kind() {
        crate::time::DateTimeKind::Utc => text + "Z",
        _ => text,
    }
}

macro_rules! impl_value_conversions {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(value)
                }
            }

            impl TryFrom<Value> for $t {
                type Error = Error;

                fn try_from(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(Error::custom(format!(
                            concat!("expected ", stringify!($variant), ", found {}"),
                            other.kind_name()
                        ))),
                    }
                }
            }
        )*
    };
}

impl_value_conversions! {
    bool => Bool,
    u8 => Byte,
    i8 => SByte,
    char => Char,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    DateTime => DateTime,
    TimeSpan => TimeSpan,
    Guid => Guid,
    String => String,
    BitArray => BitArray,
    BitVector32 => BitVector32,
    Vec<u8> => ByteArray,
    Vec<i8> => SByteArray,
    Vec<char> => CharArray,
    Vec<bool> => BooleanArray,
    Vec<i16> => Int16Array,
    Vec<u16> => UInt16Array,
    Vec<i32> => Int32Array,
    Vec<u32> => UInt32Array,
    Vec<i64> => Int64Array,
    Vec<u64> => UInt64Array,
    Vec<f32> => SingleArray,
    Vec<f64> => DoubleArray,
    Vec<Decimal> => DecimalArray,
    Vec<DateTime> => DateTimeArray,
    Vec<TimeSpan> => TimeSpanArray,
    Vec<Guid> => GuidArray,
    Vec<Option<String>> => StringArray,
    Object => Object,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int32(42));
        assert_eq!(Value::from("test"), Value::String("test".to_string()));
        assert_eq!(Value::from(Some(7u8)), Value::Byte(7));
        assert_eq!(Value::from(None::<u8>), Value::Null);
        assert_eq!(Value::from(vec![1u16, 2]), Value::UInt16Array(vec![1, 2]));
    }

    #[test]
    fn test_tryfrom() {
        assert_eq!(i64::try_from(Value::Int64(-3)).unwrap(), -3);
        let err = i64::try_from(Value::Int32(3)).unwrap_err();
        assert!(err.to_string().contains("expected Int64, found Int32"));
        assert_eq!(String::try_from(Value::from("x")).unwrap(), "x");
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Value::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(Value::SByte(-5).as_i64(), Some(-5));
        assert_eq!(Value::Single(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::from("1").as_f64(), None);
    }

    #[test]
    fn test_object_identity() {
        let shared = Rc::new(5u32);
        let a = Object::from_rc(Rc::clone(&shared));
        let b = Object::from_rc(shared);
        assert_eq!(a, b);
        assert_eq!(a.type_name(), "u32");
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert!(a.as_owned().is_none());
        assert_eq!(Value::Object(a.clone()), Value::Object(b));
        assert_ne!(Value::Object(a), Value::Object(Object::new(5u32)));
    }

    #[test]
    fn test_const_is_methods() {
        const fn check_null(v: &Value) -> bool {
            v.is_null()
        }
        assert!(check_null(&Value::Null));
        assert!(!check_null(&Value::DbNull));
        assert!(Value::DbNull.is_nullish());
    }
}
