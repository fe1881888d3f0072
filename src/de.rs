//! Serde deserialization from the binary format.
//!
//! [`Deserializer`] reads one object from a [`SerializationReader`] and hands it to
//! a [`ValueDeserializer`], which drives serde visitors over the decoded
//! [`Value`] tree. The mapping is the inverse of the one in [`crate::ser`]:
//!
//! - every integer width is offered to the visitor at its own width, so serde's
//!   range-checked conversions apply when the target type differs
//! - `Null` and `DBNull` read as `None` or `()`
//! - typed arrays, object arrays and array lists read as sequences
//! - dictionaries read as maps or structs
//! - decimals and GUIDs read as their text form, date-times as ISO 8601 text,
//!   time spans as a tick count
//! - enums read from a variant name or from a one-entry dictionary keyed by the
//!   variant name
//!
//! ```rust
//! use fast_serializer::{from_bytes, to_bytes};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! enum Message {
//!     Ping,
//!     Move { x: i64, y: i64 },
//! }
//!
//! let bytes = to_bytes(&Message::Move { x: -3, y: 9 }).unwrap();
//! let message: Message = from_bytes(&bytes).unwrap();
//! assert_eq!(message, Message::Move { x: -3, y: 9 });
//! ```

use serde::de::{self, IntoDeserializer};
use serde::forward_to_deserialize_any;

use crate::error::{Error, Result};
use crate::reader::SerializationReader;
use crate::value::{format_datetime, Value};

/// Reads serde values from a [`SerializationReader`], one object per value.
pub struct Deserializer<'r, 'a> {
    reader: &'r mut SerializationReader<'a>,
}

impl<'r, 'a> Deserializer<'r, 'a> {
    pub fn new(reader: &'r mut SerializationReader<'a>) -> Self {
        Deserializer { reader }
    }

    fn next_value(self) -> Result<ValueDeserializer> {
        Ok(ValueDeserializer::new(self.reader.read_object()?))
    }
}

macro_rules! forward_to_value {
    ($($method:ident)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                de::Deserializer::$method(self.next_value()?, visitor)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Deserializer<'_, '_> {
    type Error = Error;

    forward_to_value! {
        deserialize_any deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32
        deserialize_i64 deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_option deserialize_unit
        deserialize_seq deserialize_map deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_unit_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_unit_struct(self.next_value()?, name, visitor)
    }

    fn deserialize_newtype_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_newtype_struct(self.next_value()?, name, visitor)
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple(self.next_value()?, len, visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple_struct(self.next_value()?, name, len, visitor)
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(self.next_value()?, name, fields, visitor)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_enum(self.next_value()?, name, variants, visitor)
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    iter: std::vec::IntoIter<(Value, Value)>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(entries: Vec<(Value, Value)>) -> Self {
        MapDeserializer {
            iter: entries.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(Value::String(self.variant)))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Some(Value::Null) | None => Ok(()),
            Some(other) => Err(Error::custom(format!(
                "expected unit variant, found {}",
                other.kind_name()
            ))),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("expected newtype variant, found unit variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(value) if value.as_items().is_some() => {
                de::Deserializer::deserialize_seq(ValueDeserializer::new(value), visitor)
            }
            _ => Err(Error::custom("expected tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Dictionary(entries)) => visitor.visit_map(MapDeserializer::new(entries)),
            _ => Err(Error::custom("expected struct variant")),
        }
    }
}

/// Drives serde visitors over an owned [`Value`].
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

fn into_seq<T: Into<Value>>(items: Vec<T>) -> SeqDeserializer {
    SeqDeserializer::new(items.into_iter().map(Into::into).collect())
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null | Value::DbNull => visitor.visit_unit(),
            Value::Bool(v) => visitor.visit_bool(v),
            Value::Byte(v) => visitor.visit_u8(v),
            Value::SByte(v) => visitor.visit_i8(v),
            Value::Char(v) => visitor.visit_char(v),
            Value::Int16(v) => visitor.visit_i16(v),
            Value::UInt16(v) => visitor.visit_u16(v),
            Value::Int32(v) => visitor.visit_i32(v),
            Value::UInt32(v) => visitor.visit_u32(v),
            Value::Int64(v) => visitor.visit_i64(v),
            Value::UInt64(v) => visitor.visit_u64(v),
            Value::Single(v) => visitor.visit_f32(v),
            Value::Double(v) => visitor.visit_f64(v),
            Value::Decimal(v) => visitor.visit_string(v.to_string()),
            Value::DateTime(v) => visitor.visit_string(format_datetime(&v)),
            Value::TimeSpan(v) => visitor.visit_i64(v.ticks()),
            Value::Guid(v) => visitor.visit_string(v.to_string()),
            Value::String(v) => visitor.visit_string(v),
            Value::BitArray(v) => visitor.visit_seq(into_seq(v.iter().collect())),
            Value::BitVector32(v) => visitor.visit_u32(v.data()),
            Value::ByteArray(v) => visitor.visit_seq(into_seq(v)),
            Value::SByteArray(v) => visitor.visit_seq(into_seq(v)),
            Value::CharArray(v) => visitor.visit_seq(into_seq(v)),
            Value::BooleanArray(v) => visitor.visit_seq(into_seq(v)),
            Value::Int16Array(v) => visitor.visit_seq(into_seq(v)),
            Value::UInt16Array(v) => visitor.visit_seq(into_seq(v)),
            Value::Int32Array(v) => visitor.visit_seq(into_seq(v)),
            Value::UInt32Array(v) => visitor.visit_seq(into_seq(v)),
            Value::Int64Array(v) => visitor.visit_seq(into_seq(v)),
            Value::UInt64Array(v) => visitor.visit_seq(into_seq(v)),
            Value::SingleArray(v) => visitor.visit_seq(into_seq(v)),
            Value::DoubleArray(v) => visitor.visit_seq(into_seq(v)),
            Value::DecimalArray(v) => visitor.visit_seq(into_seq(v)),
            Value::DateTimeArray(v) => visitor.visit_seq(into_seq(v)),
            Value::TimeSpanArray(v) => visitor.visit_seq(into_seq(v)),
            Value::GuidArray(v) => visitor.visit_seq(into_seq(v)),
            Value::StringArray(v) => visitor.visit_seq(into_seq(v)),
            Value::ObjectArray(items)
            | Value::ArrayList(items)
            | Value::TypedObjectArray { items, .. } => visitor.visit_seq(SeqDeserializer::new(items)),
            Value::Dictionary(entries) => visitor.visit_map(MapDeserializer::new(entries)),
            Value::Enum { value, .. } => visitor.visit_i64(value),
            Value::Object(object) => Err(Error::custom(format!(
                "cannot deserialize a {} instance through serde",
                object.type_name()
            ))),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        if self.value.is_nullish() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::ByteArray(bytes) => visitor.visit_byte_buf(bytes),
            other => de::Deserializer::deserialize_any(ValueDeserializer::new(other), visitor),
        }
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_bytes(self, visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(variant) => visitor.visit_enum(variant.into_deserializer()),
            Value::Dictionary(entries) if entries.len() == 1 => {
                let mut entries = entries.into_iter();
                let Some((Value::String(variant), value)) = entries.next() else {
                    return Err(Error::custom("enum variant key must be a string"));
                };
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value: Some(value),
                })
            }
            other => Err(Error::custom(format!(
                "expected enum as string or single-entry dictionary, found {}",
                other.kind_name()
            ))),
        }
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> ValueDeserializer {
        ValueDeserializer::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use serde::Deserialize;
    use std::collections::HashMap;

    fn from_value<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
        T::deserialize(ValueDeserializer::new(value))
    }

    #[test]
    fn test_integer_widening() {
        let n: i64 = from_value(Value::Int16(-7)).unwrap();
        assert_eq!(n, -7);
        let n: u8 = from_value(Value::UInt64(200)).unwrap();
        assert_eq!(n, 200);
        assert!(from_value::<u8>(Value::Int32(300)).is_err());
        assert!(from_value::<u32>(Value::Int32(-1)).is_err());
    }

    #[test]
    fn test_typed_arrays_as_sequences() {
        let v: Vec<i32> = from_value(Value::Int32Array(vec![1, 2, 3])).unwrap();
        assert_eq!(v, [1, 2, 3]);
        let v: Vec<Option<String>> =
            from_value(Value::StringArray(vec![Some("a".into()), None])).unwrap();
        assert_eq!(v, [Some("a".to_string()), None]);
        let v: Vec<u8> = from_value(Value::ByteArray(vec![9, 8])).unwrap();
        assert_eq!(v, [9, 8]);
    }

    #[test]
    fn test_dictionary_as_map_and_option() {
        let value = Value::Dictionary(vec![
            (Value::from("a"), Value::Int32(1)),
            (Value::from("b"), Value::DbNull),
        ]);
        let map: HashMap<String, Option<i32>> = from_value(value).unwrap();
        assert_eq!(map["a"], Some(1));
        assert_eq!(map["b"], None);
    }

    #[test]
    fn test_decimal_as_text() {
        let d = Decimal::new(12345, 2).unwrap();
        let s: String = from_value(Value::Decimal(d)).unwrap();
        assert_eq!(s, "123.45");
    }

    #[test]
    fn test_enum_shapes() {
        #[derive(Deserialize, Debug, PartialEq)]
        enum E {
            A,
            B(u8),
            C(i32, i32),
        }

        assert_eq!(from_value::<E>(Value::from("A")).unwrap(), E::A);
        let b = Value::Dictionary(vec![(Value::from("B"), Value::Byte(4))]);
        assert_eq!(from_value::<E>(b).unwrap(), E::B(4));
        let c = Value::Dictionary(vec![(
            Value::from("C"),
            Value::ArrayList(vec![Value::Int32(1), Value::Int32(2)]),
        )]);
        assert_eq!(from_value::<E>(c).unwrap(), E::C(1, 2));
        assert!(from_value::<E>(Value::Int32(0)).is_err());
    }
}
