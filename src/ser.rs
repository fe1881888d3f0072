//! Serde serialization into the binary format.
//!
//! This module provides two serializers:
//!
//! - [`Serializer`] streams a value straight into a [`SerializationWriter`]
//! - [`ValueSerializer`] builds a [`Value`] tree, used by [`to_value`](crate::to_value)
//!   and for sequences and maps whose length is not known up front
//!
//! ## Mapping
//!
//! | serde data model            | written as                                      |
//! |-----------------------------|-------------------------------------------------|
//! | bool, integers, floats, char | the matching primitive tag                     |
//! | string                      | string tags, through the string token table     |
//! | bytes                       | `ByteArray`                                     |
//! | none, unit, unit struct     | `Null`                                          |
//! | unit variant                | the variant name as a string                    |
//! | seq, tuple, tuple struct    | `ArrayList`                                     |
//! | map, struct                 | `Dictionary`; struct field names are strings    |
//! | newtype/tuple/struct variant | a one-entry `Dictionary` keyed by the variant  |
//!
//! Because struct field names go through the string token table, a field name is
//! written in full once per stream and as a short back-reference afterwards.
//!
//! ## Usage
//!
//! ```rust
//! use fast_serializer::{to_bytes, from_bytes};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Point { x: i32, y: i32 }
//!
//! let points = vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }];
//! let bytes = to_bytes(&points).unwrap();
//! let decoded: Vec<Point> = from_bytes(&bytes).unwrap();
//! assert_eq!(decoded, points);
//! ```

use serde::{ser, Serialize};

use crate::error::{Error, Result};
use crate::tags::SerializedType;
use crate::value::Value;
use crate::writer::SerializationWriter;

/// Streams serde values into a [`SerializationWriter`], one object per value.
pub struct Serializer<'s, 'a> {
    writer: &'s mut SerializationWriter<'a>,
}

impl<'s, 'a> Serializer<'s, 'a> {
    pub fn new(writer: &'s mut SerializationWriter<'a>) -> Self {
        Serializer { writer }
    }

    fn primitive(self, value: Value) -> Result<()> {
        self.writer.write_object(&value)
    }

    // Opens a one-entry dictionary keyed by the variant name.
    fn begin_variant(&mut self, variant: &str) -> Result<()> {
        self.writer.write_tag(SerializedType::Dictionary)?;
        self.writer.write_count(1)?;
        self.writer.write_string_object(variant)
    }
}

impl<'s, 'a> ser::Serializer for Serializer<'s, 'a> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = SeqSerializer<'s, 'a>;
    type SerializeTuple = SeqSerializer<'s, 'a>;
    type SerializeTupleStruct = SeqSerializer<'s, 'a>;
    type SerializeTupleVariant = SeqSerializer<'s, 'a>;
    type SerializeMap = MapSerializer<'s, 'a>;
    type SerializeStruct = MapSerializer<'s, 'a>;
    type SerializeStructVariant = MapSerializer<'s, 'a>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.primitive(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.primitive(Value::SByte(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.primitive(Value::Int16(v))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.primitive(Value::Int32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.primitive(Value::Int64(v))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.primitive(Value::Byte(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.primitive(Value::UInt16(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.primitive(Value::UInt32(v))
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.primitive(Value::UInt64(v))
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.primitive(Value::Single(v))
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.primitive(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.primitive(Value::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.writer.write_string_object(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.writer.write_tag(SerializedType::ByteArray)?;
        self.writer.write_typed_array(Some(v))
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.writer.write_tag(SerializedType::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        mut self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.begin_variant(variant)?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        SeqSerializer::begin(self.writer, len)
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        mut self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.begin_variant(variant)?;
        self.serialize_seq(Some(len))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        MapSerializer::begin(self.writer, len)
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        mut self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.begin_variant(variant)?;
        self.serialize_map(Some(len))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Sequence state: streamed when the length is known, buffered otherwise.
pub struct SeqSerializer<'s, 'a> {
    writer: &'s mut SerializationWriter<'a>,
    expected: Option<usize>,
    written: usize,
    buffered: Vec<Value>,
}

impl<'s, 'a> SeqSerializer<'s, 'a> {
    fn begin(writer: &'s mut SerializationWriter<'a>, len: Option<usize>) -> Result<Self> {
        if let Some(len) = len {
            writer.write_tag(SerializedType::ArrayList)?;
            writer.write_count(len)?;
        }
        Ok(SeqSerializer {
            writer,
            expected: len,
            written: 0,
            buffered: Vec::new(),
        })
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        match self.expected {
            Some(_) => value.serialize(Serializer::new(&mut *self.writer))?,
            None => self.buffered.push(value.serialize(ValueSerializer)?),
        }
        self.written += 1;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self.expected {
            Some(expected) if expected != self.written => Err(Error::custom(format!(
                "sequence declared {expected} elements but produced {}",
                self.written
            ))),
            Some(_) => Ok(()),
            None => self.writer.write_object(&Value::ArrayList(self.buffered)),
        }
    }
}

impl ser::SerializeSeq for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for SeqSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Map and struct state: streamed when the length is known, buffered otherwise.
pub struct MapSerializer<'s, 'a> {
    writer: &'s mut SerializationWriter<'a>,
    expected: Option<usize>,
    written: usize,
    buffered: Vec<(Value, Value)>,
    pending_key: Option<Value>,
}

impl<'s, 'a> MapSerializer<'s, 'a> {
    fn begin(writer: &'s mut SerializationWriter<'a>, len: Option<usize>) -> Result<Self> {
        if let Some(len) = len {
            writer.write_tag(SerializedType::Dictionary)?;
            writer.write_count(len)?;
        }
        Ok(MapSerializer {
            writer,
            expected: len,
            written: 0,
            buffered: Vec::new(),
            pending_key: None,
        })
    }

    fn finish(self) -> Result<()> {
        match self.expected {
            Some(expected) if expected != self.written => Err(Error::custom(format!(
                "map declared {expected} entries but produced {}",
                self.written
            ))),
            Some(_) => Ok(()),
            None => self.writer.write_object(&Value::Dictionary(self.buffered)),
        }
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.writer.write_string_object(key)?;
        value.serialize(Serializer::new(&mut *self.writer))?;
        self.written += 1;
        Ok(())
    }
}

impl ser::SerializeMap for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match self.expected {
            Some(_) => key.serialize(Serializer::new(&mut *self.writer)),
            None => {
                self.pending_key = Some(key.serialize(ValueSerializer)?);
                Ok(())
            }
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match self.expected {
            Some(_) => value.serialize(Serializer::new(&mut *self.writer))?,
            None => {
                let key = self
                    .pending_key
                    .take()
                    .ok_or_else(|| Error::custom("serialize_value called before serialize_key"))?;
                self.buffered.push((key, value.serialize(ValueSerializer)?));
            }
        }
        self.written += 1;
        Ok(())
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStruct for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for MapSerializer<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

/// Converts serde values into [`Value`] trees with the same mapping as
/// [`Serializer`].
pub struct ValueSerializer;

/// Collects sequence elements, optionally wrapped in a variant.
pub struct SerializeVec {
    items: Vec<Value>,
    variant: Option<&'static str>,
}

/// Collects map entries, optionally wrapped in a variant.
pub struct SerializeMap {
    entries: Vec<(Value, Value)>,
    pending_key: Option<Value>,
    variant: Option<&'static str>,
}

fn wrap_variant(variant: Option<&'static str>, value: Value) -> Value {
    match variant {
        Some(name) => Value::Dictionary(vec![(Value::String(name.to_string()), value)]),
        None => value,
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVec;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeMap;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Ok(Value::SByte(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Ok(Value::Int16(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Ok(Value::Int32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int64(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Ok(Value::Byte(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Ok(Value::UInt16(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Ok(Value::UInt32(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::UInt64(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Ok(Value::Single(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::ByteArray(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        Ok(wrap_variant(Some(variant), value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or(0)),
            variant: None,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len),
            variant: Some(variant),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(SerializeMap {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
            variant: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(SerializeMap {
            entries: Vec::with_capacity(len),
            pending_key: None,
            variant: Some(variant),
        })
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(wrap_variant(self.variant, Value::ArrayList(self.items)))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleVariant for SerializeVec {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.pending_key = Some(key.serialize(ValueSerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called before serialize_key"))?;
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(wrap_variant(self.variant, Value::Dictionary(self.entries)))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.entries
            .push((Value::String(key.to_string()), value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn end(self) -> Result<Value> {
        ser::SerializeMap::end(self)
    }
}

impl ser::SerializeStructVariant for SerializeMap {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Result<Value> {
        ser::SerializeMap::end(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SerializationReader;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    enum Shape {
        Unit,
        Circle(f64),
        Rect { w: u16, h: u16 },
    }

    fn stream_then_read<T: Serialize>(value: &T) -> Value {
        let mut writer = SerializationWriter::new();
        value.serialize(Serializer::new(&mut writer)).unwrap();
        let bytes = writer.finish().unwrap();
        let value = SerializationReader::new(&bytes).unwrap().read_object().unwrap();
        value
    }

    #[test]
    fn test_streamed_matches_value_tree() {
        let mut map = BTreeMap::new();
        map.insert("a", vec![Some(1u8), None]);
        map.insert("b", vec![]);
        let shapes = vec![Shape::Unit, Shape::Circle(0.5), Shape::Rect { w: 2, h: 3 }];

        assert_eq!(stream_then_read(&map), map.serialize(ValueSerializer).unwrap());
        assert_eq!(stream_then_read(&shapes), shapes.serialize(ValueSerializer).unwrap());
    }

    #[test]
    fn test_variant_layout() {
        let value = Shape::Rect { w: 2, h: 3 }.serialize(ValueSerializer).unwrap();
        assert_eq!(
            value,
            Value::Dictionary(vec![(
                Value::from("Rect"),
                Value::Dictionary(vec![
                    (Value::from("w"), Value::UInt16(2)),
                    (Value::from("h"), Value::UInt16(3)),
                ])
            )])
        );
        assert_eq!(Shape::Unit.serialize(ValueSerializer).unwrap(), Value::from("Unit"));
    }

    #[test]
    fn test_unknown_length_sequence_is_buffered() {
        struct Unsized(Vec<i32>);

        impl Serialize for Unsized {
            fn serialize<S: ser::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                use ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(None)?;
                for item in &self.0 {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }

        let value = stream_then_read(&Unsized(vec![7, 8]));
        assert_eq!(value, Value::ArrayList(vec![Value::Int32(7), Value::Int32(8)]));
    }
}
