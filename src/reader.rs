//! The decode side: [`SerializationReader`].
//!
//! Every `read_*` method mirrors the `write_*` method of the same name on
//! [`SerializationWriter`](crate::SerializationWriter). The reader replays the
//! writer's token table growth, so calls must be made in the order the writer made
//! them.

use std::any::Any;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::bits::{byte_len, BitArray, BitVector32};
use crate::decimal::{self, Decimal};
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::header::Header;
use crate::options::{HeaderKind, ReaderOptions};
use crate::primitive::{Optimizable, Primitive, MAX_PREALLOC};
use crate::registry::{OwnedDataSerializable, TypeRegistry};
use crate::tags::{ArrayShape, SerializedType, StringCode, TokenCode};
use crate::time::{self, DateTime, TimeSpan};
use crate::value::{Object, Value};
use crate::varint::{self, ByteRead};

/// Nesting depth at which [`SerializationReader::read_object`] gives up.
const MAX_DEPTH: usize = 100;

enum Input<'a> {
    Slice(&'a [u8]),
    Stream(Box<dyn Read + 'a>),
}

/// Decodes values written by a [`SerializationWriter`](crate::SerializationWriter).
pub struct SerializationReader<'a> {
    input: Input<'a>,
    position: u64,
    end: Option<u64>,
    header: Header,
    table_sizes: (usize, usize),
    strings: Vec<String>,
    objects: Vec<Object>,
    registry: Arc<TypeRegistry>,
    depth: usize,
}

impl fmt::Debug for SerializationReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationReader")
            .field("position", &self.position)
            .field("end", &self.end)
            .field("header", &self.header)
            .field("table_sizes", &self.table_sizes)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl<'a> SerializationReader<'a> {
    /// Creates a reader over bytes that start with a full header.
    ///
    /// # Errors
    ///
    /// Fails when the header is missing, malformed, or claims more bytes than `data`
    /// holds.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Self::with_options(data, ReaderOptions::default())
    }

    /// Creates a reader over bytes with the given header layout and registry.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_options(data: &'a [u8], options: ReaderOptions) -> Result<Self> {
        let mut reader = Self::unstarted(Input::Slice(data), Some(data.len() as u64), &options);
        reader.start(options)?;
        if let Some(total) = reader.header.total_length {
            if total > data.len() as u64 {
                return Err(Error::truncated(
                    data.len() as u64,
                    usize::try_from(total - data.len() as u64).unwrap_or(usize::MAX),
                ));
            }
        }
        Ok(reader)
    }

    /// Creates a reader over a stream, consuming the header immediately.
    ///
    /// # Errors
    ///
    /// Fails when the header cannot be read.
    pub fn from_stream<R: Read + 'a>(stream: R, options: ReaderOptions) -> Result<Self> {
        let mut reader = Self::unstarted(Input::Stream(Box::new(stream)), None, &options);
        reader.start(options)?;
        Ok(reader)
    }

    fn unstarted(input: Input<'a>, end: Option<u64>, options: &ReaderOptions) -> Self {
        SerializationReader {
            input,
            position: 0,
            end,
            header: Header::default(),
            table_sizes: (0, 0),
            strings: Vec::new(),
            objects: Vec::new(),
            registry: Arc::clone(&options.registry),
            depth: 0,
        }
    }

    fn start(&mut self, options: ReaderOptions) -> Result<()> {
        let header = Header::read(self, options.header)?;
        if let Some(total) = header.total_length {
            if total < HeaderKind::Full.size() as u64 {
                return Err(Error::corrupt(0, format!("header length {total} is shorter than the header")));
            }
            self.end = Some(self.end.map_or(total, |end| end.min(total)));
        }
        let sizes = options
            .table_sizes
            .unwrap_or((header.string_table_size, header.object_table_size));
        debug!(
            "header read: length {:?}, {} strings, {} objects",
            header.total_length, sizes.0, sizes.1
        );
        self.strings = Vec::with_capacity(sizes.0.min(MAX_PREALLOC));
        self.objects = Vec::with_capacity(sizes.1.min(MAX_PREALLOC));
        self.header = header;
        self.table_sizes = sizes;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The token table sizes in effect: explicit sizes from the options, else the
    /// header's.
    #[inline]
    #[must_use]
    pub fn table_sizes(&self) -> (usize, usize) {
        self.table_sizes
    }

    /// Bytes consumed so far, header included.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Unread bytes before the end of the data, or `None` for a stream whose length
    /// is unknown.
    #[must_use]
    pub fn bytes_remaining(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.position))
    }

    #[inline]
    #[must_use]
    pub fn string_token_table_size(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    #[must_use]
    pub fn object_token_table_size(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    fn check_available(&self, needed: usize) -> Result<()> {
        match self.end {
            Some(end) if self.position + needed as u64 > end => Err(Error::truncated(
                self.position,
                usize::try_from(self.position + needed as u64 - end).unwrap_or(usize::MAX),
            )),
            _ => Ok(()),
        }
    }

    fn read_tag(&mut self) -> Result<SerializedType> {
        let start = self.position;
        let byte = self.next_byte()?;
        SerializedType::try_from(byte).map_err(|b| Error::corrupt(start, format!("unknown type tag {b}")))
    }

    fn read_shape(&mut self) -> Result<ArrayShape> {
        let start = self.position;
        let byte = self.next_byte()?;
        ArrayShape::try_from(byte).map_err(|b| Error::corrupt(start, format!("unknown array shape {b}")))
    }

    /// Reads a length or index written as an optimized `u32`.
    pub(crate) fn read_count(&mut self) -> Result<usize> {
        Ok(varint::read_u32(self)? as usize)
    }

    // ----- raw forms -----

    pub fn read_bool(&mut self) -> Result<bool> {
        bool::read_raw(self)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.next_byte()
    }

    pub fn read_sbyte(&mut self) -> Result<i8> {
        i8::read_raw(self)
    }

    pub fn read_char(&mut self) -> Result<char> {
        char::read_raw(self)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        i16::read_raw(self)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        u16::read_raw(self)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        i32::read_raw(self)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        u32::read_raw(self)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        i64::read_raw(self)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        u64::read_raw(self)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        f32::read_raw(self)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        f64::read_raw(self)
    }

    pub fn read_decimal(&mut self) -> Result<Decimal> {
        Decimal::read_raw(self)
    }

    pub fn read_datetime(&mut self) -> Result<DateTime> {
        DateTime::read_raw(self)
    }

    pub fn read_timespan(&mut self) -> Result<TimeSpan> {
        TimeSpan::read_raw(self)
    }

    pub fn read_guid(&mut self) -> Result<Guid> {
        Guid::read_raw(self)
    }

    pub fn read_bit_vector32(&mut self) -> Result<BitVector32> {
        Ok(BitVector32::new(self.read_u32()?))
    }

    /// Reads `len` bytes written with
    /// [`write_raw_bytes`](crate::SerializationWriter::write_raw_bytes).
    pub fn read_raw_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.check_available(len)?;
        self.read_vec(len)
    }

    pub fn read_string_direct(&mut self) -> Result<String> {
        let len = self.read_count()?;
        let start = self.position;
        let bytes = self.read_raw_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| Error::corrupt(start, e))
    }

    // ----- optimized forms -----

    pub fn read_optimized_i16(&mut self) -> Result<i16> {
        varint::read_i16(self)
    }

    pub fn read_optimized_u16(&mut self) -> Result<u16> {
        varint::read_u16(self)
    }

    pub fn read_optimized_i32(&mut self) -> Result<i32> {
        varint::read_i32(self)
    }

    pub fn read_optimized_u32(&mut self) -> Result<u32> {
        varint::read_u32(self)
    }

    pub fn read_optimized_i64(&mut self) -> Result<i64> {
        varint::read_i64(self)
    }

    pub fn read_optimized_u64(&mut self) -> Result<u64> {
        varint::read_u64(self)
    }

    pub fn read_optimized_decimal(&mut self) -> Result<Decimal> {
        decimal::read_optimized(self)
    }

    pub fn read_optimized_datetime(&mut self) -> Result<DateTime> {
        time::read_optimized_datetime(self)
    }

    pub fn read_optimized_timespan(&mut self) -> Result<TimeSpan> {
        time::read_optimized_timespan(self)
    }

    pub fn read_optimized_bit_vector32(&mut self) -> Result<BitVector32> {
        Ok(BitVector32::new(self.read_optimized_u32()?))
    }

    pub fn read_bit_array(&mut self) -> Result<BitArray> {
        let len = self.read_count()?;
        let start = self.position;
        let bytes = self.read_raw_bytes(byte_len(len))?;
        BitArray::from_bytes(len, bytes).ok_or_else(|| Error::corrupt(start, "bit array length mismatch"))
    }

    /// Reads a string written with
    /// [`write_optimized_string`](crate::SerializationWriter::write_optimized_string).
    pub fn read_optimized_string(&mut self) -> Result<Option<String>> {
        let start = self.position;
        let byte = self.next_byte()?;
        let code = StringCode::try_from(byte)
            .map_err(|b| Error::corrupt(start, format!("unknown string code {b}")))?;
        match code {
            StringCode::Null => Ok(None),
            StringCode::Empty => Ok(Some(String::new())),
            StringCode::New => {
                let value = self.read_string_direct()?;
                self.strings.push(value.clone());
                Ok(Some(value))
            }
            StringCode::Duplicate => self.string_token(start).map(Some),
        }
    }

    fn string_token(&mut self, start: u64) -> Result<String> {
        let index = self.read_count()?;
        self.strings.get(index).cloned().ok_or_else(|| {
            Error::corrupt(
                start,
                format!("string token {index} out of range ({} known)", self.strings.len()),
            )
        })
    }

    /// Reads a string written with [`write_str`](crate::SerializationWriter::write_str).
    ///
    /// # Errors
    ///
    /// [`Error::CorruptStream`] when the stream holds a null string.
    pub fn read_str(&mut self) -> Result<String> {
        let start = self.position;
        self.read_optimized_string()?
            .ok_or_else(|| Error::corrupt(start, "unexpected null string"))
    }

    pub fn read_type_name(&mut self) -> Result<String> {
        self.read_str()
    }

    // ----- nullable -----

    pub fn read_nullable<T: Primitive>(&mut self) -> Result<Option<T>> {
        if self.read_presence()? {
            T::read_raw(self).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_nullable_optimized<T: Optimizable>(&mut self) -> Result<Option<T>> {
        if self.read_presence()? {
            T::read_optimized(self).map(Some)
        } else {
            Ok(None)
        }
    }

    fn read_presence(&mut self) -> Result<bool> {
        let start = self.position;
        match self.next_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::corrupt(start, format!("invalid presence flag {other}"))),
        }
    }

    // ----- arrays -----

    /// Reads an array written with
    /// [`write_typed_array`](crate::SerializationWriter::write_typed_array).
    ///
    /// # Errors
    ///
    /// [`Error::CorruptStream`] when the shape byte is not `Null` or `Raw`.
    pub fn read_typed_array<T: Primitive>(&mut self) -> Result<Option<Vec<T>>> {
        let start = self.position;
        match self.read_shape()? {
            ArrayShape::Null => Ok(None),
            ArrayShape::Raw => {
                let count = self.read_count()?;
                T::read_block(self, count).map(Some)
            }
            shape => Err(Error::corrupt(
                start,
                format!("{} shape is not valid for a raw array", shape.name()),
            )),
        }
    }

    /// Reads an array written with
    /// [`write_optimized_typed_array`](crate::SerializationWriter::write_optimized_typed_array).
    /// The shape byte alone decides how the elements are laid out.
    pub fn read_optimized_typed_array<T: Optimizable>(&mut self) -> Result<Option<Vec<T>>> {
        let shape = self.read_shape()?;
        let count = match shape {
            ArrayShape::Null => return Ok(None),
            _ => self.read_count()?,
        };
        trace!("reading {} array of {count} elements", shape.name());
        let items = match shape {
            ArrayShape::Null | ArrayShape::Raw => T::read_block(self, count)?,
            ArrayShape::Optimized => {
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
                for _ in 0..count {
                    items.push(T::read_optimized(self)?);
                }
                items
            }
            ArrayShape::Partial => {
                let flags = self.read_raw_bytes(byte_len(count))?;
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
                for i in 0..count {
                    let item = if flags[i / 8] & (1 << (i % 8)) != 0 {
                        T::read_optimized(self)?
                    } else {
                        T::read_raw(self)?
                    };
                    items.push(item);
                }
                items
            }
        };
        Ok(Some(items))
    }

    pub fn read_string_array(&mut self) -> Result<Option<Vec<Option<String>>>> {
        let start = self.position;
        match self.read_shape()? {
            ArrayShape::Null => Ok(None),
            ArrayShape::Raw => {
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
                for _ in 0..count {
                    items.push(self.read_optimized_string()?);
                }
                Ok(Some(items))
            }
            shape => Err(Error::corrupt(
                start,
                format!("{} shape is not valid for a string array", shape.name()),
            )),
        }
    }

    pub fn read_object_array(&mut self) -> Result<Option<Vec<Value>>> {
        let start = self.position;
        match self.read_shape()? {
            ArrayShape::Null => Ok(None),
            ArrayShape::Raw => self.read_optimized_object_array().map(Some),
            shape => Err(Error::corrupt(
                start,
                format!("{} shape is not valid for an object array", shape.name()),
            )),
        }
    }

    /// Reads an element count and the elements, expanding null and DBNull runs.
    pub fn read_optimized_object_array(&mut self) -> Result<Vec<Value>> {
        let count = self.read_count()?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        while items.len() < count {
            let start = self.position;
            match self.read_tag()? {
                tag @ (SerializedType::NullSequence | SerializedType::DbNullSequence) => {
                    let run = self.read_count()?;
                    if run == 0 || run > count - items.len() {
                        return Err(Error::corrupt(
                            start,
                            format!("{} run of {run} overflows the array", tag.name()),
                        ));
                    }
                    let fill = if tag == SerializedType::NullSequence {
                        Value::Null
                    } else {
                        Value::DbNull
                    };
                    items.resize(items.len() + run, fill);
                }
                tag => items.push(self.read_object_with_tag(tag)?),
            }
        }
        Ok(items)
    }

    // ----- objects -----

    /// Reads one value written with
    /// [`write_object`](crate::SerializationWriter::write_object).
    pub fn read_object(&mut self) -> Result<Value> {
        let tag = self.read_tag()?;
        self.read_object_with_tag(tag)
    }

    /// Reads the payload of a value whose tag has already been consumed.
    pub fn read_object_with_tag(&mut self, tag: SerializedType) -> Result<Value> {
        let start = self.position;
        if self.depth >= MAX_DEPTH {
            return Err(Error::corrupt(start, format!("nesting deeper than {MAX_DEPTH}")));
        }
        self.depth += 1;
        let result = self.read_payload(tag, start);
        self.depth -= 1;
        result
    }

    fn read_payload(&mut self, tag: SerializedType, start: u64) -> Result<Value> {
        use SerializedType as T;

        Ok(match tag {
            T::Null => Value::Null,
            T::DbNull => Value::DbNull,
            T::BooleanTrue => Value::Bool(true),
            T::BooleanFalse => Value::Bool(false),

            T::Byte => Value::Byte(self.read_byte()?),
            T::ZeroByte => Value::Byte(0),
            T::OneByte => Value::Byte(1),
            T::SByte => Value::SByte(self.read_sbyte()?),
            T::ZeroSByte => Value::SByte(0),
            T::OneSByte => Value::SByte(1),
            T::Char => Value::Char(self.read_char()?),
            T::ZeroChar => Value::Char('\0'),
            T::OneChar => Value::Char('\u{1}'),

            T::Int16 => Value::Int16(self.read_i16()?),
            T::ZeroInt16 => Value::Int16(0),
            T::OneInt16 => Value::Int16(1),
            T::MinusOneInt16 => Value::Int16(-1),
            T::OptimizedInt16 => Value::Int16(self.read_optimized_i16()?),
            // Negative payloads hold -(v + 1), which is the bitwise complement.
            T::OptimizedInt16Negative => Value::Int16(!self.read_optimized_i16()?),
            T::UInt16 => Value::UInt16(self.read_u16()?),
            T::ZeroUInt16 => Value::UInt16(0),
            T::OneUInt16 => Value::UInt16(1),
            T::OptimizedUInt16 => Value::UInt16(self.read_optimized_u16()?),

            T::Int32 => Value::Int32(self.read_i32()?),
            T::ZeroInt32 => Value::Int32(0),
            T::OneInt32 => Value::Int32(1),
            T::MinusOneInt32 => Value::Int32(-1),
            T::OptimizedInt32 => Value::Int32(self.read_optimized_i32()?),
            T::OptimizedInt32Negative => Value::Int32(!self.read_optimized_i32()?),
            T::UInt32 => Value::UInt32(self.read_u32()?),
            T::ZeroUInt32 => Value::UInt32(0),
            T::OneUInt32 => Value::UInt32(1),
            T::OptimizedUInt32 => Value::UInt32(self.read_optimized_u32()?),

            T::Int64 => Value::Int64(self.read_i64()?),
            T::ZeroInt64 => Value::Int64(0),
            T::OneInt64 => Value::Int64(1),
            T::MinusOneInt64 => Value::Int64(-1),
            T::OptimizedInt64 => Value::Int64(self.read_optimized_i64()?),
            T::OptimizedInt64Negative => Value::Int64(!self.read_optimized_i64()?),
            T::UInt64 => Value::UInt64(self.read_u64()?),
            T::ZeroUInt64 => Value::UInt64(0),
            T::OneUInt64 => Value::UInt64(1),
            T::OptimizedUInt64 => Value::UInt64(self.read_optimized_u64()?),

            T::Single => Value::Single(self.read_f32()?),
            T::ZeroSingle => Value::Single(0.0),
            T::OneSingle => Value::Single(1.0),
            T::Double => Value::Double(self.read_f64()?),
            T::ZeroDouble => Value::Double(0.0),
            T::OneDouble => Value::Double(1.0),
            T::Decimal => Value::Decimal(self.read_optimized_decimal()?),
            T::ZeroDecimal => Value::Decimal(Decimal::ZERO),
            T::OneDecimal => Value::Decimal(Decimal::ONE),

            T::DateTime => Value::DateTime(self.read_datetime()?),
            T::MinDateTime => Value::DateTime(DateTime::MIN),
            T::MaxDateTime => Value::DateTime(DateTime::MAX),
            T::OptimizedDateTime => Value::DateTime(self.read_optimized_datetime()?),
            T::TimeSpan => Value::TimeSpan(self.read_timespan()?),
            T::ZeroTimeSpan => Value::TimeSpan(TimeSpan::ZERO),
            T::OptimizedTimeSpan => Value::TimeSpan(self.read_optimized_timespan()?),
            T::Guid => Value::Guid(self.read_guid()?),
            T::EmptyGuid => Value::Guid(Guid::EMPTY),

            T::String => {
                let value = self.read_string_direct()?;
                self.strings.push(value.clone());
                Value::String(value)
            }
            T::DuplicateString => Value::String(self.string_token(start)?),
            T::EmptyString => Value::String(String::new()),
            T::SingleSpace => Value::String(" ".to_string()),
            T::SingleChar => Value::String(self.read_char()?.to_string()),
            T::YString => Value::String("Y".to_string()),
            T::NString => Value::String("N".to_string()),

            T::BitArray => Value::BitArray(self.read_bit_array()?),
            T::BitVector32 => Value::BitVector32(self.read_optimized_bit_vector32()?),

            T::ByteArray => self.read_typed_array()?.map_or(Value::Null, Value::ByteArray),
            T::SByteArray => self.read_typed_array()?.map_or(Value::Null, Value::SByteArray),
            T::CharArray => self.read_typed_array()?.map_or(Value::Null, Value::CharArray),
            T::BooleanArray => self.read_typed_array()?.map_or(Value::Null, Value::BooleanArray),
            T::Int16Array => self.read_optimized_typed_array()?.map_or(Value::Null, Value::Int16Array),
            T::UInt16Array => self.read_optimized_typed_array()?.map_or(Value::Null, Value::UInt16Array),
            T::Int32Array => self.read_optimized_typed_array()?.map_or(Value::Null, Value::Int32Array),
            T::UInt32Array => self.read_optimized_typed_array()?.map_or(Value::Null, Value::UInt32Array),
            T::Int64Array => self.read_optimized_typed_array()?.map_or(Value::Null, Value::Int64Array),
            T::UInt64Array => self.read_optimized_typed_array()?.map_or(Value::Null, Value::UInt64Array),
            T::SingleArray => self.read_typed_array()?.map_or(Value::Null, Value::SingleArray),
            T::DoubleArray => self.read_typed_array()?.map_or(Value::Null, Value::DoubleArray),
            T::DecimalArray => self.read_optimized_typed_array()?.map_or(Value::Null, Value::DecimalArray),
            T::DateTimeArray => self.read_optimized_typed_array()?.map_or(Value::Null, Value::DateTimeArray),
            T::TimeSpanArray => self.read_optimized_typed_array()?.map_or(Value::Null, Value::TimeSpanArray),
            T::GuidArray => self.read_typed_array()?.map_or(Value::Null, Value::GuidArray),
            T::StringArray => self.read_string_array()?.map_or(Value::Null, Value::StringArray),

            T::ObjectArray => Value::ObjectArray(self.read_optimized_object_array()?),
            T::TypedObjectArray => {
                let element_type = self.read_type_name()?;
                let items = self.read_optimized_object_array()?;
                Value::TypedObjectArray { element_type, items }
            }
            T::ArrayList => Value::ArrayList(self.read_optimized_object_array()?),
            T::Dictionary => {
                let count = self.read_count()?;
                let mut entries = Vec::with_capacity(count.min(MAX_PREALLOC));
                for _ in 0..count {
                    let key = self.read_object()?;
                    let value = self.read_object()?;
                    entries.push((key, value));
                }
                Value::Dictionary(entries)
            }

            T::Enum => {
                let type_name = self.read_type_name()?;
                let value = self
                    .read_object()?
                    .as_i64()
                    .ok_or_else(|| Error::corrupt(start, format!("enum {type_name} has a non-integer value")))?;
                Value::Enum { type_name, value }
            }
            T::OwnedData => {
                let type_name = self.read_type_name()?;
                Value::Object(self.recreate(&type_name)?)
            }
            T::Surrogate => {
                let type_name = self.read_type_name()?;
                let registry = Arc::clone(&self.registry);
                let Some(surrogate) = registry.surrogate_for(&type_name) else {
                    warn!("no surrogate registered for {type_name}");
                    return Err(Error::unknown_type(&type_name));
                };
                debug!("reading {type_name} through a surrogate");
                Value::Object(surrogate.deserialize(self, &type_name)?)
            }

            T::NullSequence | T::DbNullSequence => {
                return Err(Error::corrupt(
                    start,
                    format!("{} outside an object array", tag.name()),
                ))
            }
        })
    }

    // Builds a default instance through the registry and lets it read its fields.
    fn recreate(&mut self, type_name: &str) -> Result<Object> {
        let registry = Arc::clone(&self.registry);
        let mut instance = registry.create(type_name).map_err(|e| {
            warn!("cannot recreate {type_name}: {e}");
            e
        })?;
        instance.deserialize_owned_data(self, None)?;
        Ok(Object::from_boxed_owned(type_name, instance))
    }

    /// Reads an object written with
    /// [`write_tokenized_object`](crate::SerializationWriter::write_tokenized_object).
    /// A duplicate returns a handle to the same instance as the first read.
    pub fn read_tokenized_object(&mut self) -> Result<Object> {
        let start = self.position;
        let byte = self.next_byte()?;
        let code = TokenCode::try_from(byte)
            .map_err(|b| Error::corrupt(start, format!("unknown object token code {b}")))?;
        let object = match code {
            TokenCode::Duplicate => {
                let index = self.read_count()?;
                return self.objects.get(index).cloned().ok_or_else(|| {
                    Error::corrupt(
                        start,
                        format!("object token {index} out of range ({} known)", self.objects.len()),
                    )
                });
            }
            TokenCode::New => match self.read_object()? {
                Value::Object(object) => object,
                other => {
                    return Err(Error::corrupt(
                        start,
                        format!("tokenized payload is {}, not an object", other.kind_name()),
                    ))
                }
            },
            TokenCode::Recreate => {
                let type_name = self.read_type_name()?;
                self.recreate(&type_name)?
            }
        };
        self.objects.push(object.clone());
        Ok(object)
    }

    /// Lets `target` read its own fields, with no tag or type name.
    pub fn read_owned_data(
        &mut self,
        target: &mut dyn OwnedDataSerializable,
        context: Option<&dyn Any>,
    ) -> Result<()> {
        target.deserialize_owned_data(self, context)
    }
}

impl ByteRead for SerializationReader<'_> {
    fn next_byte(&mut self) -> Result<u8> {
        self.check_available(1)?;
        let byte = match &mut self.input {
            Input::Slice(data) => *data
                .get(self.position as usize)
                .ok_or_else(|| Error::truncated(self.position, 1))?,
            Input::Stream(stream) => {
                let mut buf = [0u8; 1];
                read_stream(&mut **stream, &mut buf, self.position)?;
                buf[0]
            }
        };
        self.position += 1;
        Ok(byte)
    }

    fn offset(&self) -> u64 {
        self.position
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.check_available(buf.len())?;
        match &mut self.input {
            Input::Slice(data) => {
                let begin = self.position as usize;
                let src = data
                    .get(begin..begin + buf.len())
                    .ok_or_else(|| Error::truncated(self.position, buf.len()))?;
                buf.copy_from_slice(src);
            }
            Input::Stream(stream) => read_stream(&mut **stream, buf, self.position)?,
        }
        self.position += buf.len() as u64;
        Ok(())
    }
}

fn read_stream(stream: &mut dyn Read, buf: &mut [u8], position: u64) -> Result<()> {
    stream.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::truncated(position, buf.len()),
        _ => Error::from(e),
    })
}
