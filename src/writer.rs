//! The encode side: [`SerializationWriter`].
//!
//! A writer owns its output (an in-memory buffer or a caller-supplied stream),
//! the string and object token tables, and its [`WriterOptions`]. Every `write_*`
//! call appends to the output and may grow a token table; the reader must replay
//! the same sequence of calls.
//!
//! ## Overview
//!
//! - `write_*`: raw fixed-width forms
//! - `write_optimized_*`: variable-length forms for integers, decimals and times,
//!   and the tokenized form for strings
//! - [`write_object`](SerializationWriter::write_object): one tag byte plus the
//!   most compact payload for that tag
//! - [`write_typed_array`](SerializationWriter::write_typed_array) and
//!   [`write_optimized_typed_array`](SerializationWriter::write_optimized_typed_array):
//!   shape byte, count, then the elements
//! - [`update_header`](SerializationWriter::update_header): patches the header with
//!   the final length and table sizes
//!
//! ## Examples
//!
//! ```rust
//! use fast_serializer::{SerializationReader, SerializationWriter, Value};
//!
//! let mut writer = SerializationWriter::new();
//! writer.write_optimized_i32(300).unwrap();
//! writer.write_optimized_string(Some("fast")).unwrap();
//! writer.write_object(&Value::from(vec![1i32, 2, 3])).unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let mut reader = SerializationReader::new(&bytes).unwrap();
//! assert_eq!(reader.read_optimized_i32().unwrap(), 300);
//! assert_eq!(reader.read_optimized_string().unwrap().as_deref(), Some("fast"));
//! assert_eq!(reader.read_object().unwrap(), Value::Int32Array(vec![1, 2, 3]));
//! assert_eq!(reader.bytes_remaining(), Some(0));
//! ```

use std::any::Any;
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::bits::{BitArray, BitVector32};
use crate::decimal::{self, Decimal};
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::header::Header;
use crate::options::{HeaderKind, WriterOptions};
use crate::primitive::{EncodeContext, Optimizable, Primitive};
use crate::registry::OwnedDataSerializable;
use crate::tags::{ArrayShape, SerializedType, StringCode, TokenCode};
use crate::time::{self, DateTime, TimeSpan};
use crate::tokens::{ObjectTokenTable, StringTokenTable};
use crate::value::{Object, Value};
use crate::varint::{self, HIGHEST_OPTIMIZABLE_16, HIGHEST_OPTIMIZABLE_32, HIGHEST_OPTIMIZABLE_64};

/// A stream the writer can rewind to patch the header.
pub trait WriteSeek: Write + Seek {}

impl<T: Write + Seek> WriteSeek for T {}

enum Output<'a> {
    Buffer(Vec<u8>),
    Seekable {
        stream: Box<dyn WriteSeek + 'a>,
        start: u64,
    },
    Unseekable(Box<dyn Write + 'a>),
}

/// Encodes values into the compact binary format.
pub struct SerializationWriter<'a> {
    output: Output<'a>,
    // Staging buffer for stream outputs.
    scratch: Vec<u8>,
    written: u64,
    header_kind: HeaderKind,
    strings: StringTokenTable,
    objects: ObjectTokenTable,
    options: WriterOptions,
}

macro_rules! write_signed_object {
    ($self:ident, $value:expr, $high:expr, $encode:path,
     $raw:ident, $zero:ident, $one:ident, $minus_one:ident, $optimized:ident, $negative:ident) => {{
        let value = $value;
        match value {
            0 => $self.write_tag(SerializedType::$zero),
            1 => $self.write_tag(SerializedType::$one),
            -1 => $self.write_tag(SerializedType::$minus_one),
            v if v > 1 && v <= $high => $self.encode(|out| {
                out.push(SerializedType::$optimized.as_u8());
                $encode(v, out);
            }),
            v if v < -1 && v >= -$high - 1 => $self.encode(|out| {
                out.push(SerializedType::$negative.as_u8());
                $encode(-(v + 1), out);
            }),
            v => $self.encode(|out| {
                out.push(SerializedType::$raw.as_u8());
                out.extend_from_slice(&v.to_le_bytes());
            }),
        }
    }};
}

macro_rules! write_unsigned_object {
    ($self:ident, $value:expr, $high:expr, $encode:path,
     $raw:ident, $zero:ident, $one:ident, $optimized:ident) => {{
        let value = $value;
        match value {
            0 => $self.write_tag(SerializedType::$zero),
            1 => $self.write_tag(SerializedType::$one),
            v if v <= $high => $self.encode(|out| {
                out.push(SerializedType::$optimized.as_u8());
                $encode(v, out);
            }),
            v => $self.encode(|out| {
                out.push(SerializedType::$raw.as_u8());
                out.extend_from_slice(&v.to_le_bytes());
            }),
        }
    }};
}

impl SerializationWriter<'static> {
    /// Creates an in-memory writer with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(WriterOptions::default())
    }

    /// Creates an in-memory writer. The header placeholder is written immediately.
    #[must_use]
    pub fn with_options(options: WriterOptions) -> Self {
        let header_kind = options.header_kind();
        let mut buffer = Vec::with_capacity(options.capacity.max(header_kind.size()));
        buffer.resize(header_kind.size(), 0);
        SerializationWriter {
            output: Output::Buffer(buffer),
            scratch: Vec::new(),
            written: header_kind.size() as u64,
            header_kind,
            strings: StringTokenTable::new(),
            objects: ObjectTokenTable::new(),
            options,
        }
    }
}

impl Default for SerializationWriter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SerializationWriter<'a> {
    /// Creates a writer over a seekable stream, starting at its current position.
    ///
    /// # Errors
    ///
    /// Fails when the stream cannot report its position or the placeholder header
    /// cannot be written.
    pub fn from_stream<W: Write + Seek + 'a>(mut stream: W, options: WriterOptions) -> Result<Self> {
        let start = stream.stream_position()?;
        let header_kind = options.header_kind();
        stream.write_all(&vec![0; header_kind.size()])?;
        Ok(SerializationWriter {
            output: Output::Seekable {
                stream: Box::new(stream),
                start,
            },
            scratch: Vec::with_capacity(64),
            written: header_kind.size() as u64,
            header_kind,
            strings: StringTokenTable::new(),
            objects: ObjectTokenTable::new(),
            options,
        })
    }

    /// Creates a writer over a stream that cannot be rewound. Such a writer always
    /// reserves the minimal header and never patches it; the reader must be given
    /// the table sizes out of band.
    ///
    /// # Errors
    ///
    /// Fails when the placeholder header cannot be written.
    pub fn from_unseekable<W: Write + 'a>(mut stream: W, options: WriterOptions) -> Result<Self> {
        let header_kind = HeaderKind::Minimal;
        stream.write_all(&[0; 4])?;
        Ok(SerializationWriter {
            output: Output::Unseekable(Box::new(stream)),
            scratch: Vec::with_capacity(64),
            written: header_kind.size() as u64,
            header_kind,
            strings: StringTokenTable::new(),
            objects: ObjectTokenTable::new(),
            options,
        })
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    #[inline]
    #[must_use]
    pub fn preserve_decimal_scale(&self) -> bool {
        self.options.preserve_decimal_scale
    }

    /// The header layout reserved at the start of the output.
    #[inline]
    #[must_use]
    pub fn header_kind(&self) -> HeaderKind {
        self.header_kind
    }

    /// Bytes written so far, header included.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.written
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

    /// The bytes written so far. Empty for stream-backed writers.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.output {
            Output::Buffer(buffer) => buffer,
            _ => &[],
        }
    }

    /// Returns the buffer without patching the header. Stream-backed writers have
    /// already handed their bytes to the stream and return an empty vector.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self.output {
            Output::Buffer(buffer) => buffer,
            _ => Vec::new(),
        }
    }

    /// Patches the header, flushes, and returns the buffer.
    ///
    /// # Errors
    ///
    /// See [`update_header`](Self::update_header).
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.update_header()?;
        self.flush()?;
        Ok(self.into_bytes())
    }

    /// Rewrites the header with the current table sizes and, for a full header, the
    /// total length. Returns the total number of bytes written, or 0 for a writer
    /// over an unseekable stream, whose header is left as written.
    ///
    /// Writes made after this call leave the header stale.
    ///
    /// # Errors
    ///
    /// Fails on a stream I/O error, or when a field does not fit the header: a
    /// total length or table size above `i32::MAX` for a full header, a table
    /// size above `u16::MAX` for a minimal one. The header is left unchanged.
    pub fn update_header(&mut self) -> Result<u64> {
        let total = self.written;
        let kind = self.header_kind;
        let header = Header {
            total_length: (kind == HeaderKind::Full).then_some(total),
            string_table_size: self.strings.len(),
            object_table_size: self.objects.len(),
        };
        match &mut self.output {
            Output::Buffer(buffer) => {
                let bytes = header.encode(kind)?;
                buffer[..bytes.len()].copy_from_slice(&bytes);
            }
            Output::Seekable { stream, start } => {
                let bytes = header.encode(kind)?;
                let end = stream.stream_position()?;
                stream.seek(SeekFrom::Start(*start))?;
                stream.write_all(&bytes)?;
                stream.seek(SeekFrom::Start(end))?;
            }
            Output::Unseekable(_) => {
                debug!(
                    "header not patched on unseekable stream: {} strings, {} objects",
                    header.string_table_size, header.object_table_size
                );
                return Ok(0);
            }
        }
        debug!(
            "header patched: {} bytes, {} strings, {} objects",
            total, header.string_table_size, header.object_table_size
        );
        Ok(total)
    }

    /// Flushes a stream-backed writer.
    ///
    /// # Errors
    ///
    /// Returns the stream's I/O error.
    pub fn flush(&mut self) -> Result<()> {
        match &mut self.output {
            Output::Buffer(_) => Ok(()),
            Output::Seekable { stream, .. } => Ok(stream.flush()?),
            Output::Unseekable(stream) => Ok(stream.flush()?),
        }
    }

    // Runs `f` against the output buffer, staging through `scratch` for streams.
    fn encode<F: FnOnce(&mut Vec<u8>)>(&mut self, f: F) -> Result<()> {
        match &mut self.output {
            Output::Buffer(buffer) => {
                let before = buffer.len();
                f(buffer);
                self.written += (buffer.len() - before) as u64;
            }
            Output::Seekable { stream, .. } => {
                self.scratch.clear();
                f(&mut self.scratch);
                stream.write_all(&self.scratch)?;
                self.written += self.scratch.len() as u64;
            }
            Output::Unseekable(stream) => {
                self.scratch.clear();
                f(&mut self.scratch);
                stream.write_all(&self.scratch)?;
                self.written += self.scratch.len() as u64;
            }
        }
        Ok(())
    }

    fn context(&self) -> EncodeContext {
        EncodeContext {
            preserve_decimal_scale: self.options.preserve_decimal_scale,
        }
    }

    pub(crate) fn write_tag(&mut self, tag: SerializedType) -> Result<()> {
        self.encode(|out| out.push(tag.as_u8()))
    }

    /// Writes a length or index as an optimized `u32`.
    pub(crate) fn write_count(&mut self, count: usize) -> Result<()> {
        let count = u32::try_from(count)
            .map_err(|_| Error::custom(format!("count {count} exceeds u32::MAX")))?;
        self.encode(|out| varint::encode_u32(count, out))
    }

    // ----- raw forms -----

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.encode(|out| out.push(value))
    }

    pub fn write_sbyte(&mut self, value: i8) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    /// Writes a character as UTF-8.
    pub fn write_char(&mut self, value: char) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    /// Writes the 16-byte form, which always keeps the scale.
    pub fn write_decimal(&mut self, value: Decimal) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    /// Writes ticks and kind in 8 bytes.
    pub fn write_datetime(&mut self, value: DateTime) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_timespan(&mut self, value: TimeSpan) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_guid(&mut self, value: Guid) -> Result<()> {
        self.encode(|out| value.write_raw(out))
    }

    pub fn write_bit_vector32(&mut self, value: BitVector32) -> Result<()> {
        self.encode(|out| value.data().write_raw(out))
    }

    /// Appends bytes with no length prefix.
    pub fn write_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.encode(|out| out.extend_from_slice(bytes))
    }

    /// Writes an optimized byte length and the UTF-8 bytes, bypassing the string
    /// token table.
    pub fn write_string_direct(&mut self, value: &str) -> Result<()> {
        self.write_count(value.len())?;
        self.write_raw_bytes(value.as_bytes())
    }

    // ----- optimized forms -----

    /// Writes a 16-bit value in 1 to 3 bytes. Negative values always take 3.
    pub fn write_optimized_i16(&mut self, value: i16) -> Result<()> {
        self.encode(|out| varint::encode_i16(value, out))
    }

    pub fn write_optimized_u16(&mut self, value: u16) -> Result<()> {
        self.encode(|out| varint::encode_u16(value, out))
    }

    /// Writes a 32-bit value in 1 to 5 bytes. Negative values always take 5.
    pub fn write_optimized_i32(&mut self, value: i32) -> Result<()> {
        self.encode(|out| varint::encode_i32(value, out))
    }

    pub fn write_optimized_u32(&mut self, value: u32) -> Result<()> {
        self.encode(|out| varint::encode_u32(value, out))
    }

    /// Writes a 64-bit value in 1 to 9 bytes. Negative values always take 9.
    pub fn write_optimized_i64(&mut self, value: i64) -> Result<()> {
        self.encode(|out| varint::encode_i64(value, out))
    }

    pub fn write_optimized_u64(&mut self, value: u64) -> Result<()> {
        self.encode(|out| varint::encode_u64(value, out))
    }

    /// Writes a decimal in 1 to 14 bytes, honouring
    /// [`WriterOptions::preserve_decimal_scale`].
    pub fn write_optimized_decimal(&mut self, value: Decimal) -> Result<()> {
        let context = self.context();
        self.encode(|out| value.write_optimized(out, context))
    }

    pub fn write_optimized_datetime(&mut self, value: DateTime) -> Result<()> {
        self.encode(|out| time::encode_optimized_datetime(value, out))
    }

    pub fn write_optimized_timespan(&mut self, value: TimeSpan) -> Result<()> {
        self.encode(|out| time::encode_optimized_timespan(value, out))
    }

    pub fn write_optimized_bit_vector32(&mut self, value: BitVector32) -> Result<()> {
        self.write_optimized_u32(value.data())
    }

    /// Writes the bit count followed by the packed bits.
    pub fn write_bit_array(&mut self, value: &BitArray) -> Result<()> {
        self.write_count(value.len())?;
        self.write_raw_bytes(value.as_bytes())
    }

    /// Writes a string through the token table. `None` and `""` take one byte each;
    /// a string already in the table takes its code plus an optimized index.
    pub fn write_optimized_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.encode(|out| out.push(StringCode::Null.as_u8())),
            Some("") => self.encode(|out| out.push(StringCode::Empty.as_u8())),
            Some(s) => match self.strings.lookup(s) {
                Some(index) => {
                    self.encode(|out| out.push(StringCode::Duplicate.as_u8()))?;
                    self.write_count(index)
                }
                None => {
                    self.encode(|out| out.push(StringCode::New.as_u8()))?;
                    self.write_string_direct(s)?;
                    self.strings.register(s);
                    Ok(())
                }
            },
        }
    }

    /// Shorthand for [`write_optimized_string`](Self::write_optimized_string) with
    /// a present value.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_optimized_string(Some(value))
    }

    /// Writes a type name. Type names share the string token table.
    pub fn write_type_name(&mut self, name: &str) -> Result<()> {
        self.write_str(name)
    }

    // ----- nullable -----

    /// Writes `0` for `None`, or `1` followed by the raw value.
    pub fn write_nullable<T: Primitive>(&mut self, value: Option<T>) -> Result<()> {
        match value {
            None => self.write_byte(0),
            Some(v) => self.encode(|out| {
                out.push(1);
                v.write_raw(out);
            }),
        }
    }

    /// Writes `0` for `None`, or `1` followed by the optimized value.
    pub fn write_nullable_optimized<T: Optimizable>(&mut self, value: Option<T>) -> Result<()> {
        let context = self.context();
        match value {
            None => self.write_byte(0),
            Some(v) => self.encode(|out| {
                out.push(1);
                v.write_optimized(out, context);
            }),
        }
    }

    // ----- arrays -----

    fn write_shape(&mut self, shape: ArrayShape) -> Result<()> {
        self.encode(|out| out.push(shape.as_u8()))
    }

    /// Writes an array as its shape byte, the element count and the raw elements.
    /// `None` takes one byte, an empty array two.
    pub fn write_typed_array<T: Primitive>(&mut self, values: Option<&[T]>) -> Result<()> {
        let Some(values) = values else {
            return self.write_shape(ArrayShape::Null);
        };
        self.write_shape(ArrayShape::Raw)?;
        self.write_count(values.len())?;
        self.encode(|out| T::write_block(values, out))
    }

    /// Writes an array using the optimized element form where it pays off.
    ///
    /// With `E` elements that cannot be optimized and `limit = 1 + N * 4 / 5`:
    /// `E == 0` writes every element optimized, `E >= limit` falls back to the raw
    /// form, and anything in between writes a `ceil(N / 8)`-byte bitmask marking the
    /// optimized elements. The shape byte records which of the three was chosen.
    pub fn write_optimized_typed_array<T: Optimizable>(&mut self, values: Option<&[T]>) -> Result<()> {
        let Some(values) = values else {
            return self.write_shape(ArrayShape::Null);
        };
        if values.is_empty() {
            return self.write_typed_array(Some(values));
        }
        let flags: Vec<bool> = values.iter().map(Optimizable::is_optimizable).collect();
        let expensive = flags.iter().filter(|&&flag| !flag).count();
        let limit = 1 + values.len() * 4 / 5;
        let shape = if expensive == 0 {
            ArrayShape::Optimized
        } else if expensive >= limit {
            ArrayShape::Raw
        } else {
            ArrayShape::Partial
        };
        trace!(
            "{} array of {} elements ({} expensive) written as {}",
            std::any::type_name::<T>(),
            values.len(),
            expensive,
            shape.name()
        );
        if shape == ArrayShape::Raw {
            return self.write_typed_array(Some(values));
        }

        let context = self.context();
        self.write_shape(shape)?;
        self.write_count(values.len())?;
        self.encode(|out| {
            if shape == ArrayShape::Partial {
                out.extend_from_slice(BitArray::from_bools(&flags).as_bytes());
            }
            for (value, optimized) in values.iter().zip(&flags) {
                if *optimized {
                    value.write_optimized(out, context);
                } else {
                    value.write_raw(out);
                }
            }
        })
    }

    /// Writes an array of optional strings, each through the token table.
    pub fn write_string_array<S: AsRef<str>>(&mut self, values: Option<&[Option<S>]>) -> Result<()> {
        let Some(values) = values else {
            return self.write_shape(ArrayShape::Null);
        };
        self.write_shape(ArrayShape::Raw)?;
        self.write_count(values.len())?;
        for value in values {
            self.write_optimized_string(value.as_ref().map(AsRef::as_ref))?;
        }
        Ok(())
    }

    /// Writes an object array with a shape byte.
    pub fn write_object_array(&mut self, values: Option<&[Value]>) -> Result<()> {
        let Some(values) = values else {
            return self.write_shape(ArrayShape::Null);
        };
        self.write_shape(ArrayShape::Raw)?;
        self.write_optimized_object_array(values)
    }

    /// Writes the element count and then each element as an object. Runs of two or
    /// more nulls, or of two or more DBNulls, collapse to a sequence tag and a run
    /// length.
    pub fn write_optimized_object_array(&mut self, values: &[Value]) -> Result<()> {
        self.write_count(values.len())?;
        let mut index = 0;
        while index < values.len() {
            let item = &values[index];
            let sequence = match item {
                Value::Null => Some(SerializedType::NullSequence),
                Value::DbNull => Some(SerializedType::DbNullSequence),
                _ => None,
            };
            let run = match sequence {
                Some(_) => values[index..].iter().take_while(|v| *v == item).count(),
                None => 1,
            };
            match sequence {
                Some(tag) if run > 1 => {
                    self.write_tag(tag)?;
                    self.write_count(run)?;
                }
                _ => {
                    for value in &values[index..index + run] {
                        self.write_object(value)?;
                    }
                }
            }
            index += run;
        }
        Ok(())
    }

    // ----- objects -----

    /// Writes any [`Value`] as a tag followed by the most compact payload for it.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedType`] when an [`Object`] has neither a registered
    /// surrogate nor an owned-data implementation. Nothing is written in that case.
    pub fn write_object(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.write_tag(SerializedType::Null),
            Value::DbNull => self.write_tag(SerializedType::DbNull),
            Value::Bool(true) => self.write_tag(SerializedType::BooleanTrue),
            Value::Bool(false) => self.write_tag(SerializedType::BooleanFalse),
            Value::Byte(v) => match *v {
                0 => self.write_tag(SerializedType::ZeroByte),
                1 => self.write_tag(SerializedType::OneByte),
                v => self.encode(|out| out.extend_from_slice(&[SerializedType::Byte.as_u8(), v])),
            },
            Value::SByte(v) => match *v {
                0 => self.write_tag(SerializedType::ZeroSByte),
                1 => self.write_tag(SerializedType::OneSByte),
                v => self.encode(|out| out.extend_from_slice(&[SerializedType::SByte.as_u8(), v as u8])),
            },
            Value::Char(v) => match *v {
                '\0' => self.write_tag(SerializedType::ZeroChar),
                '\u{1}' => self.write_tag(SerializedType::OneChar),
                v => self.encode(|out| {
                    out.push(SerializedType::Char.as_u8());
                    v.write_raw(out);
                }),
            },
            Value::Int16(v) => write_signed_object!(
                self, *v, HIGHEST_OPTIMIZABLE_16, varint::encode_i16,
                Int16, ZeroInt16, OneInt16, MinusOneInt16, OptimizedInt16, OptimizedInt16Negative
            ),
            Value::UInt16(v) => write_unsigned_object!(
                self, *v, HIGHEST_OPTIMIZABLE_16 as u16, varint::encode_u16,
                UInt16, ZeroUInt16, OneUInt16, OptimizedUInt16
            ),
            Value::Int32(v) => write_signed_object!(
                self, *v, HIGHEST_OPTIMIZABLE_32, varint::encode_i32,
                Int32, ZeroInt32, OneInt32, MinusOneInt32, OptimizedInt32, OptimizedInt32Negative
            ),
            Value::UInt32(v) => write_unsigned_object!(
                self, *v, HIGHEST_OPTIMIZABLE_32 as u32, varint::encode_u32,
                UInt32, ZeroUInt32, OneUInt32, OptimizedUInt32
            ),
            Value::Int64(v) => write_signed_object!(
                self, *v, HIGHEST_OPTIMIZABLE_64, varint::encode_i64,
                Int64, ZeroInt64, OneInt64, MinusOneInt64, OptimizedInt64, OptimizedInt64Negative
            ),
            Value::UInt64(v) => write_unsigned_object!(
                self, *v, HIGHEST_OPTIMIZABLE_64 as u64, varint::encode_u64,
                UInt64, ZeroUInt64, OneUInt64, OptimizedUInt64
            ),
            Value::Single(v) => {
                // Compared by bits so -0.0 and NaN keep their raw form.
                if v.to_bits() == 0f32.to_bits() {
                    self.write_tag(SerializedType::ZeroSingle)
                } else if v.to_bits() == 1f32.to_bits() {
                    self.write_tag(SerializedType::OneSingle)
                } else {
                    self.write_tagged(SerializedType::Single, v)
                }
            }
            Value::Double(v) => {
                if v.to_bits() == 0f64.to_bits() {
                    self.write_tag(SerializedType::ZeroDouble)
                } else if v.to_bits() == 1f64.to_bits() {
                    self.write_tag(SerializedType::OneDouble)
                } else {
                    self.write_tagged(SerializedType::Double, v)
                }
            }
            Value::Decimal(v) => {
                if v.to_bits() == Decimal::ZERO.to_bits() {
                    self.write_tag(SerializedType::ZeroDecimal)
                } else if v.to_bits() == Decimal::ONE.to_bits() {
                    self.write_tag(SerializedType::OneDecimal)
                } else {
                    let preserve = self.options.preserve_decimal_scale;
                    self.encode(|out| {
                        out.push(SerializedType::Decimal.as_u8());
                        decimal::encode_optimized(*v, preserve, out);
                    })
                }
            }
            Value::DateTime(v) => {
                if *v == DateTime::MIN {
                    self.write_tag(SerializedType::MinDateTime)
                } else if *v == DateTime::MAX {
                    self.write_tag(SerializedType::MaxDateTime)
                } else if v.is_millisecond_aligned() {
                    self.encode(|out| {
                        out.push(SerializedType::OptimizedDateTime.as_u8());
                        time::encode_optimized_datetime(*v, out);
                    })
                } else {
                    self.write_tagged(SerializedType::DateTime, v)
                }
            }
            Value::TimeSpan(v) => {
                if *v == TimeSpan::ZERO {
                    self.write_tag(SerializedType::ZeroTimeSpan)
                } else if v.is_millisecond_aligned() {
                    self.encode(|out| {
                        out.push(SerializedType::OptimizedTimeSpan.as_u8());
                        time::encode_optimized_timespan(*v, out);
                    })
                } else {
                    self.write_tagged(SerializedType::TimeSpan, v)
                }
            }
            Value::Guid(v) => {
                if v.is_empty() {
                    self.write_tag(SerializedType::EmptyGuid)
                } else {
                    self.write_tagged(SerializedType::Guid, v)
                }
            }
            Value::String(s) => self.write_string_object(s),
            Value::BitArray(bits) => {
                self.write_tag(SerializedType::BitArray)?;
                self.write_bit_array(bits)
            }
            Value::BitVector32(v) => {
                self.write_tag(SerializedType::BitVector32)?;
                self.write_optimized_bit_vector32(*v)
            }
            Value::ByteArray(v) => self.write_tagged_array(SerializedType::ByteArray, v),
            Value::SByteArray(v) => self.write_tagged_array(SerializedType::SByteArray, v),
            Value::CharArray(v) => self.write_tagged_array(SerializedType::CharArray, v),
            Value::BooleanArray(v) => self.write_tagged_array(SerializedType::BooleanArray, v),
            Value::Int16Array(v) => self.write_tagged_optimized_array(SerializedType::Int16Array, v),
            Value::UInt16Array(v) => self.write_tagged_optimized_array(SerializedType::UInt16Array, v),
            Value::Int32Array(v) => self.write_tagged_optimized_array(SerializedType::Int32Array, v),
            Value::UInt32Array(v) => self.write_tagged_optimized_array(SerializedType::UInt32Array, v),
            Value::Int64Array(v) => self.write_tagged_optimized_array(SerializedType::Int64Array, v),
            Value::UInt64Array(v) => self.write_tagged_optimized_array(SerializedType::UInt64Array, v),
            Value::SingleArray(v) => self.write_tagged_array(SerializedType::SingleArray, v),
            Value::DoubleArray(v) => self.write_tagged_array(SerializedType::DoubleArray, v),
            Value::DecimalArray(v) => self.write_tagged_optimized_array(SerializedType::DecimalArray, v),
            Value::DateTimeArray(v) => self.write_tagged_optimized_array(SerializedType::DateTimeArray, v),
            Value::TimeSpanArray(v) => self.write_tagged_optimized_array(SerializedType::TimeSpanArray, v),
            Value::GuidArray(v) => self.write_tagged_array(SerializedType::GuidArray, v),
            Value::StringArray(v) => {
                self.write_tag(SerializedType::StringArray)?;
                self.write_string_array(Some(v.as_slice()))
            }
            Value::ObjectArray(items) => {
                self.write_tag(SerializedType::ObjectArray)?;
                self.write_optimized_object_array(items)
            }
            Value::TypedObjectArray {
                element_type,
                items,
            } => {
                self.write_tag(SerializedType::TypedObjectArray)?;
                self.write_type_name(element_type)?;
                self.write_optimized_object_array(items)
            }
            Value::ArrayList(items) => {
                self.write_tag(SerializedType::ArrayList)?;
                self.write_optimized_object_array(items)
            }
            Value::Dictionary(entries) => {
                self.write_tag(SerializedType::Dictionary)?;
                self.write_count(entries.len())?;
                for (key, value) in entries {
                    self.write_object(key)?;
                    self.write_object(value)?;
                }
                Ok(())
            }
            Value::Enum { type_name, value } => {
                self.write_tag(SerializedType::Enum)?;
                self.write_type_name(type_name)?;
                self.write_object(&Value::Int64(*value))
            }
            Value::Object(object) => self.write_other_object(object, None),
        }
    }

    fn write_tagged<T: Primitive>(&mut self, tag: SerializedType, value: &T) -> Result<()> {
        self.encode(|out| {
            out.push(tag.as_u8());
            value.write_raw(out);
        })
    }

    fn write_tagged_array<T: Primitive>(&mut self, tag: SerializedType, values: &[T]) -> Result<()> {
        self.write_tag(tag)?;
        self.write_typed_array(Some(values))
    }

    fn write_tagged_optimized_array<T: Optimizable>(&mut self, tag: SerializedType, values: &[T]) -> Result<()> {
        self.write_tag(tag)?;
        self.write_optimized_typed_array(Some(values))
    }

    pub(crate) fn write_string_object(&mut self, value: &str) -> Result<()> {
        match value {
            "" => return self.write_tag(SerializedType::EmptyString),
            " " => return self.write_tag(SerializedType::SingleSpace),
            "Y" => return self.write_tag(SerializedType::YString),
            "N" => return self.write_tag(SerializedType::NString),
            _ => {}
        }
        let mut chars = value.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return self.write_tagged(SerializedType::SingleChar, &c);
        }
        match self.strings.lookup(value) {
            Some(index) => {
                self.write_tag(SerializedType::DuplicateString)?;
                self.write_count(index)
            }
            None => {
                self.write_tag(SerializedType::String)?;
                self.write_string_direct(value)?;
                self.strings.register(value);
                Ok(())
            }
        }
    }

    // Resolves how `object` is written before emitting anything, so a type with
    // no surrogate and no owned data leaves the stream untouched. `lead` is an
    // optional token code written ahead of the tag.
    fn write_other_object(&mut self, object: &Object, lead: Option<TokenCode>) -> Result<()> {
        let registry = Arc::clone(&self.options.registry);
        let name = registry.name_of(object);
        let surrogate = registry.surrogate_for(&name);
        let owned = object.as_owned();
        if surrogate.is_none() && owned.is_none() {
            warn!("no surrogate or owned-data implementation for {name}");
            return Err(Error::unsupported_type(&name));
        }
        if let Some(code) = lead {
            self.encode(|out| out.push(code.as_u8()))?;
        }
        match (surrogate, owned) {
            (Some(surrogate), _) => {
                debug!("writing {name} through a surrogate");
                self.write_tag(SerializedType::Surrogate)?;
                self.write_type_name(&name)?;
                surrogate.serialize(self, object.as_any())
            }
            (None, Some(owned)) => {
                self.write_tag(SerializedType::OwnedData)?;
                self.write_type_name(&name)?;
                owned.serialize_owned_data(self, None)
            }
            (None, None) => Err(Error::unsupported_type(&name)),
        }
    }

    /// Writes an object through the object token table.
    ///
    /// The first time an instance is seen its full payload follows a `New` code,
    /// or with `recreate_from_type` its type name and owned data follow a
    /// `Recreate` code so the reader builds the instance from its registry. Later
    /// writes of the same instance cost a `Duplicate` code and an index. The
    /// instance is registered after its payload, so an object must not contain
    /// itself.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedType`] when the payload cannot be written, including a
    /// `recreate_from_type` request for an object without owned data.
    pub fn write_tokenized_object(&mut self, object: &Object, recreate_from_type: bool) -> Result<()> {
        if let Some(index) = self.objects.lookup(object) {
            self.encode(|out| out.push(TokenCode::Duplicate.as_u8()))?;
            return self.write_count(index);
        }
        if recreate_from_type {
            let Some(owned) = object.as_owned() else {
                return Err(Error::unsupported_type(object.type_name()));
            };
            let name = self.options.registry.name_of(object);
            self.encode(|out| out.push(TokenCode::Recreate.as_u8()))?;
            self.write_type_name(&name)?;
            owned.serialize_owned_data(self, None)?;
        } else {
            self.write_other_object(object, Some(TokenCode::New))?;
        }
        self.objects.register(object);
        Ok(())
    }

    /// Lets `value` write its own fields, with no tag or type name.
    pub fn write_owned_data(
        &mut self,
        value: &dyn OwnedDataSerializable,
        context: Option<&dyn Any>,
    ) -> Result<()> {
        value.serialize_owned_data(self, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Vec<u8> {
        let mut writer = SerializationWriter::new();
        writer.write_object(&value).unwrap();
        writer.into_bytes()[12..].to_vec()
    }

    #[test]
    fn test_empty_writer_header() {
        let mut writer = SerializationWriter::new();
        assert_eq!(writer.update_header().unwrap(), 12);
        assert_eq!(writer.into_bytes(), [12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let mut writer =
            SerializationWriter::with_options(WriterOptions::new().with_allow_update_header(false));
        assert_eq!(writer.update_header().unwrap(), 4);
        assert_eq!(writer.into_bytes(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_integer_tags() {
        assert_eq!(payload(Value::Int32(0)), [SerializedType::ZeroInt32.as_u8()]);
        assert_eq!(payload(Value::Int32(-1)), [SerializedType::MinusOneInt32.as_u8()]);
        assert_eq!(payload(Value::Int32(100)), [SerializedType::OptimizedInt32.as_u8(), 100]);
        assert_eq!(payload(Value::Int32(-2)), [SerializedType::OptimizedInt32Negative.as_u8(), 1]);
        assert_eq!(payload(Value::Int16(-128)), [SerializedType::OptimizedInt16Negative.as_u8(), 127]);
        assert_eq!(payload(Value::Int16(-129)).len(), 3);
        assert_eq!(payload(Value::UInt64(u64::MAX)).len(), 9);
    }

    #[test]
    fn test_special_strings() {
        assert_eq!(payload(Value::from("")), [SerializedType::EmptyString.as_u8()]);
        assert_eq!(payload(Value::from("Y")), [SerializedType::YString.as_u8()]);
        assert_eq!(payload(Value::from("x")), [SerializedType::SingleChar.as_u8(), b'x']);
        assert_eq!(payload(Value::from("ab")), [SerializedType::String.as_u8(), 2, b'a', b'b']);
    }

    #[test]
    fn test_string_tokens_shared() {
        let mut writer = SerializationWriter::new();
        writer.write_optimized_string(Some("shared")).unwrap();
        writer.write_object(&Value::from("shared")).unwrap();
        assert_eq!(writer.string_token_table_size(), 1);
        let bytes = writer.into_bytes();
        assert_eq!(&bytes[bytes.len() - 2..], [SerializedType::DuplicateString.as_u8(), 0]);
    }

    #[test]
    fn test_null_runs() {
        let items = vec![Value::Null, Value::Null, Value::Null, Value::DbNull, Value::Int32(5)];
        let mut writer = SerializationWriter::new();
        writer.write_optimized_object_array(&items).unwrap();
        assert_eq!(
            &writer.into_bytes()[12..],
            [
                5,
                SerializedType::NullSequence.as_u8(),
                3,
                SerializedType::DbNull.as_u8(),
                SerializedType::OptimizedInt32.as_u8(),
                5
            ]
        );
    }

    #[test]
    fn test_unsupported_object_writes_nothing() {
        let mut writer = SerializationWriter::new();
        let err = writer.write_object(&Value::Object(Object::new(3.5f32))).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
        assert_eq!(writer.position(), 12);
    }
}
