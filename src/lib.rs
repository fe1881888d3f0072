//! # fast_serializer
//!
//! A compact binary object serializer. Values are written as a one-byte type tag
//! followed by the smallest payload that represents them, behind a small header
//! that records the total length and the sizes of the string and object token
//! tables.
//!
//! ## Key Features
//!
//! - **Optimized integers**: 7-bit continuation encoding for 16, 32 and 64-bit values,
//!   with dedicated tags for 0, 1 and -1 so common values cost a single byte
//! - **Token tables**: repeated strings and repeated object instances are written
//!   once and referenced by index afterwards
//! - **Typed arrays**: each array picks raw, optimized or bitmask-mixed encoding
//!   depending on how many of its elements compact well
//! - **Extensible**: types the writer does not know are handled by a registered
//!   [`TypeSurrogate`] or by implementing [`OwnedDataSerializable`]
//! - **Serde compatible**: [`to_bytes`] and [`from_bytes`] work with any
//!   `#[derive(Serialize, Deserialize)]` type
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use fast_serializer::{from_bytes, to_bytes};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//!
//! let user = User { id: 123, name: "Alice".to_string(), active: true };
//! let bytes = to_bytes(&user).unwrap();
//! let back: User = from_bytes(&bytes).unwrap();
//! assert_eq!(user, back);
//! ```
//!
//! ## Writer and reader
//!
//! The [`SerializationWriter`] and [`SerializationReader`] expose every encoding
//! directly, for code that writes its own fields in a fixed order:
//!
//! ```rust
//! use fast_serializer::{SerializationReader, SerializationWriter, Value};
//!
//! let mut writer = SerializationWriter::new();
//! writer.write_optimized_i32(33).unwrap();
//! writer.write_optimized_string(Some("hello")).unwrap();
//! writer.write_object(&Value::Int64Array(vec![1, 2, 3])).unwrap();
//! let bytes = writer.finish().unwrap();
//!
//! let mut reader = SerializationReader::new(&bytes).unwrap();
//! assert_eq!(reader.read_optimized_i32().unwrap(), 33);
//! assert_eq!(reader.read_optimized_string().unwrap().as_deref(), Some("hello"));
//! assert_eq!(reader.read_object().unwrap(), Value::Int64Array(vec![1, 2, 3]));
//! ```
//!
//! Values must be read back with the same sequence of calls that wrote them: the
//! stream carries tags only where [`write_object`](SerializationWriter::write_object)
//! puts them.
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code
//! - Corrupt or truncated input is reported as an [`Error`], never a panic
//! - Capacities taken from the stream are clamped before allocating
//! - Nesting depth on the read side is bounded
//!
//! The byte-level layout is documented in [`format`].

mod bits;
pub mod compress;
pub mod de;
mod decimal;
pub mod error;
pub mod format;
mod guid;
mod header;
pub mod options;
mod primitive;
mod reader;
mod registry;
pub mod ser;
pub mod tags;
mod time;
pub mod tokens;
mod value;
pub mod varint;
mod writer;

pub use bits::{BitArray, BitVector32};
pub use compress::{finish_compressed, from_compressed_bytes, to_compressed_bytes, ByteCompressor};
pub use de::{Deserializer, ValueDeserializer};
pub use decimal::{Decimal, MAX_SCALE};
pub use error::{Error, Result};
pub use guid::Guid;
pub use header::Header;
pub use options::{HeaderKind, ReaderOptions, WriterOptions};
pub use primitive::{EncodeContext, Optimizable, Primitive};
pub use reader::SerializationReader;
pub use registry::{AsAny, OwnedDataSerializable, Recreatable, TypeRegistry, TypeSurrogate};
pub use ser::{Serializer, ValueSerializer};
pub use tags::{ArrayShape, SerializedType};
pub use time::{
    DateTime, DateTimeKind, TimeSpan, TICKS_PER_DAY, TICKS_PER_HOUR, TICKS_PER_MILLISECOND,
    TICKS_PER_MINUTE, TICKS_PER_SECOND,
};
pub use value::{Object, Value};
pub use writer::{SerializationWriter, WriteSeek};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Serialize any `T: Serialize` into a new byte vector with default options.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::to_bytes;
///
/// // 12-byte header + one tag byte.
/// assert_eq!(to_bytes(&true).unwrap().len(), 13);
/// ```
///
/// # Errors
///
/// Returns an error if the value's `Serialize` implementation fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_bytes_with_options(value, WriterOptions::default())
}

/// Serialize any `T: Serialize` into a new byte vector with custom options.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::{to_bytes_with_options, WriterOptions};
///
/// let options = WriterOptions::new().with_allow_update_header(false);
/// // 4-byte minimal header + one tag byte.
/// assert_eq!(to_bytes_with_options(&0u8, options).unwrap().len(), 5);
/// ```
///
/// # Errors
///
/// Returns an error if the value's `Serialize` implementation fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes_with_options<T>(value: &T, options: WriterOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut writer = SerializationWriter::with_options(options);
    value.serialize(Serializer::new(&mut writer))?;
    writer.finish()
}

/// Serialize any `T: Serialize` into a seekable stream, patching the header in
/// place once the value is written. Returns the total number of bytes written.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::to_writer;
/// use std::io::Cursor;
///
/// let mut cursor = Cursor::new(Vec::new());
/// let written = to_writer(&mut cursor, &vec![1u16, 2, 3]).unwrap();
/// assert_eq!(written as usize, cursor.get_ref().len());
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or the stream reports an I/O error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(stream: W, value: &T) -> Result<u64>
where
    W: io::Write + io::Seek,
    T: ?Sized + Serialize,
{
    let mut writer = SerializationWriter::from_stream(stream, WriterOptions::default())?;
    value.serialize(Serializer::new(&mut writer))?;
    let total = writer.update_header()?;
    writer.flush()?;
    Ok(total)
}

/// Convert any `T: Serialize` into a [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::{to_value, Value};
///
/// let value = to_value(&(1u8, "a")).unwrap();
/// assert_eq!(value, Value::ArrayList(vec![Value::Byte(1), Value::from("a")]));
/// ```
///
/// # Errors
///
/// Returns an error if the value's `Serialize` implementation fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// Deserialize an instance of type `T` from bytes written with [`to_bytes`].
///
/// The header must be a full header. When it records a total length, the value
/// must end exactly there.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::{from_bytes, to_bytes};
///
/// let bytes = to_bytes(&Some(-5i64)).unwrap();
/// let back: Option<i64> = from_bytes(&bytes).unwrap();
/// assert_eq!(back, Some(-5));
/// ```
///
/// # Errors
///
/// Returns an error if the bytes are truncated or corrupt, or do not describe a `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    from_bytes_with_options(bytes, ReaderOptions::default())
}

/// Deserialize an instance of type `T` from bytes with custom reader options.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::{from_bytes_with_options, to_bytes_with_options, HeaderKind};
/// use fast_serializer::{ReaderOptions, WriterOptions};
///
/// let bytes = to_bytes_with_options("abc", WriterOptions::new().with_allow_update_header(false)).unwrap();
/// let options = ReaderOptions::new().with_header(HeaderKind::Minimal);
/// let back: String = from_bytes_with_options(&bytes, options).unwrap();
/// assert_eq!(back, "abc");
/// ```
///
/// # Errors
///
/// Returns an error if the bytes are truncated or corrupt, or do not describe a `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes_with_options<T>(bytes: &[u8], options: ReaderOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut reader = SerializationReader::with_options(bytes, options)?;
    let value = T::deserialize(Deserializer::new(&mut reader))?;
    match reader.bytes_remaining() {
        Some(0) | None => Ok(value),
        Some(extra) => Err(Error::corrupt(
            reader.position(),
            format!("{extra} trailing byte(s) after the value"),
        )),
    }
}

/// Deserialize an instance of type `T` from an I/O stream.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::{from_reader, to_bytes};
/// use std::io::Cursor;
///
/// let bytes = to_bytes(&vec!["x".to_string(), "y".to_string()]).unwrap();
/// let back: Vec<String> = from_reader(Cursor::new(bytes)).unwrap();
/// assert_eq!(back, ["x", "y"]);
/// ```
///
/// # Errors
///
/// Returns an error if the stream fails, the data is truncated or corrupt, or it
/// does not describe a `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(stream: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut reader = SerializationReader::from_stream(stream, ReaderOptions::default())?;
    T::deserialize(Deserializer::new(&mut reader))
}

/// Deserialize an instance of type `T` from a [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::{from_value, Value};
///
/// let n: u64 = from_value(Value::Int16(12)).unwrap();
/// assert_eq!(n, 12);
/// ```
///
/// # Errors
///
/// Returns an error if the value does not describe a `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}
