//! Error types for binary serialization and deserialization.
//!
//! Every fallible operation in this crate returns [`Result<T>`], so a caller deals
//! with one error type whether the failure came from the byte stream, from the
//! type registry or from a serde `Serialize`/`Deserialize` implementation.
//!
//! ## Error Categories
//!
//! - **Stream errors**: [`Error::TruncatedStream`] when a read runs past the end of the
//!   data, [`Error::CorruptStream`] when a tag or marker is outside its closed set
//! - **Type errors**: [`Error::UnsupportedType`] on the write side,
//!   [`Error::UnknownType`] and [`Error::Recreation`] on the read side
//! - **I/O errors**: failures reported by an underlying [`std::io`] stream
//!
//! None of these are retried internally. A failed read leaves the reader positioned
//! somewhere inside the value that failed and it should be discarded.
//!
//! ## Examples
//!
//! ```rust
//! use fast_serializer::{Error, SerializationReader};
//!
//! // Two bytes cannot hold a 12-byte header.
//! let result = SerializationReader::new(&[0u8, 1]);
//! assert!(matches!(result, Err(Error::TruncatedStream { .. })));
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Represents all possible errors raised while writing or reading a stream.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error reported by an underlying reader or writer
    #[error("IO error: {0}")]
    Io(String),

    /// The reader ran out of bytes in the middle of a value
    #[error("Truncated stream: {needed} more byte(s) needed at offset {offset}")]
    TruncatedStream { offset: u64, needed: usize },

    /// A tag, marker or length read from the stream is not valid at this position
    #[error("Corrupt stream at offset {offset}: {msg}")]
    CorruptStream { offset: u64, msg: String },

    /// The writer has no encoding, surrogate or owned-data contract for a value
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A type name read from the stream is not known to the registry
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A known type has no zero-argument constructor registered
    #[error("Cannot recreate an instance of {0}: type is not registered as recreatable")]
    Recreation(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a truncated-stream error for a read at `offset` that needed `needed` more bytes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fast_serializer::Error;
    ///
    /// let err = Error::truncated(14, 4);
    /// assert!(err.to_string().contains("offset 14"));
    /// ```
    pub fn truncated(offset: u64, needed: usize) -> Self {
        Error::TruncatedStream { offset, needed }
    }

    /// Creates a corrupt-stream error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fast_serializer::Error;
    ///
    /// let err = Error::corrupt(3, "unknown type tag 255");
    /// assert!(err.is_corrupt());
    /// ```
    pub fn corrupt<T: fmt::Display>(offset: u64, msg: T) -> Self {
        Error::CorruptStream {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported type error for values the writer cannot encode.
    pub fn unsupported_type(type_name: &str) -> Self {
        Error::UnsupportedType(type_name.to_string())
    }

    /// Creates an unknown type error for type names the reader cannot resolve.
    pub fn unknown_type(type_name: &str) -> Self {
        Error::UnknownType(type_name.to_string())
    }

    /// Creates a recreation error for types without a registered constructor.
    pub fn recreation(type_name: &str) -> Self {
        Error::Recreation(type_name.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fast_serializer::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns true for [`Error::TruncatedStream`].
    #[inline]
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Error::TruncatedStream { .. })
    }

    /// Returns true for [`Error::CorruptStream`].
    #[inline]
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Error::CorruptStream { .. })
    }

    /// Returns true for errors that came from the type registry rather than the bytes.
    #[inline]
    #[must_use]
    pub const fn is_type_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedType(_) | Error::UnknownType(_) | Error::Recreation(_)
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            // The offset is unknown at this layer; readers that track it map the error themselves.
            io::ErrorKind::UnexpectedEof => Error::TruncatedStream {
                offset: 0,
                needed: 1,
            },
            _ => Error::Io(err.to_string()),
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
