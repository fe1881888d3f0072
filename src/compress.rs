//! Pluggable compression of finished streams.
//!
//! The format itself never compresses. A [`ByteCompressor`] is applied to the
//! complete byte array after [`SerializationWriter::finish`] and undone before a
//! [`SerializationReader`](crate::SerializationReader) is built, so the header and
//! the token tables are covered by the compressor like any other bytes.
//!
//! ```rust
//! use fast_serializer::{from_compressed_bytes, to_compressed_bytes, ByteCompressor, Result};
//!
//! /// Stores bytes unchanged.
//! struct Stored;
//!
//! impl ByteCompressor for Stored {
//!     fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
//!         Ok(bytes.to_vec())
//!     }
//!
//!     fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
//!         Ok(bytes.to_vec())
//!     }
//! }
//!
//! let packed = to_compressed_bytes(&vec![1u32, 2, 3], &Stored).unwrap();
//! let values: Vec<u32> = from_compressed_bytes(&packed, &Stored).unwrap();
//! assert_eq!(values, [1, 2, 3]);
//! ```

use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::writer::SerializationWriter;

/// A reversible transformation over a finished byte stream.
pub trait ByteCompressor {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

impl<C: ByteCompressor + ?Sized> ByteCompressor for &C {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).compress(bytes)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).decompress(bytes)
    }
}

impl<C: ByteCompressor + ?Sized> ByteCompressor for Box<C> {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).compress(bytes)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).decompress(bytes)
    }
}

/// Patches the header of `writer`, then compresses its bytes.
pub fn finish_compressed<C: ByteCompressor + ?Sized>(
    writer: SerializationWriter<'static>,
    compressor: &C,
) -> Result<Vec<u8>> {
    let bytes = writer.finish()?;
    let packed = compressor.compress(&bytes)?;
    debug!("compressed {} bytes to {}", bytes.len(), packed.len());
    Ok(packed)
}

/// Serializes `value` with default options and compresses the result.
pub fn to_compressed_bytes<T, C>(value: &T, compressor: &C) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
    C: ByteCompressor + ?Sized,
{
    let bytes = crate::to_bytes(value)?;
    compressor.compress(&bytes)
}

/// Decompresses `bytes` and deserializes a `T` from the result.
pub fn from_compressed_bytes<T, C>(bytes: &[u8], compressor: &C) -> Result<T>
where
    T: DeserializeOwned,
    C: ByteCompressor + ?Sized,
{
    let plain = compressor.decompress(bytes)?;
    crate::from_bytes(&plain)
}
