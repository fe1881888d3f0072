//! Element types for the generic nullable and array paths.
//!
//! [`Primitive`] is implemented by every fixed-shape type the writer can put in a
//! typed array or a nullable slot: it knows its raw encoding and how a block of
//! elements is laid out. [`Optimizable`] adds the compact encoding and the test
//! that decides whether compacting one element pays off, which drives the
//! `Optimized` / `Partial` / `Raw` choice in
//! [`SerializationWriter::write_optimized_typed_array`](crate::SerializationWriter::write_optimized_typed_array).

use crate::bits::byte_len;
use crate::decimal::{self, Decimal};
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::time::{self, DateTime, TimeSpan};
use crate::varint::{self, ByteRead, HIGHEST_OPTIMIZABLE_16, HIGHEST_OPTIMIZABLE_32, HIGHEST_OPTIMIZABLE_64};

/// Upper bound on capacity reserved from a count read off the stream.
pub(crate) const MAX_PREALLOC: usize = 4096;

/// Writer settings that change how a single element is encoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeContext {
    pub preserve_decimal_scale: bool,
}

/// A fixed-shape value with a raw encoding.
pub trait Primitive: Sized + Clone {
    fn write_raw(&self, out: &mut Vec<u8>);

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self>;

    /// Writes the elements of an array body, one after another by default.
    fn write_block(items: &[Self], out: &mut Vec<u8>) {
        for item in items {
            item.write_raw(out);
        }
    }

    fn read_block<R: ByteRead>(input: &mut R, count: usize) -> Result<Vec<Self>> {
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            items.push(Self::read_raw(input)?);
        }
        Ok(items)
    }
}

/// A [`Primitive`] that also has a compact encoding for some of its values.
pub trait Optimizable: Primitive {
    /// True when the compact form of this value is shorter than the raw form.
    fn is_optimizable(&self) -> bool;

    fn write_optimized(&self, out: &mut Vec<u8>, context: EncodeContext);

    fn read_optimized<R: ByteRead>(input: &mut R) -> Result<Self>;
}

impl Primitive for bool {
    fn write_raw(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        Ok(input.next_byte()? != 0)
    }

    // Eight flags per byte, lowest index in the lowest bit.
    fn write_block(items: &[Self], out: &mut Vec<u8>) {
        for chunk in items.chunks(8) {
            let byte = chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << i));
            out.push(byte);
        }
    }

    fn read_block<R: ByteRead>(input: &mut R, count: usize) -> Result<Vec<Self>> {
        let bytes = input.read_vec(byte_len(count))?;
        Ok((0..count).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect())
    }
}

impl Primitive for u8 {
    fn write_raw(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        input.next_byte()
    }

    fn write_block(items: &[Self], out: &mut Vec<u8>) {
        out.extend_from_slice(items);
    }

    fn read_block<R: ByteRead>(input: &mut R, count: usize) -> Result<Vec<Self>> {
        input.read_vec(count)
    }
}

impl Primitive for i8 {
    fn write_raw(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        Ok(input.next_byte()? as i8)
    }

    fn read_block<R: ByteRead>(input: &mut R, count: usize) -> Result<Vec<Self>> {
        Ok(input.read_vec(count)?.into_iter().map(|b| b as i8).collect())
    }
}

/// Characters are written as UTF-8, one to four bytes.
impl Primitive for char {
    fn write_raw(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        out.extend_from_slice(self.encode_utf8(&mut buf).as_bytes());
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        let start = input.offset();
        let mut buf = [0u8; 4];
        buf[0] = input.next_byte()?;
        let len = match buf[0] {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            other => return Err(Error::corrupt(start, format!("invalid UTF-8 lead byte {other:#04x}"))),
        };
        input.read_exact_into(&mut buf[1..len])?;
        std::str::from_utf8(&buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(|| Error::corrupt(start, "invalid UTF-8 character"))
    }
}

macro_rules! impl_le_primitive {
    ($($t:ty),*) => {
        $(
            impl Primitive for $t {
                #[inline]
                fn write_raw(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
                    Ok(<$t>::from_le_bytes(input.read_array()?))
                }
            }
        )*
    };
}

impl_le_primitive!(i16, u16, i32, u32, i64, u64, f32, f64);

impl Primitive for Decimal {
    fn write_raw(&self, out: &mut Vec<u8>) {
        decimal::encode_raw(*self, out);
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        decimal::read_raw(input)
    }
}

impl Primitive for DateTime {
    fn write_raw(&self, out: &mut Vec<u8>) {
        time::encode_raw_datetime(*self, out);
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        time::read_raw_datetime(input)
    }
}

impl Primitive for TimeSpan {
    fn write_raw(&self, out: &mut Vec<u8>) {
        time::encode_raw_timespan(*self, out);
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        time::read_raw_timespan(input)
    }
}

impl Primitive for Guid {
    fn write_raw(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn read_raw<R: ByteRead>(input: &mut R) -> Result<Self> {
        Ok(Guid::from_bytes(input.read_array()?))
    }
}

macro_rules! impl_optimizable_int {
    ($($t:ty => |$v:ident| $check:expr, $encode:path, $read:path);* $(;)?) => {
        $(
            impl Optimizable for $t {
                #[inline]
                fn is_optimizable(&self) -> bool {
                    let $v = *self;
                    $check
                }

                #[inline]
                fn write_optimized(&self, out: &mut Vec<u8>, _context: EncodeContext) {
                    $encode(*self, out);
                }

                #[inline]
                fn read_optimized<R: ByteRead>(input: &mut R) -> Result<Self> {
                    $read(input)
                }
            }
        )*
    };
}

impl_optimizable_int! {
    i16 => |v| (0..=HIGHEST_OPTIMIZABLE_16).contains(&v), varint::encode_i16, varint::read_i16;
    u16 => |v| v <= HIGHEST_OPTIMIZABLE_16 as u16, varint::encode_u16, varint::read_u16;
    i32 => |v| (0..=HIGHEST_OPTIMIZABLE_32).contains(&v), varint::encode_i32, varint::read_i32;
    u32 => |v| v <= HIGHEST_OPTIMIZABLE_32 as u32, varint::encode_u32, varint::read_u32;
    i64 => |v| (0..=HIGHEST_OPTIMIZABLE_64).contains(&v), varint::encode_i64, varint::read_i64;
    u64 => |v| v <= HIGHEST_OPTIMIZABLE_64 as u64, varint::encode_u64, varint::read_u64;
}

impl Optimizable for Decimal {
    fn is_optimizable(&self) -> bool {
        true
    }

    fn write_optimized(&self, out: &mut Vec<u8>, context: EncodeContext) {
        decimal::encode_optimized(*self, context.preserve_decimal_scale, out);
    }

    fn read_optimized<R: ByteRead>(input: &mut R) -> Result<Self> {
        decimal::read_optimized(input)
    }
}

impl Optimizable for DateTime {
    fn is_optimizable(&self) -> bool {
        self.is_millisecond_aligned()
    }

    fn write_optimized(&self, out: &mut Vec<u8>, _context: EncodeContext) {
        time::encode_optimized_datetime(*self, out);
    }

    fn read_optimized<R: ByteRead>(input: &mut R) -> Result<Self> {
        time::read_optimized_datetime(input)
    }
}

impl Optimizable for TimeSpan {
    fn is_optimizable(&self) -> bool {
        self.is_millisecond_aligned()
    }

    fn write_optimized(&self, out: &mut Vec<u8>, _context: EncodeContext) {
        time::encode_optimized_timespan(*self, out);
    }

    fn read_optimized<R: ByteRead>(input: &mut R) -> Result<Self> {
        time::read_optimized_timespan(input)
    }
}
