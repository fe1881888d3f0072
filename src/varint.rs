//! The "optimized" variable-length integer codec.
//!
//! Integers are split into 7-bit groups, least significant group first. Every byte
//! except the last has its high bit set. A 64-bit value never takes more than nine
//! bytes: after eight 7-bit groups the ninth byte carries the remaining eight bits
//! as-is, without a continuation flag.
//!
//! | value range                  | bytes |
//! |------------------------------|-------|
//! | `0..=127`                    | 1     |
//! | `128..=16_383`               | 2     |
//! | `16_384..=2_097_151`         | 3     |
//! | `2_097_152..=268_435_455`    | 4     |
//!
//! Signed values are encoded by reinterpreting their bits as the unsigned type of the
//! same width. There is no zig-zag step, so any negative value costs the maximum
//! number of bytes for its width. The object encoder in
//! [`SerializationWriter`](crate::SerializationWriter) sidesteps this by writing
//! `-(v + 1)` under a dedicated "negative" tag.
//!
//! ## Examples
//!
//! ```rust
//! use fast_serializer::varint;
//!
//! let mut out = Vec::new();
//! varint::encode_u32(300, &mut out);
//! assert_eq!(out, [0xAC, 0x02]);
//!
//! let (value, used) = varint::decode_u32(&out).unwrap();
//! assert_eq!((value, used), (300, 2));
//! ```

use crate::error::{Error, Result};

/// Largest 16-bit value whose optimized form is shorter than the raw 2 bytes.
pub const HIGHEST_OPTIMIZABLE_16: i16 = 0x7F;

/// Largest 32-bit value whose optimized form is shorter than the raw 4 bytes.
pub const HIGHEST_OPTIMIZABLE_32: i32 = 0x1F_FFFF;

/// Largest 64-bit value whose optimized form is shorter than the raw 8 bytes.
pub const HIGHEST_OPTIMIZABLE_64: i64 = 0x1_FFFF_FFFF_FFFF;

const CONTINUATION: u8 = 0x80;
const GROUP_MASK: u8 = 0x7F;

/// A source of single bytes that knows its own position, used by the decoders.
pub trait ByteRead {
    /// Returns the next byte or [`Error::TruncatedStream`].
    fn next_byte(&mut self) -> Result<u8>;

    /// Offset of the next byte, used when reporting errors.
    fn offset(&self) -> u64;

    /// Fills `buf` completely or fails with [`Error::TruncatedStream`].
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        for slot in buf.iter_mut() {
            *slot = self.next_byte()?;
        }
        Ok(())
    }

    /// Reads `len` bytes into a new vector. The allocation grows with the data
    /// actually read, so a corrupt length cannot reserve memory up front.
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        const CHUNK: usize = 8192;
        let mut out = Vec::with_capacity(len.min(CHUNK));
        let mut chunk = [0u8; CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(CHUNK);
            self.read_exact_into(&mut chunk[..n])?;
            out.extend_from_slice(&chunk[..n]);
            remaining -= n;
        }
        Ok(out)
    }

    /// Reads `N` bytes into an array.
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]>
    where
        Self: Sized,
    {
        let mut buf = [0u8; N];
        self.read_exact_into(&mut buf)?;
        Ok(buf)
    }
}

/// A [`ByteRead`] over a borrowed slice.
#[derive(Debug, Clone)]
pub struct SliceCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> SliceCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        SliceCursor { bytes, position: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl ByteRead for SliceCursor<'_> {
    fn next_byte(&mut self) -> Result<u8> {
        match self.bytes.get(self.position) {
            Some(&byte) => {
                self.position += 1;
                Ok(byte)
            }
            None => Err(Error::truncated(self.position as u64, 1)),
        }
    }

    fn offset(&self) -> u64 {
        self.position as u64
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.position + buf.len();
        match self.bytes.get(self.position..end) {
            Some(src) => {
                buf.copy_from_slice(src);
                self.position = end;
                Ok(())
            }
            None => Err(Error::truncated(
                self.position as u64,
                end - self.bytes.len(),
            )),
        }
    }
}

/// Appends the optimized form of a 16-bit value (1 to 3 bytes).
#[inline]
pub fn encode_u16(value: u16, out: &mut Vec<u8>) {
    encode_groups(u64::from(value), out);
}

/// Appends the optimized form of a 32-bit value (1 to 5 bytes).
#[inline]
pub fn encode_u32(value: u32, out: &mut Vec<u8>) {
    encode_groups(u64::from(value), out);
}

/// Appends the optimized form of a 64-bit value (1 to 9 bytes).
pub fn encode_u64(mut value: u64, out: &mut Vec<u8>) {
    for _ in 0..8 {
        if value <= u64::from(GROUP_MASK) {
            out.push(value as u8);
            return;
        }
        out.push((value as u8 & GROUP_MASK) | CONTINUATION);
        value >>= 7;
    }
    out.push(value as u8);
}

#[inline]
pub fn encode_i16(value: i16, out: &mut Vec<u8>) {
    encode_u16(value as u16, out);
}

#[inline]
pub fn encode_i32(value: i32, out: &mut Vec<u8>) {
    encode_u32(value as u32, out);
}

#[inline]
pub fn encode_i64(value: i64, out: &mut Vec<u8>) {
    encode_u64(value as u64, out);
}

// Only used for widths of 32 bits or less, where the value always terminates
// within five groups.
fn encode_groups(mut value: u64, out: &mut Vec<u8>) {
    while value > u64::from(GROUP_MASK) {
        out.push((value as u8 & GROUP_MASK) | CONTINUATION);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes [`encode_u32`] produces for `value`.
#[must_use]
pub const fn encoded_len_u32(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Number of bytes [`encode_u64`] produces for `value`.
#[must_use]
pub const fn encoded_len_u64(value: u64) -> usize {
    let mut len = 1;
    let mut rest = value >> 7;
    while rest != 0 && len < 9 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// Reads an optimized 16-bit value.
pub fn read_u16<R: ByteRead + ?Sized>(input: &mut R) -> Result<u16> {
    let start = input.offset();
    let value = read_groups(input, 3)?;
    u16::try_from(value).map_err(|_| Error::corrupt(start, "optimized 16-bit value overflows"))
}

/// Reads an optimized 32-bit value.
pub fn read_u32<R: ByteRead + ?Sized>(input: &mut R) -> Result<u32> {
    let start = input.offset();
    let value = read_groups(input, 5)?;
    u32::try_from(value).map_err(|_| Error::corrupt(start, "optimized 32-bit value overflows"))
}

/// Reads an optimized 64-bit value.
pub fn read_u64<R: ByteRead + ?Sized>(input: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    for _ in 0..8 {
        let byte = input.next_byte()?;
        result |= u64::from(byte & GROUP_MASK) << shift;
        if byte & CONTINUATION == 0 {
            return Ok(result);
        }
        shift += 7;
    }
    let last = input.next_byte()?;
    Ok(result | (u64::from(last) << 56))
}

#[inline]
pub fn read_i16<R: ByteRead + ?Sized>(input: &mut R) -> Result<i16> {
    read_u16(input).map(|v| v as i16)
}

#[inline]
pub fn read_i32<R: ByteRead + ?Sized>(input: &mut R) -> Result<i32> {
    read_u32(input).map(|v| v as i32)
}

#[inline]
pub fn read_i64<R: ByteRead + ?Sized>(input: &mut R) -> Result<i64> {
    read_u64(input).map(|v| v as i64)
}

fn read_groups<R: ByteRead + ?Sized>(input: &mut R, max_groups: u32) -> Result<u64> {
    let start = input.offset();
    let mut result = 0u64;
    for group in 0..max_groups {
        let byte = input.next_byte()?;
        result |= u64::from(byte & GROUP_MASK) << (group * 7);
        if byte & CONTINUATION == 0 {
            return Ok(result);
        }
    }
    Err(Error::corrupt(
        start,
        format!("optimized integer longer than {max_groups} bytes"),
    ))
}

/// Decodes an optimized 32-bit value from the start of `bytes`, returning it with
/// the number of bytes used.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut cursor = SliceCursor::new(bytes);
    let value = read_u32(&mut cursor)?;
    Ok((value, cursor.position()))
}

/// Decodes an optimized 64-bit value from the start of `bytes`, returning it with
/// the number of bytes used.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut cursor = SliceCursor::new(bytes);
    let value = read_u64(&mut cursor)?;
    Ok((value, cursor.position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode32(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_u32(value, &mut out);
        out
    }

    fn encode64(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_u64(value, &mut out);
        out
    }

    #[test]
    fn test_u32_breakpoints() {
        assert_eq!(encode32(0).len(), 1);
        assert_eq!(encode32(127).len(), 1);
        assert_eq!(encode32(128).len(), 2);
        assert_eq!(encode32(16_383).len(), 2);
        assert_eq!(encode32(16_384).len(), 3);
        assert_eq!(encode32(HIGHEST_OPTIMIZABLE_32 as u32).len(), 3);
        assert_eq!(encode32(HIGHEST_OPTIMIZABLE_32 as u32 + 1).len(), 4);
        assert_eq!(encode32(268_435_455).len(), 4);
        assert_eq!(encode32(268_435_456).len(), 5);
        assert_eq!(encode32(u32::MAX).len(), 5);
    }

    #[test]
    fn test_u64_breakpoints() {
        assert_eq!(encode64(HIGHEST_OPTIMIZABLE_64 as u64).len(), 7);
        assert_eq!(encode64(HIGHEST_OPTIMIZABLE_64 as u64 + 1).len(), 8);
        assert_eq!(encode64(72_057_594_037_927_935).len(), 8);
        assert_eq!(encode64(72_057_594_037_927_936).len(), 9);
        assert_eq!(encode64(u64::MAX).len(), 9);
        assert_eq!(encode64(u64::MAX), vec![0xFF; 9]);
    }

    #[test]
    fn test_encoded_len_matches_encoder() {
        for value in [0u64, 1, 127, 128, 300, 1 << 20, 1 << 35, 1 << 49, 1 << 56, u64::MAX] {
            assert_eq!(encoded_len_u64(value), encode64(value).len(), "{value}");
        }
        for value in [0u32, 127, 128, 16_384, 1 << 28, u32::MAX] {
            assert_eq!(encoded_len_u32(value), encode32(value).len(), "{value}");
        }
    }

    #[test]
    fn test_decode_roundtrip() {
        for value in [0u64, 1, 127, 128, 1 << 42, (1 << 56) - 1, 1 << 56, u64::MAX] {
            let bytes = encode64(value);
            assert_eq!(decode_u64(&bytes).unwrap(), (value, bytes.len()));
        }
    }

    #[test]
    fn test_negative_costs_full_width() {
        let mut out = Vec::new();
        encode_i32(-1, &mut out);
        assert_eq!(out.len(), 5);
        let mut cursor = SliceCursor::new(&out);
        assert_eq!(read_i32(&mut cursor).unwrap(), -1);

        out.clear();
        encode_i16(-1, &mut out);
        assert_eq!(out.len(), 3);
        let mut cursor = SliceCursor::new(&out);
        assert_eq!(read_i16(&mut cursor).unwrap(), -1);
    }

    #[test]
    fn test_continuation_on_last_byte_is_truncated() {
        let err = decode_u32(&[0x80, 0x80]).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn test_overlong_is_corrupt() {
        let err = decode_u32(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]).unwrap_err();
        assert!(err.is_corrupt());

        let mut cursor = SliceCursor::new(&[0xFF, 0xFF, 0x7F]);
        assert!(read_u16(&mut cursor).unwrap_err().is_corrupt());
    }
}
