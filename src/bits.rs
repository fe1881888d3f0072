//! Bit collections: [`BitArray`] of any length and the 32-bit [`BitVector32`].

use std::fmt;

/// A growable sequence of bits, packed eight to a byte with the lowest index in the
/// least significant bit.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::BitArray;
///
/// let mut bits = BitArray::new(10);
/// bits.set(3, true);
/// assert!(bits.get(3));
/// assert_eq!(bits.as_bytes(), &[0b0000_1000, 0]);
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitArray {
    len: usize,
    bytes: Vec<u8>,
}

impl BitArray {
    /// Creates `len` cleared bits.
    #[must_use]
    pub fn new(len: usize) -> Self {
        BitArray {
            len,
            bytes: vec![0; byte_len(len)],
        }
    }

    #[must_use]
    pub fn from_bools(values: &[bool]) -> Self {
        let mut bits = BitArray::new(values.len());
        for (i, &value) in values.iter().enumerate() {
            bits.set(i, value);
        }
        bits
    }

    /// Rebuilds a bit array from packed bytes. Bits beyond `len` are cleared.
    ///
    /// Returns `None` when `bytes` is not exactly `ceil(len / 8)` long.
    #[must_use]
    pub fn from_bytes(len: usize, mut bytes: Vec<u8>) -> Option<Self> {
        if bytes.len() != byte_len(len) {
            return None;
        }
        if len % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << (len % 8)) - 1;
            }
        }
        Some(BitArray { len, bytes })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns bit `index`, or false when it is out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    /// Sets bit `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= len`.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len, "bit index {index} out of range for length {}", self.len);
        let mask = 1 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    pub fn push(&mut self, value: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        self.len += 1;
        self.set(self.len - 1, value);
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }
}

impl fmt::Debug for BitArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitArray[")?;
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        write!(f, "]")
    }
}

impl FromIterator<bool> for BitArray {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = BitArray::default();
        for value in iter {
            bits.push(value);
        }
        bits
    }
}

/// Number of bytes needed to pack `bits` bits.
#[inline]
#[must_use]
pub const fn byte_len(bits: usize) -> usize {
    (bits + 7) / 8
}

/// Thirty-two flags or small bit sections stored in one `u32`.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::BitVector32;
///
/// let first = BitVector32::create_mask(0);
/// let second = BitVector32::create_mask(first);
/// let mut flags = BitVector32::new(0);
/// flags.set(second, true);
/// assert!(flags.get(second));
/// assert!(!flags.get(first));
/// assert_eq!(flags.data(), 2);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitVector32(u32);

impl BitVector32 {
    #[inline]
    #[must_use]
    pub const fn new(data: u32) -> Self {
        BitVector32(data)
    }

    #[inline]
    #[must_use]
    pub const fn data(&self) -> u32 {
        self.0
    }

    /// Returns the mask following `previous`, or the first mask when `previous` is 0.
    #[must_use]
    pub const fn create_mask(previous: u32) -> u32 {
        if previous == 0 {
            1
        } else {
            previous << 1
        }
    }

    /// True when every bit in `mask` is set.
    #[inline]
    #[must_use]
    pub const fn get(&self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    pub fn set(&mut self, mask: u32, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

impl From<u32> for BitVector32 {
    fn from(data: u32) -> Self {
        BitVector32(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_collect() {
        let bits: BitArray = [true, false, true, true, false, false, false, false, true]
            .into_iter()
            .collect();
        assert_eq!(bits.len(), 9);
        assert_eq!(bits.as_bytes(), &[0b0000_1101, 0b0000_0001]);
        assert_eq!(bits.count_ones(), 4);
        assert!(!bits.get(100));
    }

    #[test]
    fn test_from_bytes_masks_tail() {
        let bits = BitArray::from_bytes(3, vec![0xFF]).unwrap();
        assert_eq!(bits.as_bytes(), &[0b0000_0111]);
        assert_eq!(bits, BitArray::from_bools(&[true, true, true]));
        assert!(BitArray::from_bytes(9, vec![0]).is_none());
    }
}
