//! A 96-bit scaled decimal number and its compact encodings.
//!
//! [`Decimal`] stores an unsigned 96-bit mantissa in three 32-bit words, a sign and a
//! power-of-ten scale between 0 and 28. The scale is part of the value's identity
//! for display (`2.00` prints as `2.00`) but not for equality (`2.00 == 2`).
//!
//! ## Encodings
//!
//! - **Raw**: 16 bytes, the words `lo`, `mid`, `hi` and `flags` in little-endian order.
//!   `flags` holds the scale in bits 16..24 and the sign in bit 31.
//! - **Optimized**: one flag byte, an optional scale byte, then only the non-zero
//!   words. Each of those is written as an optimized integer when it is small enough
//!   and as 4 raw bytes otherwise.
//!
//! | flag bit | meaning |
//! |----------|---------|
//! | `0x01` | negative |
//! | `0x02` | scale byte follows |
//! | `0x04`, `0x08`, `0x10` | `lo`, `mid`, `hi` is zero and omitted |
//! | `0x20`, `0x40`, `0x80` | `lo`, `mid`, `hi` is written optimized |
//!
//! ## Examples
//!
//! ```rust
//! use fast_serializer::Decimal;
//!
//! let price: Decimal = "2.00".parse().unwrap();
//! assert_eq!(price.to_string(), "2.00");
//! assert_eq!(price, Decimal::from(2));
//! assert_eq!(price.trunc().to_string(), "2");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::varint::{self, ByteRead, HIGHEST_OPTIMIZABLE_32};

const SIGN_MASK: u32 = 0x8000_0000;
const SCALE_MASK: u32 = 0x00FF_0000;
const SCALE_SHIFT: u32 = 16;
const MANTISSA_MAX: u128 = (1 << 96) - 1;

/// Largest supported scale.
pub const MAX_SCALE: u32 = 28;

const FLAG_NEGATIVE: u8 = 0x01;
const FLAG_SCALE: u8 = 0x02;
const FLAG_ZERO_WORD: u8 = 0x04;
const FLAG_OPTIMIZED_WORD: u8 = 0x20;

/// A 96-bit decimal floating point number.
#[derive(Clone, Copy, Default)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    flags: u32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal::from_words(0, 0, 0, 0);
    pub const ONE: Decimal = Decimal::from_words(1, 0, 0, 0);
    pub const MINUS_ONE: Decimal = Decimal::from_words(1, 0, 0, SIGN_MASK);
    pub const MAX: Decimal = Decimal::from_words(u32::MAX, u32::MAX, u32::MAX, 0);
    pub const MIN: Decimal = Decimal::from_words(u32::MAX, u32::MAX, u32::MAX, SIGN_MASK);

    const fn from_words(lo: u32, mid: u32, hi: u32, flags: u32) -> Self {
        Decimal { lo, mid, hi, flags }
    }

    /// Builds a decimal from its three mantissa words, sign and scale.
    ///
    /// # Errors
    ///
    /// Fails when `scale` is above [`MAX_SCALE`].
    pub fn from_parts(lo: u32, mid: u32, hi: u32, negative: bool, scale: u32) -> Result<Self> {
        if scale > MAX_SCALE {
            return Err(Error::custom(format!(
                "decimal scale {scale} exceeds {MAX_SCALE}"
            )));
        }
        let mut flags = scale << SCALE_SHIFT;
        if negative {
            flags |= SIGN_MASK;
        }
        Ok(Decimal::from_words(lo, mid, hi, flags))
    }

    /// Builds `mantissa * 10^-scale`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fast_serializer::Decimal;
    ///
    /// let d = Decimal::new(-12345, 2).unwrap();
    /// assert_eq!(d.to_string(), "-123.45");
    /// ```
    ///
    /// # Errors
    ///
    /// Fails when the mantissa does not fit in 96 bits or the scale is above [`MAX_SCALE`].
    pub fn new(mantissa: i128, scale: u32) -> Result<Self> {
        let magnitude = mantissa.unsigned_abs();
        if magnitude > MANTISSA_MAX {
            return Err(Error::custom("decimal mantissa exceeds 96 bits"));
        }
        Decimal::from_parts(
            magnitude as u32,
            (magnitude >> 32) as u32,
            (magnitude >> 64) as u32,
            mantissa < 0,
            scale,
        )
    }

    /// Rebuilds a decimal from the raw `[lo, mid, hi, flags]` words, rejecting
    /// flags with reserved bits set or an out-of-range scale.
    #[must_use]
    pub fn from_bits(bits: [u32; 4]) -> Option<Self> {
        let [lo, mid, hi, flags] = bits;
        let reserved = flags & !(SIGN_MASK | SCALE_MASK);
        if reserved != 0 || (flags & SCALE_MASK) >> SCALE_SHIFT > MAX_SCALE {
            return None;
        }
        Some(Decimal::from_words(lo, mid, hi, flags))
    }

    /// Returns the raw `[lo, mid, hi, flags]` words.
    #[inline]
    #[must_use]
    pub const fn to_bits(&self) -> [u32; 4] {
        [self.lo, self.mid, self.hi, self.flags]
    }

    #[inline]
    #[must_use]
    pub const fn scale(&self) -> u32 {
        (self.flags & SCALE_MASK) >> SCALE_SHIFT
    }

    /// True when the sign bit is set, including for negative zero.
    #[inline]
    #[must_use]
    pub const fn is_sign_negative(&self) -> bool {
        self.flags & SIGN_MASK != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.lo == 0 && self.mid == 0 && self.hi == 0
    }

    /// The unsigned 96-bit mantissa.
    #[must_use]
    pub fn unsigned_mantissa(&self) -> u128 {
        u128::from(self.lo) | (u128::from(self.mid) << 32) | (u128::from(self.hi) << 64)
    }

    /// The signed mantissa.
    #[must_use]
    pub fn mantissa(&self) -> i128 {
        let magnitude = self.unsigned_mantissa() as i128;
        if self.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Drops the fractional digits, keeping the sign.
    #[must_use]
    pub fn trunc(&self) -> Self {
        let magnitude = self.unsigned_mantissa() / 10u128.pow(self.scale());
        self.with_magnitude(magnitude, 0)
    }

    /// Removes trailing zeros from the fractional digits.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let mut magnitude = self.unsigned_mantissa();
        let mut scale = self.scale();
        while scale > 0 && magnitude % 10 == 0 {
            magnitude /= 10;
            scale -= 1;
        }
        self.with_magnitude(magnitude, scale)
    }

    fn with_magnitude(&self, magnitude: u128, scale: u32) -> Self {
        Decimal::from_words(
            magnitude as u32,
            (magnitude >> 32) as u32,
            (magnitude >> 64) as u32,
            (self.flags & SIGN_MASK) | (scale << SCALE_SHIFT),
        )
    }

    // Canonical form used for equality and hashing: normalized, with zero unsigned.
    fn canonical(&self) -> (bool, u128, u32) {
        let normal = self.normalize();
        let magnitude = normal.unsigned_mantissa();
        (
            magnitude != 0 && normal.is_sign_negative(),
            magnitude,
            normal.scale(),
        )
    }

    /// Lossy conversion to `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        let value = self.unsigned_mantissa() as f64 / 10f64.powi(self.scale() as i32);
        if self.is_sign_negative() {
            -value
        } else {
            value
        }
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Decimal {}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_neg, a_mag, a_scale) = self.canonical();
        let (b_neg, b_mag, b_scale) = other.canonical();
        match (a_neg, b_neg) {
            (false, true) => return Ordering::Greater,
            (true, false) => return Ordering::Less,
            _ => {}
        }
        let by_magnitude = compare_scaled(a_mag, a_scale, b_mag, b_scale);
        if a_neg {
            by_magnitude.reverse()
        } else {
            by_magnitude
        }
    }
}

// Compares a * 10^-sa with b * 10^-sb without overflowing.
fn compare_scaled(a: u128, sa: u32, b: u128, sb: u32) -> Ordering {
    let (a_int, a_frac) = (a / 10u128.pow(sa), a % 10u128.pow(sa));
    let (b_int, b_frac) = (b / 10u128.pow(sb), b % 10u128.pow(sb));
    a_int.cmp(&b_int).then_with(|| {
        // Both fractions are below 10^28, so widening to the larger scale fits.
        let scale = sa.max(sb);
        let a_frac = a_frac * 10u128.pow(scale - sa);
        let b_frac = b_frac * 10u128.pow(scale - sb);
        a_frac.cmp(&b_frac)
    })
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.unsigned_mantissa();
        let digits = magnitude.to_string();
        let scale = self.scale() as usize;
        let mut out = String::with_capacity(digits.len() + scale + 2);
        if self.is_sign_negative() && magnitude != 0 {
            out.push('-');
        }
        if scale == 0 {
            out.push_str(&digits);
        } else if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            out.push_str(int_part);
            out.push('.');
            out.push_str(frac_part);
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take(scale - digits.len()));
            out.push_str(&digits);
        }
        f.pad(&out)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::custom(format!("invalid decimal literal: {s:?}"));
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        let mut magnitude: u128 = 0;
        for ch in int_part.chars().chain(frac_part.chars()) {
            let digit = ch.to_digit(10).ok_or_else(invalid)?;
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(u128::from(digit)))
                .filter(|m| *m <= MANTISSA_MAX)
                .ok_or_else(|| Error::custom(format!("decimal literal out of range: {s:?}")))?;
        }
        let mantissa = magnitude as i128;
        Decimal::new(if negative { -mantissa } else { mantissa }, scale)
            .map(|d| if negative && magnitude == 0 { d.negated() } else { d })
    }
}

impl Decimal {
    fn negated(&self) -> Self {
        Decimal::from_words(self.lo, self.mid, self.hi, self.flags ^ SIGN_MASK)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Decimal {
                fn from(value: $t) -> Self {
                    let magnitude = (value as i128).unsigned_abs();
                    let sign = if (value as i128) < 0 { SIGN_MASK } else { 0 };
                    Decimal::from_words(magnitude as u32, (magnitude >> 32) as u32, 0, sign)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

/// Writes the 16-byte raw form.
pub(crate) fn encode_raw(value: Decimal, out: &mut Vec<u8>) {
    for word in value.to_bits() {
        out.extend_from_slice(&word.to_le_bytes());
    }
}

pub(crate) fn read_raw<R: ByteRead>(input: &mut R) -> Result<Decimal> {
    let start = input.offset();
    let bytes: [u8; 16] = input.read_array()?;
    let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    Decimal::from_bits([word(0), word(4), word(8), word(12)])
        .ok_or_else(|| Error::corrupt(start, "invalid decimal flags"))
}

/// Writes the optimized form. Unless `preserve_scale` is set, a value without
/// fractional digits is written with scale 0.
pub(crate) fn encode_optimized(value: Decimal, preserve_scale: bool, out: &mut Vec<u8>) {
    let mut value = value;
    if !preserve_scale && value.scale() != 0 {
        let truncated = value.trunc();
        if truncated == value {
            value = truncated;
        }
    }

    let words = [value.lo, value.mid, value.hi];
    let scale = value.scale() as u8;
    let mut header = 0u8;
    if value.is_sign_negative() {
        header |= FLAG_NEGATIVE;
    }
    if scale != 0 {
        header |= FLAG_SCALE;
    }
    for (i, &word) in words.iter().enumerate() {
        if word == 0 {
            header |= FLAG_ZERO_WORD << i;
        } else if word <= HIGHEST_OPTIMIZABLE_32 as u32 {
            header |= FLAG_OPTIMIZED_WORD << i;
        }
    }

    out.push(header);
    if scale != 0 {
        out.push(scale);
    }
    for (i, &word) in words.iter().enumerate() {
        if header & (FLAG_ZERO_WORD << i) != 0 {
            continue;
        }
        if header & (FLAG_OPTIMIZED_WORD << i) != 0 {
            varint::encode_u32(word, out);
        } else {
            out.extend_from_slice(&word.to_le_bytes());
        }
    }
}

pub(crate) fn read_optimized<R: ByteRead>(input: &mut R) -> Result<Decimal> {
    let header = input.next_byte()?;
    let scale = if header & FLAG_SCALE != 0 {
        let start = input.offset();
        let scale = u32::from(input.next_byte()?);
        if scale > MAX_SCALE {
            return Err(Error::corrupt(start, format!("decimal scale {scale} exceeds {MAX_SCALE}")));
        }
        scale
    } else {
        0
    };

    let mut words = [0u32; 3];
    for (i, word) in words.iter_mut().enumerate() {
        if header & (FLAG_ZERO_WORD << i) != 0 {
            continue;
        }
        *word = if header & (FLAG_OPTIMIZED_WORD << i) != 0 {
            varint::read_u32(input)?
        } else {
            u32::from_le_bytes(input.read_array()?)
        };
    }
    Decimal::from_parts(
        words[0],
        words[1],
        words[2],
        header & FLAG_NEGATIVE != 0,
        scale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::SliceCursor;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn optimized_len(value: Decimal, preserve: bool) -> usize {
        let mut out = Vec::new();
        encode_optimized(value, preserve, &mut out);
        out.len()
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(dec("2.00").to_string(), "2.00");
        assert_eq!(dec("-0.05").to_string(), "-0.05");
        assert_eq!(dec("123").to_string(), "123");
        assert_eq!(dec(".5").to_string(), "0.5");
        assert_eq!(Decimal::MAX.to_string(), "79228162514264337593543950335");
        assert_eq!(Decimal::MIN.to_string(), "-79228162514264337593543950335");
        assert!("79228162514264337593543950336".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_numeric_equality_ignores_scale() {
        assert_eq!(dec("2.00"), Decimal::from(2));
        assert_eq!(dec("-0.0"), Decimal::ZERO);
        assert_ne!(dec("2.01"), Decimal::from(2));
        assert!(dec("-1.5") < dec("-1.25"));
        assert!(dec("10") > dec("9.999999"));
    }

    #[test]
    fn test_optimized_sizes() {
        assert_eq!(optimized_len(Decimal::ZERO, false), 1);
        assert_eq!(optimized_len(Decimal::ONE, false), 2);
        assert_eq!(optimized_len(Decimal::from(33), false), 2);
        assert_eq!(optimized_len(dec("33.00"), false), 2);
        assert_eq!(optimized_len(dec("33.00"), true), 4);
        assert_eq!(optimized_len(Decimal::MAX, false), 13);
    }

    #[test]
    fn test_optimized_roundtrip_keeps_scale_when_preserving() {
        for (text, preserve, expected) in [
            ("2.00", true, "2.00"),
            ("2.00", false, "2"),
            ("2.50", false, "2.50"),
            ("-1000000.0000", true, "-1000000.0000"),
            ("0.0000000000000000000000000001", false, "0.0000000000000000000000000001"),
        ] {
            let mut out = Vec::new();
            encode_optimized(dec(text), preserve, &mut out);
            let decoded = read_optimized(&mut SliceCursor::new(&out)).unwrap();
            assert_eq!(decoded.to_string(), expected);
        }
    }

    #[test]
    fn test_raw_rejects_bad_flags() {
        let mut out = Vec::new();
        encode_raw(Decimal::ONE, &mut out);
        out[12] = 0x01;
        assert!(read_raw(&mut SliceCursor::new(&out)).unwrap_err().is_corrupt());
    }
}
