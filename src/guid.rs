//! 128-bit globally unique identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A GUID stored in its 16-byte wire order: the first three groups are
/// little-endian, the last eight bytes are stored as written.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::Guid;
///
/// let guid: Guid = "00112233-4455-6677-8899-aabbccddeeff".parse().unwrap();
/// assert_eq!(guid.as_bytes()[0], 0x33);
/// assert_eq!(guid.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid([u8; 16]);

impl Guid {
    pub const EMPTY: Guid = Guid([0; 16]);

    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 || s.len() != 36 || !hex.is_ascii() {
            return Err(Error::custom(format!("invalid GUID: {s:?}")));
        }
        let mut text = [0u8; 16];
        for (i, slot) in text.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::custom(format!("invalid GUID: {s:?}")))?;
        }
        // Text order to wire order.
        let order = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];
        let mut bytes = [0u8; 16];
        for (dst, &src) in bytes.iter_mut().zip(order.iter()) {
            *dst = text[src];
        }
        Ok(Guid(bytes))
    }
}

impl From<[u8; 16]> for Guid {
    fn from(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }
}
