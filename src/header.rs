//! The header at the start of every stream.
//!
//! A writer reserves the header when it is created and patches it from
//! [`SerializationWriter::update_header`](crate::SerializationWriter::update_header)
//! once the token tables are complete. The reader uses the table sizes to pre-size
//! its own tables and, for a full header, the total length to bound the data.

use crate::error::{Error, Result};
use crate::options::HeaderKind;
use crate::varint::ByteRead;

/// Decoded header fields.
///
/// # Examples
///
/// ```rust
/// use fast_serializer::{Header, HeaderKind};
///
/// let header = Header { total_length: Some(40), string_table_size: 2, object_table_size: 0 };
/// let bytes = header.encode(HeaderKind::Full).unwrap();
/// assert_eq!(bytes, [40, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Stream length including the header, when known. Never present in a minimal header.
    pub total_length: Option<u64>,
    pub string_table_size: usize,
    pub object_table_size: usize,
}

impl Header {
    /// Encodes the header in the given layout.
    ///
    /// # Errors
    ///
    /// [`Error::Custom`] when a field does not fit the layout: 31 bits for a full
    /// header, 16 bits for a minimal one.
    pub fn encode(&self, kind: HeaderKind) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(kind.size());
        match kind {
            HeaderKind::Full => {
                let length = self.total_length.unwrap_or(0);
                out.extend_from_slice(&full_field("total length", length)?.to_le_bytes());
                out.extend_from_slice(
                    &full_field("string table size", self.string_table_size as u64)?.to_le_bytes(),
                );
                out.extend_from_slice(
                    &full_field("object table size", self.object_table_size as u64)?.to_le_bytes(),
                );
            }
            HeaderKind::Minimal => {
                out.extend_from_slice(
                    &minimal_field("string table size", self.string_table_size)?.to_le_bytes(),
                );
                out.extend_from_slice(
                    &minimal_field("object table size", self.object_table_size)?.to_le_bytes(),
                );
            }
        }
        Ok(out)
    }

    /// Reads a header of the given layout. A zero total length is reported as unknown.
    ///
    /// # Errors
    ///
    /// [`Error::TruncatedStream`] when fewer bytes than the header size are available,
    /// [`Error::CorruptStream`] when a full-header field is negative.
    pub fn read<R: ByteRead>(input: &mut R, kind: HeaderKind) -> Result<Header> {
        match kind {
            HeaderKind::Full => {
                let start = input.offset();
                let mut fields = [0usize; 3];
                for field in &mut fields {
                    let value = i32::from_le_bytes(input.read_array()?);
                    *field = usize::try_from(value).map_err(|_| {
                        Error::corrupt(start, format!("negative header field {value}"))
                    })?;
                }
                Ok(Header {
                    total_length: (fields[0] != 0).then_some(fields[0] as u64),
                    string_table_size: fields[1],
                    object_table_size: fields[2],
                })
            }
            HeaderKind::Minimal => {
                let strings = u16::from_le_bytes(input.read_array()?);
                let objects = u16::from_le_bytes(input.read_array()?);
                Ok(Header {
                    total_length: None,
                    string_table_size: usize::from(strings),
                    object_table_size: usize::from(objects),
                })
            }
        }
    }
}

fn full_field(field: &str, value: u64) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::custom(format!("{field} {value} does not fit a full header")))
}

fn minimal_field(field: &str, value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| Error::custom(format!("{field} {value} does not fit a minimal header")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::SliceCursor;

    #[test]
    fn test_full_roundtrip() {
        let header = Header {
            total_length: Some(1000),
            string_table_size: 7,
            object_table_size: 300,
        };
        let bytes = header.encode(HeaderKind::Full).unwrap();
        assert_eq!(bytes.len(), 12);
        let decoded = Header::read(&mut SliceCursor::new(&bytes), HeaderKind::Full).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_minimal_has_no_length() {
        let header = Header {
            total_length: Some(99),
            string_table_size: 65_535,
            object_table_size: 1,
        };
        let bytes = header.encode(HeaderKind::Minimal).unwrap();
        assert_eq!(bytes, [0xFF, 0xFF, 1, 0]);
        let decoded = Header::read(&mut SliceCursor::new(&bytes), HeaderKind::Minimal).unwrap();
        assert_eq!(decoded.total_length, None);
        assert_eq!(decoded.string_table_size, 65_535);
    }

    #[test]
    fn test_oversized_fields_are_rejected() {
        let header = Header {
            total_length: None,
            string_table_size: 65_536,
            object_table_size: 0,
        };
        assert!(header.encode(HeaderKind::Minimal).is_err());
        assert!(header.encode(HeaderKind::Full).is_ok());

        let header = Header {
            total_length: Some(i32::MAX as u64 + 1),
            ..Header::default()
        };
        assert!(header.encode(HeaderKind::Full).is_err());
    }

    #[test]
    fn test_negative_field_is_corrupt() {
        let mut bytes = Header::default().encode(HeaderKind::Full).unwrap();
        bytes[4..8].copy_from_slice(&(-1i32).to_le_bytes());
        let err = Header::read(&mut SliceCursor::new(&bytes), HeaderKind::Full).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_short_header_is_truncated() {
        let err = Header::read(&mut SliceCursor::new(&[0; 5]), HeaderKind::Full).unwrap_err();
        assert!(err.is_truncated());
    }
}
