//! The closed sets of single-byte markers that appear in a stream.
//!
//! [`SerializedType`] is the leading tag of every value written through
//! [`SerializationWriter::write_object`](crate::SerializationWriter::write_object).
//! The smaller enums mark the shape of arrays, tokenized strings and tokenized
//! objects. Reading a byte outside any of these sets is a
//! [`CorruptStream`](crate::Error::CorruptStream) error.

macro_rules! byte_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $value ),*
        }

        impl $name {
            /// Every marker in wire order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            #[inline]
            #[must_use]
            pub const fn as_u8(self) -> u8 {
                self as u8
            }

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),*
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(value: u8) -> std::result::Result<Self, u8> {
                match value {
                    $(v if v == $value => Ok($name::$variant),)*
                    other => Err(other),
                }
            }
        }
    };
}

byte_enum! {
    /// Leading tag of a value written as an object.
    pub enum SerializedType {
        Null = 0,
        DbNull = 1,
        BooleanTrue = 2,
        BooleanFalse = 3,

        Byte = 4,
        ZeroByte = 5,
        OneByte = 6,
        SByte = 7,
        ZeroSByte = 8,
        OneSByte = 9,
        Char = 10,
        ZeroChar = 11,
        OneChar = 12,

        Int16 = 13,
        ZeroInt16 = 14,
        OneInt16 = 15,
        MinusOneInt16 = 16,
        OptimizedInt16 = 17,
        OptimizedInt16Negative = 18,
        UInt16 = 19,
        ZeroUInt16 = 20,
        OneUInt16 = 21,
        OptimizedUInt16 = 22,

        Int32 = 23,
        ZeroInt32 = 24,
        OneInt32 = 25,
        MinusOneInt32 = 26,
        OptimizedInt32 = 27,
        OptimizedInt32Negative = 28,
        UInt32 = 29,
        ZeroUInt32 = 30,
        OneUInt32 = 31,
        OptimizedUInt32 = 32,

        Int64 = 33,
        ZeroInt64 = 34,
        OneInt64 = 35,
        MinusOneInt64 = 36,
        OptimizedInt64 = 37,
        OptimizedInt64Negative = 38,
        UInt64 = 39,
        ZeroUInt64 = 40,
        OneUInt64 = 41,
        OptimizedUInt64 = 42,

        Single = 43,
        ZeroSingle = 44,
        OneSingle = 45,
        Double = 46,
        ZeroDouble = 47,
        OneDouble = 48,
        Decimal = 49,
        ZeroDecimal = 50,
        OneDecimal = 51,

        /// Raw 8-byte form, used when the value has sub-millisecond ticks.
        DateTime = 52,
        MinDateTime = 53,
        MaxDateTime = 54,
        OptimizedDateTime = 55,
        /// Raw 8-byte form, used when the value has sub-millisecond ticks.
        TimeSpan = 56,
        ZeroTimeSpan = 57,
        OptimizedTimeSpan = 58,
        Guid = 59,
        EmptyGuid = 60,

        /// A string seen for the first time; it is added to the string table.
        String = 61,
        DuplicateString = 62,
        EmptyString = 63,
        SingleSpace = 64,
        SingleChar = 65,
        YString = 66,
        NString = 67,

        BitArray = 68,
        BitVector32 = 69,

        ByteArray = 70,
        SByteArray = 71,
        CharArray = 72,
        BooleanArray = 73,
        Int16Array = 74,
        UInt16Array = 75,
        Int32Array = 76,
        UInt32Array = 77,
        Int64Array = 78,
        UInt64Array = 79,
        SingleArray = 80,
        DoubleArray = 81,
        DecimalArray = 82,
        DateTimeArray = 83,
        TimeSpanArray = 84,
        GuidArray = 85,
        StringArray = 86,

        ObjectArray = 87,
        TypedObjectArray = 88,
        ArrayList = 89,
        Dictionary = 90,

        Enum = 91,
        OwnedData = 92,
        Surrogate = 93,

        /// Only valid inside an object array: a run of nulls.
        NullSequence = 94,
        /// Only valid inside an object array: a run of DBNulls.
        DbNullSequence = 95,
    }
}

byte_enum! {
    /// Leading marker of an array payload.
    pub enum ArrayShape {
        Null = 0,
        /// Count followed by raw elements.
        Raw = 1,
        /// Count followed by optimized elements.
        Optimized = 2,
        /// Count, a bitmask of optimized elements, then mixed elements.
        Partial = 3,
    }
}

byte_enum! {
    /// Leading marker of a tokenized string.
    pub enum StringCode {
        Null = 0,
        Empty = 1,
        New = 2,
        Duplicate = 3,
    }
}

byte_enum! {
    /// Leading marker of a tokenized object.
    pub enum TokenCode {
        /// Full object payload follows.
        New = 0,
        /// A type name follows; the reader constructs the instance from its registry.
        Recreate = 1,
        /// An index into the object table follows.
        Duplicate = 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_dense_and_roundtrip() {
        for (i, tag) in SerializedType::ALL.iter().enumerate() {
            assert_eq!(tag.as_u8() as usize, i, "{}", tag.name());
            assert_eq!(SerializedType::try_from(tag.as_u8()), Ok(*tag));
        }
        let next = SerializedType::ALL.len() as u8;
        assert_eq!(SerializedType::try_from(next), Err(next));
    }

    #[test]
    fn test_small_code_sets() {
        assert_eq!(ArrayShape::try_from(3), Ok(ArrayShape::Partial));
        assert!(ArrayShape::try_from(4).is_err());
        assert_eq!(StringCode::try_from(1), Ok(StringCode::Empty));
        assert_eq!(TokenCode::Duplicate.name(), "Duplicate");
    }
}
