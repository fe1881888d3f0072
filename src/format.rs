//! Byte-level layout of a stream.
//!
//! This module contains no code. It describes what
//! [`SerializationWriter`](crate::SerializationWriter) produces so that a
//! stream can be inspected by hand or read by another implementation.
//!
//! All fixed-width integers are little-endian.
//!
//! # Header
//!
//! A stream starts with one of two headers.
//!
//! | Kind | Size | Fields |
//! |------|------|--------|
//! | [`HeaderKind::Full`](crate::HeaderKind::Full) | 12 | total length `i32`, string table size `i32`, object table size `i32` |
//! | [`HeaderKind::Minimal`](crate::HeaderKind::Minimal) | 4 | string table size `u16`, object table size `u16` |
//!
//! The total length counts the header itself. The writer reserves the header
//! when it starts and fills it in from
//! [`update_header`](crate::SerializationWriter::update_header). A stream that
//! cannot seek always gets the minimal header, left zeroed; its reader is built
//! with explicit table sizes. Patching fails when a value does not fit its
//! field, so a patched header always holds the exact table sizes.
//!
//! # Optimized integers
//!
//! Seven bits per byte, least significant group first, high bit set when more
//! bytes follow. A 16-bit value takes at most 3 bytes and a 32-bit value at
//! most 5. A 64-bit value takes at most 9: the ninth byte holds the top eight
//! bits and has no continuation flag.
//!
//! Signed values are reinterpreted as unsigned, not zig-zag encoded, so every
//! negative number takes the maximum length. The object tags below route small
//! negative numbers through a separate tag with the payload `-(v + 1)` instead.
//!
//! | Width | Largest value that saves space |
//! |-------|--------------------------------|
//! | 16 | `127` (1 byte vs 2) |
//! | 32 | `2_097_151` (3 bytes vs 4) |
//! | 64 | `562_949_953_421_311` (7 bytes vs 8) |
//!
//! # Strings
//!
//! A direct string is an optimized `u32` byte length followed by UTF-8.
//!
//! An optimized string starts with a code byte:
//!
//! | Code | Meaning | Followed by |
//! |------|---------|-------------|
//! | 0 | null | nothing |
//! | 1 | empty | nothing |
//! | 2 | new | a direct string; it is appended to the string table |
//! | 3 | duplicate | optimized `u32` index into the string table |
//!
//! # Objects
//!
//! [`write_object`](crate::SerializationWriter::write_object) writes a tag from
//! [`SerializedType`](crate::SerializedType) and a payload that depends on the
//! tag. Numbering is dense from 0 (`Null`) to 95 (`DbNullSequence`).
//!
//! For each of `Int16`, `Int32` and `Int64`:
//!
//! | Value | Tag | Payload |
//! |-------|-----|---------|
//! | 0, 1, -1 | `Zero*`, `One*`, `MinusOne*` | none |
//! | `1 < v <= HIGHEST` | `Optimized*` | optimized `v` |
//! | `-(HIGHEST + 1) <= v < -1` | `Optimized*Negative` | optimized `-(v + 1)` |
//! | anything else | raw tag | raw bytes |
//!
//! Unsigned integers follow the same ladder without the negative rows. Bytes,
//! characters and floats have zero and one tags. Decimals have zero and one tags
//! for the exact bit patterns of `0` and `1`; anything else is the `Decimal` tag
//! followed by the optimized decimal form.
//!
//! Strings use `EmptyString`, `SingleSpace`, `YString`, `NString` and
//! `SingleChar` where they apply, then `DuplicateString` + index for a string
//! already in the table, then `String` + direct string, which adds it to the
//! table.
//!
//! # Decimals
//!
//! The raw form is four `u32` words: `lo`, `mid`, `hi`, `flags`. The scale is
//! in bits 16..24 of `flags` and the sign in bit 31.
//!
//! The optimized form starts with a flag byte:
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | 0x01 | negative |
//! | 0x02 | a scale byte follows |
//! | 0x04, 0x08, 0x10 | `lo`, `mid`, `hi` is zero and is omitted |
//! | 0x20, 0x40, 0x80 | `lo`, `mid`, `hi` is written optimized instead of raw |
//!
//! Unless the writer preserves decimal scale, a whole number is written with
//! its trailing zeros removed, so `2.00` is written as `2`.
//!
//! # Time spans and date-times
//!
//! A time span is a count of 100-nanosecond ticks. Its optimized form is a
//! packed little-endian word of 2 to 4 bytes: two bytes always, a third when
//! seconds accompany hours or minutes, all four when milliseconds are present.
//! Seconds with no hours, minutes or milliseconds sit in the minutes field.
//!
//! | Bits | Field |
//! |------|-------|
//! | 0 | negative |
//! | 1 | days follow as an optimized `i32` |
//! | 2 | hours and minutes are present |
//! | 3 | seconds are present |
//! | 4 | milliseconds are present |
//! | 5..10 | hours |
//! | 10..16 | minutes |
//! | 16..22 | seconds |
//! | 22..32 | milliseconds |
//!
//! A date-time's optimized form is three bytes of date (year 14 bits, month 4
//! bits, day 5 bits, then one bit set when a time of day follows) and, when that
//! bit is set, the packed time of day with the
//! [`DateTimeKind`](crate::DateTimeKind) in its two lowest bits. Values with
//! sub-millisecond ticks use the raw tags as objects.
//!
//! # Arrays
//!
//! Every array starts with an [`ArrayShape`](crate::ArrayShape) byte:
//!
//! | Shape | Followed by |
//! |-------|-------------|
//! | `Null` | nothing |
//! | `Raw` | optimized count, raw elements |
//! | `Optimized` | optimized count, optimized elements |
//! | `Partial` | optimized count, `ceil(count / 8)` bitmask bytes, elements |
//!
//! In a partial array, bit `i` of the bitmask is set when element `i` is written
//! optimized. The writer picks `Optimized` when every element compacts, `Raw`
//! when at least `1 + count * 4 / 5` elements do not, and `Partial` otherwise.
//! Boolean arrays pack eight elements per byte.
//!
//! Object arrays are a count followed by objects. Inside them, two or more
//! consecutive nulls become `NullSequence` + optimized run length, and the same
//! for `DbNullSequence`. These two tags are invalid anywhere else.
//!
//! # Tokenized objects
//!
//! [`write_tokenized_object`](crate::SerializationWriter::write_tokenized_object)
//! starts with a [`TokenCode`](crate::tags::TokenCode):
//!
//! | Code | Followed by |
//! |------|-------------|
//! | 0 `New` | the object, as written by `write_object` |
//! | 1 `Recreate` | type name, then the type's owned data |
//! | 2 `Duplicate` | optimized index into the object table |
//!
//! An instance is appended to the object table after its payload, so table
//! indices follow completion order.
