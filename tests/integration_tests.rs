use fast_serializer::{
    ArrayShape, DateTime, DateTimeKind, Decimal, Guid, HeaderKind, ReaderOptions, SerializationReader,
    SerializationWriter, TimeSpan, Value, WriterOptions,
};
use std::io::{Cursor, Seek, SeekFrom, Write};

const HEADER: usize = 12;

/// Bytes produced by `f` after the header.
fn body_len<F>(f: F) -> usize
where
    F: FnOnce(&mut SerializationWriter<'static>),
{
    let mut writer = SerializationWriter::new();
    f(&mut writer);
    writer.finish().unwrap().len() - HEADER
}

fn object_len(value: &Value) -> usize {
    body_len(|w| w.write_object(value).unwrap())
}

fn round_trip(value: &Value) -> Value {
    let mut writer = SerializationWriter::new();
    writer.write_object(value).unwrap();
    let bytes = writer.finish().unwrap();
    let mut reader = SerializationReader::new(&bytes).unwrap();
    let back = reader.read_object().unwrap();
    assert_eq!(reader.bytes_remaining(), Some(0));
    back
}

#[test]
fn test_header_reports_table_sizes() {
    let mut writer = SerializationWriter::new();
    writer.write_str("alpha").unwrap();
    writer.write_str("beta").unwrap();
    writer.write_str("alpha").unwrap();
    assert_eq!(writer.position(), (HEADER + 7 + 6 + 2) as u64);
    let bytes = writer.finish().unwrap();

    let reader = SerializationReader::new(&bytes).unwrap();
    assert_eq!(reader.header().total_length, Some(bytes.len() as u64));
    assert_eq!(reader.header().string_table_size, 2);
    assert_eq!(reader.table_sizes(), (2, 0));
    assert_eq!(reader.bytes_remaining(), Some((bytes.len() - HEADER) as u64));
}

#[test]
fn test_single_byte_values() {
    assert_eq!(body_len(|w| w.write_bool(true).unwrap()), 1);
    assert_eq!(body_len(|w| w.write_optimized_i32(33).unwrap()), 1);
    assert_eq!(body_len(|w| w.write_optimized_i32(i32::MAX).unwrap()), 5);
    assert_eq!(body_len(|w| w.write_optimized_string(None).unwrap()), 1);
    assert_eq!(body_len(|w| w.write_optimized_string(Some("")).unwrap()), 1);

    for value in [
        Value::Null,
        Value::DbNull,
        Value::Bool(false),
        Value::Int32(0),
        Value::Int32(1),
        Value::Int32(-1),
        Value::Int64(-1),
        Value::UInt16(1),
        Value::Double(0.0),
        Value::Decimal(Decimal::ZERO),
        Value::TimeSpan(TimeSpan::ZERO),
        Value::DateTime(DateTime::MIN),
        Value::DateTime(DateTime::MAX),
        Value::Guid(Guid::EMPTY),
        Value::from(""),
        Value::from(" "),
        Value::from("Y"),
        Value::from("N"),
    ] {
        assert_eq!(object_len(&value), 1, "{value:?}");
        assert_eq!(round_trip(&value), value);
    }
}

#[test]
fn test_integer_object_ladder() {
    let cases = [
        (Value::Int32(2), 2),
        (Value::Int32(127), 2),
        (Value::Int32(128), 3),
        (Value::Int32(0x1F_FFFF), 4),
        (Value::Int32(0x20_0000), 5),
        (Value::Int32(-2), 2),
        (Value::Int32(-0x20_0000), 4),
        (Value::Int32(-0x20_0001), 5),
        (Value::Int32(i32::MIN), 5),
        (Value::Int16(i16::MAX), 3),
        (Value::Int64(i64::MIN), 9),
        (Value::UInt64(u64::MAX), 9),
        (Value::UInt32(300), 3),
    ];
    for (value, len) in cases {
        assert_eq!(object_len(&value), len, "{value:?}");
        assert_eq!(round_trip(&value), value);
    }
}

#[test]
fn test_decimal_scale_option() {
    let two = Decimal::new(200, 2).unwrap();
    let plain = Decimal::new(2, 0).unwrap();

    let len = object_len(&Value::Decimal(two));
    assert_eq!(len, 3);
    assert_eq!(len, object_len(&Value::Decimal(plain)));
    let Value::Decimal(back) = round_trip(&Value::Decimal(two)) else {
        panic!("expected a decimal");
    };
    assert_eq!(back, two);
    assert_eq!(back.to_string(), "2");

    let options = WriterOptions::new().with_preserve_decimal_scale(true);
    let mut writer = SerializationWriter::with_options(options);
    writer.write_object(&Value::Decimal(two)).unwrap();
    let bytes = writer.finish().unwrap();
    assert!(bytes.len() - HEADER > len);
    let mut reader = SerializationReader::new(&bytes).unwrap();
    let Value::Decimal(back) = reader.read_object().unwrap() else {
        panic!("expected a decimal");
    };
    assert_eq!(back.to_string(), "2.00");
}

#[test]
fn test_datetime_kind_survives() {
    let cases = [
        DateTime::from_ymd_hms_milli(2024, 2, 29, 13, 45, 10, 250, DateTimeKind::Utc).unwrap(),
        DateTime::from_ymd(1999, 12, 31, DateTimeKind::Local).unwrap(),
        DateTime::from_ticks(637_000_000_000_000_001, DateTimeKind::Utc).unwrap(),
    ];
    for value in cases {
        let back = round_trip(&Value::DateTime(value));
        assert_eq!(back, Value::DateTime(value));
        if let Value::DateTime(back) = back {
            assert_eq!(back.kind(), value.kind());
        }
    }

    let mut writer = SerializationWriter::new();
    for value in cases {
        writer.write_optimized_datetime(value).unwrap();
        writer.write_datetime(value).unwrap();
    }
    let bytes = writer.finish().unwrap();
    let mut reader = SerializationReader::new(&bytes).unwrap();
    for value in cases {
        assert_eq!(reader.read_optimized_datetime().unwrap(), value);
        assert_eq!(reader.read_datetime().unwrap(), value);
    }
}

#[test]
fn test_timespan_forms() {
    let cases = [
        TimeSpan::from_seconds(59),
        TimeSpan::new(3, 4, 5, 6, 7),
        TimeSpan::new(-1, -2, 0, 0, 0),
        TimeSpan::from_ticks(12_345),
        TimeSpan::MAX,
        TimeSpan::MIN,
    ];
    let mut writer = SerializationWriter::new();
    for value in cases {
        writer.write_optimized_timespan(value).unwrap();
        writer.write_object(&Value::TimeSpan(value)).unwrap();
    }
    let bytes = writer.finish().unwrap();
    let mut reader = SerializationReader::new(&bytes).unwrap();
    for value in cases {
        assert_eq!(reader.read_optimized_timespan().unwrap(), value);
        assert_eq!(reader.read_object().unwrap(), Value::TimeSpan(value));
    }
}

#[test]
fn test_string_tokens() {
    let mut writer = SerializationWriter::new();
    writer.write_optimized_string(Some("repeated")).unwrap();
    let first = writer.position();
    writer.write_optimized_string(Some("repeated")).unwrap();
    writer.write_object(&Value::from("repeated")).unwrap();
    writer.write_object(&Value::from("other")).unwrap();
    let second = writer.position() - first;
    // Duplicate code + index, then DuplicateString tag + index, then a new string.
    assert_eq!(second, 2 + 2 + 1 + 1 + 5);
    assert_eq!(writer.string_token_table_size(), 2);
    let bytes = writer.finish().unwrap();

    let mut reader = SerializationReader::new(&bytes).unwrap();
    assert_eq!(reader.header().string_table_size, 2);
    for _ in 0..2 {
        assert_eq!(reader.read_optimized_string().unwrap().as_deref(), Some("repeated"));
    }
    assert_eq!(reader.read_object().unwrap(), Value::from("repeated"));
    assert_eq!(reader.read_object().unwrap(), Value::from("other"));
    assert_eq!(reader.string_token_table_size(), 2);
}

#[test]
fn test_array_fast_paths() {
    assert_eq!(body_len(|w| w.write_typed_array::<i32>(None).unwrap()), 1);
    assert_eq!(body_len(|w| w.write_typed_array::<i32>(Some(&[])).unwrap()), 2);
    assert_eq!(body_len(|w| w.write_optimized_typed_array::<i64>(Some(&[])).unwrap()), 2);
    assert_eq!(body_len(|w| w.write_string_array::<&str>(None).unwrap()), 1);
    assert_eq!(body_len(|w| w.write_object_array(None).unwrap()), 1);
}

#[test]
fn test_optimized_array_shapes() {
    let small: Vec<i32> = (0..10).collect();
    let mut one_large = small.clone();
    one_large[3] = 1 << 30;
    let mostly_large: Vec<i32> = (0..10).map(|i| if i == 0 { 1 } else { -i }).collect();

    // Shape, count, ten one-byte elements.
    assert_eq!(body_len(|w| w.write_optimized_typed_array(Some(&small)).unwrap()), 12);
    // Shape, count, two bitmask bytes, nine one-byte elements, one raw element.
    assert_eq!(body_len(|w| w.write_optimized_typed_array(Some(&one_large)).unwrap()), 17);
    // Shape, count, ten raw elements.
    assert_eq!(body_len(|w| w.write_optimized_typed_array(Some(&mostly_large)).unwrap()), 42);

    let mut writer = SerializationWriter::new();
    for values in [&small, &one_large, &mostly_large] {
        writer.write_optimized_typed_array(Some(values.as_slice())).unwrap();
    }
    let bytes = writer.finish().unwrap();
    let mut reader = SerializationReader::new(&bytes).unwrap();
    for values in [&small, &one_large, &mostly_large] {
        assert_eq!(reader.read_optimized_typed_array::<i32>().unwrap().as_ref(), Some(values));
    }
}

/// Shape byte and body length of an optimized `i32` array.
fn optimized_shape(values: &[i32]) -> (u8, usize) {
    let mut writer = SerializationWriter::new();
    writer.write_optimized_typed_array(Some(values)).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = SerializationReader::new(&bytes).unwrap();
    assert_eq!(reader.read_optimized_typed_array::<i32>().unwrap().as_deref(), Some(values));
    (bytes[HEADER], bytes.len() - HEADER)
}

/// `len` elements, the first `expensive` of which need the raw form.
fn with_expensive(len: usize, expensive: usize) -> Vec<i32> {
    (0..len).map(|i| if i < expensive { i32::MAX } else { 1 }).collect()
}

#[test]
fn test_optimized_array_limit() {
    let raw = ArrayShape::Raw.as_u8();
    let partial = ArrayShape::Partial.as_u8();

    // limit = 1 + 100 * 4 / 5 = 81.
    // Shape, count, 13 bitmask bytes, 20 one-byte and 80 four-byte elements.
    assert_eq!(optimized_shape(&with_expensive(100, 80)), (partial, 355));
    // Shape, count, 100 four-byte elements.
    assert_eq!(optimized_shape(&with_expensive(100, 81)), (raw, 402));

    // limit = 1.
    assert_eq!(optimized_shape(&with_expensive(1, 1)), (raw, 6));
    // limit = 2.
    assert_eq!(optimized_shape(&with_expensive(2, 1)), (partial, 8));
}

#[test]
fn test_typed_array_objects() {
    let values = [
        Value::BooleanArray(vec![true, false, true, true, false, false, true, false, true]),
        Value::ByteArray(vec![0, 1, 255]),
        Value::CharArray(vec!['a', 'ß', '€']),
        Value::UInt16Array(vec![1, 500, u16::MAX]),
        Value::Int64Array(vec![-1, 0, i64::MAX]),
        Value::DoubleArray(vec![0.5, f64::MIN_POSITIVE]),
        Value::DecimalArray(vec![Decimal::ONE, Decimal::MAX, Decimal::MIN]),
        Value::TimeSpanArray(vec![TimeSpan::from_hours(2), TimeSpan::from_ticks(1)]),
        Value::GuidArray(vec![Guid::EMPTY, Guid::from_bytes([7; 16])]),
        Value::StringArray(vec![Some("a".into()), None, Some(String::new()), Some("a".into())]),
    ];
    for value in &values {
        assert_eq!(&round_trip(value), value);
    }
    // Tag, shape, count, two packed bytes.
    assert_eq!(object_len(&values[0]), 5);
}

#[test]
fn test_object_array_null_runs() {
    let items = vec![Value::Null, Value::Null, Value::Null, Value::Int32(5), Value::DbNull];
    let value = Value::ObjectArray(items);
    // Tag, count, NullSequence + run, OptimizedInt32 + byte, DbNull.
    assert_eq!(object_len(&value), 1 + 1 + 2 + 2 + 1);
    assert_eq!(round_trip(&value), value);

    let nested = Value::Dictionary(vec![
        (Value::from("list"), Value::ArrayList(vec![Value::DbNull, Value::DbNull])),
        (
            Value::Int32(7),
            Value::TypedObjectArray {
                element_type: "Point".to_string(),
                items: vec![Value::Null],
            },
        ),
        (
            Value::from("enum"),
            Value::Enum {
                type_name: "Color".to_string(),
                value: -3,
            },
        ),
    ]);
    assert_eq!(round_trip(&nested), nested);
}

#[test]
fn test_nullable_values() {
    let mut writer = SerializationWriter::new();
    writer.write_nullable::<i32>(None).unwrap();
    let after_none = writer.position();
    writer.write_nullable(Some(7i32)).unwrap();
    writer.write_nullable_optimized(Some(7i32)).unwrap();
    writer.write_nullable_optimized::<Decimal>(None).unwrap();
    assert_eq!(after_none, HEADER as u64 + 1);
    assert_eq!(writer.position(), HEADER as u64 + 1 + 5 + 2 + 1);
    let bytes = writer.finish().unwrap();

    let mut reader = SerializationReader::new(&bytes).unwrap();
    assert_eq!(reader.read_nullable::<i32>().unwrap(), None);
    assert_eq!(reader.read_nullable::<i32>().unwrap(), Some(7));
    assert_eq!(reader.read_nullable_optimized::<i32>().unwrap(), Some(7));
    assert_eq!(reader.read_nullable_optimized::<Decimal>().unwrap(), None);
}

#[test]
fn test_minimal_header_rejects_oversized_table() {
    let mut writer =
        SerializationWriter::with_options(WriterOptions::new().with_allow_update_header(false));
    for i in 0..=u16::MAX as u32 {
        writer.write_str(&i.to_string()).unwrap();
    }
    assert_eq!(writer.string_token_table_size(), 65_536);
    assert!(writer.update_header().is_err());
    assert_eq!(&writer.as_bytes()[..4], [0, 0, 0, 0]);

    let mut writer = SerializationWriter::new();
    for i in 0..=u16::MAX as u32 {
        writer.write_str(&i.to_string()).unwrap();
    }
    let bytes = writer.finish().unwrap();
    let reader = SerializationReader::new(&bytes).unwrap();
    assert_eq!(reader.header().string_table_size, 65_536);
}

#[test]
fn test_header_patch_on_seekable_stream() {
    let mut cursor = Cursor::new(Vec::new());
    cursor.write_all(b"prefix").unwrap();
    let written = {
        let mut writer =
            SerializationWriter::from_stream(&mut cursor, WriterOptions::default()).unwrap();
        writer.write_object(&Value::from("alpha")).unwrap();
        writer.write_object(&Value::from("beta")).unwrap();
        writer.write_object(&Value::from("alpha")).unwrap();
        let total = writer.update_header().unwrap();
        writer.flush().unwrap();
        total
    };
    let end = cursor.seek(SeekFrom::End(0)).unwrap();
    assert_eq!(written, end - 6);

    let data = cursor.into_inner();
    let mut reader = SerializationReader::new(&data[6..]).unwrap();
    assert_eq!(reader.header().total_length, Some(written));
    assert_eq!(reader.header().string_table_size, 2);
    assert_eq!(reader.header().object_table_size, 0);
    for expected in ["alpha", "beta", "alpha"] {
        assert_eq!(reader.read_object().unwrap(), Value::from(expected));
    }
}

#[test]
fn test_unseekable_stream_minimal_header() {
    let mut sink = Vec::new();
    {
        let mut writer =
            SerializationWriter::from_unseekable(&mut sink, WriterOptions::default()).unwrap();
        assert_eq!(writer.header_kind(), HeaderKind::Minimal);
        writer.write_str("one").unwrap();
        writer.write_str("one").unwrap();
        assert_eq!(writer.update_header().unwrap(), 0);
        writer.flush().unwrap();
    }
    assert_eq!(&sink[..4], [0, 0, 0, 0]);

    let options = ReaderOptions::new()
        .with_header(HeaderKind::Minimal)
        .with_table_sizes(1, 0);
    let mut reader = SerializationReader::with_options(&sink, options).unwrap();
    assert_eq!(reader.table_sizes(), (1, 0));
    assert_eq!(reader.read_str().unwrap(), "one");
    assert_eq!(reader.read_str().unwrap(), "one");
}

#[test]
fn test_stream_reader_matches_slice_reader() {
    let value = Value::ArrayList(vec![
        Value::from("x"),
        Value::Int64Array(vec![1, 2, 3]),
        Value::Guid(Guid::from_bytes([1; 16])),
    ]);
    let mut writer = SerializationWriter::new();
    writer.write_object(&value).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader =
        SerializationReader::from_stream(Cursor::new(bytes.clone()), ReaderOptions::default())
            .unwrap();
    assert_eq!(reader.read_object().unwrap(), value);
    assert_eq!(reader.position(), bytes.len() as u64);
}

#[test]
fn test_truncated_and_corrupt_input() {
    let mut writer = SerializationWriter::new();
    writer.write_object(&Value::Int64(i64::MAX)).unwrap();
    let mut bytes = writer.finish().unwrap();

    let cut = &bytes[..bytes.len() - 1];
    let err = SerializationReader::new(cut).unwrap_err();
    assert!(err.is_truncated());

    let options = ReaderOptions::new().with_header(HeaderKind::Full);
    let mut short = bytes[..bytes.len() - 3].to_vec();
    short[0] = 0;
    let mut reader = SerializationReader::with_options(&short, options).unwrap();
    assert!(reader.read_object().unwrap_err().is_truncated());

    bytes[HEADER] = 200;
    let mut reader = SerializationReader::new(&bytes).unwrap();
    let err = reader.read_object().unwrap_err();
    assert!(err.is_corrupt());
}
