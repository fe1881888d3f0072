//! Property-based tests for the round-trip and size guarantees.
//!
//! These complement the example-based tests by checking the encodings over a
//! wide range of generated inputs, including the boundaries of the compact forms.

use std::collections::{BTreeMap, HashSet};

use fast_serializer::varint::{self, HIGHEST_OPTIMIZABLE_64};
use fast_serializer::{
    from_bytes, to_bytes, DateTime, DateTimeKind, Decimal, SerializationReader,
    SerializationWriter, TimeSpan, Value, WriterOptions, MAX_SCALE,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
    value: &T,
) -> bool {
    match to_bytes(value) {
        Ok(bytes) => match from_bytes::<T>(&bytes) {
            Ok(back) => *value == back,
            Err(e) => {
                eprintln!("Deserialize failed: {}", e);
                false
            }
        },
        Err(e) => {
            eprintln!("Serialize failed: {}", e);
            false
        }
    }
}

fn object_roundtrip(value: &Value, options: WriterOptions) -> Value {
    let mut writer = SerializationWriter::with_options(options);
    writer.write_object(value).unwrap();
    let bytes = writer.finish().unwrap();
    let mut reader = SerializationReader::new(&bytes).unwrap();
    let back = reader.read_object().unwrap();
    assert_eq!(reader.bytes_remaining(), Some(0));
    back
}

fn array_len(values: &[i32], optimized: bool) -> usize {
    let mut writer = SerializationWriter::new();
    if optimized {
        writer.write_optimized_typed_array(Some(values)).unwrap();
    } else {
        writer.write_typed_array(Some(values)).unwrap();
    }
    writer.finish().unwrap().len()
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Record {
    id: u64,
    label: String,
    score: Option<i32>,
    tags: Vec<String>,
}

fn kind() -> impl Strategy<Value = DateTimeKind> {
    prop_oneof![
        Just(DateTimeKind::Unspecified),
        Just(DateTimeKind::Utc),
        Just(DateTimeKind::Local),
    ]
}

proptest! {
    #[test]
    fn prop_i32(n in any::<i32>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_i64(n in any::<i64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_f64(f in prop::num::f64::NORMAL | prop::num::f64::ZERO) {
        prop_assert!(roundtrip(&f));
    }

    #[test]
    fn prop_string(s in ".*") {
        prop_assert!(roundtrip(&s));
    }

    #[test]
    fn prop_vec_i32(v in prop::collection::vec(any::<i32>(), 0..40)) {
        prop_assert!(roundtrip(&v));
    }

    #[test]
    fn prop_option_i16(opt in proptest::option::of(any::<i16>())) {
        prop_assert!(roundtrip(&opt));
    }

    #[test]
    fn prop_map(m in prop::collection::btree_map("[a-z]{0,4}", any::<u16>(), 0..10)) {
        prop_assert!(roundtrip(&m));
    }

    #[test]
    fn prop_records(
        rows in prop::collection::vec(
            (any::<u64>(), "[a-z]{0,6}", proptest::option::of(any::<i32>()),
             prop::collection::vec("[a-c]{1,2}", 0..4)),
            0..8,
        )
    ) {
        let records: Vec<Record> = rows
            .into_iter()
            .map(|(id, label, score, tags)| Record { id, label, score, tags })
            .collect();
        prop_assert!(roundtrip(&records));
    }

    #[test]
    fn prop_varint_u64(n in any::<u64>()) {
        let mut out = Vec::new();
        varint::encode_u64(n, &mut out);
        prop_assert!(out.len() <= 9);
        prop_assert_eq!(out.len(), varint::encoded_len_u64(n));
        prop_assert_eq!(varint::decode_u64(&out).unwrap(), (n, out.len()));
        if n <= HIGHEST_OPTIMIZABLE_64 as u64 {
            prop_assert!(out.len() < 8);
        }
    }

    #[test]
    fn prop_varint_u32(n in any::<u32>()) {
        let mut out = Vec::new();
        varint::encode_u32(n, &mut out);
        prop_assert!(out.len() <= 5);
        prop_assert_eq!(varint::decode_u32(&out).unwrap(), (n, out.len()));
    }

    #[test]
    fn prop_optimized_array_never_larger(v in prop::collection::vec(
        prop_oneof![0..200i32, any::<i32>()], 0..64,
    )) {
        prop_assert!(array_len(&v, true) <= array_len(&v, false));
    }

    #[test]
    fn prop_int64_array_objects(v in prop::collection::vec(any::<i64>(), 0..32)) {
        let value = Value::Int64Array(v);
        prop_assert_eq!(object_roundtrip(&value, WriterOptions::new()), value);
    }

    #[test]
    fn prop_decimal_keeps_value(mantissa in any::<i64>(), scale in 0..=MAX_SCALE) {
        let d = Decimal::new(i128::from(mantissa), scale).unwrap();
        let back = object_roundtrip(&Value::Decimal(d), WriterOptions::new());
        prop_assert_eq!(back, Value::Decimal(d));
    }

    #[test]
    fn prop_decimal_preserves_scale(mantissa in any::<i64>(), scale in 0..=MAX_SCALE) {
        let d = Decimal::new(i128::from(mantissa), scale).unwrap();
        let options = WriterOptions::new().with_preserve_decimal_scale(true);
        match object_roundtrip(&Value::Decimal(d), options) {
            Value::Decimal(back) => prop_assert_eq!(back.to_bits(), d.to_bits()),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn prop_timespan(ticks in any::<i64>()) {
        let value = Value::TimeSpan(TimeSpan::from_ticks(ticks));
        prop_assert_eq!(object_roundtrip(&value, WriterOptions::new()), value);
    }

    #[test]
    fn prop_datetime(ticks in 0..=DateTime::MAX_TICKS, kind in kind()) {
        let dt = DateTime::from_ticks(ticks, kind).unwrap();
        match object_roundtrip(&Value::DateTime(dt), WriterOptions::new()) {
            Value::DateTime(back) => {
                prop_assert_eq!(back.ticks(), ticks);
                prop_assert_eq!(back.kind(), kind);
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn prop_string_table_holds_unique_strings(words in prop::collection::vec("[a-d]{1,3}", 0..30)) {
        let mut writer = SerializationWriter::new();
        for word in &words {
            writer.write_str(word).unwrap();
        }
        let unique: HashSet<&String> = words.iter().collect();
        prop_assert_eq!(writer.string_token_table_size(), unique.len());

        let bytes = writer.finish().unwrap();
        let mut reader = SerializationReader::new(&bytes).unwrap();
        for word in &words {
            prop_assert_eq!(&reader.read_str().unwrap(), word);
        }
    }

    #[test]
    fn prop_truncated_input_is_an_error(
        m in prop::collection::btree_map("[a-z]{1,4}", any::<i64>(), 1..6),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = to_bytes(&m).unwrap();
        let cut = cut.index(bytes.len());
        prop_assert!(from_bytes::<BTreeMap<String, i64>>(&bytes[..cut]).is_err());
    }

    #[test]
    fn prop_arbitrary_bytes_do_not_panic(body in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut bytes = Vec::with_capacity(12 + body.len());
        bytes.extend_from_slice(&((12 + body.len()) as i32).to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&body);
        let _ = from_bytes::<serde_json::Value>(&bytes);
        if let Ok(mut reader) = SerializationReader::new(&bytes) {
            let _ = reader.read_object();
        };
    }
}
