use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use fast_serializer::{
    from_bytes, from_bytes_with_options, from_reader, from_value, to_bytes,
    to_bytes_with_options, to_value, to_writer, HeaderKind, ReaderOptions, SerializationWriter,
    Value, WriterOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct User {
    id: u32,
    name: String,
    email: Option<String>,
    active: bool,
    tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Product {
    sku: String,
    price: f64,
    quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Order {
    order_id: u64,
    customer: User,
    items: Vec<Product>,
    discount: Option<f32>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
enum Event {
    Started,
    Progress(u8),
    Resized(u32, u32),
    Moved { x: i64, y: i64 },
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Meters(f64);

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Marker;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Pair(i16, char);

fn user() -> User {
    User {
        id: 123,
        name: "Alice".to_string(),
        email: None,
        active: true,
        tags: vec!["admin".to_string(), "developer".to_string()],
    }
}

fn round_trip<T>(value: &T) -> T
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let bytes = to_bytes(value).unwrap();
    from_bytes(&bytes).unwrap()
}

#[test]
fn test_simple_struct() {
    assert_eq!(round_trip(&user()), user());
}

#[test]
fn test_nested_struct() {
    let order = Order {
        order_id: u64::MAX,
        customer: User {
            email: Some("alice@example.com".to_string()),
            ..user()
        },
        items: vec![
            Product {
                sku: "WIDGET-001".to_string(),
                price: 29.99,
                quantity: 2,
            },
            Product {
                sku: "GADGET-002".to_string(),
                price: 49.99,
                quantity: 0,
            },
        ],
        discount: Some(0.5),
    };
    assert_eq!(round_trip(&order), order);
}

#[test]
fn test_enum_variants() {
    let events = vec![
        Event::Started,
        Event::Progress(42),
        Event::Resized(1920, 1080),
        Event::Moved { x: -10, y: i64::MIN },
    ];
    assert_eq!(round_trip(&events), events);
}

#[test]
fn test_struct_shapes() {
    assert_eq!(round_trip(&Meters(1.5)), Meters(1.5));
    assert_eq!(round_trip(&Marker), Marker);
    assert_eq!(round_trip(&Pair(-300, 'λ')), Pair(-300, 'λ'));
    assert_eq!(round_trip(&(1u8, -1i8, "three".to_string())), (1, -1, "three".to_string()));
}

#[test]
fn test_options_and_collections() {
    let values: Vec<Option<i32>> = vec![Some(1), None, None, Some(-70_000)];
    assert_eq!(round_trip(&values), values);

    let mut by_id = HashMap::new();
    by_id.insert(7u32, "seven".to_string());
    by_id.insert(70_000u32, "many".to_string());
    assert_eq!(round_trip(&by_id), by_id);

    let nested: BTreeMap<String, Vec<Vec<u16>>> =
        [("a".to_string(), vec![vec![1, 2], vec![]])].into_iter().collect();
    assert_eq!(round_trip(&nested), nested);

    let empty: Option<Vec<u8>> = Some(Vec::new());
    assert_eq!(round_trip(&empty), empty);
}

#[test]
fn test_field_names_written_once() {
    let users: Vec<User> = (0..5).map(|id| User { id, ..user() }).collect();
    let bytes = to_bytes(&users).unwrap();
    let occurrences = bytes.windows(6).filter(|w| *w == b"active").count();
    assert_eq!(occurrences, 1);
    assert_eq!(from_bytes::<Vec<User>>(&bytes).unwrap(), users);
}

#[test]
fn test_integer_targets_are_range_checked() {
    let bytes = to_bytes(&300u16).unwrap();
    assert_eq!(from_bytes::<u64>(&bytes).unwrap(), 300);
    assert_eq!(from_bytes::<i32>(&bytes).unwrap(), 300);
    assert!(from_bytes::<u8>(&bytes).is_err());

    let bytes = to_bytes(&-1i64).unwrap();
    assert!(from_bytes::<u32>(&bytes).is_err());
}

#[test]
fn test_type_mismatch_errors() {
    let bytes = to_bytes(&5u8).unwrap();
    assert!(from_bytes::<String>(&bytes).is_err());
    assert!(from_bytes::<Event>(&bytes).is_err());
    assert!(to_bytes(&1i128).is_err());
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut writer = SerializationWriter::new();
    writer.write_object(&Value::Int32(1)).unwrap();
    writer.write_object(&Value::Int32(2)).unwrap();
    let bytes = writer.finish().unwrap();
    let err = from_bytes::<i32>(&bytes).unwrap_err();
    assert!(err.is_corrupt());
}

#[test]
fn test_json_value_interop() {
    let original = json!({
        "name": "widget",
        "count": 3,
        "delta": -12,
        "ratio": 0.25,
        "tags": ["a", "b", null],
        "nested": { "ok": true, "empty": {} }
    });
    let bytes = to_bytes(&original).unwrap();
    let back: serde_json::Value = from_bytes(&bytes).unwrap();
    assert_eq!(back, original);
}

#[test]
fn test_decode_writer_values_as_json() {
    let mut writer = SerializationWriter::new();
    writer
        .write_object(&Value::Dictionary(vec![
            (Value::from("ids"), Value::Int32Array(vec![1, 2, 3])),
            (Value::from("flags"), Value::BooleanArray(vec![true, false])),
            (Value::from("missing"), Value::DbNull),
            (Value::from("names"), Value::StringArray(vec![Some("x".into()), None])),
        ]))
        .unwrap();
    let bytes = writer.finish().unwrap();
    let back: serde_json::Value = from_bytes(&bytes).unwrap();
    assert_eq!(
        back,
        json!({ "ids": [1, 2, 3], "flags": [true, false], "missing": null, "names": ["x", null] })
    );
}

#[test]
fn test_value_conversions() {
    let value = to_value(&Event::Moved { x: 1, y: 2 }).unwrap();
    assert_eq!(
        value,
        Value::Dictionary(vec![(
            Value::from("Moved"),
            Value::Dictionary(vec![
                (Value::from("x"), Value::Int64(1)),
                (Value::from("y"), Value::Int64(2)),
            ])
        )])
    );
    assert_eq!(from_value::<Event>(value).unwrap(), Event::Moved { x: 1, y: 2 });
}

#[test]
fn test_stream_helpers() {
    let order_items = vec![
        Product {
            sku: "A".to_string(),
            price: 1.0,
            quantity: 1,
        },
        Product {
            sku: "B".to_string(),
            price: 2.0,
            quantity: 2,
        },
    ];
    let mut cursor = Cursor::new(Vec::new());
    let written = to_writer(&mut cursor, &order_items).unwrap();
    let bytes = cursor.into_inner();
    assert_eq!(written as usize, bytes.len());
    assert_eq!(bytes, to_bytes(&order_items).unwrap());

    let back: Vec<Product> = from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(back, order_items);
}

#[test]
fn test_minimal_header_options() {
    let options = WriterOptions::new().with_allow_update_header(false);
    let bytes = to_bytes_with_options(&user(), options).unwrap();
    let full = to_bytes(&user()).unwrap();
    assert_eq!(bytes.len() + 8, full.len());

    let options = ReaderOptions::new().with_header(HeaderKind::Minimal);
    let back: User = from_bytes_with_options(&bytes, options).unwrap();
    assert_eq!(back, user());
}
