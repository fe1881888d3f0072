//! Writing a stream by hand and reading it back.
//!
//! Run with: cargo run --example simple

use fast_serializer::{
    from_bytes, to_bytes, SerializationReader, SerializationWriter, TimeSpan, Value,
};
use serde::{Deserialize, Serialize};
use std::error::Error;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Explicit writer calls
    let mut writer = SerializationWriter::new();
    writer.write_optimized_i32(42)?;
    writer.write_str("Alice Johnson")?;
    writer.write_str("Alice Johnson")?;
    writer.write_optimized_timespan(TimeSpan::from_hours(1))?;
    writer.write_optimized_typed_array(Some(&[1i32, 2, 3, i32::MAX][..]))?;
    writer.write_object(&Value::from("tagged"))?;
    let bytes = writer.finish()?;
    println!("Wrote {} bytes: {:02x?}\n", bytes.len(), bytes);

    // The reader must mirror the writer's calls in order
    let mut reader = SerializationReader::new(&bytes)?;
    assert_eq!(reader.read_optimized_i32()?, 42);
    assert_eq!(reader.read_str()?, "Alice Johnson");
    assert_eq!(reader.read_str()?, "Alice Johnson");
    assert_eq!(reader.read_optimized_timespan()?, TimeSpan::from_hours(1));
    let numbers = reader.read_optimized_typed_array::<i32>()?;
    assert_eq!(numbers, Some(vec![1, 2, 3, i32::MAX]));
    assert_eq!(reader.read_object()?, Value::from("tagged"));
    println!(
        "Read back {} distinct strings, {} bytes left",
        reader.string_token_table_size(),
        reader.bytes_remaining().unwrap_or(0)
    );

    // Serde types go through the same stream format
    let users = vec![
        User {
            id: 42,
            name: "Alice Johnson".to_string(),
            email: "alice@example.com".to_string(),
        },
        User {
            id: 43,
            name: "Bob Smith".to_string(),
            email: "bob@example.com".to_string(),
        },
    ];
    let bytes = to_bytes(&users)?;
    let users_back: Vec<User> = from_bytes(&bytes)?;
    assert_eq!(users, users_back);
    println!("✓ Round-trip successful ({} bytes)", bytes.len());

    Ok(())
}
