// Test utilities and generators for avrojson property-based testing

#![allow(dead_code)]

use avrojson_core::data::{Field, Value};
use avrojson_core::schema::{EnumSchema, RecordField, RecordSchema, Schema};
use proptest::prelude::*;
use std::sync::Arc;

/// Generate field names and map keys
pub fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id".to_string()),
        Just("name".to_string()),
        Just("first-name".to_string()),
        Just("count".to_string()),
        "[a-z][a-z0-9_]{0,8}",
    ]
}

/// Generate enum symbols, at least one and no duplicates
pub fn arb_symbols() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[A-Z][A-Z_]{0,6}", 1..6).prop_map(|s| s.into_iter().collect())
}

/// Generate a primitive or enum schema
pub fn arb_leaf_schema() -> impl Strategy<Value = Schema> {
    prop_oneof![
        Just(Schema::Null),
        Just(Schema::Boolean),
        Just(Schema::Int),
        Just(Schema::Long),
        Just(Schema::Float),
        Just(Schema::Double),
        Just(Schema::Bytes),
        Just(Schema::String),
        arb_symbols().prop_map(|symbols| Schema::Enum(Arc::new(EnumSchema {
            name: None,
            symbols
        }))),
    ]
}

/// Generate a schema with limited nesting
///
/// Named types are left anonymous so that any generated schema also
/// survives a trip through its canonical text.
pub fn arb_schema_depth(depth: u32) -> BoxedStrategy<Schema> {
    arb_leaf_schema()
        .prop_recursive(depth, 32, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|items| Schema::Array(Box::new(items))),
                inner.clone().prop_map(|values| Schema::Map(Box::new(values))),
                prop::collection::btree_map(arb_name(), inner, 0..4).prop_map(|fields| {
                    let fields = fields
                        .into_iter()
                        .map(|(name, schema)| RecordField { name, schema })
                        .collect();
                    Schema::Record(Arc::new(RecordSchema::new(None, fields)))
                }),
            ]
        })
        .boxed()
}

pub fn arb_schema() -> BoxedStrategy<Schema> {
    arb_schema_depth(3)
}

/// Floats that print and parse back exactly
pub fn arb_f32() -> impl Strategy<Value = f32> {
    (-1_000_000i32..1_000_000).prop_map(|n| n as f32 / 64.0)
}

pub fn arb_f64() -> impl Strategy<Value = f64> {
    (-1_000_000i64..1_000_000).prop_map(|n| n as f64 / 256.0)
}

/// Generate a value conforming to `schema`
pub fn arb_value_for(schema: &Schema) -> BoxedStrategy<Value> {
    match schema {
        Schema::Null => Just(Value::Null).boxed(),
        Schema::Boolean => any::<bool>().prop_map(Value::Boolean).boxed(),
        Schema::Int => any::<i32>().prop_map(Value::Int).boxed(),
        Schema::Long => any::<i64>().prop_map(Value::Long).boxed(),
        Schema::Float => arb_f32().prop_map(Value::Float).boxed(),
        Schema::Double => arb_f64().prop_map(Value::Double).boxed(),
        Schema::Bytes => prop::collection::vec(any::<u8>(), 0..32)
            .prop_map(Value::Bytes)
            .boxed(),
        Schema::String => "\\PC{0,16}".prop_map(Value::String).boxed(),
        Schema::Enum(e) => prop::sample::select(e.symbols.clone())
            .prop_map(Value::String)
            .boxed(),
        Schema::Array(items) => prop::collection::vec(arb_value_for(items), 0..6)
            .prop_map(Value::Array)
            .boxed(),
        Schema::Map(values) => prop::collection::btree_map(arb_name(), arb_value_for(values), 0..6)
            .prop_map(|entries| Value::Map(entries.into_iter().collect()))
            .boxed(),
        Schema::Record(record) => {
            let names: Vec<String> = record.fields.iter().map(|f| f.name.clone()).collect();
            let values: Vec<BoxedStrategy<Value>> =
                record.fields.iter().map(|f| arb_value_for(&f.schema)).collect();
            values
                .prop_map(move |values| {
                    Value::Record(
                        names
                            .iter()
                            .cloned()
                            .zip(values)
                            .map(|(name, value)| Field { name, value })
                            .collect(),
                    )
                })
                .boxed()
        }
    }
}

/// Generate a schema together with a conforming value
pub fn arb_schema_and_value() -> impl Strategy<Value = (Schema, Value)> {
    arb_schema().prop_flat_map(|schema| {
        let value = arb_value_for(&schema);
        (Just(schema), value)
    })
}

/// Lowercase hex, for readable assertion messages
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
