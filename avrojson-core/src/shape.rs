// Shape layer - the native value shape a schema implies for JSON input

use crate::data::{Field, Value};
use crate::error::{EncodeError, Path, Result, Segment, ShapeError, Within};
use crate::schema::{RecordSchema, Schema};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Structural descriptor JSON content must conform to
///
/// `string` and `enum` schemas share the `String` shape: enum values travel
/// through JSON as their symbol text, and the symbol itself is checked
/// against the schema when the value is written. A record referenced many
/// times shares one slot list, mirroring the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Sequence(Box<Shape>),
    Mapping(Box<Shape>),
    Tuple(Arc<[Slot]>),
}

/// Named slot of a tuple, one per record field
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub shape: Shape,
}

impl Shape {
    /// Derive the shape of a schema
    pub fn derive(schema: &Schema) -> Shape {
        Shape::derive_shared(schema, &mut HashMap::new())
    }

    fn derive_shared(
        schema: &Schema,
        tuples: &mut HashMap<*const RecordSchema, Arc<[Slot]>>,
    ) -> Shape {
        match schema {
            Schema::Null => Shape::Null,
            Schema::Boolean => Shape::Boolean,
            Schema::Int => Shape::Int,
            Schema::Long => Shape::Long,
            Schema::Float => Shape::Float,
            Schema::Double => Shape::Double,
            Schema::Bytes => Shape::Bytes,
            Schema::String | Schema::Enum(_) => Shape::String,
            Schema::Array(items) => {
                Shape::Sequence(Box::new(Shape::derive_shared(items, tuples)))
            }
            Schema::Map(values) => {
                Shape::Mapping(Box::new(Shape::derive_shared(values, tuples)))
            }
            Schema::Record(record) => {
                let key = Arc::as_ptr(record);
                if let Some(slots) = tuples.get(&key) {
                    return Shape::Tuple(slots.clone());
                }
                let slots: Arc<[Slot]> = record
                    .fields
                    .iter()
                    .map(|field| Slot {
                        name: field.name.clone(),
                        shape: Shape::derive_shared(&field.schema, tuples),
                    })
                    .collect();
                tuples.insert(key, slots.clone());
                Shape::Tuple(slots)
            }
        }
    }

    /// What JSON this shape accepts, for error messages
    pub fn expected(&self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::Boolean => "a boolean",
            Shape::Int | Shape::Long => "an integer",
            Shape::Float | Shape::Double => "a number",
            Shape::Bytes => "a base64 string",
            Shape::String => "a string",
            Shape::Sequence(_) => "an array",
            Shape::Mapping(_) | Shape::Tuple(_) => "an object",
        }
    }

    /// Populate a native value from parsed JSON
    ///
    /// Structural mismatches are `ShapeError`s. Numbers of the right JSON type
    /// that do not fit the slot width are `EncodeError::OutOfRange`.
    pub fn populate(&self, json: &JsonValue) -> Result<Value> {
        let value = match (self, json) {
            (Shape::Null, JsonValue::Null) => Value::Null,
            (Shape::Boolean, JsonValue::Bool(b)) => Value::Boolean(*b),
            (Shape::Int, JsonValue::Number(n)) => {
                let n = integer(n, json, "int")?;
                let n = i32::try_from(n).map_err(|_| out_of_range("int", json))?;
                Value::Int(n)
            }
            (Shape::Long, JsonValue::Number(n)) => Value::Long(integer(n, json, "long")?),
            (Shape::Float, JsonValue::Number(n)) => {
                let x = n.as_f64().ok_or_else(|| mismatch(self, json))?;
                let narrowed = x as f32;
                if narrowed.is_infinite() {
                    return Err(out_of_range("float", json).into());
                }
                Value::Float(narrowed)
            }
            (Shape::Double, JsonValue::Number(n)) => {
                Value::Double(n.as_f64().ok_or_else(|| mismatch(self, json))?)
            }
            (Shape::Bytes, JsonValue::String(s)) => {
                let bytes = STANDARD
                    .decode(s)
                    .map_err(|e| ShapeError::InvalidBase64 {
                        reason: e.to_string(),
                        path: Path::root(),
                    })?;
                Value::Bytes(bytes)
            }
            (Shape::String, JsonValue::String(s)) => Value::String(s.clone()),
            (Shape::Sequence(inner), JsonValue::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    values.push(inner.populate(item).within(|| Segment::Index(i))?);
                }
                Value::Array(values)
            }
            (Shape::Mapping(inner), JsonValue::Object(entries)) => {
                let mut values = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let value = inner
                        .populate(item)
                        .within(|| Segment::Key(key.clone()))?;
                    values.push((key.clone(), value));
                }
                Value::Map(values)
            }
            (Shape::Tuple(slots), JsonValue::Object(entries)) => {
                let mut fields = Vec::with_capacity(slots.len());
                for slot in slots.iter() {
                    let item = entries.get(&slot.name).ok_or_else(|| ShapeError::MissingField {
                        field: slot.name.clone(),
                        path: Path::root(),
                    })?;
                    let value = slot
                        .shape
                        .populate(item)
                        .within(|| Segment::Field(slot.name.clone()))?;
                    fields.push(Field {
                        name: slot.name.clone(),
                        value,
                    });
                }
                if let Some(key) = entries.keys().find(|k| !slots.iter().any(|s| &s.name == *k)) {
                    return Err(ShapeError::UnknownField {
                        field: key.clone(),
                        path: Path::root(),
                    }
                    .into());
                }
                Value::Record(fields)
            }
            _ => return Err(mismatch(self, json).into()),
        };
        Ok(value)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Null => write!(f, "null"),
            Shape::Boolean => write!(f, "bool"),
            Shape::Int => write!(f, "i32"),
            Shape::Long => write!(f, "i64"),
            Shape::Float => write!(f, "f32"),
            Shape::Double => write!(f, "f64"),
            Shape::Bytes => write!(f, "bytes"),
            Shape::String => write!(f, "string"),
            Shape::Sequence(inner) => write!(f, "[{}]", inner),
            Shape::Mapping(inner) => write!(f, "{{string: {}}}", inner),
            Shape::Tuple(slots) => {
                write!(f, "(")?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", slot.name, slot.shape)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn integer(n: &serde_json::Number, json: &JsonValue, kind: &'static str) -> Result<i64> {
    if let Some(n) = n.as_i64() {
        return Ok(n);
    }
    if n.is_u64() {
        return Err(out_of_range(kind, json).into());
    }
    Err(ShapeError::TypeMismatch {
        expected: "an integer",
        actual: describe(json),
        path: Path::root(),
    }
    .into())
}

fn mismatch(shape: &Shape, json: &JsonValue) -> ShapeError {
    ShapeError::TypeMismatch {
        expected: shape.expected(),
        actual: describe(json),
        path: Path::root(),
    }
}

fn out_of_range(kind: &'static str, json: &JsonValue) -> EncodeError {
    EncodeError::OutOfRange {
        kind,
        value: describe(json),
        path: Path::root(),
    }
}

/// Short rendering of a JSON value for error messages
fn describe(json: &JsonValue) -> String {
    const MAX: usize = 40;
    match json {
        JsonValue::Array(items) => format!("an array of {} items", items.len()),
        JsonValue::Object(entries) => format!("an object with {} keys", entries.len()),
        scalar => {
            let text = scalar.to_string();
            if text.len() > MAX {
                let cut = (0..=MAX).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
                format!("{}...", &text[..cut])
            } else {
                text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn shape(text: &str) -> Shape {
        Shape::derive(&Schema::parse(text).unwrap())
    }

    #[test]
    fn test_derive() {
        assert_eq!(shape(r#""null""#), Shape::Null);
        assert_eq!(shape(r#"{"type": "float"}"#), Shape::Float);
        assert_eq!(
            shape(r#"{"type": "enum", "name":"suit", "symbols":["SPADES", "HEARTS"]}"#),
            Shape::String
        );
        assert_eq!(
            shape(r#"{"type": "array", "items": "boolean"}"#),
            Shape::Sequence(Box::new(Shape::Boolean))
        );
        assert_eq!(
            shape(r#"{"type": "map", "values": "long"}"#),
            Shape::Mapping(Box::new(Shape::Long))
        );
    }

    #[test]
    fn test_derive_record_slots() {
        let text = r#"{"type":"record","name":"person","fields":[
            {"name":"first-name","type":"string"},
            {"name":"tags","type":{"type":"array","items":"string"}}
        ]}"#;
        let derived = shape(text);
        assert_eq!(derived, shape(text));
        assert_eq!(
            derived,
            Shape::Tuple(Arc::from(vec![
                Slot {
                    name: "first-name".to_string(),
                    shape: Shape::String,
                },
                Slot {
                    name: "tags".to_string(),
                    shape: Shape::Sequence(Box::new(Shape::String)),
                },
            ]))
        );
        assert_eq!(derived.to_string(), r#"("first-name": string, "tags": [string])"#);
    }

    #[test]
    fn test_derive_shares_referenced_records() {
        let mut text = r#"{"type":"record","name":"T0","fields":[{"name":"v","type":"long"}]}"#
            .to_string();
        for i in 1..=48 {
            text = format!(
                r#"{{"type":"record","name":"T{}","fields":[{{"name":"a","type":{}}},{{"name":"b","type":"T{}"}}]}}"#,
                i,
                text,
                i - 1
            );
        }

        let mut derived = shape(&text);
        for _ in 0..48 {
            let next = match &derived {
                Shape::Tuple(slots) => match (&slots[0].shape, &slots[1].shape) {
                    (Shape::Tuple(a), Shape::Tuple(b)) => {
                        assert!(Arc::ptr_eq(a, b));
                        slots[0].shape.clone()
                    }
                    other => panic!("Expected two tuples, got {:?}", other),
                },
                other => panic!("Expected a tuple, got {:?}", other),
            };
            derived = next;
        }
        assert_eq!(derived.to_string(), r#"("v": i64)"#);
    }

    #[test]
    fn test_populate_scalars() {
        assert_eq!(Shape::Null.populate(&json!(null)).unwrap(), Value::Null);
        assert_eq!(Shape::Int.populate(&json!(123)).unwrap(), Value::Int(123));
        assert_eq!(Shape::Long.populate(&json!(-5)).unwrap(), Value::Long(-5));
        assert_eq!(Shape::Double.populate(&json!(3)).unwrap(), Value::Double(3.0));
        assert_eq!(
            Shape::Float.populate(&json!(123.1)).unwrap(),
            Value::Float(123.1)
        );
        assert_eq!(
            Shape::Bytes.populate(&json!("SEVMTE8=")).unwrap(),
            Value::Bytes(b"HELLO".to_vec())
        );
    }

    #[test]
    fn test_populate_range_errors() {
        for (shape, json) in [
            (Shape::Int, json!(2147483648i64)),
            (Shape::Int, json!(-2147483649i64)),
            (Shape::Long, json!(u64::MAX)),
            (Shape::Float, json!(1e300)),
        ] {
            match shape.populate(&json) {
                Err(Error::Encode(EncodeError::OutOfRange { .. })) => {}
                other => panic!("Expected out of range for {}, got {:?}", json, other),
            }
        }
    }

    #[test]
    fn test_populate_type_errors() {
        for (shape, json) in [
            (Shape::Null, json!(0)),
            (Shape::Boolean, json!("true")),
            (Shape::Int, json!(1.5)),
            (Shape::Long, json!("1")),
            (Shape::Double, json!(null)),
            (Shape::String, json!(["a"])),
            (Shape::Sequence(Box::new(Shape::Int)), json!({})),
        ] {
            match shape.populate(&json) {
                Err(Error::Shape(ShapeError::TypeMismatch { .. })) => {}
                other => panic!("Expected type mismatch for {}, got {:?}", json, other),
            }
        }

        assert!(matches!(
            Shape::Bytes.populate(&json!("not base64!")),
            Err(Error::Shape(ShapeError::InvalidBase64 { .. }))
        ));
    }

    #[test]
    fn test_populate_record_fields() {
        let derived = shape(
            r#"{"type":"record","fields":[{"name":"a","type":"int"},{"name":"b","type":"string"}]}"#,
        );

        // key order in JSON does not matter
        let value = derived.populate(&json!({"b": "x", "a": 1})).unwrap();
        assert_eq!(
            value,
            Value::Record(vec![
                Field {
                    name: "a".to_string(),
                    value: Value::Int(1),
                },
                Field {
                    name: "b".to_string(),
                    value: Value::String("x".to_string()),
                },
            ])
        );

        match derived.populate(&json!({"a": 1})) {
            Err(Error::Shape(ShapeError::MissingField { field, .. })) => assert_eq!(field, "b"),
            other => panic!("Expected missing field, got {:?}", other),
        }
        match derived.populate(&json!({"a": 1, "b": "x", "c": true})) {
            Err(Error::Shape(ShapeError::UnknownField { field, .. })) => assert_eq!(field, "c"),
            other => panic!("Expected unknown field, got {:?}", other),
        }
    }

    #[test]
    fn test_populate_error_path() {
        let derived = shape(
            r#"{"type":"record","fields":[
                {"name":"groups","type":{"type":"map","values":{"type":"array","items":"int"}}}
            ]}"#,
        );
        let err = derived
            .populate(&json!({"groups": {"x": [1, 2], "y": [3, "four"]}}))
            .unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), r#"$.groups["y"][1]"#);
        assert_eq!(
            err.to_string(),
            r#"JSON shape error: Expected an integer at $.groups["y"][1], got "four""#
        );
    }
}
