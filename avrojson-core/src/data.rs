// Core value types for avrojson

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Native value produced from JSON input or from binary input
///
/// One variant per value shape. Int/Long and Float/Double are kept apart so
/// that JSON printing uses the shortest form of the declared width.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    /// Entries in input (or wire) order
    Map(Vec<(String, Value)>),
    /// Fields in schema declaration order
    Record(Vec<Field>),
}

/// Named field in a record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

impl Value {
    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|f| f.name == name).map(|f| &f.value),
            _ => None,
        }
    }

    /// Render as compact JSON text
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i32(*n),
            Value::Long(n) => serializer.serialize_i64(*n),
            Value::Float(x) if x.is_finite() => serializer.serialize_f32(*x),
            Value::Double(x) if x.is_finite() => serializer.serialize_f64(*x),
            Value::Float(x) => Err(S::Error::custom(format!("float {} has no JSON form", x))),
            Value::Double(x) => Err(S::Error::custom(format!("double {} has no JSON form", x))),
            Value::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for field in fields {
                    map.serialize_entry(&field.name, &field.value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(value: &Value) -> String {
        String::from_utf8(value.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_scalar_json() {
        assert_eq!(json(&Value::Null), "null");
        assert_eq!(json(&Value::Boolean(true)), "true");
        assert_eq!(json(&Value::Int(-7)), "-7");
        assert_eq!(json(&Value::Long(i64::MAX)), "9223372036854775807");
        assert_eq!(json(&Value::Float(123.1)), "123.1");
        assert_eq!(json(&Value::Double(123.2)), "123.2");
        assert_eq!(json(&Value::Bytes(b"HELLO".to_vec())), "\"SEVMTE8=\"");
        assert_eq!(json(&Value::String("DONE".to_string())), "\"DONE\"");
    }

    #[test]
    fn test_non_finite_is_rejected() {
        assert!(Value::Double(f64::NAN).to_json().is_err());
        assert!(Value::Float(f32::INFINITY).to_json().is_err());
    }

    #[test]
    fn test_composite_json_keeps_order() {
        let value = Value::Record(vec![
            Field {
                name: "z".to_string(),
                value: Value::Map(vec![
                    ("b".to_string(), Value::Long(1)),
                    ("a".to_string(), Value::Long(2)),
                ]),
            },
            Field {
                name: "a".to_string(),
                value: Value::Array(vec![Value::Boolean(true), Value::Boolean(false)]),
            },
        ]);
        assert_eq!(json(&value), r#"{"z":{"b":1,"a":2},"a":[true,false]}"#);
        assert_eq!(value.field("a").map(Value::kind_name), Some("array"));
        assert_eq!(value.field("missing"), None);
    }
}
