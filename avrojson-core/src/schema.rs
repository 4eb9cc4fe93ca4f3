// Schema layer - the recursive Avro type grammar

use crate::error::{Path, SchemaError, Segment, Within};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Parsed Avro schema
///
/// An acyclic graph: named types referenced after their definition share the
/// definition's node, so a schema that references a type many times stays
/// the size of its text. There are no back references, so every walk over a
/// `Schema` terminates.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Enum(Arc<EnumSchema>),
    Array(Box<Schema>),
    Map(Box<Schema>),
    Record(Arc<RecordSchema>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// Full name including the namespace, if the enum is named
    pub name: Option<String>,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Full name including the namespace, if the record is named
    pub name: Option<String>,
    pub fields: Vec<RecordField>,
    min_encoded_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Enum,
    Array,
    Map,
    Record,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Enum => "enum",
            SchemaKind::Array => "array",
            SchemaKind::Map => "map",
            SchemaKind::Record => "record",
        }
    }

    fn primitive(name: &str) -> Option<Schema> {
        let schema = match name {
            "null" => Schema::Null,
            "boolean" => Schema::Boolean,
            "int" => Schema::Int,
            "long" => Schema::Long,
            "float" => Schema::Float,
            "double" => Schema::Double,
            "bytes" => Schema::Bytes,
            "string" => Schema::String,
            _ => return None,
        };
        Some(schema)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RecordSchema {
    pub fn new(name: Option<String>, fields: Vec<RecordField>) -> Self {
        let min_encoded_len = fields
            .iter()
            .fold(0usize, |len, f| len.saturating_add(f.schema.min_encoded_len()));
        RecordSchema {
            name,
            fields,
            min_encoded_len,
        }
    }
}

impl Schema {
    /// Parse schema text
    pub fn parse(text: &str) -> Result<Schema, SchemaError> {
        let json: JsonValue = serde_json::from_str(text).map_err(SchemaError::Json)?;
        let schema = Schema::from_json(&json)?;
        tracing::debug!(kind = %schema.kind(), "parsed schema");
        Ok(schema)
    }

    /// Build a schema from an already parsed JSON document
    pub fn from_json(json: &JsonValue) -> Result<Schema, SchemaError> {
        Parser::default().parse(json, None)
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            Schema::Null => SchemaKind::Null,
            Schema::Boolean => SchemaKind::Boolean,
            Schema::Int => SchemaKind::Int,
            Schema::Long => SchemaKind::Long,
            Schema::Float => SchemaKind::Float,
            Schema::Double => SchemaKind::Double,
            Schema::Bytes => SchemaKind::Bytes,
            Schema::String => SchemaKind::String,
            Schema::Enum(_) => SchemaKind::Enum,
            Schema::Array(_) => SchemaKind::Array,
            Schema::Map(_) => SchemaKind::Map,
            Schema::Record(_) => SchemaKind::Record,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Schema::Enum(e) => e.name.as_deref(),
            Schema::Record(r) => r.name.as_deref(),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&Schema> {
        match self {
            Schema::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&Schema> {
        match self {
            Schema::Map(values) => Some(values),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[RecordField]> {
        match self {
            Schema::Record(r) => Some(&r.fields),
            _ => None,
        }
    }

    pub fn symbols(&self) -> Option<&[String]> {
        match self {
            Schema::Enum(e) => Some(&e.symbols),
            _ => None,
        }
    }

    /// Fewest bytes any value of this schema occupies on the wire
    ///
    /// Records carry the sum of their fields, computed once when the record
    /// is built.
    pub fn min_encoded_len(&self) -> usize {
        match self {
            Schema::Null => 0,
            Schema::Float => 4,
            Schema::Double => 8,
            Schema::Record(record) => record.min_encoded_len,
            // one byte of varint, length, index or block count
            _ => 1,
        }
    }

    /// Canonical JSON form
    ///
    /// Primitives render as bare type names and only attributes that affect
    /// the encoding are kept. A named type is written out in full the first
    /// time and by name afterwards, so the output parses back to an equal
    /// schema.
    pub fn to_json(&self) -> JsonValue {
        let mut emitted = HashSet::new();
        self.canonical(&mut emitted)
    }

    fn canonical(&self, emitted: &mut HashSet<String>) -> JsonValue {
        match self {
            Schema::Enum(e) => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("enum"));
                if let Some(name) = &e.name {
                    if !emitted.insert(name.clone()) {
                        return json!(name);
                    }
                    obj.insert("name".to_string(), json!(name));
                }
                obj.insert("symbols".to_string(), json!(e.symbols));
                JsonValue::Object(obj)
            }
            Schema::Array(items) => json!({"type": "array", "items": items.canonical(emitted)}),
            Schema::Map(values) => json!({"type": "map", "values": values.canonical(emitted)}),
            Schema::Record(r) => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("record"));
                if let Some(name) = &r.name {
                    if !emitted.insert(name.clone()) {
                        return json!(name);
                    }
                    obj.insert("name".to_string(), json!(name));
                }
                let fields: Vec<JsonValue> = r
                    .fields
                    .iter()
                    .map(|f| json!({"name": f.name, "type": f.schema.canonical(emitted)}))
                    .collect();
                obj.insert("fields".to_string(), JsonValue::Array(fields));
                JsonValue::Object(obj)
            }
            primitive => json!(primitive.kind().as_str()),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Recursive-descent conversion from a JSON document to a `Schema`
#[derive(Default)]
struct Parser {
    /// Completed named types by full name
    named: HashMap<String, Schema>,
    /// Records whose fields are being parsed
    defining: HashSet<String>,
}

impl Parser {
    fn parse(&mut self, json: &JsonValue, namespace: Option<&str>) -> Result<Schema, SchemaError> {
        match json {
            JsonValue::String(name) => self.resolve(name, namespace),
            JsonValue::Array(_) => Err(unsupported("union")),
            JsonValue::Object(obj) => self.parse_object(obj, namespace),
            _ => Err(SchemaError::InvalidAttribute {
                attribute: "type",
                expected: "a type name, an object or an array",
                path: Path::root(),
            }),
        }
    }

    fn parse_object(
        &mut self,
        obj: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaError> {
        let type_json = obj.get("type").ok_or(SchemaError::MissingAttribute {
            attribute: "type",
            path: Path::root(),
        })?;

        let type_name = match type_json {
            JsonValue::String(type_name) => type_name.as_str(),
            // {"type": {...}} or {"type": [...]}
            other => {
                return self
                    .parse(other, namespace)
                    .within(|| Segment::Field("type".to_string()))
            }
        };

        match type_name {
            "enum" => self.parse_enum(obj, namespace),
            "array" => {
                let items = required(obj, "items")?;
                let items = self
                    .parse(items, namespace)
                    .within(|| Segment::Field("items".to_string()))?;
                Ok(Schema::Array(Box::new(items)))
            }
            "map" => {
                let values = required(obj, "values")?;
                let values = self
                    .parse(values, namespace)
                    .within(|| Segment::Field("values".to_string()))?;
                Ok(Schema::Map(Box::new(values)))
            }
            "record" | "error" => self.parse_record(obj, namespace),
            "fixed" => Err(unsupported("fixed")),
            other => self
                .resolve(other, namespace)
                .within(|| Segment::Field("type".to_string())),
        }
    }

    fn parse_enum(
        &mut self,
        obj: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaError> {
        let name = full_name(obj, namespace)?;

        let invalid_symbols = || SchemaError::InvalidAttribute {
            attribute: "symbols",
            expected: "a non-empty array of strings",
            path: Path::root(),
        };
        let symbols_json = required(obj, "symbols")?
            .as_array()
            .filter(|symbols| !symbols.is_empty())
            .ok_or_else(invalid_symbols)?;

        let mut symbols: Vec<String> = Vec::with_capacity(symbols_json.len());
        for (i, symbol) in symbols_json.iter().enumerate() {
            let symbol = symbol.as_str().ok_or_else(invalid_symbols)?;
            if symbol.is_empty() {
                return Err(SchemaError::EmptyName {
                    path: Path::root(),
                })
                .within(|| Segment::Index(i))
                .within(|| Segment::Field("symbols".to_string()));
            }
            if symbols.iter().any(|s| s == symbol) {
                return Err(SchemaError::DuplicateSymbol {
                    symbol: symbol.to_string(),
                    path: Path::root(),
                });
            }
            symbols.push(symbol.to_string());
        }

        let schema = Schema::Enum(Arc::new(EnumSchema {
            name: name.clone(),
            symbols,
        }));
        if let Some(name) = name {
            self.register(name, &schema)?;
        }
        Ok(schema)
    }

    fn parse_record(
        &mut self,
        obj: &Map<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaError> {
        let name = full_name(obj, namespace)?;
        let inner_namespace = match &name {
            Some(name) => name.rsplit_once('.').map(|(ns, _)| ns),
            None => namespace,
        };

        let fields_json = required(obj, "fields")?
            .as_array()
            .ok_or(SchemaError::InvalidAttribute {
                attribute: "fields",
                expected: "an array",
                path: Path::root(),
            })?;

        if let Some(name) = &name {
            self.defining.insert(name.clone());
        }

        let mut fields: Vec<RecordField> = Vec::with_capacity(fields_json.len());
        for (i, field_json) in fields_json.iter().enumerate() {
            let field = self
                .parse_field(field_json, inner_namespace)
                .within(|| Segment::Index(i))
                .within(|| Segment::Field("fields".to_string()))?;
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    field: field.name,
                    path: Path::root(),
                });
            }
            fields.push(field);
        }

        let schema = Schema::Record(Arc::new(RecordSchema::new(name.clone(), fields)));
        if let Some(name) = name {
            self.defining.remove(&name);
            self.register(name, &schema)?;
        }
        Ok(schema)
    }

    fn parse_field(
        &mut self,
        json: &JsonValue,
        namespace: Option<&str>,
    ) -> Result<RecordField, SchemaError> {
        let obj = json.as_object().ok_or(SchemaError::InvalidAttribute {
            attribute: "fields",
            expected: "an array of objects",
            path: Path::root(),
        })?;
        let name = required(obj, "name")?
            .as_str()
            .ok_or(SchemaError::InvalidAttribute {
                attribute: "name",
                expected: "a string",
                path: Path::root(),
            })?;
        if name.is_empty() {
            return Err(SchemaError::EmptyName { path: Path::root() });
        }
        let schema = self
            .parse(required(obj, "type")?, namespace)
            .within(|| Segment::Field("type".to_string()))?;
        Ok(RecordField {
            name: name.to_string(),
            schema,
        })
    }

    /// Resolve a primitive name or a reference to a named type
    fn resolve(&self, name: &str, namespace: Option<&str>) -> Result<Schema, SchemaError> {
        if let Some(primitive) = SchemaKind::primitive(name) {
            return Ok(primitive);
        }
        if name == "fixed" {
            return Err(unsupported("fixed"));
        }

        let qualified = match namespace {
            Some(ns) if !name.contains('.') => Some(format!("{}.{}", ns, name)),
            _ => None,
        };
        for candidate in qualified.as_deref().into_iter().chain(Some(name)) {
            if let Some(schema) = self.named.get(candidate) {
                return Ok(schema.clone());
            }
            if self.defining.contains(candidate) {
                return Err(unsupported(&format!("recursive type '{}'", candidate)));
            }
        }

        Err(SchemaError::UnknownType {
            name: name.to_string(),
            path: Path::root(),
        })
    }

    fn register(&mut self, name: String, schema: &Schema) -> Result<(), SchemaError> {
        if self.named.contains_key(&name) {
            return Err(SchemaError::DuplicateName {
                name,
                path: Path::root(),
            });
        }
        self.named.insert(name, schema.clone());
        Ok(())
    }
}

fn required<'a>(
    obj: &'a Map<String, JsonValue>,
    attribute: &'static str,
) -> Result<&'a JsonValue, SchemaError> {
    obj.get(attribute).ok_or(SchemaError::MissingAttribute {
        attribute,
        path: Path::root(),
    })
}

fn unsupported(feature: &str) -> SchemaError {
    SchemaError::Unsupported {
        feature: feature.to_string(),
        path: Path::root(),
    }
}

/// Full name of an optionally named type: `namespace.name`
///
/// A dotted name carries its own namespace; otherwise the `namespace`
/// attribute applies, falling back to the enclosing namespace.
fn full_name(
    obj: &Map<String, JsonValue>,
    enclosing: Option<&str>,
) -> Result<Option<String>, SchemaError> {
    let name = match obj.get("name") {
        None => return Ok(None),
        Some(JsonValue::String(name)) => name,
        Some(_) => {
            return Err(SchemaError::InvalidAttribute {
                attribute: "name",
                expected: "a string",
                path: Path::root(),
            })
        }
    };
    if name.is_empty() {
        return Err(SchemaError::EmptyName { path: Path::root() });
    }
    // references to a primitive name always resolve to the primitive
    let short_name = name.rsplit('.').next().unwrap_or(name);
    if SchemaKind::primitive(short_name).is_some() {
        return Err(SchemaError::InvalidAttribute {
            attribute: "name",
            expected: "a name other than a primitive type",
            path: Path::root(),
        });
    }
    if name.contains('.') {
        return Ok(Some(name.clone()));
    }

    let namespace = match obj.get("namespace") {
        None | Some(JsonValue::Null) => enclosing,
        Some(JsonValue::String(ns)) if ns.is_empty() => None,
        Some(JsonValue::String(ns)) => Some(ns.as_str()),
        Some(_) => {
            return Err(SchemaError::InvalidAttribute {
                attribute: "namespace",
                expected: "a string",
                path: Path::root(),
            })
        }
    };
    Ok(Some(match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.clone(),
    }))
}
