// Codec layer - schema-directed walks between JSON and binary

use crate::binary::{self, Reader};
use crate::config::CodecConfig;
use crate::data::{Field, Value};
use crate::error::{DecodeError, EncodeError, Error, Path, Result, Segment, ShapeError, Within};
use crate::schema::Schema;
use crate::shape::Shape;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Write;

/// Encode JSON text into the binary encoding of `schema_text`
pub fn encode(schema_text: &str, json: &[u8]) -> Result<Vec<u8>> {
    Codec::new(schema_text)?.encode(json)
}

/// Decode binary data written with `schema_text` back into JSON text
pub fn decode(schema_text: &str, bytes: &[u8]) -> Result<Vec<u8>> {
    Codec::new(schema_text)?.decode(bytes)
}

/// A parsed schema together with its derived shape
///
/// Immutable once built, so one `Codec` can serve any number of calls, from
/// any number of threads.
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Schema,
    shape: Shape,
    config: CodecConfig,
}

impl Codec {
    pub fn new(schema_text: &str) -> Result<Self> {
        Ok(Codec::from_schema(Schema::parse(schema_text)?))
    }

    pub fn from_schema(schema: Schema) -> Self {
        let shape = Shape::derive(&schema);
        Codec {
            schema,
            shape,
            config: CodecConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// JSON text → binary
    pub fn encode(&self, json: &[u8]) -> Result<Vec<u8>> {
        let json: JsonValue = serde_json::from_slice(json).map_err(ShapeError::Json)?;
        let value = self.shape.populate(&json)?;
        self.encode_value(&value)
    }

    /// JSON text → binary, written to `writer`
    ///
    /// The sink only sees output once the whole value encoded successfully.
    /// Returns the number of bytes written.
    pub fn encode_to<W: Write>(&self, json: &[u8], writer: &mut W) -> Result<usize> {
        let bytes = self.encode(json)?;
        writer.write_all(&bytes).map_err(EncodeError::from)?;
        Ok(bytes.len())
    }

    /// Native value → binary
    pub fn encode_value(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_value(&mut out, &self.schema, value, &self.config)?;
        tracing::trace!(bytes = out.len(), kind = %self.schema.kind(), "encoded value");
        Ok(out)
    }

    /// Binary → JSON text
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let value = self.decode_value(bytes)?;
        value.to_json().map_err(Error::Json)
    }

    /// Binary → native value
    pub fn decode_value(&self, bytes: &[u8]) -> Result<Value> {
        // a null value occupies no bytes at all
        if bytes.is_empty() && self.schema == Schema::Null {
            return Ok(Value::Null);
        }

        let mut decoder = Decoder::new(bytes, &self.config);
        let value = decoder.read_value(&self.schema)?;
        let reader = &decoder.reader;
        if !reader.is_empty() && !self.config.allow_trailing_bytes {
            return Err(DecodeError::TrailingBytes {
                offset: reader.offset(),
                remaining: reader.remaining(),
            }
            .into());
        }
        tracing::trace!(consumed = reader.offset(), kind = %self.schema.kind(), "decoded value");
        Ok(value)
    }
}

// Encoding

fn write_value(
    out: &mut Vec<u8>,
    schema: &Schema,
    value: &Value,
    config: &CodecConfig,
) -> Result<(), EncodeError> {
    match (schema, value) {
        (Schema::Null, Value::Null) => Ok(()),
        (Schema::Boolean, Value::Boolean(b)) => binary::write_boolean(out, *b),
        (Schema::Int, Value::Int(n)) => binary::write_int(out, *n),
        (Schema::Long, Value::Long(n)) => binary::write_long(out, *n),
        (Schema::Float, Value::Float(x)) => binary::write_float(out, *x),
        (Schema::Double, Value::Double(x)) => binary::write_double(out, *x),
        (Schema::Bytes, Value::Bytes(bytes)) => binary::write_bytes(out, bytes),
        (Schema::String, Value::String(s)) => binary::write_string(out, s),
        (Schema::Enum(e), Value::String(symbol)) => {
            let index = e.symbols.iter().position(|s| s == symbol).ok_or_else(|| {
                EncodeError::UnknownSymbol {
                    symbol: symbol.clone(),
                    symbols: e.symbols.clone(),
                    path: Path::root(),
                }
            })?;
            binary::write_long(out, index as i64)
        }
        (Schema::Array(items), Value::Array(values)) => {
            write_blocks(out, values, config, |out, i, item| {
                write_value(out, items, item, config).within(|| Segment::Index(i))
            })
        }
        (Schema::Map(values), Value::Map(entries)) => {
            write_blocks(out, entries, config, |out, _, (key, item)| {
                binary::write_string(out, key)?;
                write_value(out, values, item, config).within(|| Segment::Key(key.clone()))
            })
        }
        (Schema::Record(record), Value::Record(fields)) => {
            for field_schema in &record.fields {
                let field = find_field(fields, &field_schema.name)?;
                write_value(out, &field_schema.schema, &field.value, config)
                    .within(|| Segment::Field(field_schema.name.clone()))?;
            }
            Ok(())
        }
        _ => Err(EncodeError::ValueMismatch {
            expected: schema.kind().as_str(),
            actual: value.kind_name().to_string(),
            path: Path::root(),
        }),
    }
}

fn find_field<'v>(fields: &'v [Field], name: &str) -> Result<&'v Field, EncodeError> {
    fields
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| EncodeError::ValueMismatch {
            expected: "record field",
            actual: format!("no field named '{}'", name),
            path: Path::root(),
        })
}

/// Write `items` as a sequence of blocks followed by the zero-count terminator
fn write_blocks<T>(
    out: &mut Vec<u8>,
    items: &[T],
    config: &CodecConfig,
    mut write_item: impl FnMut(&mut Vec<u8>, usize, &T) -> Result<(), EncodeError>,
) -> Result<(), EncodeError> {
    let mut index = 0;
    for block in items.chunks(config.block_len(items.len())) {
        if config.sized_blocks {
            let mut scratch = Vec::new();
            for item in block {
                write_item(&mut scratch, index, item)?;
                index += 1;
            }
            binary::write_long(out, -(block.len() as i64))?;
            binary::write_long(out, scratch.len() as i64)?;
            out.extend_from_slice(&scratch);
        } else {
            binary::write_long(out, block.len() as i64)?;
            for item in block {
                write_item(out, index, item)?;
                index += 1;
            }
        }
    }
    binary::write_long(out, 0)
}

// Decoding

/// Reader state for one decode call
///
/// `items_left` is shared by every array and map in the value, so nesting
/// collections cannot multiply the configured item limit.
struct Decoder<'a, 'c> {
    reader: Reader<'a>,
    config: &'c CodecConfig,
    items_left: usize,
}

impl<'a, 'c> Decoder<'a, 'c> {
    fn new(bytes: &'a [u8], config: &'c CodecConfig) -> Self {
        Decoder {
            reader: Reader::new(bytes),
            config,
            items_left: config.max_collection_items,
        }
    }

    fn read_value(&mut self, schema: &Schema) -> Result<Value, DecodeError> {
        let reader = &mut self.reader;
        let value = match schema {
            Schema::Null => Value::Null,
            Schema::Boolean => Value::Boolean(reader.read_boolean()?),
            Schema::Int => Value::Int(reader.read_int()?),
            Schema::Long => Value::Long(reader.read_long()?),
            Schema::Float => {
                let offset = reader.offset();
                let x = reader.read_float()?;
                if !x.is_finite() {
                    return Err(non_finite(offset));
                }
                Value::Float(x)
            }
            Schema::Double => {
                let offset = reader.offset();
                let x = reader.read_double()?;
                if !x.is_finite() {
                    return Err(non_finite(offset));
                }
                Value::Double(x)
            }
            Schema::Bytes => Value::Bytes(reader.read_bytes()?.to_vec()),
            Schema::String => Value::String(reader.read_string()?.to_string()),
            Schema::Enum(e) => {
                let offset = reader.offset();
                let index = reader.read_long()?;
                let symbol = usize::try_from(index)
                    .ok()
                    .and_then(|i| e.symbols.get(i))
                    .ok_or(DecodeError::EnumIndexOutOfRange {
                        offset,
                        index,
                        symbols: e.symbols.len(),
                        path: Path::root(),
                    })?;
                Value::String(symbol.clone())
            }
            Schema::Array(items) => {
                let values = self.read_blocks(items.min_encoded_len(), |decoder, i| {
                    decoder.read_value(items).within(|| Segment::Index(i))
                })?;
                Value::Array(values)
            }
            Schema::Map(values) => {
                let min_len = values.min_encoded_len().saturating_add(1);
                let pairs = self.read_blocks(min_len, |decoder, i| {
                    let key = decoder
                        .reader
                        .read_string()
                        .within(|| Segment::Index(i))?
                        .to_string();
                    let value = decoder
                        .read_value(values)
                        .within(|| Segment::Key(key.clone()))?;
                    Ok((key, value))
                })?;

                // a repeated key keeps its first position and its last value
                let mut index: HashMap<String, usize> = HashMap::new();
                let mut entries: Vec<(String, Value)> = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    match index.get(&key) {
                        Some(&at) => entries[at].1 = value,
                        None => {
                            index.insert(key.clone(), entries.len());
                            entries.push((key, value));
                        }
                    }
                }
                Value::Map(entries)
            }
            Schema::Record(record) => {
                let mut fields = Vec::with_capacity(record.fields.len());
                for field_schema in &record.fields {
                    let value = self
                        .read_value(&field_schema.schema)
                        .within(|| Segment::Field(field_schema.name.clone()))?;
                    fields.push(Field {
                        name: field_schema.name.clone(),
                        value,
                    });
                }
                Value::Record(fields)
            }
        };
        Ok(value)
    }

    /// Read blocks until the zero-count terminator
    ///
    /// A negative count means the block is prefixed with its byte size, which
    /// is read and skipped over; items are still decoded one by one.
    fn read_blocks<T>(
        &mut self,
        min_item_len: usize,
        mut read_item: impl FnMut(&mut Self, usize) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let mut items = Vec::new();
        loop {
            let offset = self.reader.offset();
            let count = self.reader.read_long()?;
            if count == 0 {
                return Ok(items);
            }
            if count < 0 {
                self.reader.read_long()?;
            }
            let count = count.unsigned_abs();

            if count > self.items_left as u64 {
                let limit = self.config.max_collection_items;
                return Err(DecodeError::CollectionTooLarge {
                    offset,
                    count: ((limit - self.items_left) as u64).saturating_add(count),
                    limit,
                    path: Path::root(),
                });
            }
            // every item needs at least `min_item_len` bytes, so a count the
            // input cannot hold is rejected before allocating for it
            let remaining = self.reader.remaining();
            let needed = count.saturating_mul(min_item_len as u64);
            if needed > remaining as u64 {
                return Err(DecodeError::Truncated {
                    offset: self.reader.offset(),
                    needed: usize::try_from(needed).unwrap_or(usize::MAX),
                    remaining,
                    path: Path::root(),
                });
            }
            self.items_left -= count as usize;

            // zero-width items are bounded by the item limit alone, so the
            // vector grows as they are read instead of up front
            let capacity = count.min((remaining / min_item_len.max(1)) as u64);
            items.reserve(capacity as usize);
            for _ in 0..count {
                let i = items.len();
                items.push(read_item(self, i)?);
            }
        }
    }
}

fn non_finite(offset: usize) -> DecodeError {
    DecodeError::NonFinite {
        offset,
        path: Path::root(),
    }
}
