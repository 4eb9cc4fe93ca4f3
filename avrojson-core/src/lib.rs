//! Schema-driven conversion between JSON text and the Avro binary encoding
//!
//! A schema is parsed once into a [`Schema`], from which a [`Shape`] is
//! derived that JSON input must conform to. A [`Codec`] bundles both and
//! converts in either direction:
//!
//! ```
//! let schema = r#"{"type": "map", "values": "int"}"#;
//! let bytes = avrojson_core::encode(schema, br#"{"abc": 123}"#).unwrap();
//! assert_eq!(bytes, vec![0x02, 0x06, b'a', b'b', b'c', 0xf6, 0x01, 0x00]);
//!
//! let json = avrojson_core::decode(schema, &bytes).unwrap();
//! assert_eq!(json, br#"{"abc":123}"#.to_vec());
//! ```

pub mod binary;
pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod schema;
pub mod shape;

pub use codec::{decode, encode, Codec};
pub use config::CodecConfig;
pub use data::{Field, Value};
pub use error::{DecodeError, EncodeError, Error, Path, Result, SchemaError, Segment, ShapeError};
pub use schema::{EnumSchema, RecordField, RecordSchema, Schema, SchemaKind};
pub use shape::{Shape, Slot};
