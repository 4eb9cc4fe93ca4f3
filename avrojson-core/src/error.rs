// Error types for avrojson

use bstr::BStr;
use std::error::Error as StdError;
use std::fmt;
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for encode/decode calls
#[derive(Debug)]
pub enum Error {
    Schema(SchemaError),
    Shape(ShapeError),
    Encode(EncodeError),
    Decode(DecodeError),
    /// The JSON printer rejected a decoded value
    Json(serde_json::Error),
}

/// Location inside a schema document or a value, printed as `$.a[2]["k"]`.
///
/// Segments are stored innermost first: errors are raised at the leaf and the
/// enclosing walks prepend their own segment while the error propagates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Malformed or unsupported schema text
#[derive(Debug)]
pub enum SchemaError {
    Json(serde_json::Error),
    MissingAttribute { attribute: &'static str, path: Path },
    InvalidAttribute { attribute: &'static str, expected: &'static str, path: Path },
    UnknownType { name: String, path: Path },
    Unsupported { feature: String, path: Path },
    DuplicateSymbol { symbol: String, path: Path },
    DuplicateField { field: String, path: Path },
    DuplicateName { name: String, path: Path },
    EmptyName { path: Path },
}

/// Input JSON that does not fit the shape derived from the schema
#[derive(Debug)]
pub enum ShapeError {
    Json(serde_json::Error),
    TypeMismatch { expected: &'static str, actual: String, path: Path },
    MissingField { field: String, path: Path },
    UnknownField { field: String, path: Path },
    InvalidBase64 { reason: String, path: Path },
}

/// Values that cannot be written under the wire constraints of their type
#[derive(Debug)]
pub enum EncodeError {
    OutOfRange { kind: &'static str, value: String, path: Path },
    UnknownSymbol { symbol: String, symbols: Vec<String>, path: Path },
    ValueMismatch { expected: &'static str, actual: String, path: Path },
    Io(io::Error),
}

/// Truncated or corrupt binary input
#[derive(Debug)]
pub enum DecodeError {
    Truncated { offset: usize, needed: usize, remaining: usize, path: Path },
    VarintOverflow { offset: usize, path: Path },
    InvalidBoolean { offset: usize, byte: u8, path: Path },
    IntOutOfRange { offset: usize, value: i64, path: Path },
    NegativeLength { offset: usize, length: i64, path: Path },
    InvalidUtf8 { offset: usize, bytes: Vec<u8>, path: Path },
    EnumIndexOutOfRange { offset: usize, index: i64, symbols: usize, path: Path },
    NonFinite { offset: usize, path: Path },
    CollectionTooLarge { offset: usize, count: u64, limit: usize, path: Path },
    TrailingBytes { offset: usize, remaining: usize },
}

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter().rev()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn push_outer(&mut self, segment: Segment) {
        self.0.push(segment);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in self.segments() {
            match segment {
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Key(key) => write!(f, "[{:?}]", key)?,
            }
        }
        Ok(())
    }
}

impl SchemaError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            SchemaError::Json(_) => None,
            SchemaError::MissingAttribute { path, .. }
            | SchemaError::InvalidAttribute { path, .. }
            | SchemaError::UnknownType { path, .. }
            | SchemaError::Unsupported { path, .. }
            | SchemaError::DuplicateSymbol { path, .. }
            | SchemaError::DuplicateField { path, .. }
            | SchemaError::DuplicateName { path, .. }
            | SchemaError::EmptyName { path } => Some(path),
        }
    }

    fn within(mut self, segment: Segment) -> Self {
        match &mut self {
            SchemaError::Json(_) => {}
            SchemaError::MissingAttribute { path, .. }
            | SchemaError::InvalidAttribute { path, .. }
            | SchemaError::UnknownType { path, .. }
            | SchemaError::Unsupported { path, .. }
            | SchemaError::DuplicateSymbol { path, .. }
            | SchemaError::DuplicateField { path, .. }
            | SchemaError::DuplicateName { path, .. }
            | SchemaError::EmptyName { path } => path.push_outer(segment),
        }
        self
    }
}

impl ShapeError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ShapeError::Json(_) => None,
            ShapeError::TypeMismatch { path, .. }
            | ShapeError::MissingField { path, .. }
            | ShapeError::UnknownField { path, .. }
            | ShapeError::InvalidBase64 { path, .. } => Some(path),
        }
    }

    fn within(mut self, segment: Segment) -> Self {
        match &mut self {
            ShapeError::Json(_) => {}
            ShapeError::TypeMismatch { path, .. }
            | ShapeError::MissingField { path, .. }
            | ShapeError::UnknownField { path, .. }
            | ShapeError::InvalidBase64 { path, .. } => path.push_outer(segment),
        }
        self
    }
}

impl EncodeError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            EncodeError::Io(_) => None,
            EncodeError::OutOfRange { path, .. }
            | EncodeError::UnknownSymbol { path, .. }
            | EncodeError::ValueMismatch { path, .. } => Some(path),
        }
    }

    fn within(mut self, segment: Segment) -> Self {
        match &mut self {
            EncodeError::Io(_) => {}
            EncodeError::OutOfRange { path, .. }
            | EncodeError::UnknownSymbol { path, .. }
            | EncodeError::ValueMismatch { path, .. } => path.push_outer(segment),
        }
        self
    }
}

impl DecodeError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DecodeError::TrailingBytes { .. } => None,
            DecodeError::Truncated { path, .. }
            | DecodeError::VarintOverflow { path, .. }
            | DecodeError::InvalidBoolean { path, .. }
            | DecodeError::IntOutOfRange { path, .. }
            | DecodeError::NegativeLength { path, .. }
            | DecodeError::InvalidUtf8 { path, .. }
            | DecodeError::EnumIndexOutOfRange { path, .. }
            | DecodeError::NonFinite { path, .. }
            | DecodeError::CollectionTooLarge { path, .. } => Some(path),
        }
    }

    fn within(mut self, segment: Segment) -> Self {
        match &mut self {
            DecodeError::TrailingBytes { .. } => {}
            DecodeError::Truncated { path, .. }
            | DecodeError::VarintOverflow { path, .. }
            | DecodeError::InvalidBoolean { path, .. }
            | DecodeError::IntOutOfRange { path, .. }
            | DecodeError::NegativeLength { path, .. }
            | DecodeError::InvalidUtf8 { path, .. }
            | DecodeError::EnumIndexOutOfRange { path, .. }
            | DecodeError::NonFinite { path, .. }
            | DecodeError::CollectionTooLarge { path, .. } => path.push_outer(segment),
        }
        self
    }
}

impl Error {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Schema(e) => e.path(),
            Error::Shape(e) => e.path(),
            Error::Encode(e) => e.path(),
            Error::Decode(e) => e.path(),
            Error::Json(_) => None,
        }
    }

    fn within(self, segment: Segment) -> Self {
        match self {
            Error::Schema(e) => Error::Schema(e.within(segment)),
            Error::Shape(e) => Error::Shape(e.within(segment)),
            Error::Encode(e) => Error::Encode(e.within(segment)),
            Error::Decode(e) => Error::Decode(e.within(segment)),
            Error::Json(e) => Error::Json(e),
        }
    }
}

/// Prepends a path segment to the error of a failed child walk.
pub(crate) trait Within {
    fn within(self, segment: impl FnOnce() -> Segment) -> Self;
}

macro_rules! impl_within {
    ($($error:ty),*) => {
        $(
            impl<T> Within for std::result::Result<T, $error> {
                #[inline]
                fn within(self, segment: impl FnOnce() -> Segment) -> Self {
                    self.map_err(|e| e.within(segment()))
                }
            }
        )*
    };
}

impl_within!(Error, SchemaError, ShapeError, EncodeError, DecodeError);

// Error trait implementations

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Schema(e) => Some(e),
            Error::Shape(e) => Some(e),
            Error::Encode(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Json(e) => Some(e),
        }
    }
}

impl StdError for SchemaError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SchemaError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl StdError for ShapeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ShapeError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl StdError for EncodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            EncodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl StdError for DecodeError {}

// Display implementations

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema(e) => write!(f, "Schema error: {}", e),
            Error::Shape(e) => write!(f, "JSON shape error: {}", e),
            Error::Encode(e) => write!(f, "Encode error: {}", e),
            Error::Decode(e) => write!(f, "Decode error: {}", e),
            Error::Json(e) => write!(f, "JSON output error: {}", e),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Json(e) => write!(f, "Schema is not valid JSON: {}", e),
            SchemaError::MissingAttribute { attribute, path } => {
                write!(f, "Missing attribute '{}' at {}", attribute, path)
            }
            SchemaError::InvalidAttribute {
                attribute,
                expected,
                path,
            } => {
                write!(
                    f,
                    "Attribute '{}' at {} must be {}",
                    attribute, path, expected
                )
            }
            SchemaError::UnknownType { name, path } => {
                write!(f, "Unknown type '{}' at {}", name, path)
            }
            SchemaError::Unsupported { feature, path } => {
                write!(f, "Unsupported schema feature '{}' at {}", feature, path)
            }
            SchemaError::DuplicateSymbol { symbol, path } => {
                write!(f, "Duplicate enum symbol '{}' at {}", symbol, path)
            }
            SchemaError::DuplicateField { field, path } => {
                write!(f, "Duplicate record field '{}' at {}", field, path)
            }
            SchemaError::DuplicateName { name, path } => {
                write!(f, "Named type '{}' redefined at {}", name, path)
            }
            SchemaError::EmptyName { path } => write!(f, "Empty name at {}", path),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Json(e) => write!(f, "Input is not valid JSON: {}", e),
            ShapeError::TypeMismatch {
                expected,
                actual,
                path,
            } => {
                write!(f, "Expected {} at {}, got {}", expected, path, actual)
            }
            ShapeError::MissingField { field, path } => {
                write!(f, "Missing required field '{}' at {}", field, path)
            }
            ShapeError::UnknownField { field, path } => {
                write!(f, "Field '{}' at {} is not declared by the record", field, path)
            }
            ShapeError::InvalidBase64 { reason, path } => {
                write!(f, "Invalid base64 bytes at {}: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::OutOfRange { kind, value, path } => {
                write!(f, "Value {} at {} is out of range for {}", value, path, kind)
            }
            EncodeError::UnknownSymbol {
                symbol,
                symbols,
                path,
            } => {
                write!(
                    f,
                    "Symbol '{}' at {} is not one of [{}]",
                    symbol,
                    path,
                    symbols.join(", ")
                )
            }
            EncodeError::ValueMismatch {
                expected,
                actual,
                path,
            } => {
                write!(f, "Expected {} value at {}, got {}", expected, path, actual)
            }
            EncodeError::Io(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated {
                offset,
                needed,
                remaining,
                path,
            } => {
                write!(
                    f,
                    "Truncated input at offset {} ({}): needed {} bytes, {} remaining",
                    offset, path, needed, remaining
                )
            }
            DecodeError::VarintOverflow { offset, path } => {
                write!(f, "Varint at offset {} ({}) exceeds 64 bits", offset, path)
            }
            DecodeError::InvalidBoolean { offset, byte, path } => {
                write!(
                    f,
                    "Invalid boolean byte 0x{:02x} at offset {} ({})",
                    byte, offset, path
                )
            }
            DecodeError::IntOutOfRange {
                offset,
                value,
                path,
            } => {
                write!(
                    f,
                    "Value {} at offset {} ({}) does not fit in an int",
                    value, offset, path
                )
            }
            DecodeError::NegativeLength {
                offset,
                length,
                path,
            } => {
                write!(f, "Negative length {} at offset {} ({})", length, offset, path)
            }
            DecodeError::InvalidUtf8 {
                offset,
                bytes,
                path,
            } => {
                write!(
                    f,
                    "Invalid UTF-8 string {:?} at offset {} ({})",
                    BStr::new(bytes),
                    offset,
                    path
                )
            }
            DecodeError::EnumIndexOutOfRange {
                offset,
                index,
                symbols,
                path,
            } => {
                write!(
                    f,
                    "Enum index {} at offset {} ({}) is out of range for {} symbols",
                    index, offset, path, symbols
                )
            }
            DecodeError::NonFinite { offset, path } => {
                write!(
                    f,
                    "Non-finite floating point value at offset {} ({}) has no JSON form",
                    offset, path
                )
            }
            DecodeError::CollectionTooLarge {
                offset,
                count,
                limit,
                path,
            } => {
                write!(
                    f,
                    "Collection at offset {} ({}) declares {} items, limit is {}",
                    offset, path, count, limit
                )
            }
            DecodeError::TrailingBytes { offset, remaining } => {
                write!(
                    f,
                    "{} unread bytes after the value ending at offset {}",
                    remaining, offset
                )
            }
        }
    }
}

// Convenience From implementations for error composition

impl From<SchemaError> for Error {
    fn from(error: SchemaError) -> Self {
        Error::Schema(error)
    }
}

impl From<ShapeError> for Error {
    fn from(error: ShapeError) -> Self {
        Error::Shape(error)
    }
}

impl From<EncodeError> for Error {
    fn from(error: EncodeError) -> Self {
        Error::Encode(error)
    }
}

impl From<DecodeError> for Error {
    fn from(error: DecodeError) -> Self {
        Error::Decode(error)
    }
}

impl From<io::Error> for EncodeError {
    fn from(error: io::Error) -> Self {
        EncodeError::Io(error)
    }
}
