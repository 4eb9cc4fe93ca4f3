// Binary layer - primitive Avro wire encoding
//
// Integers are zig-zag folded and written as little-endian base-128 varints,
// floating point values as little-endian IEEE-754, and bytes/strings as a
// varint length followed by the raw bytes. Nothing here knows about schemas.

use crate::error::{DecodeError, EncodeError, Path};
use bstr::ByteSlice;
use std::io::Write;

/// Longest varint a 64-bit value can produce
pub const MAX_VARINT_LEN: usize = 10;

/// Zig-zag encoding converts signed integers to unsigned
///
/// Small magnitudes of either sign map to small unsigned values, so they use
/// fewer varint bytes. Formula: (n << 1) ^ (n >> 63)
#[inline]
pub fn zig_zag_encode(n: i64) -> u64 {
    ((n as u64) << 1) ^ ((n >> 63) as u64)
}

/// Decode a zig-zag encoded value back to a signed integer
#[inline]
pub fn zig_zag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Number of bytes `write_long` emits for `value`
pub fn varint_len(value: i64) -> usize {
    let mut n = zig_zag_encode(value);
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

pub fn write_long<W: Write>(writer: &mut W, value: i64) -> Result<(), EncodeError> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut n = zig_zag_encode(value);
    let mut len = 0;
    while n >= 0x80 {
        buf[len] = (n as u8 & 0x7F) | 0x80;
        n >>= 7;
        len += 1;
    }
    buf[len] = n as u8;
    writer.write_all(&buf[..=len])?;
    Ok(())
}

pub fn write_int<W: Write>(writer: &mut W, value: i32) -> Result<(), EncodeError> {
    write_long(writer, i64::from(value))
}

pub fn write_boolean<W: Write>(writer: &mut W, value: bool) -> Result<(), EncodeError> {
    writer.write_all(&[u8::from(value)])?;
    Ok(())
}

pub fn write_float<W: Write>(writer: &mut W, value: f32) -> Result<(), EncodeError> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn write_double<W: Write>(writer: &mut W, value: f64) -> Result<(), EncodeError> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed byte block
pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), EncodeError> {
    write_long(writer, bytes.len() as i64)?;
    writer.write_all(bytes)?;
    Ok(())
}

pub fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<(), EncodeError> {
    write_bytes(writer, s.as_bytes())
}

/// Cursor over an in-memory binary buffer
///
/// Every read checks the remaining length first, so a short buffer yields
/// `DecodeError::Truncated` with the offset where the read started.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::Truncated {
            offset: self.offset,
            needed,
            remaining: self.remaining(),
            path: Path::root(),
        }
    }

    /// Take the next `len` raw bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_long(&mut self) -> Result<i64, DecodeError> {
        let start = self.offset;
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = match self.data.get(self.offset) {
                Some(byte) => *byte,
                None => {
                    let err = self.truncated(1);
                    self.offset = start;
                    return Err(err);
                }
            };
            self.offset += 1;

            let shift = 7 * i as u32;
            // the tenth byte only has room for the top bit
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                self.offset = start;
                return Err(DecodeError::VarintOverflow {
                    offset: start,
                    path: Path::root(),
                });
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(zig_zag_decode(value));
            }
        }
        self.offset = start;
        Err(DecodeError::VarintOverflow {
            offset: start,
            path: Path::root(),
        })
    }

    pub fn read_int(&mut self) -> Result<i32, DecodeError> {
        let start = self.offset;
        let value = self.read_long()?;
        i32::try_from(value).map_err(|_| DecodeError::IntOutOfRange {
            offset: start,
            value,
            path: Path::root(),
        })
    }

    pub fn read_boolean(&mut self) -> Result<bool, DecodeError> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(DecodeError::InvalidBoolean {
                offset,
                byte,
                path: Path::root(),
            }),
        }
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a varint length that must be non-negative
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.offset;
        let length = self.read_long()?;
        if length < 0 {
            return Err(DecodeError::NegativeLength {
                offset,
                length,
                path: Path::root(),
            });
        }
        usize::try_from(length).map_err(|_| self.truncated(usize::MAX))
    }

    /// Read a length-prefixed byte block
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_length()?;
        self.take(len)
    }

    pub fn read_string(&mut self) -> Result<&'a str, DecodeError> {
        let offset = self.offset;
        let bytes = self.read_bytes()?;
        bytes.to_str().map_err(|_| DecodeError::InvalidUtf8 {
            offset,
            bytes: bytes.to_vec(),
            path: Path::root(),
        })
    }
}
