//! Byte-exact document serialization
//!
//! The reference sample is embedded verbatim inside every chunk, and the
//! envelope records that wrap chunks for persistence are themselves
//! documents, so this encoding is part of the on-disk contract. A document
//! is self-delimited by its leading length header and can be re-parsed
//! from the middle of a larger buffer.

use super::{Document, FieldValue};
use crate::{FtdcError, Result};
use bytes::{BufMut, BytesMut};

const TAG_DOUBLE: u8 = 0x01;
const TAG_INT32: u8 = 0x02;
const TAG_INT64: u8 = 0x03;
const TAG_DECIMAL: u8 = 0x04;
const TAG_BOOL: u8 = 0x05;
const TAG_DATE: u8 = 0x06;
const TAG_TIMESTAMP: u8 = 0x07;
const TAG_STRING: u8 = 0x08;
const TAG_BINARY: u8 = 0x09;
const TAG_DOCUMENT: u8 = 0x0a;
const TAG_ARRAY: u8 = 0x0b;

/// Serialize a document into `buf`
///
/// Format:
/// - 4 bytes: total document length, including this header
/// - per field: 1 byte type tag, 2 bytes name length, name bytes, value
///
/// Scalars are fixed-width little-endian. Strings and binaries carry a
/// 4-byte length prefix. Nested documents and arrays repeat the
/// length-header layout and delimit themselves.
pub fn encode_document(buf: &mut BytesMut, doc: &Document) {
    let start = buf.len();
    buf.put_u32_le(0);

    for (name, value) in doc.iter() {
        buf.put_u8(tag(value));
        buf.put_u16_le(name.len() as u16);
        buf.put_slice(name.as_bytes());
        encode_value(buf, value);
    }

    let total = (buf.len() - start) as u32;
    buf[start..start + 4].copy_from_slice(&total.to_le_bytes());
}

/// Deserialize one document from the front of `buf`, advancing it
pub fn decode_document(buf: &mut &[u8]) -> Result<Document> {
    let total = read_u32_le(buf)? as usize;
    if total < 4 {
        return Err(FtdcError::Corrupt(format!(
            "document length header {} is shorter than the header itself",
            total
        )));
    }

    let mut body = take(buf, total - 4)?;
    let mut doc = Document::new();

    while !body.is_empty() {
        let tag = read_u8(&mut body)?;
        let name_len = read_u16_le(&mut body)? as usize;
        let name = std::str::from_utf8(take(&mut body, name_len)?)
            .map_err(|e| FtdcError::Corrupt(format!("field name is not UTF-8: {}", e)))?
            .to_string();
        let value = decode_value(tag, &mut body)?;
        doc.insert(name, value);
    }

    Ok(doc)
}

/// Serialize a document to an owned buffer
pub fn document_to_bytes(doc: &Document) -> BytesMut {
    let mut buf = BytesMut::new();
    encode_document(&mut buf, doc);
    buf
}

fn tag(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Double(_) => TAG_DOUBLE,
        FieldValue::Int32(_) => TAG_INT32,
        FieldValue::Int64(_) => TAG_INT64,
        FieldValue::Decimal(_) => TAG_DECIMAL,
        FieldValue::Bool(_) => TAG_BOOL,
        FieldValue::Date(_) => TAG_DATE,
        FieldValue::Timestamp { .. } => TAG_TIMESTAMP,
        FieldValue::String(_) => TAG_STRING,
        FieldValue::Binary(_) => TAG_BINARY,
        FieldValue::Document(_) => TAG_DOCUMENT,
        FieldValue::Array(_) => TAG_ARRAY,
    }
}

fn encode_value(buf: &mut BytesMut, value: &FieldValue) {
    match value {
        FieldValue::Double(v) => buf.put_f64_le(*v),
        FieldValue::Int32(v) => buf.put_i32_le(*v),
        FieldValue::Int64(v) => buf.put_i64_le(*v),
        FieldValue::Decimal(v) => buf.put_i64_le(*v),
        FieldValue::Bool(v) => buf.put_u8(*v as u8),
        FieldValue::Date(v) => buf.put_i64_le(*v),
        FieldValue::Timestamp { seconds, increment } => {
            buf.put_u32_le(*seconds);
            buf.put_u32_le(*increment);
        }
        FieldValue::String(s) => {
            buf.put_u32_le(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        FieldValue::Binary(b) => {
            buf.put_u32_le(b.len() as u32);
            buf.put_slice(b);
        }
        FieldValue::Document(doc) => encode_document(buf, doc),
        FieldValue::Array(items) => {
            let start = buf.len();
            buf.put_u32_le(0);
            for item in items {
                buf.put_u8(tag(item));
                encode_value(buf, item);
            }
            let total = (buf.len() - start) as u32;
            buf[start..start + 4].copy_from_slice(&total.to_le_bytes());
        }
    }
}

fn decode_value(tag: u8, buf: &mut &[u8]) -> Result<FieldValue> {
    let value = match tag {
        TAG_DOUBLE => FieldValue::Double(read_f64_le(buf)?),
        TAG_INT32 => FieldValue::Int32(read_i32_le(buf)?),
        TAG_INT64 => FieldValue::Int64(read_i64_le(buf)?),
        TAG_DECIMAL => FieldValue::Decimal(read_i64_le(buf)?),
        TAG_BOOL => FieldValue::Bool(read_u8(buf)? != 0),
        TAG_DATE => FieldValue::Date(read_i64_le(buf)?),
        TAG_TIMESTAMP => FieldValue::Timestamp {
            seconds: read_u32_le(buf)?,
            increment: read_u32_le(buf)?,
        },
        TAG_STRING => {
            let len = read_u32_le(buf)? as usize;
            let s = std::str::from_utf8(take(buf, len)?)
                .map_err(|e| FtdcError::Corrupt(format!("string value is not UTF-8: {}", e)))?;
            FieldValue::String(s.to_string())
        }
        TAG_BINARY => {
            let len = read_u32_le(buf)? as usize;
            FieldValue::Binary(take(buf, len)?.to_vec())
        }
        TAG_DOCUMENT => FieldValue::Document(decode_document(buf)?),
        TAG_ARRAY => {
            let total = read_u32_le(buf)? as usize;
            if total < 4 {
                return Err(FtdcError::Corrupt(format!(
                    "array length header {} is shorter than the header itself",
                    total
                )));
            }
            let mut body = take(buf, total - 4)?;
            let mut items = Vec::new();
            while !body.is_empty() {
                let tag = read_u8(&mut body)?;
                items.push(decode_value(tag, &mut body)?);
            }
            FieldValue::Array(items)
        }
        other => {
            return Err(FtdcError::Corrupt(format!(
                "unknown field type tag {:#04x}",
                other
            )))
        }
    };

    Ok(value)
}

pub(crate) fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if buf.len() < n {
        return Err(FtdcError::Corrupt(format!(
            "document truncated: needed {} bytes, {} remain",
            n,
            buf.len()
        )));
    }
    let (head, rest) = buf.split_at(n);
    *buf = rest;
    Ok(head)
}

fn read_u8(buf: &mut &[u8]) -> Result<u8> {
    Ok(take(buf, 1)?[0])
}

fn read_u16_le(buf: &mut &[u8]) -> Result<u16> {
    let bytes = take(buf, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32_le(buf: &mut &[u8]) -> Result<u32> {
    let bytes = take(buf, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i32_le(buf: &mut &[u8]) -> Result<i32> {
    let bytes = take(buf, 4)?;
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i64_le(buf: &mut &[u8]) -> Result<i64> {
    let bytes = take(buf, 8)?;
    Ok(i64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

fn read_f64_le(buf: &mut &[u8]) -> Result<f64> {
    let bytes = take(buf, 8)?;
    Ok(f64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}
