//! Envelope documents for persisted chunks and metadata

use crate::compression::ChunkDecompressor;
use crate::document::{Document, EpochMillis, FieldValue};
use crate::{FtdcError, Result};

/// Capture date of the record's payload
pub const ID_FIELD: &str = "_id";
/// Discriminates metadata records from metric chunks
pub const TYPE_FIELD: &str = "type";
/// Metadata payload document
pub const DOC_FIELD: &str = "doc";
/// Compressed metric chunk payload
pub const DATA_FIELD: &str = "data";

/// Kind of record in a persisted capture stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RecordType {
    /// One-off capture metadata, stored uncompressed
    Metadata = 0,
    /// A compressed metric chunk
    MetricChunk = 1,
}

impl TryFrom<i32> for RecordType {
    type Error = FtdcError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(RecordType::Metadata),
            1 => Ok(RecordType::MetricChunk),
            other => Err(FtdcError::Corrupt(format!(
                "unknown record type {}",
                other
            ))),
        }
    }
}

/// Wrap capture metadata in its envelope record
pub fn metadata_record(metadata: &Document, date: EpochMillis) -> Document {
    Document::new()
        .with(ID_FIELD, FieldValue::Date(date))
        .with(TYPE_FIELD, RecordType::Metadata as i32)
        .with(DOC_FIELD, metadata.clone())
}

/// Wrap a compressed chunk in its envelope record
///
/// `date` is the reference capture time returned alongside the chunk.
pub fn metric_chunk_record(chunk: &[u8], date: EpochMillis) -> Document {
    Document::new()
        .with(ID_FIELD, FieldValue::Date(date))
        .with(TYPE_FIELD, RecordType::MetricChunk as i32)
        .with(DATA_FIELD, FieldValue::Binary(chunk.to_vec()))
}

/// Read the capture date of a record
pub fn record_id(record: &Document) -> Result<EpochMillis> {
    match record.get(ID_FIELD) {
        Some(FieldValue::Date(date)) => Ok(*date),
        _ => Err(FtdcError::Corrupt(format!(
            "record is missing a '{}' date field",
            ID_FIELD
        ))),
    }
}

/// Read the kind of a record
pub fn record_type(record: &Document) -> Result<RecordType> {
    match record.get(TYPE_FIELD) {
        Some(FieldValue::Int32(value)) => RecordType::try_from(*value),
        Some(FieldValue::Int64(value)) => {
            let narrowed = i32::try_from(*value).map_err(|_| {
                FtdcError::Corrupt(format!("record type {} out of range", value))
            })?;
            RecordType::try_from(narrowed)
        }
        _ => Err(FtdcError::Corrupt(format!(
            "record is missing an integer '{}' field",
            TYPE_FIELD
        ))),
    }
}

/// Unwrap the metadata payload of a metadata record
pub fn metadata_document(record: &Document) -> Result<&Document> {
    match record.get(DOC_FIELD) {
        Some(FieldValue::Document(doc)) => Ok(doc),
        _ => Err(FtdcError::Corrupt(format!(
            "metadata record is missing a '{}' document field",
            DOC_FIELD
        ))),
    }
}

/// Unwrap the compressed chunk payload of a metric-chunk record
pub fn chunk_data(record: &Document) -> Result<&[u8]> {
    match record.get(DATA_FIELD) {
        Some(FieldValue::Binary(data)) => Ok(data),
        _ => Err(FtdcError::Corrupt(format!(
            "metric chunk record is missing a '{}' binary field",
            DATA_FIELD
        ))),
    }
}

/// Decode every sample document stored in a metric-chunk record
pub fn chunk_samples(
    record: &Document,
    decompressor: &ChunkDecompressor,
) -> Result<Vec<Document>> {
    decompressor.decompress(chunk_data(record)?)
}
