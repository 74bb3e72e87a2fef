//! Hierarchical sample documents
//!
//! A diagnostic sample is a self-describing tree of named fields. Field
//! order is significant: metric extraction and reconstruction both walk
//! documents in insertion order, so two documents with the same fields in
//! a different order have different schemas.

pub mod wire;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch
pub type EpochMillis = i64;

/// Possible field value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// 64-bit float
    Double(f64),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// Integral fixed-point decimal; only the integer part is captured
    Decimal(i64),
    /// Boolean
    Bool(bool),
    /// Wall-clock instant in milliseconds since epoch
    Date(EpochMillis),
    /// Logical timestamp: seconds plus an ordering increment
    Timestamp {
        seconds: u32,
        increment: u32,
    },
    /// UTF-8 string
    String(String),
    /// Opaque binary blob
    Binary(Vec<u8>),
    /// Nested document
    Document(Document),
    /// Array of values
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Does this value contribute to the metric stream?
    ///
    /// Strings and binary blobs do not; they are assumed constant across a
    /// chunk and survive only inside the reference sample. Documents and
    /// arrays are traversed through rather than captured directly.
    pub fn is_metric_bearing(&self) -> bool {
        !matches!(self, FieldValue::String(_) | FieldValue::Binary(_))
    }

    /// Is this one of the interchangeable numeric types?
    ///
    /// Samples legitimately shift a metric between numeric widths from one
    /// capture to the next; any numeric type matches any other during
    /// schema comparison.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldValue::Double(_)
                | FieldValue::Int32(_)
                | FieldValue::Int64(_)
                | FieldValue::Decimal(_)
        )
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<Document> for FieldValue {
    fn from(v: Document) -> Self {
        FieldValue::Document(v)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::Array(v)
    }
}

/// An ordered collection of named fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field, preserving insertion order
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Builder-style append
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up the first field with the given name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Fields in document order
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Iterate over `(name, value)` pairs in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
