//! Metric projection to and from documents
//!
//! Extraction walks a sample against the reference sample in lockstep,
//! flattening every metric-bearing leaf into a positional vector of 64-bit
//! slots and reporting whether the two documents still share a schema.
//! Reconstruction is the inverse walk: it rebuilds a full document by
//! pairing the reference's shape with a vector of absolute metric values.

use crate::document::{Document, FieldValue};
use crate::{FtdcError, Result};
use tracing::debug;

/// Maximum document nesting depth for either traversal
pub const MAX_RECURSION: usize = 10;

/// Extract `current`'s metrics, checking its schema against `reference`
///
/// Appends one slot per numeric, boolean, or date leaf and two per
/// timestamp leaf, in document order. Returns `true` iff every
/// metric-bearing leaf of `current` lines up with `reference` by name and
/// type class. On a mismatch the walk keeps extracting from `current`
/// alone, so the caller always receives the complete vector it needs to
/// treat `current` as a new reference.
pub fn extract_metrics(
    reference: &Document,
    current: &Document,
    metrics: &mut Vec<u64>,
) -> Result<bool> {
    extract_inner(
        Node::Document(reference),
        Node::Document(current),
        metrics,
        true,
        0,
    )
}

/// Rebuild a document from the reference shape and absolute metric values
///
/// Metric-bearing leaves take their value from the vector, keeping the
/// reference leaf's type; strings and binaries are copied from the
/// reference unchanged.
pub fn construct_document(reference: &Document, metrics: &[u64]) -> Result<Document> {
    let mut pos = 0;
    construct_inner(reference, metrics, &mut pos, 0)
}

/// A traversal position: a document, an array, or the empty stand-in used
/// once the schemas have diverged
#[derive(Clone, Copy)]
enum Node<'a> {
    Document(&'a Document),
    Array(&'a [FieldValue]),
    Empty,
}

impl<'a> Node<'a> {
    fn metric_fields(self) -> MetricFields<'a> {
        match self {
            Node::Document(doc) => MetricFields::Document(doc.fields().iter()),
            Node::Array(items) => MetricFields::Array(items.iter().enumerate()),
            Node::Empty => MetricFields::Empty,
        }
    }
}

/// Identifies a field within its parent: by name in a document, by
/// position in an array
#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldKey<'a> {
    Name(&'a str),
    Index(usize),
}

/// Iterator over the metric-bearing fields of one node
enum MetricFields<'a> {
    Document(std::slice::Iter<'a, (String, FieldValue)>),
    Array(std::iter::Enumerate<std::slice::Iter<'a, FieldValue>>),
    Empty,
}

impl<'a> Iterator for MetricFields<'a> {
    type Item = (FieldKey<'a>, &'a FieldValue);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            MetricFields::Document(iter) => {
                for (name, value) in iter {
                    if value.is_metric_bearing() {
                        return Some((FieldKey::Name(name.as_str()), value));
                    }
                }
                None
            }
            MetricFields::Array(iter) => {
                for (index, value) in iter {
                    if value.is_metric_bearing() {
                        return Some((FieldKey::Index(index), value));
                    }
                }
                None
            }
            MetricFields::Empty => None,
        }
    }
}

fn extract_inner(
    reference: Node<'_>,
    current: Node<'_>,
    metrics: &mut Vec<u64>,
    mut matches: bool,
    recursion: usize,
) -> Result<bool> {
    if recursion > MAX_RECURSION {
        return Err(FtdcError::RecursionLimit);
    }

    let mut ref_fields = reference.metric_fields().peekable();
    let mut cur_fields = current.metric_fields();

    while let Some((cur_key, cur_value)) = cur_fields.next() {
        if matches && ref_fields.peek().is_none() {
            debug!("schema change: current sample is longer than reference");
            matches = false;
        }

        let ref_entry = if matches { ref_fields.next() } else { None };

        if let Some((ref_key, ref_value)) = ref_entry {
            if ref_key != cur_key {
                debug!(from = ?ref_key, to = ?cur_key, "schema change: field name changed");
                matches = false;
            }

            // Types must match exactly, except that any numeric type is
            // allowed to stand in for any other. Treating an integer-width
            // shift as a schema change would flush a chunk on almost every
            // capture cycle.
            if std::mem::discriminant(ref_value) != std::mem::discriminant(cur_value)
                && !(ref_value.is_numeric() && cur_value.is_numeric())
            {
                debug!(field = ?cur_key, "schema change: field type changed");
                matches = false;
            }
        }

        match cur_value {
            FieldValue::Double(v) => metrics.push(*v as i64 as u64),
            FieldValue::Int32(v) => metrics.push(*v as i64 as u64),
            FieldValue::Int64(v) => metrics.push(*v as u64),
            FieldValue::Decimal(v) => metrics.push(*v as u64),
            FieldValue::Bool(v) => metrics.push(*v as u64),
            FieldValue::Date(ms) => metrics.push(*ms as u64),
            FieldValue::Timestamp { seconds, increment } => {
                // Two adjacent slots; the increment usually stays flat so
                // it delta-compresses to nothing.
                metrics.push(*seconds as u64);
                metrics.push(*increment as u64);
            }
            FieldValue::Document(cur_doc) => {
                let ref_node = match ref_entry {
                    Some((_, FieldValue::Document(ref_doc))) if matches => Node::Document(ref_doc),
                    _ => Node::Empty,
                };
                matches = extract_inner(
                    ref_node,
                    Node::Document(cur_doc),
                    metrics,
                    matches,
                    recursion + 1,
                )?;
            }
            FieldValue::Array(cur_items) => {
                let ref_node = match ref_entry {
                    Some((_, FieldValue::Array(ref_items))) if matches => Node::Array(ref_items),
                    _ => Node::Empty,
                };
                matches = extract_inner(
                    ref_node,
                    Node::Array(cur_items),
                    metrics,
                    matches,
                    recursion + 1,
                )?;
            }
            FieldValue::String(_) | FieldValue::Binary(_) => {
                // Filtered out by MetricFields
            }
        }
    }

    if matches && ref_fields.peek().is_some() {
        debug!("schema change: reference is longer than current sample");
        matches = false;
    }

    Ok(matches)
}

fn construct_inner(
    reference: &Document,
    metrics: &[u64],
    pos: &mut usize,
    recursion: usize,
) -> Result<Document> {
    if recursion > MAX_RECURSION {
        return Err(FtdcError::RecursionLimit);
    }

    let mut doc = Document::new();
    for (name, value) in reference.iter() {
        doc.insert(name, construct_value(value, metrics, pos, recursion)?);
    }
    Ok(doc)
}

fn construct_value(
    reference: &FieldValue,
    metrics: &[u64],
    pos: &mut usize,
    recursion: usize,
) -> Result<FieldValue> {
    let value = match reference {
        FieldValue::Double(_) => FieldValue::Double(next_metric(metrics, pos)? as i64 as f64),
        FieldValue::Int32(_) => FieldValue::Int32(next_metric(metrics, pos)? as i32),
        FieldValue::Int64(_) => FieldValue::Int64(next_metric(metrics, pos)? as i64),
        FieldValue::Decimal(_) => FieldValue::Decimal(next_metric(metrics, pos)? as i64),
        FieldValue::Bool(_) => FieldValue::Bool(next_metric(metrics, pos)? != 0),
        FieldValue::Date(_) => FieldValue::Date(next_metric(metrics, pos)? as i64),
        FieldValue::Timestamp { .. } => {
            let seconds = next_metric(metrics, pos)? as u32;
            let increment = next_metric(metrics, pos)? as u32;
            FieldValue::Timestamp { seconds, increment }
        }
        FieldValue::Document(ref_doc) => {
            FieldValue::Document(construct_inner(ref_doc, metrics, pos, recursion + 1)?)
        }
        FieldValue::Array(ref_items) => {
            if recursion + 1 > MAX_RECURSION {
                return Err(FtdcError::RecursionLimit);
            }
            let mut items = Vec::with_capacity(ref_items.len());
            for item in ref_items {
                items.push(construct_value(item, metrics, pos, recursion + 1)?);
            }
            FieldValue::Array(items)
        }
        other => other.clone(),
    };

    Ok(value)
}

fn next_metric(metrics: &[u64], pos: &mut usize) -> Result<u64> {
    let value = metrics.get(*pos).copied().ok_or_else(|| {
        FtdcError::OutOfRange(format!(
            "reference schema expects more than the {} metrics supplied",
            metrics.len()
        ))
    })?;
    *pos += 1;
    Ok(value)
}
