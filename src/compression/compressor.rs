//! Chunk assembler
//!
//! Accumulates diagnostic samples against a reference sample, delta-encodes
//! their metric vectors, and emits framed chunks when the chunk fills or
//! the sample schema changes.

use super::block::BlockCompressor;
use super::{metrics, varint};
use crate::document::wire;
use crate::document::{Document, EpochMillis};
use crate::{CaptureConfig, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

/// Result of feeding one sample to the compressor
#[derive(Debug)]
pub enum SampleOutcome {
    /// Sample accepted; the current chunk has room for more
    HasSpace,

    /// The sample's schema no longer matches the reference. The samples
    /// accumulated so far were flushed as `chunk`, and the new sample has
    /// been installed as the next chunk's reference.
    SchemaChanged {
        chunk: Bytes,
        reference_date: EpochMillis,
    },

    /// The sample filled the chunk to its configured capacity and is the
    /// chunk's final sample. The next sample starts a new reference.
    CompressorFull {
        chunk: Bytes,
        reference_date: EpochMillis,
    },
}

/// Delta-compresses a stream of samples into metric chunks
///
/// The first accepted sample becomes the chunk's reference: it is stored
/// verbatim and defines both the metric schema and the delta baseline.
/// Each later sample contributes one column of deltas against the sample
/// before it. The assembled chunk is
/// `reference | metric count | delta count | packed deltas`, run-length
/// encoded for zeros, varint packed, and zlib compressed behind a
/// little-endian `u32` uncompressed-length prefix.
///
/// Not internally synchronized; callers sharing one instance across
/// threads must serialize access themselves.
pub struct ChunkCompressor {
    block: BlockCompressor,
    max_deltas: usize,

    reference: Option<Document>,
    reference_date: EpochMillis,

    metric_count: usize,
    delta_count: usize,

    /// Metric-major delta matrix: `deltas[metric * max_deltas + sample]`.
    /// Emission scans metrics outer, samples inner; an unchanged metric
    /// contributes one contiguous run of zeros.
    deltas: Vec<u64>,

    metrics: Vec<u64>,
    prev_metrics: Vec<u64>,
    uncompressed: BytesMut,
}

impl ChunkCompressor {
    /// Create a compressor for the given capture configuration
    pub fn new(config: &CaptureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block: BlockCompressor::new(),
            max_deltas: config.max_deltas(),
            reference: None,
            reference_date: 0,
            metric_count: 0,
            delta_count: 0,
            deltas: Vec::new(),
            metrics: Vec::new(),
            prev_metrics: Vec::new(),
            uncompressed: BytesMut::new(),
        })
    }

    /// Add one sample, returning whether the caller must flush a chunk
    ///
    /// `date` is the instant at which the sample's capture began; it is
    /// retained while the sample serves as reference and returned with the
    /// chunk it anchors. On error the compressor's committed state is
    /// untouched and the sample is dropped.
    pub fn add_sample(&mut self, sample: &Document, date: EpochMillis) -> Result<SampleOutcome> {
        self.metrics.clear();

        let matches = match self.reference.as_ref() {
            None => {
                metrics::extract_metrics(sample, sample, &mut self.metrics)?;
                self.install_reference(sample.clone(), date);
                return Ok(SampleOutcome::HasSpace);
            }
            Some(reference) => metrics::extract_metrics(reference, sample, &mut self.metrics)?,
        };

        if !matches {
            // Flush what we have, then start over with this sample as the
            // new reference. Its metric vector is already in `metrics`.
            let chunk = self.build_chunk()?;
            let flushed_date = self.reference_date;
            self.install_reference(sample.clone(), date);
            return Ok(SampleOutcome::SchemaChanged {
                chunk,
                reference_date: flushed_date,
            });
        }

        for i in 0..self.metrics.len() {
            self.deltas[array_offset(self.max_deltas, self.delta_count, i)] =
                self.metrics[i].wrapping_sub(self.prev_metrics[i]);
        }
        self.delta_count += 1;

        std::mem::swap(&mut self.prev_metrics, &mut self.metrics);

        if self.delta_count == self.max_deltas {
            let chunk = self.build_chunk()?;
            let reference_date = self.reference_date;
            self.reference = None;
            return Ok(SampleOutcome::CompressorFull {
                chunk,
                reference_date,
            });
        }

        Ok(SampleOutcome::HasSpace)
    }

    /// Assemble and compress the samples accumulated so far
    ///
    /// Used by hosts that flush on a schedule (interim files) rather than
    /// waiting for a chunk boundary. The compressor state is left intact.
    /// Callers should gate on [`has_data_to_flush`](Self::has_data_to_flush).
    pub fn get_compressed_samples(&mut self) -> Result<(Bytes, EpochMillis)> {
        let chunk = self.build_chunk()?;
        Ok((chunk, self.reference_date))
    }

    /// Number of delta-encoded samples accumulated so far
    ///
    /// A flushed chunk decompresses to one more document than this; the
    /// extra one is the reference sample.
    pub fn sample_count(&self) -> usize {
        self.delta_count
    }

    /// Is there a pending reference sample to flush?
    ///
    /// False before the first sample and immediately after a
    /// capacity-triggered flush; true otherwise.
    pub fn has_data_to_flush(&self) -> bool {
        self.reference.is_some()
    }

    /// Drop the in-progress chunk, keeping allocations for reuse
    pub fn reset(&mut self) {
        self.reference = None;
        self.reference_date = 0;
        self.metric_count = 0;
        self.delta_count = 0;
        self.deltas.clear();
        self.metrics.clear();
        self.prev_metrics.clear();
    }

    fn install_reference(&mut self, sample: Document, date: EpochMillis) {
        self.reference = Some(sample);
        self.reference_date = date;

        self.metric_count = self.metrics.len();
        self.delta_count = 0;
        self.prev_metrics.clear();
        std::mem::swap(&mut self.prev_metrics, &mut self.metrics);

        // Stale values past delta_count are overwritten before emission
        // ever reads them.
        self.deltas.resize(self.metric_count * self.max_deltas, 0);
    }

    fn build_chunk(&mut self) -> Result<Bytes> {
        debug!(
            metric_count = self.metric_count,
            delta_count = self.delta_count,
            "assembling metric chunk"
        );

        self.uncompressed.clear();
        match &self.reference {
            Some(doc) => wire::encode_document(&mut self.uncompressed, doc),
            None => wire::encode_document(&mut self.uncompressed, &Document::new()),
        }

        self.uncompressed.put_u32_le(self.metric_count as u32);
        self.uncompressed.put_u32_le(self.delta_count as u32);

        if self.metric_count != 0 && self.delta_count != 0 {
            // Zero runs carry across metric boundaries; a block of flat
            // metrics collapses to a single pair.
            let mut zero_run: u64 = 0;

            for i in 0..self.metric_count {
                for j in 0..self.delta_count {
                    let delta = self.deltas[array_offset(self.max_deltas, j, i)];

                    if delta == 0 {
                        zero_run += 1;
                        continue;
                    }

                    if zero_run > 0 {
                        varint::encode(&mut self.uncompressed, 0);
                        varint::encode(&mut self.uncompressed, zero_run - 1);
                        zero_run = 0;
                    }

                    varint::encode(&mut self.uncompressed, delta);
                }
            }

            if zero_run > 0 {
                varint::encode(&mut self.uncompressed, 0);
                varint::encode(&mut self.uncompressed, zero_run - 1);
            }
        }

        let compressed = self.block.compress(&self.uncompressed)?;

        let mut chunk = BytesMut::with_capacity(4 + compressed.len());
        chunk.put_u32_le(self.uncompressed.len() as u32);
        chunk.put_slice(&compressed);

        Ok(chunk.freeze())
    }
}

/// Offset of `(sample, metric)` in a metric-major delta matrix
fn array_offset(max_deltas: usize, sample: usize, metric: usize) -> usize {
    metric * max_deltas + sample
}
