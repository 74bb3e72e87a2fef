//! Chunk decoder
//!
//! Inverse of the assembler: unframes a chunk, inflates it, and replays
//! the packed delta stream on top of the reference sample to reconstruct
//! the original document sequence.

use super::block::BlockCompressor;
use super::{metrics, varint};
use crate::document::wire;
use crate::document::Document;
use crate::{FtdcError, Result};

/// Reconstructs the sample documents stored in a metric chunk
#[derive(Debug, Default)]
pub struct ChunkDecompressor {
    block: BlockCompressor,
}

impl ChunkDecompressor {
    /// Create a decompressor
    pub fn new() -> Self {
        Self {
            block: BlockCompressor::new(),
        }
    }

    /// Decode a chunk into its reference sample plus all successors
    ///
    /// The returned vector holds the reference document first, then one
    /// document per delta-encoded sample, in capture order.
    pub fn decompress(&self, chunk: &[u8]) -> Result<Vec<Document>> {
        let mut framed = chunk;
        let declared_len = wire::read_u32_le(&mut framed)
            .map_err(|_| FtdcError::Corrupt("chunk shorter than its length prefix".to_string()))?
            as usize;

        let body = self.block.decompress(framed, declared_len)?;
        let mut slice = &body[..];

        let reference = wire::decode_document(&mut slice)?;
        let metric_count = wire::read_u32_le(&mut slice)? as usize;
        let sample_count = wire::read_u32_le(&mut slice)? as usize;

        // The reference's own extraction is the delta baseline; its slot
        // count must agree with what the chunk recorded.
        let mut baseline = Vec::with_capacity(metric_count);
        metrics::extract_metrics(&reference, &reference, &mut baseline)?;
        if baseline.len() != metric_count {
            return Err(FtdcError::Corrupt(format!(
                "chunk declares {} metrics but its reference sample has {}",
                metric_count,
                baseline.len()
            )));
        }

        let deltas = read_delta_table(&mut slice, metric_count, sample_count)?;

        let mut documents = Vec::with_capacity(sample_count + 1);
        documents.push(reference.clone());

        let mut values = baseline;
        for sample in 0..sample_count {
            for metric in 0..metric_count {
                values[metric] =
                    values[metric].wrapping_add(deltas[metric * sample_count + sample]);
            }
            documents.push(metrics::construct_document(&reference, &values)?);
        }

        Ok(documents)
    }
}

/// Expand the packed varint stream into a metric-major delta table
///
/// A `0` value is never a literal delta; it introduces a run: the next
/// varint is the run length minus one. Runs carry across metric
/// boundaries exactly as the assembler emitted them.
fn read_delta_table(
    slice: &mut &[u8],
    metric_count: usize,
    sample_count: usize,
) -> Result<Vec<u64>> {
    let mut deltas = vec![0u64; metric_count * sample_count];
    let mut zeros_remaining: u64 = 0;

    for metric in 0..metric_count {
        for sample in 0..sample_count {
            let delta = if zeros_remaining > 0 {
                zeros_remaining -= 1;
                0
            } else {
                if slice.is_empty() {
                    return Err(FtdcError::Corrupt(
                        "packed delta stream ended before all samples were read".to_string(),
                    ));
                }
                let value = varint::decode(slice)?;
                if value == 0 {
                    zeros_remaining = varint::decode(slice)?;
                    0
                } else {
                    value
                }
            };
            deltas[metric * sample_count + sample] = delta;
        }
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{ChunkCompressor, SampleOutcome};
    use crate::document::FieldValue;
    use crate::CaptureConfig;
    use bytes::{BufMut, Bytes, BytesMut};

    fn compressor(max_samples: u32) -> ChunkCompressor {
        let config = CaptureConfig {
            max_samples_per_archive_metric_chunk: max_samples,
        };
        ChunkCompressor::new(&config).unwrap()
    }

    fn sample(n: i64) -> Document {
        Document::new()
            .with("host", "db-01")
            .with("connections", (10 + n) as i32)
            .with("uptime", 1000 * n)
            .with("healthy", n % 2 == 0)
            .with("captured", FieldValue::Date(1_700_000_000_000 + n))
            .with(
                "mem",
                Document::new()
                    .with("resident", 512 + n)
                    .with("virt", 2048i64),
            )
            .with(
                "ts",
                FieldValue::Timestamp {
                    seconds: 100 + n as u32,
                    increment: n as u32,
                },
            )
            .with(
                "loads",
                FieldValue::Array(vec![
                    FieldValue::Double(n as f64),
                    FieldValue::Double((n * 2) as f64),
                ]),
            )
    }

    /// Frame an uncompressed chunk body the way the assembler does
    fn frame(body: &[u8]) -> Bytes {
        let compressed = BlockCompressor::new().compress(body).unwrap();
        let mut chunk = BytesMut::new();
        chunk.put_u32_le(body.len() as u32);
        chunk.put_slice(&compressed);
        chunk.freeze()
    }

    #[test]
    fn test_roundtrip_full_chunk() {
        let mut compressor = compressor(4);
        let samples: Vec<Document> = (0..4).map(sample).collect();

        let mut flushed = None;
        for (i, s) in samples.iter().enumerate() {
            match compressor.add_sample(s, i as i64).unwrap() {
                SampleOutcome::HasSpace => {}
                SampleOutcome::CompressorFull { chunk, .. } => flushed = Some(chunk),
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        let chunk = flushed.expect("fourth sample fills the chunk");
        let decoded = ChunkDecompressor::new().decompress(&chunk).unwrap();

        assert_eq!(decoded.len(), samples.len());
        for (original, decoded) in samples.iter().zip(&decoded) {
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn test_roundtrip_partial_chunk() {
        let mut compressor = compressor(100);
        let samples: Vec<Document> = (0..5).map(sample).collect();
        for (i, s) in samples.iter().enumerate() {
            assert!(matches!(
                compressor.add_sample(s, i as i64).unwrap(),
                SampleOutcome::HasSpace
            ));
        }

        let (chunk, _) = compressor.get_compressed_samples().unwrap();
        let decoded = ChunkDecompressor::new().decompress(&chunk).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_reference_only_chunk() {
        let mut compressor = compressor(10);
        compressor
            .add_sample(&Document::new().with("a", 1i32), 0)
            .unwrap();

        let (chunk, _) = compressor.get_compressed_samples().unwrap();
        let decoded = ChunkDecompressor::new().decompress(&chunk).unwrap();
        assert_eq!(decoded, vec![Document::new().with("a", 1i32)]);
    }

    #[test]
    fn test_non_metric_fields_come_from_reference() {
        let mut compressor = compressor(10);

        compressor
            .add_sample(&Document::new().with("host", "db-01").with("n", 1i64), 0)
            .unwrap();
        // The successor's string differs; it is assumed constant and the
        // reference's value wins on readback.
        compressor
            .add_sample(&Document::new().with("host", "db-02").with("n", 2i64), 1)
            .unwrap();

        let (chunk, _) = compressor.get_compressed_samples().unwrap();
        let decoded = ChunkDecompressor::new().decompress(&chunk).unwrap();

        assert_eq!(
            decoded[1],
            Document::new().with("host", "db-01").with("n", 2i64)
        );
    }

    #[test]
    fn test_wrapping_negative_deltas_roundtrip() {
        let mut compressor = compressor(10);
        for value in [i64::MAX, i64::MIN, 0, -1] {
            compressor
                .add_sample(&Document::new().with("n", value), 0)
                .unwrap();
        }

        let (chunk, _) = compressor.get_compressed_samples().unwrap();
        let decoded = ChunkDecompressor::new().decompress(&chunk).unwrap();

        let values: Vec<i64> = decoded
            .iter()
            .map(|d| match d.get("n") {
                Some(FieldValue::Int64(v)) => *v,
                other => panic!("unexpected field {:?}", other),
            })
            .collect();
        assert_eq!(values, vec![i64::MAX, i64::MIN, 0, -1]);
    }

    #[test]
    fn test_truncated_frame() {
        let decompressor = ChunkDecompressor::new();
        assert!(matches!(
            decompressor.decompress(&[1, 0]),
            Err(FtdcError::Corrupt(_))
        ));
    }

    #[test]
    fn test_declared_length_mismatch() {
        let body = {
            let mut buf = BytesMut::new();
            crate::document::wire::encode_document(&mut buf, &Document::new());
            buf.put_u32_le(0);
            buf.put_u32_le(0);
            buf
        };
        let compressed = BlockCompressor::new().compress(&body).unwrap();

        let mut chunk = BytesMut::new();
        chunk.put_u32_le(body.len() as u32 + 5);
        chunk.put_slice(&compressed);

        assert!(matches!(
            ChunkDecompressor::new().decompress(&chunk),
            Err(FtdcError::Corrupt(_))
        ));
    }

    #[test]
    fn test_metric_count_mismatch() {
        let mut body = BytesMut::new();
        crate::document::wire::encode_document(
            &mut body,
            &Document::new().with("a", 1i32),
        );
        body.put_u32_le(5);
        body.put_u32_le(0);

        assert!(matches!(
            ChunkDecompressor::new().decompress(&frame(&body)),
            Err(FtdcError::Corrupt(_))
        ));
    }

    #[test]
    fn test_truncated_delta_stream() {
        let mut body = BytesMut::new();
        crate::document::wire::encode_document(
            &mut body,
            &Document::new().with("a", 1i32),
        );
        body.put_u32_le(1);
        body.put_u32_le(1);
        // One delta expected, none present.

        assert!(matches!(
            ChunkDecompressor::new().decompress(&frame(&body)),
            Err(FtdcError::Corrupt(_))
        ));
    }

    #[test]
    fn test_malformed_varint_in_stream() {
        let mut body = BytesMut::new();
        crate::document::wire::encode_document(
            &mut body,
            &Document::new().with("a", 1i32),
        );
        body.put_u32_le(1);
        body.put_u32_le(1);
        body.put_u8(0x80);
        // Continuation bit set, then nothing.

        assert!(matches!(
            ChunkDecompressor::new().decompress(&frame(&body)),
            Err(FtdcError::Malformed(_))
        ));
    }
}
