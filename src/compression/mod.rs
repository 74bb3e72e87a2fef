//! Metric chunk compression
//!
//! Each chunk stores one reference sample verbatim plus a configurable
//! number of successors reduced to deltas. The pipeline for the deltas:
//!
//! 1. Delta encoding against the previous sample's metric vector
//! 2. Run-length encoding of zeros as `(0, count - 1)` pairs
//! 3. Varint packing of every emitted value
//! 4. Zlib over the assembled buffer
//!
//! Metrics that do not change cost almost nothing; in steady state a
//! sample of hundreds of metrics compresses to a few bytes.

mod block;
mod compressor;
mod decompressor;
mod metrics;
pub mod varint;

pub use block::BlockCompressor;
pub use compressor::{ChunkCompressor, SampleOutcome};
pub use decompressor::ChunkDecompressor;
pub use metrics::{construct_document, extract_metrics, MAX_RECURSION};
