//! FTDC - Full-Time Diagnostic Data Capture Core
//!
//! Compresses a stream of periodic diagnostic samples into compact metric
//! chunks, and decodes those chunks back into the original documents.
//! Designed for capture loops that snapshot hundreds of server metrics
//! every second: consecutive samples are nearly identical, so each chunk
//! stores one reference sample plus delta-encoded successors.
//!
//! # Architecture
//!
//! - **Document model**: ordered, typed, hierarchical sample documents
//!   with a byte-exact wire encoding
//! - **Metric extraction**: lockstep schema comparison that flattens every
//!   numeric leaf into a positional vector
//! - **Chunk compression**: delta / zero-run-length / varint pipeline over
//!   a metric-major matrix, finished with zlib
//! - **Archive records**: self-describing envelopes wrapping chunks and
//!   metadata for persistence
//!
//! Persistence itself (file writing, rotation, interim-file recovery) and
//! the sampler that produces documents are the host's responsibility.

pub mod archive;
pub mod compression;
pub mod document;

mod config;
mod error;

pub use config::{CaptureConfig, MAX_SAMPLES_PER_ARCHIVE_METRIC_CHUNK_DEFAULT};
pub use error::{FtdcError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
