//! Block compressor facade
//!
//! Buffer-to-buffer zlib compression for assembled metric chunks. The rest
//! of the pipeline treats the output as opaque bytes; framing (the
//! uncompressed-length prefix) is the caller's job.

use crate::{FtdcError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Zlib compressor for metric chunk payloads
#[derive(Debug, Clone)]
pub struct BlockCompressor {
    level: Compression,
}

impl BlockCompressor {
    /// Create a compressor at the default zlib level
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Compress `src` into an owned buffer
    pub fn compress(&self, src: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(src.len() / 2 + 16), self.level);
        encoder
            .write_all(src)
            .and_then(|_| encoder.finish())
            .map_err(|e| FtdcError::Corrupt(format!("zlib compression failed: {}", e)))
    }

    /// Decompress `src`, verifying it inflates to exactly `expected_len` bytes
    pub fn decompress(&self, src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(expected_len);
        let mut decoder = ZlibDecoder::new(src);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| FtdcError::Corrupt(format!("zlib decompression failed: {}", e)))?;

        if out.len() != expected_len {
            return Err(FtdcError::Corrupt(format!(
                "decompressed to {} bytes, chunk declared {}",
                out.len(),
                expected_len
            )));
        }

        Ok(out)
    }
}

impl Default for BlockCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let compressor = BlockCompressor::new();
        let src: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();

        let compressed = compressor.compress(&src).unwrap();
        let restored = compressor.decompress(&compressed, src.len()).unwrap();
        assert_eq!(restored, src);
    }

    #[test]
    fn test_empty_input() {
        let compressor = BlockCompressor::new();
        let compressed = compressor.compress(&[]).unwrap();
        let restored = compressor.decompress(&compressed, 0).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let compressor = BlockCompressor::new();
        let compressed = compressor.compress(b"some sample bytes").unwrap();
        assert!(matches!(
            compressor.decompress(&compressed, 3),
            Err(FtdcError::Corrupt(_))
        ));
    }

    #[test]
    fn test_garbage_input() {
        let compressor = BlockCompressor::new();
        assert!(matches!(
            compressor.decompress(&[0xff, 0x13, 0x37, 0x00], 10),
            Err(FtdcError::Corrupt(_))
        ));
    }
}
