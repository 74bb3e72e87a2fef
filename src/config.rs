//! Capture configuration consumed by the compressor

use crate::{FtdcError, Result};
use serde::{Deserialize, Serialize};

/// Default number of samples collected into one archive metric chunk
pub const MAX_SAMPLES_PER_ARCHIVE_METRIC_CHUNK_DEFAULT: u32 = 300;

/// Configuration for diagnostic-data capture
///
/// Only `max_samples_per_archive_metric_chunk` is read by the core; the
/// struct is deserializable so hosts can load it alongside their own
/// capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Samples per chunk, counting the reference sample
    pub max_samples_per_archive_metric_chunk: u32,
}

impl CaptureConfig {
    /// Validate the configuration
    ///
    /// A chunk holds one reference sample plus delta-encoded successors,
    /// so fewer than two samples per chunk leaves no room for any delta.
    pub fn validate(&self) -> Result<()> {
        if self.max_samples_per_archive_metric_chunk < 2 {
            return Err(FtdcError::Config(format!(
                "max_samples_per_archive_metric_chunk must be at least 2, got {}",
                self.max_samples_per_archive_metric_chunk
            )));
        }
        Ok(())
    }

    /// Maximum number of delta-encoded samples per chunk
    pub fn max_deltas(&self) -> usize {
        self.max_samples_per_archive_metric_chunk as usize - 1
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_samples_per_archive_metric_chunk: MAX_SAMPLES_PER_ARCHIVE_METRIC_CHUNK_DEFAULT,
        }
    }
}
