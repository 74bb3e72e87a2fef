//! Error types for the FTDC core

use thiserror::Error;

/// Result type alias for FTDC operations
pub type Result<T> = std::result::Result<T, FtdcError>;

/// FTDC error types
#[derive(Error, Debug)]
pub enum FtdcError {
    /// Metric extraction or reconstruction descended too deep
    #[error("recursion limit reached while walking sample document")]
    RecursionLimit,

    /// Varint decode failure during readback
    #[error("malformed varint: {0}")]
    Malformed(String),

    /// Chunk or document bytes cannot be decoded
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// Reconstruction ran past the metrics the chunk supplied
    #[error("metric position out of range: {0}")]
    OutOfRange(String),

    /// Invalid capture configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl FtdcError {
    /// Check if the error indicates undecodable persisted data
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            FtdcError::Malformed(_) | FtdcError::Corrupt(_) | FtdcError::OutOfRange(_)
        )
    }
}
