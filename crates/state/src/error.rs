//! Error types for the state crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for state store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// State store error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the state file failed.
    #[error("failed to read state file '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    /// Writing the state file failed.
    #[error("failed to write state file '{path}': {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// The state record could not be decoded.
    #[error("state record is not valid JSON: {reason}")]
    DecodeFailed { reason: String },
}

impl Error {
    /// Create a read error.
    pub fn read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a write error.
    pub fn write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a decode error.
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
        }
    }
}
