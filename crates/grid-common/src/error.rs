//! Error types for grid metadata and windows.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised while building or validating grid types.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Invalid raster metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),
}

impl GridError {
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    pub fn invalid_window(msg: impl Into<String>) -> Self {
        Self::InvalidWindow(msg.into())
    }
}
