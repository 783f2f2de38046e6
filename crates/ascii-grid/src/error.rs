//! Error types for ASCII grid reading.

use std::path::{Path, PathBuf};

use grid_common::GridError;
use thiserror::Error;

/// Result type for ASCII grid operations.
pub type Result<T> = std::result::Result<T, AsciiGridError>;

/// Errors raised while reading an ASCII grid.
#[derive(Error, Debug)]
pub enum AsciiGridError {
    /// Header is missing a required key or has an unparseable value
    #[error("Malformed raster header: {0}")]
    MalformedHeader(String),

    /// File could not be opened or a read failed mid-stream
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File ended before the last requested row
    #[error("Raster ended after {rows_read} data rows, expected row {expected_row}")]
    Truncated { expected_row: usize, rows_read: usize },
}

impl AsciiGridError {
    pub fn malformed_header(msg: impl Into<String>) -> Self {
        Self::MalformedHeader(msg.into())
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for failures of the underlying file rather than its header.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Truncated { .. })
    }
}

impl From<GridError> for AsciiGridError {
    fn from(err: GridError) -> Self {
        Self::MalformedHeader(err.to_string())
    }
}
