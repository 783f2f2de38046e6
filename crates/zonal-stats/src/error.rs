//! Error types for aggregation.

use std::time::Duration;

use ascii_grid::AsciiGridError;
use grid_common::BoundingBox;
use thiserror::Error;

/// Errors that abort a polygon or the whole run.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// Raster header or raster I/O failure.
    #[error(transparent)]
    Raster(#[from] AsciiGridError),

    /// The polygon has no usable window.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Reading a window took longer than the configured limit.
    #[error("scan of rows {north}..={south} timed out after {timeout:?}")]
    ScanTimeout {
        north: usize,
        south: usize,
        timeout: Duration,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A containment task panicked or was cancelled.
    #[error("containment task failed: {0}")]
    Task(String),
}

impl AggregationError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for raster read failures, which fall under the I/O error policy.
    pub fn is_io(&self) -> bool {
        match self {
            Self::Raster(e) => e.is_io(),
            Self::ScanTimeout { .. } => true,
            _ => false,
        }
    }
}

/// Errors resolving the raster window of one polygon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    /// The polygon's bounding box lies outside the raster.
    #[error("bounding box {bbox:?} lies outside the raster")]
    EmptyWindow { bbox: BoundingBox },

    /// The geometry has no coordinates or non-finite ones.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors turning a GeoJSON feature into an administrative polygon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolygonError {
    #[error("invalid GeoJSON: {0}")]
    Parse(String),

    #[error("feature has no geometry")]
    MissingGeometry,

    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("could not derive grouping key from properties")]
    MissingKey,

    #[error("invalid key template: {0}")]
    InvalidTemplate(String),
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregationError>;
