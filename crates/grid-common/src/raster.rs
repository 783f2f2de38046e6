//! Raster metadata for ESRI ASCII grids.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{GridError, GridResult};

/// The no-data sentinel as it appears in the header.
///
/// Pixel tokens are compared against the raw header text, not the parsed
/// number, so `-3.4028234663852885981e+38` never drifts through an `f64`
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoDataValue {
    raw: String,
    value: f64,
}

impl NoDataValue {
    /// Build from the raw header token.
    pub fn parse(raw: &str) -> GridResult<Self> {
        let value = raw
            .parse::<f64>()
            .map_err(|_| GridError::invalid_metadata(format!("NODATA_value '{}' is not numeric", raw)))?;
        Ok(Self {
            raw: raw.to_string(),
            value,
        })
    }

    /// Raw header text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed numeric value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// True when a pixel token is the sentinel.
    pub fn matches(&self, token: &str) -> bool {
        token == self.raw
    }
}

/// Metadata describing a single-band north-up raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// Number of columns
    pub ncols: usize,
    /// Number of rows
    pub nrows: usize,
    /// Longitude of the lower-left corner
    pub xllcorner: f64,
    /// Latitude of the lower-left corner
    pub yllcorner: f64,
    /// Pixel width in degrees
    pub dx: f64,
    /// Pixel height in degrees
    pub dy: f64,
    /// No-data sentinel
    pub nodata: NoDataValue,
    /// Lines preceding the first pixel row
    pub header_lines: usize,
}

impl RasterMetadata {
    /// Check dimensions and spacing.
    pub fn validate(&self) -> GridResult<()> {
        if self.ncols == 0 || self.nrows == 0 {
            return Err(GridError::invalid_metadata(format!(
                "grid must have at least one row and column, got {}x{}",
                self.ncols, self.nrows
            )));
        }

        if !(self.dx.is_finite() && self.dx > 0.0) || !(self.dy.is_finite() && self.dy > 0.0) {
            return Err(GridError::invalid_metadata(format!(
                "pixel size must be positive, got dx={} dy={}",
                self.dx, self.dy
            )));
        }

        if !self.xllcorner.is_finite() || !self.yllcorner.is_finite() {
            return Err(GridError::invalid_metadata("lower-left corner is not finite"));
        }

        Ok(())
    }

    /// Latitude assigned to raster row `row` (row 0 is the northern edge).
    pub fn row_latitude(&self, row: usize) -> f64 {
        self.yllcorner + (self.nrows - row) as f64 * self.dy
    }

    /// Longitude assigned to raster column `col`.
    pub fn column_longitude(&self, col: usize) -> f64 {
        self.xllcorner + col as f64 * self.dx
    }

    /// Extent covered by the pixel coordinates.
    pub fn coordinate_extent(&self) -> BoundingBox {
        BoundingBox::new(
            self.column_longitude(0),
            self.row_latitude(self.nrows - 1),
            self.column_longitude(self.ncols - 1),
            self.row_latitude(0),
        )
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.ncols * self.nrows
    }

    /// Check if the raster is empty.
    pub fn is_empty(&self) -> bool {
        self.ncols == 0 || self.nrows == 0
    }
}
