//! Pixel coordinate arrays and raster windows.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{GridError, GridResult};
use crate::raster::RasterMetadata;

/// Latitude of every raster row and longitude of every raster column.
///
/// Built once per raster and shared read-only by every polygon.
#[derive(Debug, Clone)]
pub struct CoordinateArrays {
    /// Row latitudes, north to south (raster row order)
    latitudes: Vec<f64>,
    /// Column longitudes, west to east
    longitudes: Vec<f64>,
    /// `latitudes` reversed, for binary search
    ascending_latitudes: Vec<f64>,
}

impl CoordinateArrays {
    /// Build both arrays from the raster header.
    pub fn from_metadata(meta: &RasterMetadata) -> Self {
        let latitudes: Vec<f64> = (0..meta.nrows).map(|row| meta.row_latitude(row)).collect();
        let longitudes: Vec<f64> = (0..meta.ncols).map(|col| meta.column_longitude(col)).collect();
        let ascending_latitudes = latitudes.iter().rev().copied().collect();

        Self {
            latitudes,
            longitudes,
            ascending_latitudes,
        }
    }

    /// Row latitudes, north to south.
    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    /// Column longitudes, west to east.
    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    /// Row latitudes, south to north.
    pub fn ascending_latitudes(&self) -> &[f64] {
        &self.ascending_latitudes
    }

    pub fn nrows(&self) -> usize {
        self.latitudes.len()
    }

    pub fn ncols(&self) -> usize {
        self.longitudes.len()
    }

    /// Latitude of a row, if it exists.
    pub fn latitude(&self, row: usize) -> Option<f64> {
        self.latitudes.get(row).copied()
    }

    /// Longitude of a column, if it exists.
    pub fn longitude(&self, col: usize) -> Option<f64> {
        self.longitudes.get(col).copied()
    }

    /// Translate an index into `ascending_latitudes` back to a raster row.
    pub fn row_from_ascending(&self, ascending_index: usize) -> usize {
        self.nrows() - 1 - ascending_index
    }

    /// Extent covered by the coordinate arrays.
    pub fn extent(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(
            *self.longitudes.first()?,
            *self.ascending_latitudes.first()?,
            *self.longitudes.last()?,
            *self.latitudes.first()?,
        ))
    }
}

/// Raster sub-rectangle that may intersect one polygon.
///
/// Rows grow southward, so `north <= south`; columns grow eastward, so
/// `west <= east`. All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowIndex {
    pub north: usize,
    pub south: usize,
    pub east: usize,
    pub west: usize,
}

impl WindowIndex {
    /// Create a window, checking it lies inside an `nrows x ncols` grid.
    pub fn new(
        north: usize,
        south: usize,
        east: usize,
        west: usize,
        nrows: usize,
        ncols: usize,
    ) -> GridResult<Self> {
        if north > south || west > east {
            return Err(GridError::invalid_window(format!(
                "rows {}..={} cols {}..={} are inverted",
                north, south, west, east
            )));
        }

        if south >= nrows || east >= ncols {
            return Err(GridError::invalid_window(format!(
                "rows {}..={} cols {}..={} exceed {}x{} grid",
                north, south, west, east, nrows, ncols
            )));
        }

        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// Inclusive row range.
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.north..=self.south
    }

    /// Inclusive column range.
    pub fn columns(&self) -> RangeInclusive<usize> {
        self.west..=self.east
    }

    pub fn row_count(&self) -> usize {
        self.south - self.north + 1
    }

    pub fn column_count(&self) -> usize {
        self.east - self.west + 1
    }

    /// Number of pixels covered by the window.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.row_count() * self.column_count()
    }

    pub fn contains_column(&self, col: usize) -> bool {
        self.columns().contains(&col)
    }
}
