//! Mapping a polygon's bounding box onto a window of raster indices.
//!
//! The nearest row and column to each bbox edge are found by binary search,
//! then the window is widened by a margin so pixels just outside the nearest
//! index are still tested against the polygon.

use geo::{BoundingRect, MultiPolygon};
use grid_common::{BoundingBox, CoordinateArrays, WindowIndex};

use crate::error::WindowError;

/// Index of the element of `sorted` closest to `target`.
///
/// `sorted` must be ascending. Ties go to the lower index; targets outside
/// the range clamp to the first or last element. Returns `None` only for an
/// empty slice.
pub fn nearest_index(sorted: &[f64], target: f64) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }

    let upper = sorted.partition_point(|v| *v < target);
    if upper == 0 {
        return Some(0);
    }
    if upper == sorted.len() {
        return Some(sorted.len() - 1);
    }

    let below = upper - 1;
    if target - sorted[below] <= sorted[upper] - target {
        Some(below)
    } else {
        Some(upper)
    }
}

/// Bounding box of a geometry, rejecting empty or non-finite geometries.
pub fn geometry_bounds(geometry: &MultiPolygon<f64>) -> Result<BoundingBox, WindowError> {
    let rect = geometry
        .bounding_rect()
        .ok_or_else(|| WindowError::Degenerate("geometry has no coordinates".to_string()))?;

    let bbox = BoundingBox::from(rect);
    if !bbox.is_finite() {
        return Err(WindowError::Degenerate(format!(
            "non-finite bounding box {:?}",
            bbox
        )));
    }

    Ok(bbox)
}

/// Window of raster indices that may contain pixels of `geometry`.
pub fn resolve_window(
    geometry: &MultiPolygon<f64>,
    coords: &CoordinateArrays,
    margin: usize,
) -> Result<WindowIndex, WindowError> {
    let bbox = geometry_bounds(geometry)?;
    resolve_bbox_window(&bbox, coords, margin)
}

/// Window of raster indices for a bounding box.
///
/// Fails with [`WindowError::EmptyWindow`] when the box does not touch the
/// extent spanned by the coordinate arrays.
pub fn resolve_bbox_window(
    bbox: &BoundingBox,
    coords: &CoordinateArrays,
    margin: usize,
) -> Result<WindowIndex, WindowError> {
    let outside = || WindowError::EmptyWindow { bbox: *bbox };

    let extent = coords.extent().ok_or_else(outside)?;
    if !extent.touches(bbox) {
        return Err(outside());
    }

    let ascending = coords.ascending_latitudes();
    let north_asc = nearest_index(ascending, bbox.north()).ok_or_else(outside)?;
    let south_asc = nearest_index(ascending, bbox.south()).ok_or_else(outside)?;
    let east_col = nearest_index(coords.longitudes(), bbox.east()).ok_or_else(outside)?;
    let west_col = nearest_index(coords.longitudes(), bbox.west()).ok_or_else(outside)?;

    // Rows count downward from the north, so the higher latitude is the
    // smaller row index.
    let north = coords.row_from_ascending(north_asc).saturating_sub(margin);
    let south = (coords.row_from_ascending(south_asc) + margin).min(coords.nrows() - 1);
    let east = (east_col + margin).min(coords.ncols() - 1);
    let west = west_col.saturating_sub(margin);

    WindowIndex::new(north, south, east, west, coords.nrows(), coords.ncols())
        .map_err(|e| WindowError::Degenerate(e.to_string()))
}
