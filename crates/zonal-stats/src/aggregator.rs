//! Pixel containment and summation for one polygon.
//!
//! Each retained row becomes one blocking task that walks the row's tokens
//! inside the window, drops no-data pixels, and tests every remaining pixel
//! coordinate against the polygon. Rows are consumed in raster order so the
//! floating-point sum does not depend on task scheduling.

use std::ops::AddAssign;
use std::sync::Arc;

use ascii_grid::ScannedRow;
use futures::stream::{self, StreamExt};
use geo::{Intersects, MultiPolygon, Point};
use grid_common::{CoordinateArrays, NoDataValue, WindowIndex};
use serde::Serialize;
use tracing::trace;

use crate::error::{AggregationError, Result};

/// Pixel counters for one polygon or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PixelStats {
    /// Pixels in the window that were tested for containment
    pub tested: u64,
    /// Pixels inside or on the boundary of the polygon
    pub contained: u64,
    /// Contained pixels that added to the total
    pub contributed: u64,
    /// Pixels equal to the no-data sentinel
    pub nodata: u64,
    /// Contained pixels that were not numbers
    pub unparseable: u64,
}

impl AddAssign for PixelStats {
    fn add_assign(&mut self, other: Self) {
        self.tested += other.tested;
        self.contained += other.contained;
        self.contributed += other.contributed;
        self.nodata += other.nodata;
        self.unparseable += other.unparseable;
    }
}

/// Contributing values of one row, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowContribution {
    pub row: usize,
    pub values: Vec<f64>,
    pub stats: PixelStats,
}

/// Sum of one polygon's contributing pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolygonTotal {
    /// `None` when no pixel contributed
    pub total: Option<f64>,
    pub stats: PixelStats,
}

/// Test one raster row against a polygon.
///
/// Tokens outside the window's columns are ignored. A contained pixel
/// contributes when it parses to a value other than zero or NaN.
pub fn aggregate_row(
    row: &ScannedRow,
    window: &WindowIndex,
    geometry: &MultiPolygon<f64>,
    coords: &CoordinateArrays,
    nodata: &NoDataValue,
) -> RowContribution {
    let mut contribution = RowContribution {
        row: row.row,
        ..Default::default()
    };

    let Some(lat) = coords.latitude(row.row) else {
        return contribution;
    };

    let stats = &mut contribution.stats;
    for (col, token) in row
        .line
        .split_whitespace()
        .enumerate()
        .skip(window.west)
        .take(window.column_count())
    {
        if nodata.matches(token) {
            stats.nodata += 1;
            continue;
        }

        let Some(lon) = coords.longitude(col) else {
            break;
        };

        stats.tested += 1;
        if !geometry.intersects(&Point::new(lon, lat)) {
            continue;
        }
        stats.contained += 1;

        match token.parse::<f64>() {
            Ok(value) if value == 0.0 || value.is_nan() => {}
            Ok(value) => {
                contribution.values.push(value);
                stats.contributed += 1;
            }
            Err(_) => {
                stats.unparseable += 1;
            }
        }
    }

    contribution
}

/// Runs row containment tasks for a polygon with bounded fan-out.
#[derive(Debug, Clone)]
pub struct PixelAggregator {
    coords: Arc<CoordinateArrays>,
    nodata: Arc<NoDataValue>,
    concurrency: usize,
}

impl PixelAggregator {
    pub fn new(coords: Arc<CoordinateArrays>, nodata: NoDataValue, concurrency: usize) -> Self {
        Self {
            coords,
            nodata: Arc::new(nodata),
            concurrency: concurrency.max(1),
        }
    }

    /// Sum the contributing pixels of `rows` for one polygon.
    ///
    /// At most `concurrency` row tasks run at once. Results are folded in
    /// row order.
    pub async fn aggregate(
        &self,
        rows: Vec<ScannedRow>,
        window: WindowIndex,
        geometry: Arc<MultiPolygon<f64>>,
    ) -> Result<PolygonTotal> {
        let tasks = rows.into_iter().map(|row| {
            let coords = Arc::clone(&self.coords);
            let nodata = Arc::clone(&self.nodata);
            let geometry = Arc::clone(&geometry);
            tokio::task::spawn_blocking(move || {
                aggregate_row(&row, &window, &geometry, &coords, &nodata)
            })
        });

        let mut results = stream::iter(tasks).buffered(self.concurrency);
        let mut result = PolygonTotal::default();

        while let Some(joined) = results.next().await {
            let contribution = joined.map_err(|e| AggregationError::Task(e.to_string()))?;
            trace!(
                row = contribution.row,
                values = contribution.values.len(),
                "Row containment finished"
            );

            result.stats += contribution.stats;
            for value in contribution.values {
                result.total = Some(result.total.map_or(value, |sum| sum + value));
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_common::RasterMetadata;
    use test_utils::rectangle_multi;

    fn metadata(ncols: usize, nrows: usize) -> RasterMetadata {
        RasterMetadata {
            ncols,
            nrows,
            xllcorner: 0.0,
            yllcorner: 0.0,
            dx: 1.0,
            dy: 1.0,
            nodata: NoDataValue::parse("-9999").unwrap(),
            header_lines: 6,
        }
    }

    fn row(row: usize, line: &str) -> ScannedRow {
        ScannedRow {
            row,
            line: line.to_string(),
        }
    }

    fn full_window(nrows: usize, ncols: usize) -> WindowIndex {
        WindowIndex::new(0, nrows - 1, ncols - 1, 0, nrows, ncols).unwrap()
    }

    #[test]
    fn test_nodata_pixels_never_contribute() {
        let meta = metadata(4, 4);
        let coords = CoordinateArrays::from_metadata(&meta);
        // Row 2 has latitude 2.
        let geometry = rectangle_multi(0.0, 1.0, 3.0, 3.0);
        let result = aggregate_row(
            &row(2, "9 -9999 11 12"),
            &full_window(4, 4),
            &geometry,
            &coords,
            &meta.nodata,
        );
        assert_eq!(result.values, vec![9.0, 11.0, 12.0]);
        assert_eq!(result.stats.nodata, 1);
        assert_eq!(result.stats.contained, 3);
    }

    #[test]
    fn test_nodata_compared_as_text() {
        let meta = metadata(2, 1);
        let coords = CoordinateArrays::from_metadata(&meta);
        let geometry = rectangle_multi(-1.0, 0.0, 5.0, 5.0);
        let result = aggregate_row(
            &row(0, "-9999.0 3"),
            &full_window(1, 2),
            &geometry,
            &coords,
            &meta.nodata,
        );
        assert_eq!(result.values, vec![-9999.0, 3.0]);
        assert_eq!(result.stats.nodata, 0);
    }

    #[test]
    fn test_zero_and_nan_values_skipped() {
        let meta = metadata(4, 1);
        let coords = CoordinateArrays::from_metadata(&meta);
        let geometry = rectangle_multi(-1.0, 0.0, 5.0, 5.0);
        let result = aggregate_row(
            &row(0, "0 0.0 NaN 2.5"),
            &full_window(1, 4),
            &geometry,
            &coords,
            &meta.nodata,
        );
        assert_eq!(result.values, vec![2.5]);
        assert_eq!(result.stats.contained, 4);
        assert_eq!(result.stats.contributed, 1);
    }

    #[test]
    fn test_boundary_pixels_included() {
        let meta = metadata(4, 4);
        let coords = CoordinateArrays::from_metadata(&meta);
        // Columns 1 and 2 sit exactly on the west and east edges.
        let geometry = rectangle_multi(1.0, 2.0, 2.0, 3.0);
        let result = aggregate_row(
            &row(2, "9 10 11 12"),
            &full_window(4, 4),
            &geometry,
            &coords,
            &meta.nodata,
        );
        assert_eq!(result.values, vec![10.0, 11.0]);
    }

    #[test]
    fn test_columns_outside_window_ignored() {
        let meta = metadata(4, 4);
        let coords = CoordinateArrays::from_metadata(&meta);
        let geometry = rectangle_multi(-10.0, -10.0, 10.0, 10.0);
        let window = WindowIndex::new(0, 3, 2, 1, 4, 4).unwrap();
        let result = aggregate_row(&row(1, "5 6 7 8"), &window, &geometry, &coords, &meta.nodata);
        assert_eq!(result.values, vec![6.0, 7.0]);
        assert_eq!(result.stats.tested, 2);
    }

    #[test]
    fn test_unparseable_token_counted() {
        let meta = metadata(2, 1);
        let coords = CoordinateArrays::from_metadata(&meta);
        let geometry = rectangle_multi(-1.0, 0.0, 5.0, 5.0);
        let result = aggregate_row(
            &row(0, "abc 4"),
            &full_window(1, 2),
            &geometry,
            &coords,
            &meta.nodata,
        );
        assert_eq!(result.values, vec![4.0]);
        assert_eq!(result.stats.unparseable, 1);
    }

    #[test]
    fn test_extra_whitespace_keeps_columns_aligned() {
        let meta = metadata(3, 1);
        let coords = CoordinateArrays::from_metadata(&meta);
        // Only column 2 (lon 2) is inside.
        let geometry = rectangle_multi(1.5, 0.0, 2.5, 5.0);
        let result = aggregate_row(
            &row(0, "  1   2\t3 "),
            &full_window(1, 3),
            &geometry,
            &coords,
            &meta.nodata,
        );
        assert_eq!(result.values, vec![3.0]);
    }

    #[tokio::test]
    async fn test_aggregate_sums_in_row_order() {
        let meta = metadata(4, 4);
        let coords = Arc::new(CoordinateArrays::from_metadata(&meta));
        let aggregator = PixelAggregator::new(coords, meta.nodata.clone(), 2);

        let rows = vec![
            row(0, "1 2 3 4"),
            row(1, "5 6 7 8"),
            row(2, "9 -9999 11 12"),
            row(3, "13 14 15 16"),
        ];
        let geometry = Arc::new(rectangle_multi(0.0, 1.0, 1.0, 2.0));
        let result = aggregator
            .aggregate(rows, full_window(4, 4), geometry)
            .await
            .unwrap();

        assert_eq!(result.total, Some(36.0));
        assert_eq!(result.stats.contributed, 3);
        assert_eq!(result.stats.nodata, 1);
    }

    #[tokio::test]
    async fn test_aggregate_without_contribution() {
        let meta = metadata(2, 2);
        let coords = Arc::new(CoordinateArrays::from_metadata(&meta));
        let aggregator = PixelAggregator::new(coords, meta.nodata.clone(), 4);

        let rows = vec![row(0, "0 0"), row(1, "0 0")];
        let geometry = Arc::new(rectangle_multi(-1.0, -1.0, 5.0, 5.0));
        let result = aggregator
            .aggregate(rows, full_window(2, 2), geometry)
            .await
            .unwrap();

        assert_eq!(result.total, None);
        assert_eq!(result.stats.contained, 4);
    }
}
