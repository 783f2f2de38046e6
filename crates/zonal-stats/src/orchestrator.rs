//! Drives a full aggregation run over a raster and a set of polygons.

use std::sync::Arc;
use std::time::Instant;

use ascii_grid::{AsciiGrid, WindowScanner};
use grid_common::{CoordinateArrays, RasterMetadata};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::accumulator::{AccumulatorMap, SharedAccumulator};
use crate::aggregator::{PixelAggregator, PolygonTotal};
use crate::config::{AggregationConfig, IoErrorPolicy};
use crate::error::{AggregationError, PolygonError, Result, WindowError};
use crate::polygon::{AdminPolygon, FeatureResult, GroupingKey};
use crate::summary::{RunSummary, SkipReason};
use crate::window::resolve_window;

/// Totals and bookkeeping of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationOutcome {
    pub totals: AccumulatorMap,
    pub summary: RunSummary,
}

/// Aggregates one raster over any number of polygons.
///
/// The coordinate arrays are built once and shared by every polygon.
/// Polygons are processed one at a time; the pixel work inside each polygon
/// runs concurrently.
pub struct Aggregation {
    metadata: RasterMetadata,
    coords: Arc<CoordinateArrays>,
    scanner: WindowScanner,
    aggregator: PixelAggregator,
    config: AggregationConfig,
}

impl Aggregation {
    /// Prepare a run over an opened raster.
    pub fn new(grid: &AsciiGrid, config: AggregationConfig) -> Result<Self> {
        config.validate().map_err(AggregationError::config)?;

        let metadata = grid.metadata().clone();
        let coords = Arc::new(CoordinateArrays::from_metadata(&metadata));
        let aggregator = PixelAggregator::new(
            Arc::clone(&coords),
            metadata.nodata.clone(),
            config.containment_concurrency,
        );

        info!(
            path = %grid.path().display(),
            ncols = metadata.ncols,
            nrows = metadata.nrows,
            dx = metadata.dx,
            dy = metadata.dy,
            nodata = metadata.nodata.raw(),
            margin = config.window_margin,
            concurrency = config.containment_concurrency,
            "Prepared aggregation"
        );

        Ok(Self {
            metadata,
            coords,
            scanner: grid.scanner(),
            aggregator,
            config,
        })
    }

    /// Open a raster and prepare a run over it.
    pub async fn open(path: impl AsRef<std::path::Path>, config: AggregationConfig) -> Result<Self> {
        let grid = AsciiGrid::open(path).await?;
        Self::new(&grid, config)
    }

    pub fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    pub fn coordinates(&self) -> &CoordinateArrays {
        &self.coords
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Aggregate the raster over already keyed polygons.
    pub async fn run<I>(&self, polygons: I) -> Result<AggregationOutcome>
    where
        I: IntoIterator<Item = AdminPolygon>,
    {
        self.drive(polygons.into_iter().map(Ok)).await
    }

    /// Aggregate the raster over GeoJSON features, keyed by `key`.
    ///
    /// Features that failed to parse or cannot be converted are recorded as
    /// skipped.
    pub async fn run_features<K>(
        &self,
        features: &[FeatureResult],
        key: &K,
    ) -> Result<AggregationOutcome>
    where
        K: GroupingKey + ?Sized,
    {
        self.drive(features.iter().map(|feature| match feature {
            Ok(feature) => AdminPolygon::from_feature(feature, key),
            Err(e) => Err(e.clone()),
        }))
        .await
    }

    async fn drive<I>(&self, polygons: I) -> Result<AggregationOutcome>
    where
        I: Iterator<Item = std::result::Result<AdminPolygon, PolygonError>>,
    {
        let started = Instant::now();
        let accumulator = SharedAccumulator::new();
        let mut summary = RunSummary::default();

        for (index, polygon) in polygons.enumerate() {
            let polygon = match polygon {
                Ok(polygon) => polygon,
                Err(e) => {
                    warn!(index, error = %e, "Skipping invalid feature");
                    summary.record_skip(index, None, SkipReason::InvalidFeature(e.to_string()));
                    continue;
                }
            };

            match self.process_polygon(index, &polygon).await {
                Ok(PolygonTotal {
                    total: Some(total),
                    stats,
                }) => {
                    accumulator.add(&polygon.key, total).await;
                    summary.record_processed(stats, true);
                }
                Ok(PolygonTotal { total: None, stats }) => {
                    summary.record_processed(stats, false);
                }
                Err(AggregationError::Window(WindowError::EmptyWindow { .. })) => {
                    debug!(index, key = %polygon.key, "Polygon outside raster");
                    summary.record_skip(index, Some(polygon.key.clone()), SkipReason::EmptyWindow);
                }
                Err(AggregationError::Window(e @ WindowError::Degenerate(_))) => {
                    warn!(index, key = %polygon.key, error = %e, "Skipping degenerate polygon");
                    summary.record_skip(
                        index,
                        Some(polygon.key.clone()),
                        SkipReason::InvalidFeature(e.to_string()),
                    );
                }
                Err(e) if e.is_io() && self.config.io_error_policy == IoErrorPolicy::SkipPolygon => {
                    warn!(index, key = %polygon.key, error = %e, "Skipping polygon after read failure");
                    summary.record_skip(index, Some(polygon.key.clone()), SkipReason::Io(e.to_string()));
                }
                Err(e) => return Err(e),
            }

            if (index + 1) % self.config.progress_interval == 0 {
                info!(
                    polygons = index + 1,
                    keys = accumulator.len().await,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Aggregation progress"
                );
            }
        }

        summary.elapsed = started.elapsed();
        summary.log();

        Ok(AggregationOutcome {
            totals: accumulator.finalize().await,
            summary,
        })
    }

    /// Window, scan and sum one polygon.
    #[instrument(skip(self, polygon), fields(key = %polygon.key))]
    async fn process_polygon(&self, index: usize, polygon: &AdminPolygon) -> Result<PolygonTotal> {
        let window = resolve_window(&polygon.geometry, &self.coords, self.config.window_margin)?;
        debug!(
            north = window.north,
            south = window.south,
            west = window.west,
            east = window.east,
            "Resolved window"
        );

        let rows = match self.config.scan_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, self.scanner.scan(&window))
                .await
                .map_err(|_| AggregationError::ScanTimeout {
                    north: window.north,
                    south: window.south,
                    timeout,
                })??,
            None => self.scanner.scan(&window).await?,
        };

        let result = self
            .aggregator
            .aggregate(rows, window, Arc::clone(&polygon.geometry))
            .await?;

        debug!(
            total = ?result.total,
            contained = result.stats.contained,
            "Polygon aggregated"
        );
        Ok(result)
    }
}
