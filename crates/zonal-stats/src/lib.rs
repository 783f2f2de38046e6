//! Zonal statistics over ESRI ASCII grids
//!
//! Sums the pixels of a population raster inside each administrative
//! polygon. Only the rows a polygon can reach are streamed from disk, so a
//! country-sized raster never has to fit in memory.
//!
//! # Architecture
//!
//! ```text
//! AdminPolygon (key + geometry)
//!      │
//!      ▼
//! resolve_window(bbox)            nearest rows/cols + margin
//!      │
//!      ▼
//! WindowScanner::scan(window)     rows north..=south, stop early
//!      │
//!      ▼
//! PixelAggregator::aggregate      one blocking task per row,
//!      │                          at most N in flight, row order kept
//!      ▼
//! SharedAccumulator::add(key)     merge per-polygon partial total
//!      │
//!      ▼
//! AccumulatorMap                  key -> total
//! ```
//!
//! # Example
//!
//! ```ignore
//! use zonal_stats::{Aggregation, AggregationConfig, TemplateKey, parse_features};
//!
//! let aggregation = Aggregation::open("COL_ppp_v2b_2015_UNadj.asc", AggregationConfig::from_env()).await?;
//! let features = parse_features(&std::fs::read_to_string("municipalities.geojson")?)?;
//! let outcome = aggregation
//!     .run_features(&features, &TemplateKey::colombia_municipalities())
//!     .await?;
//!
//! for (key, total) in &outcome.totals {
//!     println!("{key}: {total}");
//! }
//! ```

pub mod accumulator;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod polygon;
pub mod summary;
pub mod window;

// Re-export commonly used types at crate root
pub use accumulator::{AccumulatorMap, SharedAccumulator};
pub use aggregator::{aggregate_row, PixelAggregator, PixelStats, PolygonTotal, RowContribution};
pub use config::{AggregationConfig, IoErrorPolicy, DEFAULT_CONTAINMENT_CONCURRENCY, DEFAULT_WINDOW_MARGIN};
pub use error::{AggregationError, PolygonError, Result, WindowError};
pub use orchestrator::{Aggregation, AggregationOutcome};
pub use polygon::{
    parse_features, AdminPolygon, FeatureResult, FieldsKey, GroupingKey, TemplateKey,
};
pub use summary::{RunSummary, SkipReason, SkippedPolygon};
pub use window::{geometry_bounds, nearest_index, resolve_bbox_window, resolve_window};
