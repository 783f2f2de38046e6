//! Common types shared by the raster reader and the aggregation engine.
//!
//! The raster is a single-band, north-up grid in geographic coordinates.
//! [`RasterMetadata`] owns the index/coordinate mapping and
//! [`CoordinateArrays`] materializes it once for the whole run.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod raster;

pub use bbox::BoundingBox;
pub use error::{GridError, GridResult};
pub use grid::{CoordinateArrays, WindowIndex};
pub use raster::{NoDataValue, RasterMetadata};
