//! ESRI ASCII grid reader.
//!
//! Reads the `key value` header of an ASCII grid and streams bounded
//! windows of pixel rows without loading the whole file.
//!
//! ```ignore
//! use ascii_grid::AsciiGrid;
//!
//! let grid = AsciiGrid::open("COL_ppp_v2b_2015_UNadj.asc").await?;
//! let rows = grid.scanner().scan(&window).await?;
//! ```

pub mod error;
pub mod header;
pub mod scanner;

use std::path::{Path, PathBuf};

use grid_common::RasterMetadata;

pub use error::{AsciiGridError, Result};
pub use header::{parse_header, read_header, HeaderBuilder};
pub use scanner::{ScannedRow, WindowScanner};

/// An ASCII grid file with its parsed header.
#[derive(Debug, Clone)]
pub struct AsciiGrid {
    path: PathBuf,
    metadata: RasterMetadata,
}

impl AsciiGrid {
    /// Open a raster and parse its header.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = read_header(&path).await?;
        Ok(Self { path, metadata })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    /// Scanner positioned after this raster's header.
    pub fn scanner(&self) -> WindowScanner {
        WindowScanner::new(&self.path, self.metadata.header_lines)
    }
}
