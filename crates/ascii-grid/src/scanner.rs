//! Bounded streaming of raster rows.
//!
//! Only the rows of one window are kept in memory. Reading stops at the last
//! row of the window, so the tail of a multi-gigabyte raster is never read
//! for a polygon in its northern part.

use std::path::{Path, PathBuf};

use grid_common::WindowIndex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, trace};

use crate::error::{AsciiGridError, Result};

/// Read buffer for raster files: 1 MiB.
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// One raster row retained by a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedRow {
    /// Raster row index (0 = northernmost row)
    pub row: usize,
    /// Raw pixel tokens, without the line terminator
    pub line: String,
}

/// Streams the rows of a window from a raster file.
#[derive(Debug, Clone)]
pub struct WindowScanner {
    path: PathBuf,
    header_lines: usize,
}

impl WindowScanner {
    /// Create a scanner for a raster whose pixel rows start after
    /// `header_lines` lines.
    pub fn new(path: impl Into<PathBuf>, header_lines: usize) -> Self {
        Self {
            path: path.into(),
            header_lines,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read rows `window.north..=window.south`, in order.
    ///
    /// Column bounds are not applied here. On failure nothing that was
    /// already read is returned.
    pub async fn scan(&self, window: &WindowIndex) -> Result<Vec<ScannedRow>> {
        let file = File::open(&self.path)
            .await
            .map_err(|e| AsciiGridError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let first = self.header_lines + window.north;
        let last = self.header_lines + window.south;

        let mut rows = Vec::with_capacity(window.row_count());
        let mut buf = String::new();
        let mut index = 0usize;

        loop {
            buf.clear();
            let read = reader
                .read_line(&mut buf)
                .await
                .map_err(|e| AsciiGridError::io(&self.path, e))?;
            if read == 0 {
                break;
            }

            if index >= first {
                let line = buf.trim_end_matches(['\n', '\r']).to_string();
                trace!(row = index - self.header_lines, "Retained raster row");
                rows.push(ScannedRow {
                    row: index - self.header_lines,
                    line,
                });

                if index == last {
                    debug!(
                        path = %self.path.display(),
                        north = window.north,
                        south = window.south,
                        rows = rows.len(),
                        "Scanned raster window"
                    );
                    return Ok(rows);
                }
            }

            index += 1;
        }

        Err(AsciiGridError::Truncated {
            expected_row: window.south,
            rows_read: index.saturating_sub(self.header_lines),
        })
    }
}
