//! ESRI ASCII grid header parsing.
//!
//! A header is a run of `key value` lines:
//!
//! ```text
//! ncols        4470
//! nrows        5288
//! xllcorner    -81.739290337968
//! yllcorner    -4.227887418487
//! dx           0.003333759262
//! dy           0.003333200000
//! NODATA_value -3.4028234663852885981e+38
//! ```
//!
//! The first line with more than two tokens, or whose first token is a
//! number, is the first pixel row.

use std::collections::HashMap;
use std::path::Path;

use grid_common::{NoDataValue, RasterMetadata};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::error::{AsciiGridError, Result};

const KNOWN_KEYS: &[&str] = &[
    "ncols",
    "nrows",
    "xllcorner",
    "yllcorner",
    "cellsize",
    "dx",
    "dy",
    "nodata_value",
];

/// Accumulates header lines until the pixel body starts.
#[derive(Debug, Default)]
pub struct HeaderBuilder {
    entries: HashMap<String, String>,
    lines: usize,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns `false` once the line belongs to the pixel body;
    /// that line is not counted as a header line.
    pub fn push_line(&mut self, line: &str) -> bool {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens.len() > 2 || tokens.first().is_some_and(|t| t.parse::<f64>().is_ok()) {
            return false;
        }

        self.lines += 1;

        if let [key, value] = tokens.as_slice() {
            let key = key.to_ascii_lowercase();
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!(key = %key, "Ignoring unknown header key");
            }
            self.entries.insert(key, value.to_string());
        }

        true
    }

    /// Number of header lines consumed so far.
    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Build the metadata record, failing when a required key is absent.
    pub fn finish(self) -> Result<RasterMetadata> {
        let ncols = self.parse_required::<usize>("ncols")?;
        let nrows = self.parse_required::<usize>("nrows")?;
        let xllcorner = self.parse_required::<f64>("xllcorner")?;
        let yllcorner = self.parse_required::<f64>("yllcorner")?;

        let (dx, dy) = match self.entries.get("cellsize") {
            Some(_) => {
                let cellsize = self.parse_required::<f64>("cellsize")?;
                (cellsize, cellsize)
            }
            None => {
                if !self.entries.contains_key("dx") || !self.entries.contains_key("dy") {
                    return Err(AsciiGridError::malformed_header(
                        "missing 'cellsize' or 'dx'/'dy'",
                    ));
                }
                (self.parse_required::<f64>("dx")?, self.parse_required::<f64>("dy")?)
            }
        };

        let nodata_raw = self.required("nodata_value")?;
        let nodata = NoDataValue::parse(nodata_raw)?;

        let metadata = RasterMetadata {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            dx,
            dy,
            nodata,
            header_lines: self.lines,
        };
        metadata.validate()?;

        Ok(metadata)
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| AsciiGridError::malformed_header(format!("missing '{}'", key)))
    }

    fn parse_required<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.required(key)?;
        raw.parse().map_err(|_| {
            AsciiGridError::malformed_header(format!("invalid value '{}' for '{}'", raw, key))
        })
    }
}

/// Parse a header from any async buffered reader.
///
/// `source` names the reader in I/O errors.
pub async fn parse_header<R>(mut reader: R, source: &Path) -> Result<RasterMetadata>
where
    R: AsyncBufRead + Unpin,
{
    let mut builder = HeaderBuilder::new();
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| AsciiGridError::io(source, e))?;
        if read == 0 || !builder.push_line(&line) {
            break;
        }
    }
    builder.finish()
}

/// Read the header of a raster file, stopping at the first pixel row.
pub async fn read_header(path: impl AsRef<Path>) -> Result<RasterMetadata> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AsciiGridError::io(path, e))?;

    let metadata = parse_header(BufReader::new(file), path).await?;
    debug!(
        path = %path.display(),
        ncols = metadata.ncols,
        nrows = metadata.nrows,
        header_lines = metadata.header_lines,
        "Parsed raster header"
    );
    Ok(metadata)
}
