//! Path utilities for test data and temporary rasters.

use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Searches for a test file in `TEST_DATA_DIR` and the workspace `testdata/`.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }
    candidates.push(workspace_root().join("testdata").join(name));

    candidates.into_iter().find(|path| path.exists())
}

/// Write raster text to a temporary `.asc` file.
///
/// The file is removed when the returned handle is dropped.
pub fn write_temp_raster(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("raster_")
        .suffix(".asc")
        .tempfile()
        .expect("Failed to create temporary raster");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temporary raster");
    file.flush().expect("Failed to flush temporary raster");
    file
}

/// Creates a temporary directory for test output.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
