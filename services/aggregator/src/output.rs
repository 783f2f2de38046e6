//! Writing run results to disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use zonal_stats::{AccumulatorMap, RunSummary};

/// `<output_dir>/<raster stem>.json`
pub fn totals_path(output_dir: &Path, raster: &Path) -> PathBuf {
    let stem = raster
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "totals".to_string());
    output_dir.join(format!("{}.json", stem))
}

/// `<output_dir>/<raster stem>.summary.json`
pub fn summary_path(output_dir: &Path, raster: &Path) -> PathBuf {
    totals_path(output_dir, raster).with_extension("summary.json")
}

/// Write the key-to-total map as one JSON object.
pub async fn write_totals(path: &Path, totals: &AccumulatorMap) -> Result<()> {
    let json = serde_json::to_vec(totals)?;
    write_file(path, &json).await?;
    info!(path = %path.display(), keys = totals.len(), "Saved totals");
    Ok(())
}

pub async fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_vec_pretty(summary)?;
    write_file(path, &json).await?;
    info!(path = %path.display(), "Saved run summary");
    Ok(())
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
