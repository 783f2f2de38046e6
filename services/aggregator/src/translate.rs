//! GeoTIFF to ASCII grid conversion through `gdal_translate`.

use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{info, warn};

/// Default GDAL binary, overridable with `GDAL_TRANSLATE`.
pub const GDAL_TRANSLATE: &str = "gdal_translate";

/// One `gdal_translate -of AAIGrid` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Output size as a percentage of the input, in both axes
    pub reduce_to_percent: u32,
}

impl TranslateRequest {
    /// `<dir>/<name>.tif` into `<dir>/<name>.asc`.
    pub fn for_raster(dir: Option<&Path>, name: &str, reduce_to_percent: u32) -> Self {
        let input = crate::config::resolve_raster(dir, name, "tif");
        let output = input.with_extension("asc");
        Self {
            input,
            output,
            reduce_to_percent,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.reduce_to_percent == 0 || self.reduce_to_percent > 100 {
            bail!(
                "reduce_to_percent must be 1-100, got {}",
                self.reduce_to_percent
            );
        }
        Ok(())
    }

    /// Arguments passed to `gdal_translate`.
    pub fn args(&self) -> Vec<String> {
        let size = format!("{}%", self.reduce_to_percent);
        vec![
            "-of".to_string(),
            "AAIGrid".to_string(),
            "-outsize".to_string(),
            size.clone(),
            size,
            self.input.display().to_string(),
            self.output.display().to_string(),
        ]
    }
}

/// Run `gdal_translate` and report its output.
pub async fn translate(request: &TranslateRequest) -> Result<PathBuf> {
    request.validate()?;

    let program = std::env::var("GDAL_TRANSLATE").unwrap_or_else(|_| GDAL_TRANSLATE.to_string());
    info!(
        program = %program,
        input = %request.input.display(),
        output = %request.output.display(),
        percent = request.reduce_to_percent,
        "Translating raster to ASCII grid"
    );

    let output: Output = Command::new(&program)
        .args(request.args())
        .output()
        .await
        .with_context(|| format!("Failed to run {}", program))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        bail!("{} failed ({}): {}", program, output.status, stderr.trim());
    }

    if !stdout.trim().is_empty() {
        info!(stdout = %stdout.trim(), "gdal_translate output");
    }
    if !stderr.trim().is_empty() {
        warn!(stderr = %stderr.trim(), "gdal_translate warnings");
    }

    Ok(request.output.clone())
}
