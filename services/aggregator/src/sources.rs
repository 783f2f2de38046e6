//! Sources of administrative polygons.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use zonal_stats::{parse_features, FeatureResult};

/// Anything that can list the administrative features of a country.
#[async_trait]
pub trait PolygonSource: Send + Sync {
    /// Load every feature, in source order.
    ///
    /// A feature that cannot be decoded stays in place as an error so the
    /// run can report it and carry on.
    async fn load_features(&self) -> Result<Vec<FeatureResult>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// GeoJSON `FeatureCollection` (or single `Feature`) on local disk.
#[derive(Debug, Clone)]
pub struct GeoJsonFileSource {
    path: PathBuf,
}

impl GeoJsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PolygonSource for GeoJsonFileSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_features(&self) -> Result<Vec<FeatureResult>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read GeoJSON file: {}", self.path.display()))?;
        debug!(bytes = text.len(), "Read GeoJSON file");

        let features = parse_features(&text)
            .with_context(|| format!("Failed to parse GeoJSON file: {}", self.path.display()))?;

        let invalid = features.iter().filter(|f| f.is_err()).count();
        if invalid > 0 {
            warn!(invalid, "Some features could not be decoded");
        }
        info!(features = features.len(), "Loaded administrative features");
        Ok(features)
    }

    fn describe(&self) -> String {
        format!("geojson:{}", self.path.display())
    }
}
