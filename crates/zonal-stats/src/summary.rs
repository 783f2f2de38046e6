//! Per-run bookkeeping: what was processed, what was skipped and why.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::PixelStats;

/// Why a polygon did not take part in aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Bounding box lies outside the raster.
    EmptyWindow,
    /// Feature could not be turned into a keyed polygon.
    InvalidFeature(String),
    /// Raster read failed and the run was configured to continue.
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedPolygon {
    /// Position of the polygon in the input sequence
    pub index: usize,
    /// Grouping key, when one could be derived
    pub key: Option<String>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Counters for one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub polygons_seen: usize,
    pub polygons_processed: usize,
    pub polygons_contributing: usize,
    pub pixels: PixelStats,
    pub skipped: Vec<SkippedPolygon>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record_processed(&mut self, stats: PixelStats, contributed: bool) {
        self.polygons_seen += 1;
        self.polygons_processed += 1;
        if contributed {
            self.polygons_contributing += 1;
        }
        self.pixels += stats;
    }

    pub fn record_skip(&mut self, index: usize, key: Option<String>, reason: SkipReason) {
        self.polygons_seen += 1;
        self.skipped.push(SkippedPolygon { index, key, reason });
    }

    /// Count of skips whose reason matches `pred`.
    pub fn skipped_where(&self, pred: impl Fn(&SkipReason) -> bool) -> usize {
        self.skipped.iter().filter(|s| pred(&s.reason)).count()
    }

    /// Emit the summary through tracing.
    pub fn log(&self) {
        info!(
            polygons = self.polygons_seen,
            processed = self.polygons_processed,
            contributing = self.polygons_contributing,
            skipped = self.skipped.len(),
            pixels_contained = self.pixels.contained,
            pixels_contributed = self.pixels.contributed,
            nodata = self.pixels.nodata,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Aggregation finished"
        );

        for skipped in &self.skipped {
            warn!(
                index = skipped.index,
                key = skipped.key.as_deref().unwrap_or("-"),
                reason = ?skipped.reason,
                "Polygon skipped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut summary = RunSummary::default();
        summary.record_processed(
            PixelStats {
                contained: 4,
                contributed: 3,
                ..Default::default()
            },
            true,
        );
        summary.record_processed(PixelStats::default(), false);
        summary.record_skip(2, Some("x".to_string()), SkipReason::EmptyWindow);
        summary.record_skip(3, None, SkipReason::InvalidFeature("no geometry".to_string()));

        assert_eq!(summary.polygons_seen, 4);
        assert_eq!(summary.polygons_processed, 2);
        assert_eq!(summary.polygons_contributing, 1);
        assert_eq!(summary.pixels.contributed, 3);
        assert_eq!(summary.skipped_where(|r| *r == SkipReason::EmptyWindow), 1);
    }

    #[test]
    fn test_skip_serialization() {
        let skipped = SkippedPolygon {
            index: 5,
            key: Some("k".to_string()),
            reason: SkipReason::Io("disk gone".to_string()),
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["index"], 5);
        assert_eq!(json["reason"], "io");
        assert_eq!(json["detail"], "disk gone");
    }
}
