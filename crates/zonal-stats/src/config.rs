//! Configuration for an aggregation run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rows and columns added on each side of a polygon's nearest-pixel window.
pub const DEFAULT_WINDOW_MARGIN: usize = 1;

/// Row containment tasks in flight per polygon.
pub const DEFAULT_CONTAINMENT_CONCURRENCY: usize = 1000;

/// Configuration for an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Safety margin around the nearest-pixel window.
    pub window_margin: usize,

    /// Maximum row containment tasks in flight for one polygon.
    pub containment_concurrency: usize,

    /// What to do when the raster cannot be read for a polygon.
    pub io_error_policy: IoErrorPolicy,

    /// Upper bound on reading one polygon's window, in seconds.
    pub scan_timeout_secs: Option<u64>,

    /// Log progress every N polygons.
    pub progress_interval: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            window_margin: DEFAULT_WINDOW_MARGIN,
            containment_concurrency: DEFAULT_CONTAINMENT_CONCURRENCY,
            io_error_policy: IoErrorPolicy::Abort,
            scan_timeout_secs: None,
            progress_interval: 10,
        }
    }
}

impl AggregationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("AGGREGATE_WINDOW_MARGIN") {
            if let Ok(margin) = val.parse() {
                config.window_margin = margin;
            }
        }

        if let Ok(val) = std::env::var("AGGREGATE_CONTAINMENT_CONCURRENCY") {
            if let Ok(limit) = val.parse() {
                config.containment_concurrency = limit;
            }
        }

        if let Ok(val) = std::env::var("AGGREGATE_IO_ERROR_POLICY") {
            config.io_error_policy = IoErrorPolicy::from_str(&val);
        }

        if let Ok(val) = std::env::var("AGGREGATE_SCAN_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.scan_timeout_secs = Some(secs);
            }
        }

        if let Ok(val) = std::env::var("AGGREGATE_PROGRESS_INTERVAL") {
            if let Ok(interval) = val.parse() {
                config.progress_interval = interval;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.containment_concurrency == 0 {
            return Err("containment_concurrency must be > 0".to_string());
        }

        if self.progress_interval == 0 {
            return Err("progress_interval must be > 0".to_string());
        }

        if self.scan_timeout_secs == Some(0) {
            return Err("scan_timeout_secs must be > 0 when set".to_string());
        }

        Ok(())
    }

    /// Scan timeout as a duration.
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

/// Handling of raster read failures during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoErrorPolicy {
    /// Stop the run and return the error.
    #[default]
    Abort,
    /// Record the polygon as skipped and continue.
    SkipPolygon,
}

impl IoErrorPolicy {
    /// Parse from string (case-insensitive). Unknown values abort.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "skip" | "skip_polygon" => Self::SkipPolygon,
            _ => Self::Abort,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::SkipPolygon => "skip_polygon",
        }
    }
}

impl std::fmt::Display for IoErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
