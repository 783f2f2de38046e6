//! Population raster aggregator.
//!
//! Sums an ESRI ASCII grid population raster inside every administrative
//! polygon of a GeoJSON file and writes the totals as one JSON object.
//! The `translate` command prepares the ASCII grid from a GeoTIFF.

mod config;
mod output;
mod sources;
mod translate;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{JobConfig, KeySpec};
use sources::{GeoJsonFileSource, PolygonSource};
use translate::TranslateRequest;
use zonal_stats::{Aggregation, IoErrorPolicy};

#[derive(Parser, Debug)]
#[command(name = "aggregator")]
#[command(about = "Aggregate population rasters by administrative region")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sum raster pixels inside each polygon of a GeoJSON file
    Aggregate {
        /// Raster name (resolved as <raster-dir>/<name>.asc) or path
        #[arg(short, long)]
        file: Option<String>,

        /// GeoJSON file with the administrative polygons
        #[arg(short, long, env = "GEOJSON_PATH")]
        geojson: Option<PathBuf>,

        /// Directory holding rasters
        #[arg(long, env = "RASTER_DIR")]
        raster_dir: Option<PathBuf>,

        /// Directory for the totals file (default: raster directory)
        #[arg(long, env = "OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// YAML job file; flags override its values
        #[arg(long)]
        job: Option<PathBuf>,

        /// Key template such as "{WCOLGEN02_}-{NOMBRE_MPI}_{NOMBRE_CAB}"
        #[arg(long, conflicts_with = "gadm_iso")]
        key_template: Option<String>,

        /// Key GADM features as <iso>_<ID_0>_<ID_1>_<ID_2>
        #[arg(long)]
        gadm_iso: Option<String>,

        /// Window margin in pixels
        #[arg(long)]
        margin: Option<usize>,

        /// Row containment tasks in flight per polygon
        #[arg(long)]
        concurrency: Option<usize>,

        /// Skip polygons whose rows cannot be read instead of aborting
        #[arg(long)]
        skip_io_errors: bool,

        /// Also write <name>.summary.json next to the totals
        #[arg(long)]
        summary: bool,
    },

    /// Convert a GeoTIFF into an ASCII grid with gdal_translate
    Translate {
        /// Raster name (resolved as <raster-dir>/<name>.tif) or path
        #[arg(short, long)]
        file: String,

        /// Output size as a percentage of the input
        #[arg(short, long, default_value = "100")]
        reduce_to_percent: u32,

        /// Directory holding rasters
        #[arg(long, env = "RASTER_DIR")]
        raster_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if cli.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    match cli.command {
        Commands::Aggregate {
            file,
            geojson,
            raster_dir,
            output_dir,
            job,
            key_template,
            gadm_iso,
            margin,
            concurrency,
            skip_io_errors,
            summary,
        } => {
            let mut job = match job {
                Some(path) => JobConfig::from_yaml_file(&path)?,
                None => JobConfig::default(),
            };

            if file.is_some() {
                job.raster = file;
            }
            if geojson.is_some() {
                job.geojson = geojson;
            }
            if raster_dir.is_some() {
                job.raster_dir = raster_dir;
            }
            if output_dir.is_some() {
                job.output_dir = output_dir;
            }
            if let Some(template) = key_template {
                job.key = KeySpec::Template { template };
            }
            if let Some(iso) = gadm_iso {
                job.key = KeySpec::Gadm { iso };
            }

            let mut aggregation = job.aggregation_config();
            if let Some(margin) = margin {
                aggregation.window_margin = margin;
            }
            if let Some(concurrency) = concurrency {
                aggregation.containment_concurrency = concurrency;
            }
            if skip_io_errors {
                aggregation.io_error_policy = IoErrorPolicy::SkipPolygon;
            }
            job.aggregation = Some(aggregation);

            run_aggregate(&job, summary).await
        }
        Commands::Translate {
            file,
            reduce_to_percent,
            raster_dir,
        } => {
            let request = TranslateRequest::for_raster(raster_dir.as_deref(), &file, reduce_to_percent);
            let output = translate::translate(&request).await?;
            info!(output = %output.display(), "Translation completed");
            Ok(())
        }
    }
}

/// Aggregate one raster over the job's polygons and save the totals.
async fn run_aggregate(job: &JobConfig, write_summary: bool) -> Result<()> {
    let started = Instant::now();

    let raster = job.raster_path()?;
    let source = GeoJsonFileSource::new(job.geojson_path()?);
    let key = job.key.build()?;
    let config = job.aggregation_config();

    info!(
        raster = %raster.display(),
        source = %source.describe(),
        key = ?job.key,
        policy = %config.io_error_policy,
        "Starting aggregation"
    );

    let aggregation = Aggregation::open(&raster, config)
        .await
        .with_context(|| format!("Failed to open raster: {}", raster.display()))?;
    let features = source.load_features().await?;

    let outcome = aggregation.run_features(&features, &*key).await?;

    let output_dir = job
        .output_dir
        .clone()
        .or_else(|| raster.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    output::write_totals(&output::totals_path(&output_dir, &raster), &outcome.totals).await?;
    if write_summary {
        output::write_summary(&output::summary_path(&output_dir, &raster), &outcome.summary)
            .await?;
    }

    info!(
        keys = outcome.totals.len(),
        total = outcome.totals.grand_total(),
        skipped = outcome.summary.skipped.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "All done"
    );

    Ok(())
}
