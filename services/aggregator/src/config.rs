//! Aggregator job configuration.
//!
//! A job can be described entirely on the command line, or in a YAML file
//! whose values may reference environment variables with `${VAR}` and
//! `${VAR:-default}`. Command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use zonal_stats::{AggregationConfig, FieldsKey, GroupingKey, TemplateKey};

/// Key template of the Colombian municipality boundaries.
pub const DEFAULT_KEY_TEMPLATE: &str = "{WCOLGEN02_}-{NOMBRE_MPI}_{NOMBRE_CAB}";

/// How features are turned into accumulator keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeySpec {
    /// `{FIELD}` placeholders between literal text
    Template { template: String },
    /// Property values joined by a separator
    Fields {
        fields: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        skip_missing: bool,
    },
    /// `<iso>_<ID_0>_<ID_1>_<ID_2>`
    Gadm { iso: String },
}

fn default_separator() -> String {
    "_".to_string()
}

impl Default for KeySpec {
    fn default() -> Self {
        Self::Template {
            template: DEFAULT_KEY_TEMPLATE.to_string(),
        }
    }
}

impl KeySpec {
    pub fn build(&self) -> Result<Box<dyn GroupingKey + Send + Sync>> {
        let key: Box<dyn GroupingKey + Send + Sync> = match self {
            Self::Template { template } => Box::new(
                TemplateKey::parse(template)
                    .with_context(|| format!("Invalid key template '{}'", template))?,
            ),
            Self::Fields {
                fields,
                separator,
                prefix,
                skip_missing,
            } => {
                anyhow::ensure!(!fields.is_empty(), "Key fields must not be empty");
                let mut key = FieldsKey::new(fields.iter().cloned(), separator.clone())
                    .skip_missing(*skip_missing);
                if let Some(prefix) = prefix {
                    key = key.with_prefix(prefix.clone());
                }
                Box::new(key)
            }
            Self::Gadm { iso } => Box::new(FieldsKey::gadm(iso)),
        };
        Ok(key)
    }
}

/// One aggregation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Directory holding rasters
    pub raster_dir: Option<PathBuf>,
    /// Raster name without extension, or a path to an `.asc` file
    pub raster: Option<String>,
    /// GeoJSON file with the administrative polygons
    pub geojson: Option<PathBuf>,
    /// Where the totals are written; defaults to the raster directory
    pub output_dir: Option<PathBuf>,
    pub key: KeySpec,
    /// Replaces the `AGGREGATE_*` environment settings when present
    pub aggregation: Option<AggregationConfig>,
}

impl JobConfig {
    /// Load a job from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse job file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Path of the raster to aggregate.
    ///
    /// A bare name resolves to `<raster_dir>/<name>.asc`; anything with an
    /// extension or a directory component is used as given.
    pub fn raster_path(&self) -> Result<PathBuf> {
        let raster = self
            .raster
            .as_deref()
            .context("No raster given (use --file or set `raster` in the job file)")?;
        Ok(resolve_raster(self.raster_dir.as_deref(), raster, "asc"))
    }

    pub fn geojson_path(&self) -> Result<&Path> {
        self.geojson
            .as_deref()
            .context("No GeoJSON file given (use --geojson, GEOJSON_PATH or the job file)")
    }

    /// Aggregation settings from the job file, else from the environment.
    pub fn aggregation_config(&self) -> AggregationConfig {
        self.aggregation
            .clone()
            .unwrap_or_else(AggregationConfig::from_env)
    }
}

/// Resolve a raster name against a directory and default extension.
pub fn resolve_raster(dir: Option<&Path>, name: &str, extension: &str) -> PathBuf {
    let candidate = Path::new(name);
    if candidate.extension().is_some() || candidate.components().count() > 1 {
        return candidate.to_path_buf();
    }

    let file = format!("{}.{}", name, extension);
    match dir {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` in job file content.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
