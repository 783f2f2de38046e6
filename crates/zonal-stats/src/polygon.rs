//! Administrative polygons and the keys that group their totals.

use std::sync::Arc;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, JsonObject, Value};
use serde_json::Value as JsonValue;

use crate::error::PolygonError;

/// One administrative region: a grouping key and its geometry.
///
/// The geometry sits behind an `Arc` so row tasks can share it.
#[derive(Debug, Clone)]
pub struct AdminPolygon {
    pub key: String,
    pub geometry: Arc<MultiPolygon<f64>>,
}

impl AdminPolygon {
    pub fn new(key: impl Into<String>, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self {
            key: key.into(),
            geometry: Arc::new(geometry.into()),
        }
    }

    /// Build from a GeoJSON feature, deriving the key from its properties.
    pub fn from_feature<K>(feature: &Feature, key: &K) -> Result<Self, PolygonError>
    where
        K: GroupingKey + ?Sized,
    {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or(PolygonError::MissingGeometry)?;
        let geometry = multipolygon_from_value(&geometry.value)?;

        let empty = JsonObject::new();
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        let key = key.derive(properties).ok_or(PolygonError::MissingKey)?;

        Ok(Self {
            key,
            geometry: Arc::new(geometry),
        })
    }
}

/// A feature as read from a GeoJSON document, or why it could not be read.
pub type FeatureResult = Result<Feature, PolygonError>;

/// Parse GeoJSON text into features.
///
/// Accepts a `FeatureCollection` or a single `Feature`. Each feature is
/// decoded on its own, so one malformed geometry leaves the rest usable.
/// Only a document that is not GeoJSON at all is an error.
pub fn parse_features(text: &str) -> Result<Vec<FeatureResult>, PolygonError> {
    let document: JsonValue =
        serde_json::from_str(text).map_err(|e| PolygonError::Parse(e.to_string()))?;

    let kind = document
        .get("type")
        .and_then(JsonValue::as_str)
        .map(str::to_owned);

    match kind.as_deref() {
        Some("FeatureCollection") => {
            let features = match document {
                JsonValue::Object(mut object) => object.remove("features"),
                _ => None,
            };
            match features {
                Some(JsonValue::Array(features)) => {
                    Ok(features.into_iter().map(feature_from_value).collect())
                }
                _ => Err(PolygonError::Parse(
                    "FeatureCollection has no 'features' array".to_string(),
                )),
            }
        }
        Some("Feature") => Ok(vec![feature_from_value(document)]),
        Some(other) => Err(PolygonError::Parse(format!(
            "expected a Feature or FeatureCollection, found {}",
            other
        ))),
        None => Err(PolygonError::Parse("missing 'type' member".to_string())),
    }
}

fn feature_from_value(value: JsonValue) -> FeatureResult {
    Feature::from_json_value(value).map_err(|e| PolygonError::Parse(e.to_string()))
}

fn multipolygon_from_value(value: &Value) -> Result<MultiPolygon<f64>, PolygonError> {
    match value {
        Value::Polygon(rings) => Ok(MultiPolygon::new(vec![polygon_from_rings(rings)?])),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| polygon_from_rings(rings))
            .collect::<Result<Vec<_>, _>>()
            .map(MultiPolygon::new),
        Value::Point(_) => Err(PolygonError::UnsupportedGeometry("Point".to_string())),
        Value::MultiPoint(_) => Err(PolygonError::UnsupportedGeometry("MultiPoint".to_string())),
        Value::LineString(_) => Err(PolygonError::UnsupportedGeometry("LineString".to_string())),
        Value::MultiLineString(_) => Err(PolygonError::UnsupportedGeometry(
            "MultiLineString".to_string(),
        )),
        Value::GeometryCollection(_) => Err(PolygonError::UnsupportedGeometry(
            "GeometryCollection".to_string(),
        )),
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>, PolygonError> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| PolygonError::InvalidGeometry("polygon has no exterior ring".to_string()))?;

    let exterior = ring_from_positions(exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>, PolygonError> {
    if positions.len() < 3 {
        return Err(PolygonError::InvalidGeometry(format!(
            "ring has {} positions, need at least 3",
            positions.len()
        )));
    }

    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(PolygonError::InvalidGeometry(format!(
                "invalid position {:?}",
                position
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

/// Derives the accumulator key of a feature from its properties.
///
/// Returning `None` means the feature cannot be keyed and is skipped.
pub trait GroupingKey {
    fn derive(&self, properties: &JsonObject) -> Option<String>;
}

impl<F> GroupingKey for F
where
    F: Fn(&JsonObject) -> Option<String>,
{
    fn derive(&self, properties: &JsonObject) -> Option<String> {
        self(properties)
    }
}

/// Text form of a scalar property. Null, arrays and objects have none.
fn property_text(properties: &JsonObject, field: &str) -> Option<String> {
    match properties.get(field)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Joins property values with a separator, with an optional prefix.
///
/// With `skip_missing` absent fields are left out of the key; otherwise any
/// absent field makes the feature unkeyable.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldsKey {
    prefix: Option<String>,
    fields: Vec<String>,
    separator: String,
    skip_missing: bool,
}

impl FieldsKey {
    pub fn new<I, S>(fields: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            fields: fields.into_iter().map(Into::into).collect(),
            separator: separator.into(),
            skip_missing: false,
        }
    }

    /// Key starts with `prefix`, followed by the separator and the fields.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn skip_missing(mut self, skip: bool) -> Self {
        self.skip_missing = skip;
        self
    }

    /// `<iso>_<ID_0>_<ID_1>_<ID_2>` keys used for GADM boundaries.
    pub fn gadm(iso: &str) -> Self {
        Self::new(["ID_0", "ID_1", "ID_2"], "_")
            .with_prefix(iso.to_lowercase())
            .skip_missing(true)
    }
}

impl GroupingKey for FieldsKey {
    fn derive(&self, properties: &JsonObject) -> Option<String> {
        let mut parts: Vec<String> = Vec::with_capacity(self.fields.len() + 1);
        if let Some(prefix) = &self.prefix {
            parts.push(prefix.clone());
        }

        let mut found = 0;
        for field in &self.fields {
            match property_text(properties, field) {
                Some(value) => {
                    parts.push(value);
                    found += 1;
                }
                None if self.skip_missing => {}
                None => return None,
            }
        }

        if found == 0 {
            return None;
        }
        Some(parts.join(&self.separator))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// Key built from a template such as `{WCOLGEN02_}-{NOMBRE_MPI}_{NOMBRE_CAB}`.
///
/// Every referenced field must be present. `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateKey {
    segments: Vec<Segment>,
}

impl TemplateKey {
    pub fn parse(template: &str) -> Result<Self, PolygonError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => field.push(ch),
                            None => {
                                return Err(PolygonError::InvalidTemplate(format!(
                                    "unclosed '{{' in '{}'",
                                    template
                                )))
                            }
                        }
                    }
                    if field.is_empty() {
                        return Err(PolygonError::InvalidTemplate(format!(
                            "empty field in '{}'",
                            template
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(PolygonError::InvalidTemplate(format!(
                        "unmatched '}}' in '{}'",
                        template
                    )))
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.iter().any(|s| matches!(s, Segment::Field(_))) {
            return Err(PolygonError::InvalidTemplate(format!(
                "'{}' references no fields",
                template
            )));
        }

        Ok(Self { segments })
    }

    /// Template for the Colombian municipality boundaries.
    pub fn colombia_municipalities() -> Self {
        Self {
            segments: vec![
                Segment::Field("WCOLGEN02_".to_string()),
                Segment::Literal("-".to_string()),
                Segment::Field("NOMBRE_MPI".to_string()),
                Segment::Literal("_".to_string()),
                Segment::Field("NOMBRE_CAB".to_string()),
            ],
        }
    }

    /// Field names referenced by the template, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl GroupingKey for TemplateKey {
    fn derive(&self, properties: &JsonObject) -> Option<String> {
        let mut key = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Field(name) => key.push_str(&property_text(properties, name)?),
            }
        }
        Some(key)
    }
}
