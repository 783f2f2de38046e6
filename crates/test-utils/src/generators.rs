//! Generators for synthetic rasters and administrative polygons.
//!
//! Values are predictable so totals can be checked by hand.

use geo::{polygon, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

/// Header of a synthetic ASCII grid.
#[derive(Debug, Clone, Copy)]
pub struct GridHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: f64,
}

impl GridHeader {
    /// Unit-cell grid anchored at the origin with `-9999` as no-data.
    pub fn unit(ncols: usize, nrows: usize) -> Self {
        Self {
            ncols,
            nrows,
            xllcorner: 0.0,
            yllcorner: 0.0,
            cellsize: 1.0,
            nodata: -9999.0,
        }
    }

    /// Render the six header lines.
    pub fn render(&self) -> String {
        format!(
            "ncols {}\nnrows {}\nxllcorner {}\nyllcorner {}\ncellsize {}\nNODATA_value {}\n",
            self.ncols, self.nrows, self.xllcorner, self.yllcorner, self.cellsize, self.nodata
        )
    }
}

/// Creates row values where each cell is `row * ncols + col + 1`.
///
/// ```
/// use test_utils::create_sequential_rows;
///
/// let rows = create_sequential_rows(4, 2);
/// assert_eq!(rows[0], vec![1.0, 2.0, 3.0, 4.0]);
/// assert_eq!(rows[1], vec![5.0, 6.0, 7.0, 8.0]);
/// ```
pub fn create_sequential_rows(ncols: usize, nrows: usize) -> Vec<Vec<f64>> {
    (0..nrows)
        .map(|row| (0..ncols).map(|col| (row * ncols + col + 1) as f64).collect())
        .collect()
}

/// Creates rows filled with a constant value.
pub fn create_constant_rows(ncols: usize, nrows: usize, value: f64) -> Vec<Vec<f64>> {
    vec![vec![value; ncols]; nrows]
}

/// Render a complete ASCII grid from a header and row values.
///
/// Values equal to `header.nodata` are written with the header's text so
/// they compare equal to the sentinel.
pub fn render_ascii_grid(header: &GridHeader, rows: &[Vec<f64>]) -> String {
    let mut text = header.render();
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    text
}

/// Axis-aligned square (or rectangle) polygon.
pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: max_x, y: min_y),
        (x: max_x, y: max_y),
        (x: min_x, y: max_y),
        (x: min_x, y: min_y),
    ]
}

/// Rectangle as a one-member multi-polygon.
pub fn rectangle_multi(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![rectangle(min_x, min_y, max_x, max_y)])
}

/// GeoJSON feature for a rectangle with string properties.
pub fn rectangle_feature(
    bounds: (f64, f64, f64, f64),
    properties: &[(&str, &str)],
) -> Feature {
    let (min_x, min_y, max_x, max_y) = bounds;
    let ring = vec![
        vec![min_x, min_y],
        vec![max_x, min_y],
        vec![max_x, max_y],
        vec![min_x, max_y],
        vec![min_x, min_y],
    ];

    let mut props = JsonObject::new();
    for (key, value) in properties {
        props.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Wrap features in a collection.
pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
