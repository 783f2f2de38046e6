//! Common test fixtures for aggregation tests.

/// The 4x4 raster used by the end-to-end scenario.
///
/// Row latitudes are 4, 3, 2, 1 (north to south) and column longitudes are
/// 0, 1, 2, 3. The `-9999` pixel sits at row 2, column 1.
pub const FOUR_BY_FOUR_ASC: &str = "ncols 4
nrows 4
xllcorner 0
yllcorner 0
cellsize 1
NODATA_value -9999
1 2 3 4
5 6 7 8
9 -9999 11 12
13 14 15 16
";

/// Header of a raster using distinct `dx`/`dy` and a float no-data value,
/// the shape gdal_translate writes for WorldPop rasters.
pub const DX_DY_HEADER: &str = "ncols 3
nrows 2
xllcorner -81.739290337968
yllcorner -4.227887418487
dx 0.003333759262
dy 0.003333200000
NODATA_value -3.4028234663852885981e+38
";

/// Common bounding boxes as (min_x, min_y, max_x, max_y).
pub mod bbox {
    /// Lower-left 2x2 block of pixel coordinates in [`super::FOUR_BY_FOUR_ASC`]
    pub const LOWER_LEFT_BLOCK: (f64, f64, f64, f64) = (0.0, 1.0, 1.0, 2.0);

    /// Whole coordinate extent of [`super::FOUR_BY_FOUR_ASC`]
    pub const FULL_EXTENT: (f64, f64, f64, f64) = (0.0, 1.0, 3.0, 4.0);

    /// Far away from any test raster
    pub const OUTSIDE: (f64, f64, f64, f64) = (100.0, 50.0, 101.0, 51.0);
}

/// Feature collection with two municipalities keyed the way the
/// Colombian boundary file is.
pub const MUNICIPALITIES_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "WCOLGEN02_": "101", "NOMBRE_MPI": "NORTE", "NOMBRE_CAB": "ALTA" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0, 3], [3, 3], [3, 4], [0, 4], [0, 3]]]
      }
    },
    {
      "type": "Feature",
      "properties": { "WCOLGEN02_": "102", "NOMBRE_MPI": "SUR", "NOMBRE_CAB": "BAJA" },
      "geometry": {
        "type": "MultiPolygon",
        "coordinates": [[[[0, 1], [3, 1], [3, 2], [0, 2], [0, 1]]]]
      }
    }
  ]
}"#;
