//! End-to-end aggregation tests against small rasters on disk.

use geo::MultiPolygon;
use test_utils::fixtures::{bbox, FOUR_BY_FOUR_ASC, MUNICIPALITIES_GEOJSON};
use test_utils::{
    assert_approx_eq, create_constant_rows, create_sequential_rows, feature_collection, rectangle,
    rectangle_feature, rectangle_multi, render_ascii_grid, require_test_file, write_temp_raster,
    GridHeader,
};
use zonal_stats::{
    parse_features, AdminPolygon, Aggregation, AggregationConfig, AggregationError, FeatureResult,
    FieldsKey, IoErrorPolicy, SkipReason, TemplateKey,
};

fn block(key: &str, bounds: (f64, f64, f64, f64)) -> AdminPolygon {
    let (min_x, min_y, max_x, max_y) = bounds;
    AdminPolygon::new(key, rectangle_multi(min_x, min_y, max_x, max_y))
}

async fn four_by_four() -> (tempfile::NamedTempFile, Aggregation) {
    let file = write_temp_raster(FOUR_BY_FOUR_ASC);
    let aggregation = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();
    (file, aggregation)
}

// ============================================================================
// Core scenario
// ============================================================================

#[tokio::test]
async fn test_lower_left_block_total() {
    let (_file, aggregation) = four_by_four().await;

    let outcome = aggregation
        .run(vec![block("A", bbox::LOWER_LEFT_BLOCK)])
        .await
        .unwrap();

    // 9 + 13 + 14; the -9999 pixel is excluded.
    assert_eq!(outcome.totals.get("A"), Some(36.0));
    assert_eq!(outcome.totals.len(), 1);
    assert_eq!(outcome.summary.pixels.nodata, 1);
    assert_eq!(outcome.summary.polygons_contributing, 1);
}

#[tokio::test]
async fn test_full_extent_total() {
    let (_file, aggregation) = four_by_four().await;

    let outcome = aggregation
        .run(vec![block("all", bbox::FULL_EXTENT)])
        .await
        .unwrap();

    // 1..=16 minus the missing 10.
    assert_eq!(outcome.totals.get("all"), Some(126.0));
}

#[tokio::test]
async fn test_boundary_pixels_included() {
    let (_file, aggregation) = four_by_four().await;

    // Square from (0,0) to (2,2): pixel coordinates on x = 2 and y = 2 lie
    // on its edge and still count. Rows 2 and 3, columns 0..=2.
    let outcome = aggregation
        .run(vec![block("edge", (0.0, 0.0, 2.0, 2.0))])
        .await
        .unwrap();

    assert_eq!(outcome.totals.get("edge"), Some(9.0 + 11.0 + 13.0 + 14.0 + 15.0));
}

#[tokio::test]
async fn test_outside_polygon_has_no_key() {
    let (_file, aggregation) = four_by_four().await;

    let outcome = aggregation
        .run(vec![block("A", bbox::LOWER_LEFT_BLOCK), block("far", bbox::OUTSIDE)])
        .await
        .unwrap();

    assert!(outcome.totals.contains_key("A"));
    assert!(!outcome.totals.contains_key("far"));
    assert_eq!(
        outcome
            .summary
            .skipped_where(|r| *r == SkipReason::EmptyWindow),
        1
    );
}

#[tokio::test]
async fn test_polygon_between_pixels_has_no_key() {
    let (_file, aggregation) = four_by_four().await;

    // Inside the raster extent but containing no pixel coordinate.
    let outcome = aggregation
        .run(vec![block("gap", (0.2, 1.2, 0.8, 1.8))])
        .await
        .unwrap();

    assert!(outcome.totals.is_empty());
    assert_eq!(outcome.summary.polygons_processed, 1);
    assert!(outcome.summary.skipped.is_empty());
}

// ============================================================================
// Value filtering
// ============================================================================

#[tokio::test]
async fn test_all_zero_polygon_has_no_key() {
    let header = GridHeader::unit(5, 5);
    let file = write_temp_raster(&render_ascii_grid(&header, &create_constant_rows(5, 5, 0.0)));
    let aggregation = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();

    let outcome = aggregation
        .run(vec![block("zero", (0.0, 0.0, 5.0, 5.0))])
        .await
        .unwrap();

    assert!(!outcome.totals.contains_key("zero"));
    assert_eq!(outcome.summary.pixels.contained, 25);
    assert_eq!(outcome.summary.polygons_contributing, 0);
}

#[tokio::test]
async fn test_all_nodata_polygon_has_no_key() {
    let header = GridHeader::unit(3, 3);
    let file = write_temp_raster(&render_ascii_grid(
        &header,
        &create_constant_rows(3, 3, -9999.0),
    ));
    let aggregation = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();

    let outcome = aggregation
        .run(vec![block("empty", (0.0, 0.0, 3.0, 3.0))])
        .await
        .unwrap();

    assert!(outcome.totals.is_empty());
    assert_eq!(outcome.summary.pixels.nodata, 9);
}

// ============================================================================
// Algebraic properties
// ============================================================================

#[tokio::test]
async fn test_runs_are_idempotent() {
    let (_file, aggregation) = four_by_four().await;
    let polygons = vec![
        block("A", bbox::LOWER_LEFT_BLOCK),
        block("B", (1.0, 3.0, 3.0, 4.0)),
    ];

    let first = aggregation.run(polygons.clone()).await.unwrap();
    let second = aggregation.run(polygons).await.unwrap();
    assert_eq!(first.totals, second.totals);
}

#[tokio::test]
async fn test_polygon_order_does_not_matter() {
    let header = GridHeader::unit(20, 20);
    let file = write_temp_raster(&render_ascii_grid(&header, &create_sequential_rows(20, 20)));
    let aggregation = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();

    let polygons = vec![
        block("west", (0.0, 0.0, 9.0, 20.0)),
        block("east", (10.0, 0.0, 19.0, 20.0)),
        block("middle", (5.5, 5.5, 14.5, 14.5)),
    ];
    let mut reversed = polygons.clone();
    reversed.reverse();

    let forward = aggregation.run(polygons).await.unwrap();
    let backward = aggregation.run(reversed).await.unwrap();
    assert_eq!(forward.totals.len(), 3);
    assert_eq!(backward.totals.len(), 3);
    for (key, total) in &forward.totals {
        let other = backward.totals.get(key).unwrap();
        assert_approx_eq!(*total, other, 1e-9 * total.abs().max(1.0));
    }
}

#[tokio::test]
async fn test_shared_key_accumulates() {
    let (_file, aggregation) = four_by_four().await;

    let outcome = aggregation
        .run(vec![
            block("dept", (-0.5, 3.5, 0.5, 4.5)),
            block("dept", (2.5, 0.5, 3.5, 1.5)),
        ])
        .await
        .unwrap();

    // One pixel each: (0,4) -> 1 and (3,1) -> 16.
    assert_eq!(outcome.totals.get("dept"), Some(17.0));
}

#[tokio::test]
async fn test_low_concurrency_matches_default() {
    let header = GridHeader::unit(30, 30);
    let text = render_ascii_grid(&header, &create_sequential_rows(30, 30));
    let file = write_temp_raster(&text);

    let narrow = Aggregation::open(
        file.path(),
        AggregationConfig {
            containment_concurrency: 1,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let wide = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();

    let polygons = vec![block("p", (2.5, 3.5, 21.5, 17.5))];
    let a = narrow.run(polygons.clone()).await.unwrap();
    let b = wide.run(polygons).await.unwrap();
    assert_eq!(a.totals, b.totals);
}

// ============================================================================
// Polygons with holes and multiple parts
// ============================================================================

#[tokio::test]
async fn test_hole_excludes_interior_pixels() {
    let header = GridHeader::unit(5, 5);
    let file = write_temp_raster(&render_ascii_grid(&header, &create_constant_rows(5, 5, 1.0)));
    let aggregation = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();

    let outer = rectangle(0.0, 1.0, 4.0, 5.0);
    let hole = rectangle(1.5, 2.5, 2.5, 3.5);
    let donut = geo::Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);

    let outcome = aggregation
        .run(vec![AdminPolygon::new("donut", donut)])
        .await
        .unwrap();

    // 5x5 pixel coordinates in the outer square, minus (2,3) in the hole.
    assert_eq!(outcome.totals.get("donut"), Some(24.0));
}

#[tokio::test]
async fn test_multipolygon_parts_sum() {
    let (_file, aggregation) = four_by_four().await;

    let parts = MultiPolygon::new(vec![
        rectangle(-0.5, 3.5, 0.5, 4.5),
        rectangle(2.5, 0.5, 3.5, 1.5),
    ]);
    let outcome = aggregation
        .run(vec![AdminPolygon::new("islands", parts)])
        .await
        .unwrap();

    assert_eq!(outcome.totals.get("islands"), Some(17.0));
}

// ============================================================================
// GeoJSON features
// ============================================================================

#[tokio::test]
async fn test_municipality_features() {
    let (_file, aggregation) = four_by_four().await;
    let features = parse_features(MUNICIPALITIES_GEOJSON).unwrap();

    let outcome = aggregation
        .run_features(&features, &TemplateKey::colombia_municipalities())
        .await
        .unwrap();

    // Rows at latitude 3 and 4, then rows at latitude 1 and 2.
    assert_eq!(outcome.totals.get("101-NORTE_ALTA"), Some(36.0));
    assert_eq!(outcome.totals.get("102-SUR_BAJA"), Some(90.0));
}

#[tokio::test]
async fn test_unkeyable_feature_skipped() {
    let (_file, aggregation) = four_by_four().await;
    let features: Vec<FeatureResult> = vec![
        Ok(rectangle_feature(bbox::LOWER_LEFT_BLOCK, &[("ID_0", "53")])),
        Ok(rectangle_feature(bbox::FULL_EXTENT, &[("NAME", "nowhere")])),
    ];

    let outcome = aggregation
        .run_features(&features, &FieldsKey::gadm("COL"))
        .await
        .unwrap();

    assert_eq!(outcome.totals.get("col_53"), Some(36.0));
    assert_eq!(outcome.summary.skipped.len(), 1);
    assert_eq!(outcome.summary.skipped[0].index, 1);
    assert!(matches!(
        outcome.summary.skipped[0].reason,
        SkipReason::InvalidFeature(_)
    ));
}

#[tokio::test]
async fn test_malformed_geometry_skips_only_that_feature() {
    let (_file, aggregation) = four_by_four().await;

    let good = rectangle_feature(bbox::LOWER_LEFT_BLOCK, &[("ID", "good")]);
    let mut document = serde_json::to_value(feature_collection(vec![good])).unwrap();
    document["features"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({
            "type": "Feature",
            "properties": {"ID": "broken"},
            "geometry": {"type": "Polygon", "coordinates": [[1, 2]]}
        }));

    let features = parse_features(&document.to_string()).unwrap();
    let outcome = aggregation
        .run_features(&features, &FieldsKey::new(["ID"], "_"))
        .await
        .unwrap();

    assert_eq!(outcome.totals.get("good"), Some(36.0));
    assert_eq!(outcome.totals.len(), 1);
    assert_eq!(outcome.summary.skipped.len(), 1);
    assert_eq!(outcome.summary.skipped[0].index, 1);
    assert!(matches!(
        outcome.summary.skipped[0].reason,
        SkipReason::InvalidFeature(_)
    ));
}

// ============================================================================
// I/O failures
// ============================================================================

#[tokio::test]
async fn test_missing_raster_aborts_by_default() {
    let file = write_temp_raster(FOUR_BY_FOUR_ASC);
    let aggregation = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();
    drop(file);

    let result = aggregation
        .run(vec![block("A", bbox::LOWER_LEFT_BLOCK)])
        .await;
    assert!(matches!(result, Err(AggregationError::Raster(_))));
}

#[tokio::test]
async fn test_missing_raster_skipped_when_configured() {
    let file = write_temp_raster(FOUR_BY_FOUR_ASC);
    let config = AggregationConfig {
        io_error_policy: IoErrorPolicy::SkipPolygon,
        ..Default::default()
    };
    let aggregation = Aggregation::open(file.path(), config).await.unwrap();
    drop(file);

    let outcome = aggregation
        .run(vec![block("A", bbox::LOWER_LEFT_BLOCK)])
        .await
        .unwrap();
    assert!(outcome.totals.is_empty());
    assert!(matches!(outcome.summary.skipped[0].reason, SkipReason::Io(_)));
}

#[tokio::test]
async fn test_truncated_raster_is_io_failure() {
    let text: String = FOUR_BY_FOUR_ASC.lines().take(8).map(|l| format!("{}\n", l)).collect();
    let file = write_temp_raster(&text);
    let aggregation = Aggregation::open(file.path(), AggregationConfig::default())
        .await
        .unwrap();

    let result = aggregation
        .run(vec![block("A", bbox::LOWER_LEFT_BLOCK)])
        .await;
    match result {
        Err(e) => assert!(e.is_io(), "expected I/O failure, got {e}"),
        Ok(outcome) => panic!("expected failure, got {:?}", outcome.totals),
    }
}

// ============================================================================
// Real rasters (skipped unless present in TEST_DATA_DIR or testdata/)
// ============================================================================

#[tokio::test]
async fn test_worldpop_colombia_bogota() {
    let path = require_test_file!("COL_ppp_v2b_2015_UNadj.asc");
    let aggregation = Aggregation::open(&path, AggregationConfig::default())
        .await
        .unwrap();

    let extent = aggregation.metadata().coordinate_extent();
    assert!(extent.contains_point(-74.08, 4.6));

    let outcome = aggregation
        .run(vec![block("bogota", (-74.2, 4.5, -74.0, 4.8))])
        .await
        .unwrap();

    let total = outcome.totals.get("bogota").unwrap();
    assert!(total > 1_000_000.0, "unexpected Bogota population {total}");
    assert!(outcome.summary.skipped.is_empty());
}
