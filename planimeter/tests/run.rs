//! Tests de bout en bout sur des fichiers GeoJSON temporaires

use std::path::{Path, PathBuf};

use planimeter::{run, OutputTarget, RunOptions, RunStatus};
use planimetry::{GeometryKind, TransformPolicy};
use serde_json::Value;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("planimeter_it_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn options(input: &Path, output: &Path) -> RunOptions {
    RunOptions {
        input: input.to_path_buf(),
        output: OutputTarget::GeoJson(output.to_path_buf()),
        crs: None,
        kind: None,
        policy: TransformPolicy::Abort,
        batch_bytes: 256,
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Carrés de 1° le long de l'équateur, plus une feature sans géométrie
fn squares(n: usize) -> String {
    let mut features: Vec<String> = (0..n)
        .map(|i| {
            let x = i as f64;
            format!(
                r#"{{"type":"Feature","id":"sq{i}","properties":{{"rang":{i},"nom":"carré {i}"}},"geometry":{{"type":"Polygon","coordinates":[[[{x},0],[{x1},0],[{x1},1],[{x},1],[{x},0]]]}}}}"#,
                i = i,
                x = x,
                x1 = x + 1.0
            )
        })
        .collect();
    features.push(r#"{"type":"Feature","properties":{"rang":-1,"nom":"vide"},"geometry":null}"#.to_string());
    format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
}

#[tokio::test]
async fn test_compute_geographic_squares() {
    let dir = temp_dir("squares");
    let input = dir.join("squares.geojson");
    let output = dir.join("out.geojson");
    std::fs::write(&input, squares(10)).unwrap();

    let report = run(&options(&input, &output)).await.unwrap();

    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.features_read, 11);
    assert_eq!(report.features_written, 11);
    assert_eq!(report.features_without_geometry, 1);
    assert!(report.batches_committed > 1);
    assert_eq!(report.geometry_kind, "MULTIPOLYGON");
    assert_eq!(report.fields, ["rang", "nom", "length_m", "area_m2"]);

    let value = read_json(&output);
    let features = value["features"].as_array().unwrap();
    assert_eq!(features.len(), 11);

    // Ordre conservé, attributs intacts, champs dérivés ajoutés
    for (i, feature) in features.iter().take(10).enumerate() {
        assert_eq!(feature["id"], format!("sq{}", i));
        let props = &feature["properties"];
        assert_eq!(props["rang"], i as i64);
        let area = props["area_m2"].as_f64().unwrap();
        assert!((area - 1.2309e10).abs() / 1.2309e10 < 0.01, "area={}", area);
        let length = props["length_m"].as_f64().unwrap();
        assert!((length - 4.0 * 111_320.0).abs() / 445_280.0 < 0.01, "length={}", length);
    }
    assert_eq!(features[10]["properties"]["area_m2"], Value::Null);

    let extent = report.extent.unwrap();
    assert_eq!((extent.min_x, extent.max_x), (0.0, 10.0));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_compute_lambert93_with_sidecar_prj() {
    let dir = temp_dir("lambert");
    let input = dir.join("parcelles.geojson");
    let output = dir.join("parcelles_out.geojson");
    std::fs::write(
        &input,
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"section":"AB"},"geometry":{"type":"LineString","coordinates":[[652000,6862000],[652100,6862000]]}}
        ]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("parcelles.prj"),
        r#"PROJCS["RGF93_Lambert_93",GEOGCS["GCS_RGF_1993",DATUM["D_RGF_1993",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",700000.0],PARAMETER["False_Northing",6600000.0],PARAMETER["Central_Meridian",3.0],PARAMETER["Standard_Parallel_1",49.0],PARAMETER["Standard_Parallel_2",44.0],PARAMETER["Latitude_Of_Origin",46.5],UNIT["Meter",1.0]]"#,
    )
    .unwrap();

    let report = run(&options(&input, &output)).await.unwrap();
    assert_eq!(report.crs_origin, ".prj sidecar");
    assert_eq!(report.crs_category.as_deref(), Some("Projected"));
    assert!(report.transform.is_some());

    let value = read_json(&output);
    let props = &value["features"][0]["properties"];
    let length = props["length_m"].as_f64().unwrap();
    assert!((length - 100.0).abs() < 0.05, "length={}", length);
    assert!(props.get("area_m2").is_none());

    // Géométrie d'origine, en Lambert 93
    assert_eq!(value["features"][0]["geometry"]["coordinates"][0][0], 652000.0);

    // Sans code EPSG, le système de sortie est déclaré par un .prj
    assert!(value.get("crs").is_none());
    let declared = std::fs::read_to_string(dir.join("parcelles_out.prj")).unwrap();
    assert!(declared.starts_with("PROJCS[\"RGF93_Lambert_93\""));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_unsupported_crs_fails_before_output() {
    let dir = temp_dir("vertical");
    let input = dir.join("heights.geojson");
    let output = dir.join("heights_out.geojson");
    std::fs::write(&input, squares(1)).unwrap();

    let mut opts = options(&input, &output);
    opts.crs = Some("EPSG:5773".to_string());
    assert!(run(&opts).await.is_err());
    assert!(!output.exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_geometry_mismatch_aborts() {
    let dir = temp_dir("mismatch");
    let input = dir.join("mixed.geojson");
    let output = dir.join("mixed_out.geojson");
    std::fs::write(&input, squares(2)).unwrap();

    let mut opts = options(&input, &output);
    opts.kind = Some(GeometryKind::MultiLineString);
    let err = run(&opts).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Geometry mismatch"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_skip_policy_reports_skipped_features() {
    let dir = temp_dir("skip");
    let input = dir.join("utm.geojson");
    let output = dir.join("utm_out.geojson");
    // Abscisse démesurée: la série de Mercator transverse diverge
    std::fs::write(
        &input,
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":"ok","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1000,0],[1000,1000],[0,1000],[0,0]]]}},
            {"type":"Feature","id":"bad","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1e308,0],[1e308,10],[0,0]]]}}
        ]}"#,
    )
    .unwrap();

    let mut opts = options(&input, &output);
    opts.crs = Some("EPSG:32620".to_string());
    opts.policy = TransformPolicy::Skip;
    let report = run(&opts).await.unwrap();

    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(report.features_written, 1);
    assert_eq!(report.features_skipped, 1);
    assert_eq!(report.skipped[0].feature, "bad");

    let value = read_json(&output);
    assert_eq!(value["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::32620");
    assert_eq!(value["features"].as_array().unwrap().len(), 1);

    opts.policy = TransformPolicy::Abort;
    assert!(run(&opts).await.is_err());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_attributes_of_later_features_are_kept() {
    let dir = temp_dir("heterogeneous");
    let input = dir.join("routes.geojson");
    let output = dir.join("routes_out.geojson");
    std::fs::write(
        &input,
        r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"nom":"a"},"geometry":{"type":"LineString","coordinates":[[0,0],[1,0]]}},
            {"type":"Feature","properties":{"nom":"b","owner":"X","length_m":"legacy"},"geometry":{"type":"LineString","coordinates":[[0,0],[1,0]]}}
        ]}"#,
    )
    .unwrap();

    let report = run(&options(&input, &output)).await.unwrap();
    assert_eq!(report.fields, ["nom", "owner", "length_m", "length_m_1"]);

    let value = read_json(&output);
    let features = value["features"].as_array().unwrap();
    for feature in features {
        let length = feature["properties"]["length_m_1"].as_f64().unwrap();
        assert!((length - 111_319.49).abs() < 0.01, "length={}", length);
    }
    let second = &features[1]["properties"];
    assert_eq!(second["owner"], "X");
    assert_eq!(second["length_m"], "legacy");

    std::fs::remove_dir_all(&dir).ok();
}
