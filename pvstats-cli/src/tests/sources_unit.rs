//! Input validation and output settings shared by the commands.

use super::helpers::{Workspace, workspace, write_utf8};
use super::*;
use crate::sources::{OutputOverrides, load_json, processed_geo_path, require_existing};
use camino::Utf8Path;
use pvstats_data::io::{GeoFormat, TableFormat};
use rstest::rstest;
use std::collections::BTreeMap;

#[rstest]
fn require_existing_accepts_files(workspace: Workspace) {
    let path = workspace.root.join("cities.csv");
    write_utf8(&path, b"municipio_codigo\n1\n");
    require_existing(&path, "cities").expect("file exists");
}

#[rstest]
fn require_existing_reports_missing_files(workspace: Workspace) {
    let path = workspace.root.join("missing.csv");
    match require_existing(&path, "cities").expect_err("missing file") {
        CliError::MissingSourceFile { field, path: found } => {
            assert_eq!(field, "cities");
            assert_eq!(found, path);
        }
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

#[rstest]
fn require_existing_rejects_directories(workspace: Workspace) {
    match require_existing(&workspace.root, "cities").expect_err("directory") {
        CliError::SourcePathNotFile { field, .. } => assert_eq!(field, "cities"),
        other => panic!("expected SourcePathNotFile, found {other:?}"),
    }
}

#[rstest]
fn output_defaults_match_the_pipeline_defaults() {
    let settings = OutputOverrides::default().resolve().expect("defaults");
    assert_eq!(settings.processed_folder, Utf8PathBuf::from("data/processed"));
    assert_eq!(settings.results_folder, Utf8PathBuf::from("data/results"));
    assert_eq!(settings.table_format, TableFormat::Parquet);
    assert_eq!(settings.geo_format, GeoFormat::Parquet);
    assert_eq!(
        processed_geo_path(&settings, "land_use"),
        Utf8PathBuf::from("data/processed/land_use.parquet")
    );
}

#[rstest]
fn output_overrides_are_applied() {
    let settings = OutputOverrides {
        processed_folder: Some(Utf8Path::new("out/processed")),
        results_folder: None,
        table_format: Some("CSV"),
        geo_format: Some("geojson"),
    }
    .resolve()
    .expect("overrides");
    assert_eq!(settings.processed_folder, Utf8PathBuf::from("out/processed"));
    assert_eq!(settings.results_folder, Utf8PathBuf::from("data/results"));
    assert_eq!(settings.table_format, TableFormat::Csv);
    assert_eq!(settings.geo_format, GeoFormat::GeoJson);
}

#[rstest]
#[case(Some("xlsx"), None, "table-format")]
#[case(None, Some("shp"), "geo-format")]
fn unknown_formats_are_rejected(
    #[case] table_format: Option<&str>,
    #[case] geo_format: Option<&str>,
    #[case] expected: &str,
) {
    let overrides = OutputOverrides {
        table_format,
        geo_format,
        ..OutputOverrides::default()
    };
    match overrides.resolve().expect_err("unknown format") {
        CliError::InvalidFormat { field, .. } => assert_eq!(field, expected),
        other => panic!("expected InvalidFormat, found {other:?}"),
    }
}

#[rstest]
fn mappings_load_from_json(workspace: Workspace) {
    let path = workspace.root.join("mapping.json");
    write_utf8(&path, br#"{"URB1": "URB-SUR", "EXT": "EXT"}"#);
    let mapping: BTreeMap<String, String> = load_json(&path, "mapping").expect("mapping");
    assert_eq!(mapping.get("URB1").map(String::as_str), Some("URB-SUR"));
    assert_eq!(mapping.len(), 2);
}

#[rstest]
fn malformed_json_is_reported_with_its_path(workspace: Workspace) {
    let path = workspace.root.join("mapping.json");
    write_utf8(&path, b"[1, 2");
    let err = load_json::<BTreeMap<String, String>>(&path, "mapping").expect_err("malformed");
    match err {
        CliError::ParseSettingsFile { field, path: found, .. } => {
            assert_eq!(field, "mapping");
            assert_eq!(found, path);
        }
        other => panic!("expected ParseSettingsFile, found {other:?}"),
    }
}

#[rstest]
fn missing_json_files_fail_to_open(workspace: Workspace) {
    let err = load_json::<BTreeMap<String, String>>(&workspace.root.join("none.json"), "params")
        .expect_err("missing");
    assert!(matches!(err, CliError::OpenSettingsFile { field: "params", .. }));
}
