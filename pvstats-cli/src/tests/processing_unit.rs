//! Configuration and execution of the processing commands.

use super::helpers::{Workspace, geo_table, square, text, workspace, write_utf8};
use super::*;
use crate::processing::{
    ARG_CITIES, ARG_DIVISIONS, ARG_LAND_USE, ENV_LAND_USE, LandUseConfig, ProcessDivisionsConfig,
    RemapCategoriesConfig, execute_land_use, execute_remap_categories,
    land_use_config_from_layers_for_test,
};
use pvstats_core::{GeoTable, Value};
use pvstats_data::io::{
    GeoFormat, ReadOptions, TableFormat, read_geo_table, read_table, write_geo_table,
};
use pvstats_data::processing::{LandUseIds, OutputSettings, ProcessingError};
use rstest::{fixture, rstest};
use serde_json::json;

fn csv_settings(workspace: &Workspace) -> OutputSettings {
    OutputSettings {
        table_format: TableFormat::Csv,
        geo_format: GeoFormat::GeoJson,
        ..OutputSettings::rooted_at(&workspace.root)
    }
}

fn ids() -> LandUseIds {
    LandUseIds {
        urbanized: vec![111, 121, 131],
        industrial: vec![121],
        urban: vec![111],
        service: vec![131],
    }
}

#[fixture]
fn land_use() -> GeoTable {
    geo_table(
        vec![
            ("MUNICIPIO", vec![Value::Int(65), Value::Int(65), Value::Int(18)]),
            (
                "MUNICIPIO_NOMBRE",
                vec![text("Getafe"), text("Getafe"), text("El Boalo")],
            ),
            ("ID_USO_MAX", vec![Value::Int(111), Value::Int(121), Value::Int(131)]),
            (
                "SUPERF_M2",
                vec![Value::Float(1.5e6), Value::Float(2.0e6), Value::Float(5.0e5)],
            ),
        ],
        vec![
            square(0.0, 0.0, 1.0),
            square(2.0, 0.0, 1.0),
            square(4.0, 0.0, 1.0),
        ],
    )
}

#[rstest]
fn land_use_requires_an_input() {
    match LandUseConfig::try_from(LandUseArgs::default()).expect_err("missing input") {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_LAND_USE);
            assert_eq!(env, ENV_LAND_USE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn land_use_ids_come_from_configuration_layers() {
    use ortho_config::MergeComposer;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "land_use": "data/raw/usos.gpkg",
            "urbanized_ids": [111, 121, 131],
            "industrial_ids": [121],
            "urban_ids": [111],
            "service_ids": [131],
            "table_format": "csv",
        }),
        None,
    );
    composer.push_cli(json!({ "layer": "USOS", "service_ids": [131, 132] }));

    let config = land_use_config_from_layers_for_test(composer.layers()).expect("config");
    assert_eq!(config.land_use, Utf8PathBuf::from("data/raw/usos.gpkg"));
    assert_eq!(config.layer.as_deref(), Some("USOS"));
    assert_eq!(config.ids.urbanized, vec![111, 121, 131]);
    assert_eq!(config.ids.service, vec![131, 132]);
    assert_eq!(config.settings.table_format, TableFormat::Csv);
}

#[rstest]
fn land_use_writes_polygons_and_surfaces(workspace: Workspace, land_use: GeoTable) {
    let raw = workspace.root.join("usos.geojson");
    write_geo_table(&raw, &land_use).expect("raw input");
    let config = LandUseConfig {
        land_use: raw,
        layer: None,
        ids: ids(),
        settings: csv_settings(&workspace),
    };

    execute_land_use(&config).expect("land use");

    let polygons = read_geo_table(
        &config.settings.processed_folder.join("land_use.geojson"),
        None,
    )
    .expect("processed polygons");
    assert_eq!(polygons.height(), 1);
    let surfaces = read_table(
        &config.settings.results_folder.join("superficie_por_municipio.csv"),
        &ReadOptions::default(),
    )
    .expect("surfaces");
    assert_eq!(surfaces.height(), 2);
    assert_eq!(surfaces.get(0, "superficie_km2_urbanized"), Some(&Value::Float(3.5)));
}

#[rstest]
fn land_use_rejects_empty_groupings(workspace: Workspace, land_use: GeoTable) {
    let raw = workspace.root.join("usos.geojson");
    write_geo_table(&raw, &land_use).expect("raw input");
    let config = LandUseConfig {
        land_use: raw,
        layer: None,
        ids: LandUseIds {
            industrial: Vec::new(),
            ..ids()
        },
        settings: csv_settings(&workspace),
    };

    let err = execute_land_use(&config).expect_err("empty grouping");
    assert!(matches!(
        err,
        CliError::Processing(ProcessingError::EmptyLandUseIds { group: "industrial" })
    ));
}

#[rstest]
fn remap_defaults_to_the_category_column() {
    let args = RemapCategoriesArgs {
        input: Some(Utf8PathBuf::from("zonas.geojson")),
        mapping: Some(Utf8PathBuf::from("mapping.json")),
        ..RemapCategoriesArgs::default()
    };
    let config = RemapCategoriesConfig::try_from(args).expect("config");
    assert_eq!(config.column, "categoria");
    assert!(config.save_to.is_none());
}

#[rstest]
fn remap_rewrites_categories_from_a_json_mapping(workspace: Workspace) {
    let input = workspace.root.join("zonas.geojson");
    let zones = geo_table(
        vec![("categoria", vec![text("EXT"), text("IND"), text("???")])],
        vec![
            square(0.0, 0.0, 1.0),
            square(1.0, 0.0, 1.0),
            square(2.0, 0.0, 1.0),
        ],
    );
    write_geo_table(&input, &zones).expect("zones");
    let mapping = workspace.root.join("mapping.json");
    write_utf8(&mapping, br#"{"EXT": "Perimetro", "IND": "Industrial"}"#);
    let config = RemapCategoriesConfig {
        input,
        column: "categoria".to_owned(),
        mapping,
        save_to: Some(workspace.root.join("out/zonas.geojson")),
    };

    execute_remap_categories(&config).expect("remapped");

    let saved = read_geo_table(&workspace.root.join("out/zonas.geojson"), None).expect("saved");
    assert_eq!(
        saved.attributes().column("categoria").expect("categories"),
        [text("Perimetro"), text("Industrial"), Value::Null]
    );
}

fn divisions_config(workspace: &Workspace) -> ProcessDivisionsConfig {
    let args = ProcessDivisionsArgs {
        divisions: Some(workspace.root.join("raw/divisions.gpkg")),
        cities: Some(workspace.root.join("raw/cities.csv")),
        processed_folder: Some(workspace.root.join("processed")),
        ..ProcessDivisionsArgs::default()
    };
    ProcessDivisionsConfig::try_from(args).expect("config")
}

#[rstest]
fn processed_inputs_replace_missing_raw_files(workspace: Workspace) {
    let config = divisions_config(&workspace);
    assert_eq!(
        config.inputs.processed_divisions,
        workspace.root.join("processed/administrative_divisions.parquet")
    );
    write_utf8(&config.inputs.processed_divisions, b"");
    write_utf8(&config.inputs.processed_cities, b"");

    config.validate_sources().expect("processed inputs suffice");
}

#[rstest]
#[case::divisions(false, ARG_DIVISIONS)]
#[case::cities(true, ARG_CITIES)]
fn raw_inputs_are_required_without_processed_files(
    workspace: Workspace,
    #[case] divisions_processed: bool,
    #[case] expected: &str,
) {
    let config = divisions_config(&workspace);
    if divisions_processed {
        write_utf8(&config.inputs.processed_divisions, b"");
    }

    match config.validate_sources().expect_err("missing raw input") {
        CliError::MissingSourceFile { field, .. } => assert_eq!(field, expected),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}
