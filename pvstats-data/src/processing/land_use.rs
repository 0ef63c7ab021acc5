//! Land-use polygons filtered and aggregated per municipality.
//!
//! Categories are the SIOSE `ID_USO_MAX` codes. Each grouping (urbanized,
//! industrial, urban, service) is a list of codes taken from configuration.

use camino::Utf8Path;
use log::info;
use pvstats_core::{GeoTable, JoinKind, JoinSpec, Table, Value};
use serde::Deserialize;

use super::{OutputSettings, ProcessingError};
use crate::io::{read_geo_table, save_geo_table, save_table};

/// GeoPackage layer holding the land-use polygons.
pub const LAND_USE_LAYER: &str = "SAR_28_T_USOS";

const CATEGORY_COLUMN: &str = "ID_USO_MAX";
const SURFACE_COLUMN: &str = "SUPERF_M2";
const MUNICIPALITY_KEYS: [&str; 2] = ["MUNICIPIO", "MUNICIPIO_NOMBRE"];

/// `ID_USO_MAX` codes making up each land-use grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LandUseIds {
    /// Every built-up category.
    #[serde(default)]
    pub urbanized: Vec<i64>,
    /// Industrial categories.
    #[serde(default)]
    pub industrial: Vec<i64>,
    /// Residential categories.
    #[serde(default)]
    pub urban: Vec<i64>,
    /// Service and tertiary categories.
    #[serde(default)]
    pub service: Vec<i64>,
}

fn require_ids<'a>(ids: &'a [i64], group: &'static str) -> Result<&'a [i64], ProcessingError> {
    if ids.is_empty() {
        Err(ProcessingError::EmptyLandUseIds { group })
    } else {
        Ok(ids)
    }
}

fn category_values(ids: &[i64]) -> Vec<Value> {
    ids.iter().copied().map(Value::Int).collect()
}

/// Keep the land-use polygons of the urban categories and save them as
/// `land_use`.
///
/// # Errors
///
/// Fails when `urban_ids` is empty, the input cannot be read, or the output
/// cannot be written.
pub fn process_land_use(
    path: &Utf8Path,
    layer: Option<&str>,
    urban_ids: &[i64],
    settings: &OutputSettings,
) -> Result<GeoTable, ProcessingError> {
    let urban_ids = require_ids(urban_ids, "urban")?;
    let land_use = read_geo_table(path, Some(layer.unwrap_or(LAND_USE_LAYER)))?;
    let mask = land_use
        .attributes()
        .is_in(CATEGORY_COLUMN, &category_values(urban_ids))?;
    let filtered = land_use.filter(&mask)?;
    info!(
        "kept {} of {} land-use polygons",
        filtered.height(),
        land_use.height()
    );
    save_geo_table(
        "land_use",
        &filtered,
        &settings.processed_folder,
        settings.geo_format,
    )?;
    Ok(filtered)
}

/// Sum `SUPERF_M2` per municipality over the polygons whose category is in
/// `ids`.
///
/// The result holds `MUNICIPIO`, `MUNICIPIO_NOMBRE`, `superficie_km2` and
/// `superficie_m2`, one row per municipality in order of first appearance.
///
/// # Errors
///
/// Fails when `ids` is empty or a required column is missing.
pub fn filter_and_group_land_use(land_use: &Table, ids: &[i64]) -> Result<Table, ProcessingError> {
    if ids.is_empty() {
        return Err(ProcessingError::EmptyLandUseIds { group: "requested" });
    }
    let mask = land_use.is_in(CATEGORY_COLUMN, &category_values(ids))?;
    let mut grouped = land_use
        .filter(&mask)?
        .group_sum(&MUNICIPALITY_KEYS, SURFACE_COLUMN)?;
    let square_km = grouped.map_f64(SURFACE_COLUMN, |surface| surface / 1e6)?;
    grouped.push_column("superficie_km2", square_km)?;
    grouped.rename(
        &[(SURFACE_COLUMN.to_owned(), "superficie_m2".to_owned())]
            .into_iter()
            .collect(),
    )?;
    Ok(grouped.select(&[
        MUNICIPALITY_KEYS[0],
        MUNICIPALITY_KEYS[1],
        "superficie_km2",
        "superficie_m2",
    ])?)
}

/// Aggregate the land use per municipality for every grouping.
///
/// `layer` selects the GeoPackage layer as in [`process_land_use`].
/// Each grouping is saved to the results folder (`urbanized_zones`,
/// `industrial_zones`, `urban_zones`, `service_zones`) and the four are
/// outer-joined on the municipality into `superficie_por_municipio`.
/// Surface columns are suffixed `_urbanized`, `_industrial`, `_urban` and
/// `_service`.
///
/// # Errors
///
/// Fails when any grouping has no ids, the input cannot be read, or an
/// output cannot be written.
pub fn filter_land_use(
    path: &Utf8Path,
    layer: Option<&str>,
    ids: &LandUseIds,
    settings: &OutputSettings,
) -> Result<Table, ProcessingError> {
    let urbanized_ids = require_ids(&ids.urbanized, "urbanized")?;
    let industrial_ids = require_ids(&ids.industrial, "industrial")?;
    let urban_ids = require_ids(&ids.urban, "urban")?;
    let service_ids = require_ids(&ids.service, "service")?;
    let land_use = read_geo_table(path, Some(layer.unwrap_or(LAND_USE_LAYER)))?;

    let group = |name: &str, group_ids: &[i64]| -> Result<Table, ProcessingError> {
        let table = filter_and_group_land_use(land_use.attributes(), group_ids)?;
        save_table(
            &format!("{name}_zones"),
            &table,
            &settings.results_folder,
            settings.table_format,
        )?;
        Ok(table)
    };
    let urbanized = group("urbanized", urbanized_ids)?;
    let industrial = group("industrial", industrial_ids)?;
    let urban = group("urban", urban_ids)?;
    let service = group("service", service_ids)?;

    let merged = urbanized
        .merge(
            &industrial,
            &JoinSpec::on(&MUNICIPALITY_KEYS, JoinKind::Outer).with_suffixes("_urbanized", "_industrial"),
        )?
        .merge(&urban, &JoinSpec::on(&MUNICIPALITY_KEYS, JoinKind::Outer))?
        .merge(
            &service,
            &JoinSpec::on(&MUNICIPALITY_KEYS, JoinKind::Outer).with_suffixes("_urban", "_service"),
        )?;

    save_table(
        "superficie_por_municipio",
        &merged,
        &settings.results_folder,
        settings.table_format,
    )?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::write_geo_table;
    use crate::processing::fixtures::{Workspace, geo_table, square, table, text, workspace};
    use rstest::{fixture, rstest};

    #[fixture]
    fn land_use() -> GeoTable {
        geo_table(
            vec![
                ("MUNICIPIO", vec![Value::Int(65), Value::Int(65), Value::Int(18), Value::Int(65)]),
                (
                    "MUNICIPIO_NOMBRE",
                    vec![text("Getafe"), text("Getafe"), text("El Boalo"), text("Getafe")],
                ),
                ("ID_USO_MAX", vec![Value::Int(111), Value::Int(121), Value::Int(111), Value::Int(131)]),
                (
                    "SUPERF_M2",
                    vec![Value::Float(1.5e6), Value::Float(2.0e6), Value::Float(5.0e5), Value::Float(1.0e6)],
                ),
            ],
            vec![
                square(0.0, 0.0, 1.0),
                square(2.0, 0.0, 1.0),
                square(4.0, 0.0, 1.0),
                square(6.0, 0.0, 1.0),
            ],
        )
    }

    fn ids() -> LandUseIds {
        LandUseIds {
            urbanized: vec![111, 121, 131],
            industrial: vec![121],
            urban: vec![111],
            service: vec![131],
        }
    }

    #[rstest]
    fn groups_sum_per_municipality(land_use: GeoTable) {
        let grouped = filter_and_group_land_use(land_use.attributes(), &[111, 131]).expect("grouped");
        let expected = table(vec![
            ("MUNICIPIO", vec![Value::Int(65), Value::Int(18)]),
            ("MUNICIPIO_NOMBRE", vec![text("Getafe"), text("El Boalo")]),
            ("superficie_km2", vec![Value::Float(2.5), Value::Float(0.5)]),
            ("superficie_m2", vec![Value::Float(2.5e6), Value::Float(5.0e5)]),
        ]);
        assert_eq!(grouped, expected);
    }

    #[rstest]
    fn empty_id_lists_are_rejected(land_use: GeoTable) {
        assert!(matches!(
            filter_and_group_land_use(land_use.attributes(), &[]),
            Err(ProcessingError::EmptyLandUseIds { .. })
        ));
    }

    #[rstest]
    fn processing_keeps_urban_polygons(workspace: Workspace, land_use: GeoTable) {
        let raw = workspace.root.join("usos.geojson");
        write_geo_table(&raw, &land_use).expect("raw input");

        let filtered = process_land_use(&raw, None, &[111], &workspace.settings()).expect("filtered");

        assert_eq!(filtered.height(), 2);
        assert_eq!(
            filtered.attributes().column("MUNICIPIO").expect("codes"),
            [Value::Int(65), Value::Int(18)]
        );
    }

    #[rstest]
    fn groupings_are_joined_with_suffixes(workspace: Workspace, land_use: GeoTable) {
        let raw = workspace.root.join("usos.geojson");
        write_geo_table(&raw, &land_use).expect("raw input");
        let settings = workspace.settings();

        let merged = filter_land_use(&raw, None, &ids(), &settings).expect("merged");

        assert_eq!(
            merged.column_names(),
            vec![
                "MUNICIPIO",
                "MUNICIPIO_NOMBRE",
                "superficie_km2_urbanized",
                "superficie_m2_urbanized",
                "superficie_km2_industrial",
                "superficie_m2_industrial",
                "superficie_km2_urban",
                "superficie_m2_urban",
                "superficie_km2_service",
                "superficie_m2_service",
            ]
        );
        assert_eq!(merged.height(), 2);
        assert_eq!(merged.get(1, "superficie_km2_industrial"), Some(&Value::Null));
        assert_eq!(merged.get(0, "superficie_km2_urbanized"), Some(&Value::Float(4.5)));
        for name in ["urbanized", "industrial", "urban", "service"] {
            let saved = settings.results_folder.join(format!("{name}_zones.csv"));
            assert!(pvstats_fs::file_is_file(&saved).expect("inspect"), "{name} saved");
        }
    }

    #[rstest]
    fn missing_groupings_fail_before_reading(workspace: Workspace) {
        let ids = LandUseIds {
            service: Vec::new(),
            ..ids()
        };
        let result = filter_land_use(
            &workspace.root.join("missing.gpkg"),
            None,
            &ids,
            &workspace.settings(),
        );
        assert!(matches!(
            result,
            Err(ProcessingError::EmptyLandUseIds { group: "service" })
        ));
    }
}
