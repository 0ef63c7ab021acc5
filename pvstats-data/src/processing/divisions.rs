//! Municipal boundaries and their join with the municipal census.

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use pvstats_core::{GeoTable, JoinKind, JoinSpec, NumericKind, Table};

use super::{OutputSettings, ProcessingError, input_exists, process_cities_info};
use crate::io::{ReadOptions, read_geo_table, read_table, save_geo_table};

/// GeoPackage layer holding the administrative units.
pub const ADMINISTRATIVE_DIVISIONS_LAYER: &str = "IDEM_CM_UNID_ADMIN";

const INTEGER_COLUMNS: [&str; 5] = ["CD_NATCODE", "CDID", "CD_MUNICIPIO", "CD_INE", "CD_INE_1"];

/// Units recorded separately in the boundaries but belonging to another
/// municipality, as `(keep, remove)` pairs of `DS_NOMBRE`.
const MERGED_UNITS: [(&str, &str); 2] = [
    ("El Boalo", "El Redegüelo"),
    ("Navacerrada", "Los Baldios"),
];

/// Attribute columns of the joined divisions, in output order.
pub const DIVISION_COLUMNS: [&str; 13] = [
    "municipio_codigo",
    "municipio_nombre",
    "DS_NOMBRE",
    "DS_DESCRIPCION",
    "municipio_codigo_ine",
    "CD_INE",
    "nuts4_codigo",
    "nuts4_nombre",
    "CDID",
    "CD_NATCODE",
    "superficie_km2",
    "densidad_por_km2",
    "population",
];

/// Clean the administrative boundaries.
///
/// Reads `layer` (default [`ADMINISTRATIVE_DIVISIONS_LAYER`]), makes the code
/// columns integers, folds the units listed above into their municipality
/// and adds `superficie_km2`. Saved as `administrative_divisions`.
///
/// # Errors
///
/// Fails when the input cannot be read, a code is not an integer, one of
/// the merged units is missing, or the output cannot be written.
pub fn process_administrative_divisions(
    path: &Utf8Path,
    layer: Option<&str>,
    settings: &OutputSettings,
) -> Result<GeoTable, ProcessingError> {
    let layer = layer.unwrap_or(ADMINISTRATIVE_DIVISIONS_LAYER);
    let mut divisions = read_geo_table(path, Some(layer))?;
    for column in INTEGER_COLUMNS {
        divisions.update_attributes(|attributes| {
            attributes.coerce_numeric(column, NumericKind::Integer)
        })?;
    }
    for (keep, remove) in MERGED_UNITS {
        divisions.merge_geometries("DS_NOMBRE", keep, remove)?;
    }
    divisions.push_area_column("superficie_km2", 1e-6)?;

    save_geo_table(
        "administrative_divisions",
        &divisions,
        &settings.processed_folder,
        settings.geo_format,
    )?;
    Ok(divisions)
}

/// Attach the census data to the boundaries.
///
/// Inner join on `CD_MUNICIPIO == municipio_codigo`. The census surface
/// replaces the computed one and the attributes follow
/// [`DIVISION_COLUMNS`]. Saved as `administrative_divisions_with_info`.
///
/// # Errors
///
/// Fails when a required column is missing or the output cannot be written.
pub fn join_administrative_divisions(
    divisions: &GeoTable,
    cities: &Table,
    settings: &OutputSettings,
) -> Result<GeoTable, ProcessingError> {
    let joined = divisions.merge_table(
        cities,
        &JoinSpec::between(&["CD_MUNICIPIO"], &["municipio_codigo"], JoinKind::Inner),
    )?;
    let (mut attributes, geometries, crs) = joined.into_parts();
    attributes.drop_columns(&["CD_MUNICIPIO", "CD_INE_1", "superficie_km2_x"])?;
    attributes.rename(
        &[("superficie_km2_y".to_owned(), "superficie_km2".to_owned())]
            .into_iter()
            .collect(),
    )?;
    let attributes = attributes.select(&DIVISION_COLUMNS)?;
    let joined = GeoTable::new(attributes, geometries)?.with_crs(crs);
    info!(
        "matched {} of {} administrative divisions with census data",
        joined.height(),
        divisions.height()
    );

    save_geo_table(
        "administrative_divisions_with_info",
        &joined,
        &settings.processed_folder,
        settings.geo_format,
    )?;
    Ok(joined)
}

/// Inputs of [`administrative_divisions_with_info`]: a processed file is
/// used when it exists, the raw file is processed otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionInputs {
    /// Output of [`process_administrative_divisions`].
    pub processed_divisions: Utf8PathBuf,
    /// Raw administrative boundaries (GeoPackage).
    pub raw_divisions: Utf8PathBuf,
    /// Output of [`process_cities_info`].
    pub processed_cities: Utf8PathBuf,
    /// Raw municipal census (CSV).
    pub raw_cities: Utf8PathBuf,
}

/// Produce the joined divisions from whichever inputs are available.
///
/// # Errors
///
/// Fails when reading, processing or joining fails.
pub fn administrative_divisions_with_info(
    inputs: &DivisionInputs,
    settings: &OutputSettings,
) -> Result<GeoTable, ProcessingError> {
    let divisions = if input_exists(&inputs.processed_divisions)? {
        read_geo_table(&inputs.processed_divisions, None)?
    } else {
        info!(
            "{} not found, processing {}",
            inputs.processed_divisions, inputs.raw_divisions
        );
        process_administrative_divisions(&inputs.raw_divisions, None, settings)?
    };
    let cities = if input_exists(&inputs.processed_cities)? {
        read_table(&inputs.processed_cities, &ReadOptions::default())?
    } else {
        info!(
            "{} not found, processing {}",
            inputs.processed_cities, inputs.raw_cities
        );
        process_cities_info(&inputs.raw_cities, settings)?
    };
    join_administrative_divisions(&divisions, &cities, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{GeoFormat, save_table, write_geo_table};
    use crate::processing::fixtures::{Workspace, geo_table, square, table, text, workspace};
    use pvstats_core::{TableError, Value};
    use rstest::rstest;

    fn raw_divisions() -> GeoTable {
        geo_table(
            vec![
                ("DS_NOMBRE", vec![text("El Boalo"), text("El Redegüelo"), text("Navacerrada"), text("Los Baldios"), text("Getafe")]),
                ("DS_DESCRIPCION", vec![text("Municipio"); 5]),
                ("CD_NATCODE", vec![text("1"), text("2"), text("3"), text("4"), text("5")]),
                ("CDID", vec![text("11"), text("12"), text("13"), text("14"), text("15")]),
                ("CD_MUNICIPIO", vec![text("18"), text("18"), text("93"), text("93"), text("65")]),
                ("CD_INE", vec![text("28018"), text("28018"), text("28093"), text("28093"), text("28065")]),
                ("CD_INE_1", vec![text("280180"), text("280180"), text("280930"), text("280930"), text("280650")]),
            ],
            vec![
                square(0.0, 0.0, 1000.0),
                square(1000.0, 0.0, 1000.0),
                square(5000.0, 0.0, 1000.0),
                square(7000.0, 0.0, 1000.0),
                square(9000.0, 0.0, 2000.0),
            ],
        )
        .with_crs(Some("EPSG:25830".to_owned()))
    }

    fn cities() -> Table {
        table(vec![
            ("municipio_codigo", vec![Value::Int(18), Value::Int(65)]),
            ("municipio_nombre", vec![text("Boalo (El)"), text("Getafe")]),
            ("municipio_codigo_ine", vec![Value::Int(28018), Value::Int(28065)]),
            ("nuts4_codigo", vec![Value::Int(7), Value::Int(9)]),
            ("nuts4_nombre", vec![text("Sierra Norte"), text("Sur")]),
            ("superficie_km2", vec![Value::Float(39.6), Value::Float(78.4)]),
            ("densidad_por_km2", vec![Value::Float(200.0), Value::Float(2300.0)]),
            ("population", vec![Value::Int(7920), Value::Int(180_320)]),
        ])
    }

    #[rstest]
    fn divisions_are_cleaned_and_merged(workspace: Workspace) {
        let raw = workspace.root.join("divisions.geojson");
        write_geo_table(&raw, &raw_divisions()).expect("raw input");

        let divisions =
            process_administrative_divisions(&raw, None, &workspace.settings()).expect("processed");

        assert_eq!(divisions.height(), 3);
        let names = divisions.attributes().column("DS_NOMBRE").expect("names");
        assert_eq!(names, [text("El Boalo"), text("Navacerrada"), text("Getafe")]);
        assert_eq!(divisions.attributes().get(0, "CD_MUNICIPIO"), Some(&Value::Int(18)));
        let surface = divisions
            .attributes()
            .get(0, "superficie_km2")
            .and_then(Value::as_f64)
            .expect("surface");
        assert!((surface - 2.0).abs() < 1e-9);
        assert!(pvstats_fs::is_dir(&workspace.settings().processed_folder));
    }

    #[rstest]
    fn non_integer_codes_fail(workspace: Workspace) {
        let mut divisions = raw_divisions();
        divisions
            .update_attributes(|attributes| attributes.set_column("CDID", vec![text("x"); 5]))
            .expect("replace column");
        let raw = workspace.root.join("divisions.geojson");
        write_geo_table(&raw, &divisions).expect("raw input");

        let result = process_administrative_divisions(&raw, None, &workspace.settings());
        assert!(matches!(
            result,
            Err(ProcessingError::Table(TableError::NotNumeric { .. }))
        ));
    }

    #[rstest]
    fn join_keeps_census_surface_and_column_order(workspace: Workspace) {
        let settings = workspace.settings();
        let raw = workspace.root.join("divisions.geojson");
        write_geo_table(&raw, &raw_divisions()).expect("raw input");
        let divisions = process_administrative_divisions(&raw, None, &settings).expect("processed");

        let joined = join_administrative_divisions(&divisions, &cities(), &settings).expect("joined");

        assert_eq!(joined.height(), 2);
        assert_eq!(joined.attributes().column_names(), DIVISION_COLUMNS.to_vec());
        assert_eq!(joined.attributes().get(1, "superficie_km2"), Some(&Value::Float(78.4)));
        assert_eq!(joined.crs(), Some("EPSG:25830"));
    }

    #[rstest]
    fn pipeline_prefers_processed_inputs(workspace: Workspace) {
        let settings = workspace.settings();
        let raw = workspace.root.join("divisions.geojson");
        write_geo_table(&raw, &raw_divisions()).expect("raw input");
        let processed_divisions =
            process_administrative_divisions(&raw, None, &settings).expect("processed");
        let processed_divisions_path = settings
            .processed_folder
            .join(format!("administrative_divisions.{}", GeoFormat::GeoJson));
        assert!(input_exists(&processed_divisions_path).expect("inspect"));
        let processed_cities = save_table(
            "cities_info",
            &cities(),
            &settings.processed_folder,
            settings.table_format,
        )
        .expect("cities");

        let inputs = DivisionInputs {
            processed_divisions: processed_divisions_path,
            raw_divisions: workspace.root.join("missing/raw.gpkg"),
            processed_cities,
            raw_cities: workspace.root.join("missing/raw.csv"),
        };
        let joined = administrative_divisions_with_info(&inputs, &settings).expect("joined");

        assert_eq!(joined.height(), 2);
        assert_eq!(processed_divisions.height(), 3);
    }
}
