//! Electricity consumption relative to population and surface.

use camino::Utf8Path;
use log::info;
use pvstats_core::{GeoTable, JoinKind, JoinSpec, Table};

use crate::io::write_geo_table;
use crate::processing::ProcessingError;

/// Join the consumption of `year` onto the municipal boundaries and derive
/// `consumption_per_capita` and `consumption_per_km2`.
///
/// Rows are matched on `municipio_nombre == Nombre`; municipalities without
/// consumption figures are dropped. The result is written as GeoJSON to
/// `save_path`.
///
/// # Errors
///
/// Fails when a required column is missing or the output cannot be written.
pub fn consumption_per_city(
    divisions_with_info: &GeoTable,
    consumption: &Table,
    year: &str,
    save_path: &Utf8Path,
) -> Result<GeoTable, ProcessingError> {
    let mut joined = divisions_with_info.merge_table(
        consumption,
        &JoinSpec::between(&["municipio_nombre"], &["Nombre"], JoinKind::Inner),
    )?;
    let per_capita = joined
        .attributes()
        .zip_f64(year, "population", |mwh, population| mwh / population)?;
    let per_km2 = joined
        .attributes()
        .zip_f64(year, "superficie_km2", |mwh, surface| mwh / surface)?;
    joined.update_attributes(|attributes| {
        attributes.push_column("consumption_per_capita", per_capita)?;
        attributes.push_column("consumption_per_km2", per_km2)
    })?;

    write_geo_table(save_path, &joined)?;
    info!(
        "saved {year} consumption for {} municipalities to {save_path}",
        joined.height()
    );
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::fixtures::{Workspace, geo_table, square, table, text, workspace};
    use pvstats_core::{TableError, Value};
    use rstest::{fixture, rstest};

    #[fixture]
    fn divisions() -> GeoTable {
        geo_table(
            vec![
                ("municipio_nombre", vec![text("Getafe"), text("Pinto"), text("Valdemoro")]),
                ("population", vec![Value::Int(180_000), Value::Int(0), Value::Int(75_000)]),
                ("superficie_km2", vec![Value::Float(78.4), Value::Float(62.5), Value::Float(64.2)]),
            ],
            vec![
                square(0.0, 0.0, 1.0),
                square(1.0, 0.0, 1.0),
                square(2.0, 0.0, 1.0),
            ],
        )
    }

    #[fixture]
    fn consumption() -> Table {
        table(vec![
            ("Nombre", vec![text("Getafe"), text("Pinto")]),
            ("2021", vec![Value::Int(900_000), Value::Int(312_500)]),
        ])
    }

    #[rstest]
    fn ratios_are_derived(workspace: Workspace, divisions: GeoTable, consumption: Table) {
        let save_path = workspace.root.join("results/consumption.geojson");

        let joined = consumption_per_city(&divisions, &consumption, "2021", &save_path).expect("joined");

        assert_eq!(joined.height(), 2);
        assert_eq!(
            joined.attributes().get(0, "consumption_per_capita"),
            Some(&Value::Float(5.0))
        );
        assert_eq!(joined.attributes().get(1, "consumption_per_capita"), Some(&Value::Null));
        assert_eq!(
            joined.attributes().get(1, "consumption_per_km2"),
            Some(&Value::Float(5000.0))
        );
        assert!(pvstats_fs::file_is_file(&save_path).expect("inspect"));
    }

    #[rstest]
    fn unknown_years_fail(workspace: Workspace, divisions: GeoTable, consumption: Table) {
        let save_path = workspace.root.join("consumption.geojson");
        assert!(matches!(
            consumption_per_city(&divisions, &consumption, "1999", &save_path),
            Err(ProcessingError::Table(TableError::MissingColumn { .. }))
        ));
    }
}
