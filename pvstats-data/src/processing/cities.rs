//! Municipal census: codes, surface, density and estimated population.

use camino::Utf8Path;
use pvstats_core::{NumericKind, Table};

use super::{OutputSettings, ProcessingError};
use crate::io::{CsvOptions, Encoding, ReadOptions, read_table, save_table};

const INTEGER_COLUMNS: [&str; 3] = ["municipio_codigo", "municipio_codigo_ine", "nuts4_codigo"];
const FLOAT_COLUMNS: [&str; 2] = ["superficie_km2", "densidad_por_km2"];

/// Clean the municipal census.
///
/// The input is `;`-separated ISO-8859-1 text. Codes become integers,
/// surface and density floats, names are trimmed and `population` is
/// estimated as the rounded product of surface and density. Saved as
/// `cities_info`.
///
/// # Errors
///
/// Fails when the input cannot be read, a cell is not numeric, or the
/// output cannot be written.
pub fn process_cities_info(path: &Utf8Path, settings: &OutputSettings) -> Result<Table, ProcessingError> {
    let options = ReadOptions::default().with_csv(
        CsvOptions::default()
            .with_delimiter(b';')
            .with_encoding(Encoding::Latin1),
    );
    let mut cities = read_table(path, &options)?;
    for column in INTEGER_COLUMNS {
        cities.coerce_numeric(column, NumericKind::Integer)?;
    }
    for column in FLOAT_COLUMNS {
        cities.coerce_numeric(column, NumericKind::Float)?;
    }
    cities.strip("municipio_nombre")?;

    let population = cities.zip_f64("superficie_km2", "densidad_por_km2", |surface, density| {
        (surface * density).round()
    })?;
    cities.push_column("population", population)?;
    cities.coerce_numeric("population", NumericKind::Integer)?;

    save_table(
        "cities_info",
        &cities,
        &settings.processed_folder,
        settings.table_format,
    )?;
    Ok(cities)
}
