//! Yearly electricity consumption per municipality.

use camino::Utf8Path;
use pvstats_core::{NumericKind, Table, Value};

use super::{OutputSettings, ProcessingError};
use crate::io::{CsvOptions, Encoding, ReadOptions, read_table, save_table};

/// Clean the consumption table (one `Nombre` column followed by one MWh
/// column per year).
///
/// Names are trimmed; yearly figures lose their `.` thousands separators and
/// become integers, with unparsable cells left null. Saved as
/// `consumption_per_city`.
///
/// # Errors
///
/// Fails when the input cannot be read, `Nombre` is missing, or the output
/// cannot be written.
pub fn process_consumption_per_city(
    path: &Utf8Path,
    settings: &OutputSettings,
) -> Result<Table, ProcessingError> {
    let options = ReadOptions::default()
        .with_csv(CsvOptions::default().with_encoding(Encoding::Latin1).raw_text());
    let mut consumption = read_table(path, &options)?;
    consumption.strip("Nombre")?;

    let years: Vec<String> = consumption
        .column_names()
        .into_iter()
        .skip(1)
        .map(str::to_owned)
        .collect();
    for year in &years {
        consumption.transform(year, |value| match value {
            Value::Text(text) => Value::Text(text.replace('.', "")),
            other => other.clone(),
        })?;
        consumption.coerce_numeric_lenient(year, NumericKind::Integer)?;
    }

    save_table(
        "consumption_per_city",
        &consumption,
        &settings.processed_folder,
        settings.table_format,
    )?;
    Ok(consumption)
}
