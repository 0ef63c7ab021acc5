//! Share of municipal electricity demand coverable by rooftop photovoltaics,
//! and the ground-mounted surface needed to reach a target share.

use std::collections::BTreeMap;

use camino::Utf8Path;
use log::info;
use pvstats_core::{GeoTable, JoinKind, JoinSpec, Table, Value};
use serde::Deserialize;

use crate::io::write_geo_table;
use crate::processing::ProcessingError;

/// Number of leading input columns holding source data.
const SOURCE_COLUMNS: usize = 6;

/// Labels of the coverage bins, from `(0, 0.2]` to `(0.8, 1]`.
pub const COVERAGE_LABELS: [&str; 5] = ["0-20%", "20-40%", "40-60%", "60-80%", "80-100%"];

/// Parameters of the coverage model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoverageParams {
    /// Renaming applied to the source columns. After renaming the table must
    /// hold `urban_ha`, `rural_ha` and `mean_electricity_consumption`.
    #[serde(default)]
    pub column_rename: BTreeMap<String, String>,
    /// Installable rooftop power, kW per hectare of urban land.
    pub power_per_ha_roof: f64,
    /// Equivalent full-load hours per year of rooftop installations.
    pub hef_roof: f64,
    /// Target share of the demand to cover, between 0 and 1.
    pub consumption_to_cover: f64,
    /// Equivalent full-load hours per year of ground installations.
    pub hef_floor: f64,
    /// Installable ground power, kW per hectare.
    pub power_per_ha_floor: f64,
}

/// Bin label for a covered share; `None` outside `(0, 1]`.
#[must_use]
pub fn coverage_category(share: f64) -> Option<&'static str> {
    let in_range = share > 0.0 && share <= 1.0;
    if !in_range {
        return None;
    }
    COVERAGE_LABELS
        .iter()
        .zip([0.2, 0.4, 0.6, 0.8, 1.0])
        .find(|(_, upper)| share <= *upper)
        .map(|(label, _)| *label)
}

fn required_in_floor(share: Option<f64>, mean: Option<f64>, covered: Option<f64>, target: f64) -> Value {
    match (share, mean, covered) {
        (Some(share), Some(mean), Some(covered)) if share < target => {
            Value::Float(target.mul_add(mean, -covered))
        }
        (Some(_), Some(_), Some(_)) => Value::Float(0.0),
        _ => Value::Null,
    }
}

/// Recompute the coverage model over the municipal source table.
///
/// Keeps the first six columns, renames them through
/// [`CoverageParams::column_rename`] and derives, in MW and MWh:
/// `power_in_roof`, `electricity_generated_annually`,
/// `electricity_covered_annually` (capped by the mean consumption),
/// `covered_percentage`, `electricity_required_in_floor` (to reach
/// [`CoverageParams::consumption_to_cover`]), `power_in_floor`, `floor_ha`,
/// `used_rural_floor` and `coverage_category`.
///
/// Missing cells propagate: a null generation or mean consumption gives a
/// null `electricity_covered_annually` rather than the other operand, and a
/// null `covered_percentage` gives a null `electricity_required_in_floor`
/// rather than zero.
///
/// # Errors
///
/// Fails when a required column is missing after renaming.
pub fn process_pv_coverage(table: &Table, params: &CoverageParams) -> Result<Table, ProcessingError> {
    let mut coverage = table.head_columns(SOURCE_COLUMNS);
    coverage.rename(&params.column_rename)?;

    let power_in_roof = coverage.map_f64("urban_ha", |hectares| {
        hectares * params.power_per_ha_roof / 1000.0
    })?;
    coverage.push_column("power_in_roof", power_in_roof)?;
    let generated = coverage.map_f64("power_in_roof", |power| power * params.hef_roof)?;
    coverage.push_column("electricity_generated_annually", generated)?;
    let covered = coverage.zip_f64(
        "electricity_generated_annually",
        "mean_electricity_consumption",
        f64::min,
    )?;
    coverage.push_column("electricity_covered_annually", covered)?;
    let share = coverage.zip_f64(
        "electricity_covered_annually",
        "mean_electricity_consumption",
        |covered, mean| covered / mean,
    )?;
    coverage.push_column("covered_percentage", share)?;

    let required: Vec<Value> = {
        let share = coverage.float_column("covered_percentage")?;
        let mean = coverage.float_column("mean_electricity_consumption")?;
        let covered = coverage.float_column("electricity_covered_annually")?;
        share
            .into_iter()
            .zip(mean)
            .zip(covered)
            .map(|((share, mean), covered)| {
                required_in_floor(share, mean, covered, params.consumption_to_cover)
            })
            .collect()
    };
    coverage.push_column("electricity_required_in_floor", required)?;
    let power_in_floor = coverage.map_f64("electricity_required_in_floor", |energy| {
        energy / params.hef_floor
    })?;
    coverage.push_column("power_in_floor", power_in_floor)?;
    let floor_ha = coverage.map_f64("power_in_floor", |power| {
        power / (params.power_per_ha_floor / 1000.0)
    })?;
    coverage.push_column("floor_ha", floor_ha)?;
    let used_rural_floor = coverage.zip_f64("floor_ha", "rural_ha", |floor, rural| floor / rural)?;
    coverage.push_column("used_rural_floor", used_rural_floor)?;

    let categories = coverage
        .float_column("covered_percentage")?
        .into_iter()
        .map(|share| {
            share
                .and_then(coverage_category)
                .map_or(Value::Null, Value::from)
        })
        .collect();
    coverage.push_column("coverage_category", categories)?;
    Ok(coverage)
}

/// Attach the coverage rows to the municipal boundaries.
///
/// `municipio` is trimmed and matched against `municipio_nombre`; the joined
/// table is written as GeoJSON to `save_path`.
///
/// # Errors
///
/// Fails when a key column is missing or the output cannot be written.
pub fn relate_pv_location(
    coverage: &Table,
    divisions: &GeoTable,
    save_path: &Utf8Path,
) -> Result<GeoTable, ProcessingError> {
    let mut coverage = coverage.clone();
    coverage.strip("municipio")?;
    let joined = divisions.merge_table(
        &coverage,
        &JoinSpec::between(&["municipio_nombre"], &["municipio"], JoinKind::Inner),
    )?;
    write_geo_table(save_path, &joined)?;
    info!(
        "located {} of {} coverage rows, saved to {save_path}",
        joined.height(),
        coverage.height()
    );
    Ok(joined)
}
