//! Surface of photovoltaic installation polygons per perimeter.

use std::collections::BTreeMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use pvstats_core::{GeoTable, Value};

use crate::io::{read_geo_table, write_geo_table};
use crate::processing::ProcessingError;

/// Category marking the perimeter polygons once remapped.
pub const PERIMETER_CATEGORY: &str = "Perimetro";

const CATEGORY_COLUMN: &str = "categoria";
const AREA_COLUMN: &str = "area_m2";
const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// Installable surface inside one perimeter.
#[derive(Debug, Clone, PartialEq)]
pub struct PerimeterSummary {
    /// Row of the perimeter in the combined table.
    pub row: usize,
    /// Land type shared by the categories inside the perimeter (the text
    /// before the first `-`), when any category is present.
    pub land_type: Option<String>,
    /// Hectares per category, sorted by category name. The perimeter itself
    /// is included.
    pub hectares: Vec<(String, f64)>,
}

impl fmt::Display for PerimeterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "perimeter {} ({})",
            self.row,
            self.land_type.as_deref().unwrap_or("unknown land type")
        )?;
        for (category, hectares) in &self.hectares {
            writeln!(f, "  {category}: {hectares:.0} ha")?;
        }
        Ok(())
    }
}

fn land_type(category: &str) -> &str {
    category.split('-').next().unwrap_or(category).trim()
}

fn summarise(table: &GeoTable, perimeter_row: usize, inside: &[usize]) -> PerimeterSummary {
    let categories = table.attributes().column(CATEGORY_COLUMN).unwrap_or_default();
    let areas = table.attributes().column(AREA_COLUMN).unwrap_or_default();
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in inside {
        let Some(category) = categories.get(*row).and_then(Value::as_str) else {
            continue;
        };
        let area = areas.get(*row).and_then(Value::as_f64).unwrap_or_default();
        *totals.entry(category).or_default() += area;
    }

    let mut shared: Option<&str> = None;
    for category in totals.keys().filter(|name| **name != PERIMETER_CATEGORY) {
        let local = land_type(category);
        match shared {
            None => shared = Some(local),
            Some(existing) if existing != local => {
                warn!("land type mismatch: {existing} != {local}");
            }
            Some(_) => {}
        }
    }

    PerimeterSummary {
        row: perimeter_row,
        land_type: shared.map(str::to_owned),
        hectares: totals
            .into_iter()
            .map(|(category, area)| (category.to_owned(), area / SQUARE_METRES_PER_HECTARE))
            .collect(),
    }
}

/// Combine the installation layers and summarise each perimeter.
///
/// Every file gains an `area_m2` column before being stacked; the combined
/// table is written as GeoJSON to `save_path` with its original category
/// codes. Categories are then remapped through `mapping` and, for every
/// [`PERIMETER_CATEGORY`] row, the polygons within it are summed per
/// category in hectares.
///
/// # Errors
///
/// Fails when `paths` is empty, an input cannot be read, the `categoria`
/// column is missing, or the output cannot be written.
pub fn analyze_pv_installations(
    paths: &[Utf8PathBuf],
    mapping: &BTreeMap<String, String>,
    save_path: &Utf8Path,
) -> Result<Vec<PerimeterSummary>, ProcessingError> {
    if paths.is_empty() {
        return Err(ProcessingError::NoInputs);
    }
    let mut layers = Vec::with_capacity(paths.len());
    for path in paths {
        let mut layer = read_geo_table(path, None)?;
        layer.push_area_column(AREA_COLUMN, 1.0)?;
        layers.push(layer);
    }
    let mut combined = GeoTable::concat(&layers);
    write_geo_table(save_path, &combined)?;
    info!(
        "saved {} installation polygons to {save_path}",
        combined.height()
    );

    combined.update_attributes(|attributes| attributes.map_values(CATEGORY_COLUMN, mapping))?;
    let perimeter_rows: Vec<usize> = combined
        .attributes()
        .column(CATEGORY_COLUMN)?
        .iter()
        .enumerate()
        .filter_map(|(row, value)| (value.as_str() == Some(PERIMETER_CATEGORY)).then_some(row))
        .collect();
    let perimeters: Vec<_> = perimeter_rows
        .iter()
        .map(|row| combined.geometries()[*row].clone())
        .collect();

    let summaries: Vec<PerimeterSummary> = perimeter_rows
        .iter()
        .zip(combined.within_each(&perimeters))
        .map(|(row, inside)| summarise(&combined, *row, &inside))
        .collect();
    for summary in &summaries {
        info!("{summary}");
    }
    Ok(summaries)
}
