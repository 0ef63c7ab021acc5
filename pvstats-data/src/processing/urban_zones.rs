//! Urban zone polygons with their surface.

use camino::Utf8Path;
use pvstats_core::GeoTable;

use super::{OutputSettings, ProcessingError};
use crate::io::{read_geo_table, save_geo_table};

/// Add `superficie_m2` to the urban zones and save them as `urban_zones`.
///
/// Areas are measured in the units of the input CRS; inputs are expected in
/// a metric projection such as `EPSG:23030`.
///
/// # Errors
///
/// Fails when the input cannot be read or the output cannot be written.
pub fn process_urban_zones(path: &Utf8Path, settings: &OutputSettings) -> Result<GeoTable, ProcessingError> {
    let mut zones = read_geo_table(path, None)?;
    zones.push_area_column("superficie_m2", 1.0)?;
    save_geo_table(
        "urban_zones",
        &zones,
        &settings.processed_folder,
        settings.geo_format,
    )?;
    Ok(zones)
}
