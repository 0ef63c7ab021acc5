//! Cleaning and joining of the raw municipal datasets.
//!
//! Each `process_*` step reads one raw input, normalises its columns and
//! saves the result under [`OutputSettings::processed_folder`] in the
//! configured format. The land-use groupings are results and go to
//! [`OutputSettings::results_folder`].

mod categories;
mod cities;
mod consumption;
mod divisions;
mod error;
mod land_use;
mod urban_zones;

use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::io::{GeoFormat, TableFormat};

pub use categories::remap_column_categories;
pub use cities::process_cities_info;
pub use consumption::process_consumption_per_city;
pub use divisions::{
    ADMINISTRATIVE_DIVISIONS_LAYER, DIVISION_COLUMNS, DivisionInputs,
    administrative_divisions_with_info, join_administrative_divisions,
    process_administrative_divisions,
};
pub use error::ProcessingError;
pub use land_use::{
    LAND_USE_LAYER, LandUseIds, filter_and_group_land_use, filter_land_use, process_land_use,
};
pub use urban_zones::process_urban_zones;

/// Where processed datasets and results are written, and in which format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Folder receiving cleaned inputs.
    pub processed_folder: Utf8PathBuf,
    /// Folder receiving aggregated results.
    pub results_folder: Utf8PathBuf,
    /// Format for plain tables.
    pub table_format: TableFormat,
    /// Format for geo tables.
    pub geo_format: GeoFormat,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            processed_folder: Utf8PathBuf::from("data/processed"),
            results_folder: Utf8PathBuf::from("data/results"),
            table_format: TableFormat::default(),
            geo_format: GeoFormat::default(),
        }
    }
}

impl OutputSettings {
    /// Settings writing everything below `root` (`root/processed` and
    /// `root/results`).
    #[must_use]
    pub fn rooted_at(root: &Utf8Path) -> Self {
        Self {
            processed_folder: root.join("processed"),
            results_folder: root.join("results"),
            ..Self::default()
        }
    }
}

/// Whether `path` names an existing regular file. A missing parent
/// directory counts as absent.
pub(crate) fn input_exists(path: &Utf8Path) -> Result<bool, ProcessingError> {
    match pvstats_fs::file_is_file(path) {
        Ok(found) => Ok(found),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ProcessingError::Inspect {
            path: path.to_owned(),
            source,
        }),
    }
}

#[cfg(test)]
pub(crate) mod fixtures;
