//! Input validation and settings shared by the pipeline commands.

use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use pvstats_data::io::{GeoFormat, TableFormat};
use pvstats_data::processing::OutputSettings;
use serde::de::DeserializeOwned;

use crate::CliError;

pub(crate) const ARG_PROCESSED_FOLDER: &str = "processed-folder";
pub(crate) const ARG_RESULTS_FOLDER: &str = "results-folder";
pub(crate) const ARG_TABLE_FORMAT: &str = "table-format";
pub(crate) const ARG_GEO_FORMAT: &str = "geo-format";

/// Fail unless `path` names an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match pvstats_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) if pvstats_fs::is_dir(path) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Decode a JSON settings file such as a category mapping.
pub(crate) fn load_json<T: DeserializeOwned>(
    path: &Utf8Path,
    field: &'static str,
) -> Result<T, CliError> {
    let file = pvstats_fs::open_file(path).map_err(|source| CliError::OpenSettingsFile {
        field,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseSettingsFile {
        field,
        path: path.to_path_buf(),
        source,
    })
}

/// Output locations and formats as given on the command line or in config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct OutputOverrides<'a> {
    pub(crate) processed_folder: Option<&'a Utf8Path>,
    pub(crate) results_folder: Option<&'a Utf8Path>,
    pub(crate) table_format: Option<&'a str>,
    pub(crate) geo_format: Option<&'a str>,
}

impl OutputOverrides<'_> {
    /// Fill the gaps with [`OutputSettings::default`].
    pub(crate) fn resolve(&self) -> Result<OutputSettings, CliError> {
        let defaults = OutputSettings::default();
        let table_format = match self.table_format {
            Some(raw) => raw
                .parse::<TableFormat>()
                .map_err(|source| CliError::InvalidFormat {
                    field: ARG_TABLE_FORMAT,
                    source,
                })?,
            None => defaults.table_format,
        };
        let geo_format = match self.geo_format {
            Some(raw) => raw
                .parse::<GeoFormat>()
                .map_err(|source| CliError::InvalidFormat {
                    field: ARG_GEO_FORMAT,
                    source,
                })?,
            None => defaults.geo_format,
        };
        Ok(OutputSettings {
            processed_folder: self
                .processed_folder
                .map_or(defaults.processed_folder, Utf8Path::to_path_buf),
            results_folder: self
                .results_folder
                .map_or(defaults.results_folder, Utf8Path::to_path_buf),
            table_format,
            geo_format,
        })
    }
}

/// Path a processed dataset named `name` is saved to under `settings`.
pub(crate) fn processed_table_path(settings: &OutputSettings, name: &str) -> Utf8PathBuf {
    settings
        .processed_folder
        .join(format!("{name}.{}", settings.table_format.extension()))
}

/// Path a processed geo dataset named `name` is saved to under `settings`.
pub(crate) fn processed_geo_path(settings: &OutputSettings, name: &str) -> Utf8PathBuf {
    settings
        .processed_folder
        .join(format!("{name}.{}", settings.geo_format.extension()))
}
