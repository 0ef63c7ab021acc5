//! Reading and writing tables and geo tables.
//!
//! Every entry point dispatches on the path extension (or on an explicit
//! [`TableFormat`] / [`GeoFormat`] when saving into a folder by name).
//! Tabular inputs: CSV, Parquet, JSON records and spreadsheets. Geographic
//! inputs: GeoParquet, GeoPackage, GeoJSON and shapefiles. Shapefiles are
//! read-only.

mod csv;
mod error;
mod excel;
mod geojson;
mod gpkg;
pub(crate) mod json;
mod parquet;
mod shapefile;

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use pvstats_core::{GeoTable, Table, Value};

pub use self::csv::{CsvOptions, Encoding};
pub use error::IoError;

/// Output format for plain tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    /// Apache Parquet.
    #[default]
    Parquet,
    /// Comma-separated values with a header row.
    Csv,
    /// JSON array of records.
    Json,
}

/// Output format for geo tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoFormat {
    /// GeoParquet with a WKB geometry column.
    #[default]
    Parquet,
    /// GeoJSON feature collection.
    GeoJson,
    /// OGC GeoPackage.
    GeoPackage,
}

/// Error returned when parsing an unknown format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format `{0}`")]
pub struct UnknownFormat(pub String);

impl TableFormat {
    /// File extension used when saving in this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl GeoFormat {
    /// File extension used when saving in this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::GeoJson => "geojson",
            Self::GeoPackage => "gpkg",
        }
    }
}

impl FromStr for TableFormat {
    type Err = UnknownFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "parquet" => Ok(Self::Parquet),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(UnknownFormat(raw.to_owned())),
        }
    }
}

impl FromStr for GeoFormat {
    type Err = UnknownFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "parquet" => Ok(Self::Parquet),
            "geojson" => Ok(Self::GeoJson),
            "gpkg" | "geopackage" => Ok(Self::GeoPackage),
            _ => Err(UnknownFormat(raw.to_owned())),
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl fmt::Display for GeoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options for [`read_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Parsing options for CSV inputs.
    pub csv: CsvOptions,
    /// Worksheet to read from spreadsheet inputs.
    pub sheet: Option<String>,
}

impl ReadOptions {
    /// Read CSV inputs with `csv`.
    #[must_use]
    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    /// Read the named worksheet from spreadsheet inputs.
    #[must_use]
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

fn extension(path: &Utf8Path) -> String {
    path.extension().unwrap_or_default().to_ascii_lowercase()
}

fn unsupported(path: &Utf8Path, format: impl Into<String>) -> IoError {
    IoError::UnsupportedFormat {
        path: path.to_owned(),
        format: format.into(),
    }
}

/// Read a plain table, choosing the adapter by extension.
///
/// # Errors
///
/// Fails for unknown extensions or when the adapter rejects the file.
pub fn read_table(path: &Utf8Path, options: &ReadOptions) -> Result<Table, IoError> {
    debug!("reading table from {path}");
    match extension(path).as_str() {
        "csv" => csv::read(path, options.csv),
        "parquet" => parquet::read_table(path),
        "json" => json::read(path),
        "xlsx" | "xlsm" | "xls" | "ods" => excel::read(path, options.sheet.as_deref()),
        other => Err(unsupported(path, other)),
    }
}

/// Read a geo table, choosing the adapter by extension.
///
/// `layer` selects the GeoPackage layer and is ignored by other formats.
///
/// # Errors
///
/// Fails for unknown extensions or when the adapter rejects the file.
pub fn read_geo_table(path: &Utf8Path, layer: Option<&str>) -> Result<GeoTable, IoError> {
    debug!("reading geo table from {path}");
    match extension(path).as_str() {
        "parquet" => parquet::read_geo_table(path),
        "gpkg" => gpkg::read(path, layer),
        "geojson" | "json" => geojson::read(path),
        "shp" => shapefile::read(path),
        other => Err(unsupported(path, other)),
    }
}

/// Write a plain table to `path`, choosing the format by extension.
///
/// # Errors
///
/// Fails for unknown extensions or when writing fails.
pub fn write_table(path: &Utf8Path, table: &Table) -> Result<(), IoError> {
    match extension(path).as_str() {
        "csv" => csv::write(path, table),
        "parquet" => parquet::write_table(path, table),
        "json" => json::write(path, table),
        other => Err(unsupported(path, other)),
    }
}

/// Write `table` as CSV to `path` whatever its extension, creating parent
/// directories.
///
/// # Errors
///
/// Fails when the file cannot be created or written.
pub fn write_table_csv(path: &Utf8Path, table: &Table) -> Result<(), IoError> {
    csv::write(path, table)
}

/// Write a geo table to `path`, choosing the format by extension.
///
/// # Errors
///
/// Fails for unknown extensions (shapefiles included) or when writing fails.
pub fn write_geo_table(path: &Utf8Path, table: &GeoTable) -> Result<(), IoError> {
    match extension(path).as_str() {
        "parquet" => parquet::write_geo_table(path, table),
        "geojson" | "json" => geojson::write(path, table),
        "gpkg" => gpkg::write(path, table),
        other => Err(unsupported(path, other)),
    }
}

/// Save `table` as `{folder}/{name}.{format}`, creating the folder.
///
/// # Errors
///
/// Fails when the folder cannot be created or writing fails.
pub fn save_table(
    name: &str,
    table: &Table,
    folder: &Utf8Path,
    format: TableFormat,
) -> Result<Utf8PathBuf, IoError> {
    let path = prepare_target(name, folder, format.extension())?;
    write_table(&path, table)?;
    info!("saved {name} ({} rows) to {path}", table.height());
    Ok(path)
}

/// Save `table` as `{folder}/{name}.{format}`, creating the folder.
///
/// # Errors
///
/// Fails when the folder cannot be created or writing fails.
pub fn save_geo_table(
    name: &str,
    table: &GeoTable,
    folder: &Utf8Path,
    format: GeoFormat,
) -> Result<Utf8PathBuf, IoError> {
    let path = prepare_target(name, folder, format.extension())?;
    write_geo_table(&path, table)?;
    info!("saved {name} ({} rows) to {path}", table.height());
    Ok(path)
}

fn prepare_target(name: &str, folder: &Utf8Path, extension: &str) -> Result<Utf8PathBuf, IoError> {
    pvstats_fs::ensure_dir(folder).map_err(|source| IoError::Write {
        path: folder.to_owned(),
        source,
    })?;
    Ok(folder.join(format!("{name}.{extension}")))
}

fn read_bytes(path: &Utf8Path) -> Result<Vec<u8>, IoError> {
    use std::io::Read;

    let mut file = pvstats_fs::open_file(path).map_err(|source| IoError::Read {
        path: path.to_owned(),
        source,
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|source| IoError::Read {
            path: path.to_owned(),
            source,
        })?;
    Ok(bytes)
}

fn create(path: &Utf8Path) -> Result<std::fs::File, IoError> {
    pvstats_fs::create_file(path).map_err(|source| IoError::Write {
        path: path.to_owned(),
        source,
    })
}

/// Storage type shared by the typed writers (Parquet, GeoPackage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    /// Narrowest kind able to hold every non-null cell.
    pub(crate) fn infer(values: &[Value]) -> Self {
        let mut kind: Option<Self> = None;
        for value in values {
            let cell = match value {
                Value::Null => continue,
                Value::Bool(_) => Self::Bool,
                Value::Int(_) => Self::Int,
                Value::Float(_) => Self::Float,
                Value::Text(_) => Self::Text,
            };
            kind = Some(match (kind, cell) {
                (None, cell) => cell,
                (Some(current), cell) if current == cell => current,
                (Some(Self::Int | Self::Float), Self::Int | Self::Float) => Self::Float,
                _ => Self::Text,
            });
        }
        kind.unwrap_or(Self::Text)
    }
}

#[cfg(test)]
mod tests;
