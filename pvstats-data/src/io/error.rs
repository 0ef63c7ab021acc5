//! Error types produced by the file format adapters.

use std::io;

use camino::Utf8PathBuf;
use pvstats_core::{TableError, WkbError};
use thiserror::Error;

/// Errors raised while reading or writing datasets.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IoError {
    /// The path extension or requested format has no adapter.
    #[error("unsupported file format `{format}` for {path}")]
    UnsupportedFormat {
        /// Offending path.
        path: Utf8PathBuf,
        /// Extension or format name that was requested.
        format: String,
    },
    /// Opening or reading a file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Creating or writing a file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The file is not valid UTF-8 text.
    #[error("{path} is not valid UTF-8 (try the Latin-1 encoding): {source}")]
    Decode {
        /// File being decoded.
        path: Utf8PathBuf,
        /// Decoding failure.
        source: std::string::FromUtf8Error,
    },
    /// CSV parsing or serialisation failed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by the `csv` crate.
        source: csv::Error,
    },
    /// JSON parsing or serialisation failed.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by `serde_json`.
        source: serde_json::Error,
    },
    /// GeoJSON parsing or conversion failed.
    #[error("GeoJSON error in {path}: {source}")]
    GeoJson {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by the `geojson` crate.
        source: Box<geojson::Error>,
    },
    /// Parquet reading or writing failed.
    #[error("Parquet error in {path}: {source}")]
    Parquet {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by the `parquet` crate.
        source: parquet::errors::ParquetError,
    },
    /// Building Arrow record batches failed.
    #[error("Arrow error in {path}: {source}")]
    Arrow {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by the `arrow` crate.
        source: arrow::error::ArrowError,
    },
    /// Reading a shapefile failed.
    #[error("shapefile error in {path}: {source}")]
    Shapefile {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by the `shapefile` crate.
        source: Box<shapefile::Error>,
    },
    /// Reading a spreadsheet failed.
    #[error("spreadsheet error in {path}: {source}")]
    Spreadsheet {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by `calamine`.
        source: Box<calamine::Error>,
    },
    /// Accessing a GeoPackage database failed.
    #[error("GeoPackage error in {path}: {source}")]
    GeoPackage {
        /// File being processed.
        path: Utf8PathBuf,
        /// Error reported by `rusqlite`.
        source: rusqlite::Error,
    },
    /// A stored geometry could not be decoded.
    #[error("invalid geometry in {path} (row {row}): {source}")]
    Geometry {
        /// File being processed.
        path: Utf8PathBuf,
        /// Zero-based row index.
        row: usize,
        /// WKB decoding failure.
        source: WkbError,
    },
    /// The file content does not have the expected shape.
    #[error("{path}: {message}")]
    Layout {
        /// File being processed.
        path: Utf8PathBuf,
        /// Description of the mismatch.
        message: String,
    },
    /// Assembling the in-memory table failed.
    #[error(transparent)]
    Table(#[from] TableError),
}

impl IoError {
    pub(crate) fn layout(path: &camino::Utf8Path, message: impl Into<String>) -> Self {
        Self::Layout {
            path: path.to_owned(),
            message: message.into(),
        }
    }
}
