//! Errors raised by the dataset processing steps and analyses.

use camino::Utf8PathBuf;
use pvstats_core::TableError;
use thiserror::Error;

use crate::io::IoError;

/// Errors raised while cleaning, joining or analysing datasets.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProcessingError {
    /// Reading or writing a dataset failed.
    #[error(transparent)]
    Io(#[from] IoError),
    /// A table operation failed (missing column, bad cell, join keys).
    #[error(transparent)]
    Table(#[from] TableError),
    /// A land-use grouping was configured without any category id.
    #[error("no land-use ids configured for {group} zones")]
    EmptyLandUseIds {
        /// Name of the grouping (`urban`, `industrial`, ...).
        group: &'static str,
    },
    /// Checking for a previously processed file failed.
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        /// Path being checked.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The analysis was given no input files.
    #[error("no input files were given")]
    NoInputs,
}
