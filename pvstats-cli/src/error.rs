//! Error types emitted by the pvstats CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use pvstats_data::io::{IoError, UnknownFormat};
use pvstats_data::processing::ProcessingError;
use pvstats_data::ree::ReeError;
use thiserror::Error;

/// Errors emitted by the pvstats CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An output format name is not recognised.
    #[error("invalid {field}: {source}")]
    InvalidFormat {
        field: &'static str,
        #[source]
        source: UnknownFormat,
    },
    /// Opening a JSON settings file failed.
    #[error("failed to open {field} file {path:?}: {source}")]
    OpenSettingsFile {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A JSON settings file could not be decoded.
    #[error("failed to parse {field} file {path:?}: {source}")]
    ParseSettingsFile {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The log file could not be opened for appending.
    #[error("failed to open log file {path:?}: {source}")]
    OpenLogFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A global logger was already installed.
    #[error("failed to initialise logging: {0}")]
    InitLogging(#[source] log::SetLoggerError),
    /// The async runtime for HTTP requests could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Writing the command report to stdout failed.
    #[error("failed to write command output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// Retrieving or saving REE data failed.
    #[error(transparent)]
    Ree(#[from] ReeError),
    /// A processing or analysis step failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    /// Reading an input table failed.
    #[error(transparent)]
    Io(#[from] IoError),
}
