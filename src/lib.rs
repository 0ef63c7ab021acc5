//! Facade crate for the photovoltaic statistics workspace.
//!
//! This crate re-exports the table model and, behind the `data` feature, the
//! readers, REE clients and processing pipelines.

#![forbid(unsafe_code)]

pub use pvstats_core::{
    Column, GeoTable, JoinKind, JoinSpec, NumericKind, Table, TableError, Value, WkbError,
};

#[cfg(feature = "data")]
pub use pvstats_data::{analysis, io, processing, ree};
