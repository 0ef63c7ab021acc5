//! Tabular and geospatial primitives for the photovoltaic statistics
//! pipeline.
//!
//! [`Table`] is a small column-major frame with the operations the
//! processing steps need: typed coercion, category remapping, hash joins
//! and grouped sums. [`GeoTable`] adds one geometry per row, planar areas,
//! geometry merges and containment queries backed by an `rstar` index.
//! The [`wkb`] module converts geometries to and from well-known binary.

mod error;
mod geo_table;
mod group;
mod join;
mod spatial;
mod table;
mod value;
pub mod wkb;

pub use error::TableError;
pub use geo_table::GeoTable;
pub use join::{JoinKind, JoinSpec};
pub use table::{Column, Table};
pub use value::{NumericKind, Value};
pub use wkb::WkbError;
