//! Shared fixtures for the processing and analysis tests.

use camino::Utf8PathBuf;
use geo::{Geometry, LineString, Polygon};
use pvstats_core::{GeoTable, Table, Value};
use rstest::fixture;
use tempfile::TempDir;

use super::OutputSettings;
use crate::io::{GeoFormat, TableFormat};

/// Temporary directory removed when dropped.
pub(crate) struct Workspace {
    _dir: TempDir,
    pub(crate) root: Utf8PathBuf,
}

impl Workspace {
    /// Output settings writing CSV tables and GeoJSON geo tables below the
    /// workspace root.
    pub(crate) fn settings(&self) -> OutputSettings {
        OutputSettings {
            table_format: TableFormat::Csv,
            geo_format: GeoFormat::GeoJson,
            ..OutputSettings::rooted_at(&self.root)
        }
    }
}

#[fixture]
pub(crate) fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    Workspace { _dir: dir, root }
}

/// Axis-aligned square with its lower-left corner at `(x, y)`.
pub(crate) fn square(x: f64, y: f64, side: f64) -> Geometry<f64> {
    Geometry::Polygon(Polygon::new(
        LineString::from(vec![
            (x, y),
            (x + side, y),
            (x + side, y + side),
            (x, y + side),
            (x, y),
        ]),
        vec![],
    ))
}

pub(crate) fn text(raw: &str) -> Value {
    Value::from(raw)
}

pub(crate) fn table(columns: Vec<(&str, Vec<Value>)>) -> Table {
    Table::from_columns(
        columns
            .into_iter()
            .map(|(name, values)| (name.to_owned(), values))
            .collect(),
    )
    .expect("fixture table")
}

pub(crate) fn geo_table(columns: Vec<(&str, Vec<Value>)>, geometries: Vec<Geometry<f64>>) -> GeoTable {
    GeoTable::new(table(columns), geometries).expect("fixture geo table")
}
