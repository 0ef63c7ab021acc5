//! Test helpers for composing CLI inputs on disk.

use camino::{Utf8Path, Utf8PathBuf};
use geo::{Geometry, LineString, Polygon};
use pvstats_core::{GeoTable, Table, Value};
use rstest::fixture;
use std::fs;
use tempfile::TempDir;

/// Temporary directory removed when dropped.
pub(super) struct Workspace {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
}

#[fixture]
pub(super) fn workspace() -> Workspace {
    let dir = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
    Workspace { _dir: dir, root }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write file");
}

pub(super) fn text(raw: &str) -> Value {
    Value::from(raw)
}

pub(super) fn square(x: f64, y: f64, side: f64) -> Geometry<f64> {
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

pub(super) fn table(columns: Vec<(&str, Vec<Value>)>) -> Table {
    Table::from_columns(
        columns
            .into_iter()
            .map(|(name, values)| (name.to_owned(), values))
            .collect(),
    )
    .expect("fixture table")
}

pub(super) fn geo_table(
    columns: Vec<(&str, Vec<Value>)>,
    geometries: Vec<Geometry<f64>>,
) -> GeoTable {
    GeoTable::new(table(columns), geometries).expect("fixture geo table")
}
