//! Shapefile reader (`.shp` geometries plus `.dbf` attributes).
//!
//! Attribute columns are ordered by name. Null shapes become empty
//! geometry collections.

use std::collections::BTreeMap;

use camino::Utf8Path;
use geo::{Geometry, GeometryCollection};
use pvstats_core::{GeoTable, Table, Value};
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};

use super::IoError;

fn field_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(text) => text.map_or(Value::Null, |text| Value::Text(text.trim_end().to_owned())),
        FieldValue::Memo(text) => Value::Text(text),
        FieldValue::Numeric(number) => Value::from(number),
        FieldValue::Float(number) => Value::from(number.map(f64::from)),
        FieldValue::Double(number) | FieldValue::Currency(number) => Value::Float(number),
        FieldValue::Integer(number) => Value::Int(i64::from(number)),
        FieldValue::Logical(flag) => Value::from(flag),
        other => Value::Text(format!("{other:?}")),
    }
}

fn geometry(path: &Utf8Path, row: usize, shape: Shape) -> Result<Geometry<f64>, IoError> {
    if matches!(shape, Shape::NullShape) {
        return Ok(Geometry::GeometryCollection(GeometryCollection::default()));
    }
    Geometry::<f64>::try_from(shape)
        .map_err(|err| IoError::layout(path, format!("unsupported shape in row {row}: {err}")))
}

pub(super) fn read(path: &Utf8Path) -> Result<GeoTable, IoError> {
    let shapefile_error = |source| IoError::Shapefile {
        path: path.to_owned(),
        source: Box::new(source),
    };
    let mut reader = Reader::from_path(path.as_std_path()).map_err(shapefile_error)?;

    let mut geometries = Vec::new();
    let mut records: Vec<BTreeMap<String, Value>> = Vec::new();
    for (row, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(shapefile_error)?;
        geometries.push(geometry(path, row, shape)?);
        records.push(
            record
                .into_iter()
                .map(|(name, value)| (name, field_value(value)))
                .collect(),
        );
    }

    let header: Vec<String> = records
        .iter()
        .flat_map(BTreeMap::keys)
        .cloned()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    let rows = records
        .into_iter()
        .map(|mut record| {
            header
                .iter()
                .map(|name| record.remove(name).unwrap_or_default())
                .collect()
        })
        .collect();
    let attributes = Table::from_rows(header, rows)?;
    Ok(GeoTable::new(attributes, geometries)?)
}
