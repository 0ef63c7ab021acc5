//! JSON adapter.
//!
//! Reads either a records array (`[{"col": value}, ...]`) or the
//! column-oriented object pandas writes by default
//! (`{"col": {"0": value, ...}}`). Always writes records.

use std::io::Write;

use camino::Utf8Path;
use pvstats_core::{Table, Value};
use serde_json::{Map, Number, Value as JsonValue};

use super::{IoError, create, read_bytes};

/// Convert a JSON scalar into a cell; nested values are kept as JSON text.
pub(crate) fn from_json(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(flag) => Value::Bool(*flag),
        JsonValue::Number(number) => number
            .as_i64()
            .map(Value::Int)
            .or_else(|| number.as_f64().map(Value::Float))
            .unwrap_or_else(|| Value::Text(number.to_string())),
        JsonValue::String(text) => Value::Text(text.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Convert a cell into JSON. Non-finite floats become `null`.
pub(crate) fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(flag) => JsonValue::Bool(*flag),
        Value::Int(int) => JsonValue::Number(Number::from(*int)),
        Value::Float(float) => Number::from_f64(*float).map_or(JsonValue::Null, JsonValue::Number),
        Value::Text(text) => JsonValue::String(text.clone()),
    }
}

/// JSON object holding the cells of `row`.
pub(crate) fn row_object(table: &Table, row: usize) -> Map<String, JsonValue> {
    table
        .columns()
        .iter()
        .map(|column| {
            let cell = column.values().get(row).map_or(JsonValue::Null, to_json);
            (column.name().to_owned(), cell)
        })
        .collect()
}

/// Build a table from JSON objects, unioning keys in first-appearance order.
pub(crate) fn table_from_objects<'a, I>(objects: I) -> Result<Table, IoError>
where
    I: IntoIterator<Item = &'a Map<String, JsonValue>>,
{
    let objects: Vec<&Map<String, JsonValue>> = objects.into_iter().collect();
    let mut header: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }
    let rows = objects
        .iter()
        .map(|object| {
            header
                .iter()
                .map(|key| object.get(key).map_or(Value::Null, from_json))
                .collect()
        })
        .collect();
    Ok(Table::from_rows(header, rows)?)
}

fn from_columns_object(path: &Utf8Path, object: &Map<String, JsonValue>) -> Result<Table, IoError> {
    let mut columns = Vec::with_capacity(object.len());
    for (name, cells) in object {
        let cells = cells.as_object().ok_or_else(|| {
            IoError::layout(path, format!("column `{name}` is not an index object"))
        })?;
        columns.push((name.clone(), cells.values().map(from_json).collect()));
    }
    Ok(Table::from_columns(columns)?)
}

pub(super) fn read(path: &Utf8Path) -> Result<Table, IoError> {
    let bytes = read_bytes(path)?;
    let root: JsonValue = serde_json::from_slice(&bytes).map_err(|source| IoError::Json {
        path: path.to_owned(),
        source,
    })?;
    match &root {
        JsonValue::Array(records) => {
            let objects = records
                .iter()
                .enumerate()
                .map(|(index, record)| {
                    record.as_object().ok_or_else(|| {
                        IoError::layout(path, format!("record {index} is not a JSON object"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            table_from_objects(objects)
        }
        JsonValue::Object(object) => from_columns_object(path, object),
        _ => Err(IoError::layout(
            path,
            "expected an array of records or an object of columns",
        )),
    }
}

pub(super) fn write(path: &Utf8Path, table: &Table) -> Result<(), IoError> {
    let records: Vec<JsonValue> = (0..table.height())
        .map(|row| JsonValue::Object(row_object(table, row)))
        .collect();
    let mut file = create(path)?;
    serde_json::to_writer(&mut file, &records).map_err(|source| IoError::Json {
        path: path.to_owned(),
        source,
    })?;
    file.flush().map_err(|source| IoError::Write {
        path: path.to_owned(),
        source,
    })
}
