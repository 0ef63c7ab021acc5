//! Parquet and GeoParquet adapter.
//!
//! Geo tables store their geometries as WKB in a binary column described by
//! the `geo` key-value metadata entry (GeoParquet 1.0). Files without that
//! entry fall back to a binary column called `geometry`.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float64Array, Int64Array, LargeBinaryArray,
    StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use camino::Utf8Path;
use geo::{Geometry, GeometryCollection};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use pvstats_core::{GeoTable, Table, Value, wkb};
use serde_json::{Value as JsonValue, json};

use super::{ColumnKind, IoError, create};

const GEO_METADATA_KEY: &str = "geo";
const DEFAULT_GEOMETRY_COLUMN: &str = "geometry";
const PANDAS_INDEX_PREFIX: &str = "__index_level_";

struct Batches {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    geo_metadata: Option<JsonValue>,
}

fn parquet_error(path: &Utf8Path) -> impl Fn(parquet::errors::ParquetError) -> IoError + '_ {
    move |source| IoError::Parquet {
        path: path.to_owned(),
        source,
    }
}

fn arrow_error(path: &Utf8Path) -> impl Fn(arrow::error::ArrowError) -> IoError + '_ {
    move |source| IoError::Arrow {
        path: path.to_owned(),
        source,
    }
}

fn load(path: &Utf8Path) -> Result<Batches, IoError> {
    let file = pvstats_fs::open_file(path).map_err(|source| IoError::Read {
        path: path.to_owned(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_error(path))?;
    let geo_metadata = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|entries| entries.iter().find(|entry| entry.key == GEO_METADATA_KEY))
        .and_then(|entry| entry.value.as_deref())
        .and_then(|raw| serde_json::from_str(raw).ok());
    let schema = Arc::clone(builder.schema());
    let reader = builder.build().map_err(parquet_error(path))?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(arrow_error(path))?;
    Ok(Batches {
        schema,
        batches,
        geo_metadata,
    })
}

fn downcast<'a, T: 'static>(path: &Utf8Path, array: &'a ArrayRef) -> Result<&'a T, IoError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        IoError::layout(
            path,
            format!("unexpected Arrow array type {}", array.data_type()),
        )
    })
}

fn cells(path: &Utf8Path, array: &ArrayRef) -> Result<Vec<Value>, IoError> {
    let values = match array.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let cast_array = cast(array, &DataType::Int64).map_err(arrow_error(path))?;
            downcast::<Int64Array>(path, &cast_array)?
                .iter()
                .map(Value::from)
                .collect()
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let cast_array = cast(array, &DataType::Float64).map_err(arrow_error(path))?;
            downcast::<Float64Array>(path, &cast_array)?
                .iter()
                .map(Value::from)
                .collect()
        }
        DataType::Boolean => downcast::<BooleanArray>(path, array)?
            .iter()
            .map(Value::from)
            .collect(),
        DataType::Null => vec![Value::Null; array.len()],
        _ => {
            let cast_array = cast(array, &DataType::Utf8).map_err(arrow_error(path))?;
            downcast::<StringArray>(path, &cast_array)?
                .iter()
                .map(Value::from)
                .collect()
        }
    };
    Ok(values)
}

fn attributes(path: &Utf8Path, loaded: &Batches, skip: Option<&str>) -> Result<Table, IoError> {
    let mut columns = Vec::new();
    for (index, field) in loaded.schema.fields().iter().enumerate() {
        let name = field.name();
        if Some(name.as_str()) == skip || name.starts_with(PANDAS_INDEX_PREFIX) {
            continue;
        }
        let mut values = Vec::new();
        for batch in &loaded.batches {
            values.extend(cells(path, batch.column(index))?);
        }
        columns.push((name.clone(), values));
    }
    let height = loaded.batches.iter().map(RecordBatch::num_rows).sum();
    if columns.is_empty() {
        return Ok(Table::with_height(height));
    }
    Ok(Table::from_columns(columns)?)
}

pub(super) fn read_table(path: &Utf8Path) -> Result<Table, IoError> {
    let loaded = load(path)?;
    attributes(path, &loaded, None)
}

/// CRS label from a GeoParquet column entry: `AUTHORITY:CODE` for PROJJSON
/// identifiers, the string itself for plain strings.
fn crs_label(column: &JsonValue) -> Option<String> {
    match column.get("crs")? {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Object(projjson) => {
            let id = projjson.get("id")?;
            let authority = id.get("authority")?.as_str()?;
            let code = id.get("code")?;
            let code = code
                .as_str()
                .map_or_else(|| code.to_string(), str::to_owned);
            Some(format!("{authority}:{code}"))
        }
        _ => None,
    }
}

fn decode_geometry(path: &Utf8Path, row: usize, bytes: Option<&[u8]>) -> Result<Geometry<f64>, IoError> {
    bytes.map_or_else(
        || Ok(Geometry::GeometryCollection(GeometryCollection::default())),
        |bytes| {
            wkb::decode(bytes).map_err(|source| IoError::Geometry {
                path: path.to_owned(),
                row,
                source,
            })
        },
    )
}

pub(super) fn read_geo_table(path: &Utf8Path) -> Result<GeoTable, IoError> {
    let loaded = load(path)?;
    let primary = loaded
        .geo_metadata
        .as_ref()
        .and_then(|meta| meta.get("primary_column"))
        .and_then(JsonValue::as_str)
        .unwrap_or(DEFAULT_GEOMETRY_COLUMN)
        .to_owned();
    let crs = loaded
        .geo_metadata
        .as_ref()
        .and_then(|meta| meta.get("columns"))
        .and_then(|columns| columns.get(&primary))
        .and_then(crs_label);
    let index = loaded
        .schema
        .index_of(&primary)
        .map_err(|_| IoError::layout(path, format!("missing geometry column `{primary}`")))?;

    let mut geometries = Vec::new();
    for batch in &loaded.batches {
        let column = batch.column(index);
        match column.data_type() {
            DataType::Binary => {
                for bytes in downcast::<BinaryArray>(path, column)? {
                    geometries.push(decode_geometry(path, geometries.len(), bytes)?);
                }
            }
            DataType::LargeBinary => {
                for bytes in downcast::<LargeBinaryArray>(path, column)? {
                    geometries.push(decode_geometry(path, geometries.len(), bytes)?);
                }
            }
            other => {
                return Err(IoError::layout(
                    path,
                    format!("geometry column `{primary}` has type {other}, expected WKB binary"),
                ));
            }
        }
    }
    let table = attributes(path, &loaded, Some(&primary))?;
    Ok(GeoTable::new(table, geometries)?.with_crs(crs))
}

fn column_array(values: &[Value]) -> (DataType, ArrayRef) {
    match ColumnKind::infer(values) {
        ColumnKind::Int => (
            DataType::Int64,
            Arc::new(values.iter().map(Value::as_i64).collect::<Int64Array>()) as ArrayRef,
        ),
        ColumnKind::Float => (
            DataType::Float64,
            Arc::new(values.iter().map(Value::as_f64).collect::<Float64Array>()) as ArrayRef,
        ),
        ColumnKind::Bool => (
            DataType::Boolean,
            Arc::new(
                values
                    .iter()
                    .map(|value| match value {
                        Value::Bool(flag) => Some(*flag),
                        _ => None,
                    })
                    .collect::<BooleanArray>(),
            ) as ArrayRef,
        ),
        ColumnKind::Text => (
            DataType::Utf8,
            Arc::new(
                values
                    .iter()
                    .map(|value| (!value.is_null()).then(|| value.to_string()))
                    .collect::<StringArray>(),
            ) as ArrayRef,
        ),
    }
}

fn batch_parts(table: &Table) -> (Vec<Field>, Vec<ArrayRef>) {
    table
        .columns()
        .iter()
        .map(|column| {
            let (data_type, array) = column_array(column.values());
            (Field::new(column.name(), data_type, true), array)
        })
        .unzip()
}

fn write_batch(
    path: &Utf8Path,
    fields: Vec<Field>,
    arrays: Vec<ArrayRef>,
    rows: usize,
    properties: Option<WriterProperties>,
) -> Result<(), IoError> {
    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    let batch = RecordBatch::try_new_with_options(Arc::clone(&schema), arrays, &options)
        .map_err(arrow_error(path))?;
    let file = create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, properties).map_err(parquet_error(path))?;
    writer.write(&batch).map_err(parquet_error(path))?;
    writer.close().map_err(parquet_error(path))?;
    Ok(())
}

pub(super) fn write_table(path: &Utf8Path, table: &Table) -> Result<(), IoError> {
    let (fields, arrays) = batch_parts(table);
    write_batch(path, fields, arrays, table.height(), None)
}

fn geo_metadata(table: &GeoTable) -> JsonValue {
    let mut column = json!({
        "encoding": "WKB",
        "geometry_types": [],
    });
    if let Some((authority, code)) = table.crs().and_then(|crs| crs.split_once(':')) {
        let code = code
            .parse::<i64>()
            .map_or_else(|_| JsonValue::from(code), JsonValue::from);
        column["crs"] = json!({ "id": { "authority": authority, "code": code } });
    }
    json!({
        "version": "1.0.0",
        "primary_column": DEFAULT_GEOMETRY_COLUMN,
        "columns": { DEFAULT_GEOMETRY_COLUMN: column },
    })
}

pub(super) fn write_geo_table(path: &Utf8Path, table: &GeoTable) -> Result<(), IoError> {
    let (mut fields, mut arrays) = batch_parts(table.attributes());
    let encoded: Vec<Vec<u8>> = table.geometries().iter().map(wkb::encode).collect();
    fields.push(Field::new(DEFAULT_GEOMETRY_COLUMN, DataType::Binary, true));
    arrays.push(Arc::new(BinaryArray::from_iter_values(encoded)));
    let properties = WriterProperties::builder()
        .set_key_value_metadata(Some(vec![KeyValue::new(
            GEO_METADATA_KEY.to_owned(),
            geo_metadata(table).to_string(),
        )]))
        .build();
    write_batch(path, fields, arrays, table.height(), Some(properties))
}
