//! Delimited text adapter.

use std::io::Write;

use camino::Utf8Path;
use pvstats_core::{Table, Value};

use super::{IoError, create, read_bytes};

/// Character encoding of a text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8, with an optional byte-order mark.
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

/// Parsing options for CSV inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Text encoding of the file.
    pub encoding: Encoding,
    /// Infer integers, floats and booleans; when off every non-empty cell is
    /// kept as text.
    pub infer_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: Encoding::Utf8,
            infer_types: true,
        }
    }
}

impl CsvOptions {
    /// Use `delimiter` between fields.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Decode the file as `encoding`.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Keep cells as text instead of inferring numbers.
    #[must_use]
    pub const fn raw_text(mut self) -> Self {
        self.infer_types = false;
        self
    }
}

fn decode(path: &Utf8Path, bytes: Vec<u8>, encoding: Encoding) -> Result<String, IoError> {
    match encoding {
        Encoding::Utf8 => {
            let text = String::from_utf8(bytes).map_err(|source| IoError::Decode {
                path: path.to_owned(),
                source,
            })?;
            if text.starts_with('\u{feff}') {
                Ok(text.trim_start_matches('\u{feff}').to_owned())
            } else {
                Ok(text)
            }
        }
        Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}

fn cell(raw: &str, infer_types: bool) -> Value {
    if infer_types {
        Value::infer(raw)
    } else if raw.is_empty() {
        Value::Null
    } else {
        Value::Text(raw.to_owned())
    }
}

pub(super) fn read(path: &Utf8Path, options: CsvOptions) -> Result<Table, IoError> {
    let text = decode(path, read_bytes(path)?, options.encoding)?;
    parse(path, &text, options)
}

pub(super) fn parse(path: &Utf8Path, text: &str, options: CsvOptions) -> Result<Table, IoError> {
    let csv_error = |source| IoError::Csv {
        path: path.to_owned(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_owned)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(
            record
                .iter()
                .map(|raw| cell(raw, options.infer_types))
                .collect(),
        );
    }
    Ok(Table::from_rows(header, rows)?)
}

pub(super) fn write(path: &Utf8Path, table: &Table) -> Result<(), IoError> {
    let csv_error = |source| IoError::Csv {
        path: path.to_owned(),
        source,
    };
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer
        .write_record(table.column_names())
        .map_err(csv_error)?;
    for row in 0..table.height() {
        writer
            .write_record(table.row(row).map(ToString::to_string))
            .map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|err| IoError::Write {
            path: path.to_owned(),
            source: err.into_error(),
        })?
        .flush()
        .map_err(|source| IoError::Write {
            path: path.to_owned(),
            source,
        })
}
