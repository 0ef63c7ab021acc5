//! Spreadsheet reader (xlsx, xlsm, xls, ods).
//!
//! The first row of the worksheet is the header. Integral numbers are read
//! as integers, mirroring how spreadsheet numbers are surfaced by dataframe
//! readers.

use calamine::{Data, Reader, open_workbook_auto};
use camino::Utf8Path;
use log::warn;
use pvstats_core::{Table, Value};

use super::IoError;

fn cell(data: &Data) -> Value {
    match data {
        Data::Empty => Value::Null,
        Data::Int(int) => Value::Int(*int),
        Data::Float(float) => Value::Float(*float)
            .as_i64()
            .map_or(Value::Float(*float), Value::Int),
        Data::Bool(flag) => Value::Bool(*flag),
        Data::String(text) => Value::Text(text.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn header_name(index: usize, data: &Data) -> String {
    match data {
        Data::Empty => format!("Unnamed: {index}"),
        other => cell(other).to_string(),
    }
}

pub(super) fn read(path: &Utf8Path, sheet: Option<&str>) -> Result<Table, IoError> {
    let spreadsheet_error = |source| IoError::Spreadsheet {
        path: path.to_owned(),
        source: Box::new(source),
    };
    let mut workbook = open_workbook_auto(path.as_std_path()).map_err(spreadsheet_error)?;
    let name = if let Some(sheet) = sheet {
        sheet.to_owned()
    } else {
        let first = workbook
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| IoError::layout(path, "workbook has no worksheets"))?;
        warn!("no worksheet given for {path}; reading `{first}`");
        first
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(spreadsheet_error)?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Table::empty());
    };
    let header: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(index, data)| header_name(index, data))
        .collect();
    let body = rows
        .map(|row| row.iter().map(cell).collect())
        .collect();
    Ok(Table::from_rows(header, body)?)
}
