//! Multi-request retrieval of REE series and their CSV output.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use log::info;
use pvstats_core::Table;

use super::data_api::{DataRequest, ReeDataClient, TimeTrunc};
use super::demanda_api::ReeDemandaClient;
use super::transport::ReeTransport;
use super::{ApiDate, ReeError, throttle_request_dates};
use crate::io::{IoError, write_table_csv};

/// Retrieve demand for `start .. end`, one request per throttled window.
///
/// Requests are issued sequentially and their tables stacked in order.
///
/// # Errors
///
/// Fails on an invalid range or on the first failing request.
pub async fn retrieve_demand<T: ReeTransport>(
    client: &ReeDataClient<T>,
    start: ApiDate,
    end: ApiDate,
    time_trunc: TimeTrunc,
    max_days: u32,
) -> Result<Table, ReeError> {
    info!("retrieving demand data from REE API from {start} to {end}");
    let windows = throttle_request_dates(start, end, max_days)?;
    let mut tables = Vec::with_capacity(windows.len());
    for window in windows {
        let request = DataRequest::new(window.start, window.end, time_trunc);
        tables.push(client.get_demand(&request).await?);
    }
    Ok(Table::concat(&tables))
}

/// Retrieve generation for every calendar day from `start` to `end`
/// inclusive, one request per day.
///
/// # Errors
///
/// Fails when `end` precedes `start` or on the first failing request.
pub async fn retrieve_generation<T: ReeTransport>(
    client: &ReeDemandaClient<T>,
    start: NaiveDate,
    end: NaiveDate,
    geo_limit: &str,
) -> Result<Table, ReeError> {
    if end < start {
        return Err(ReeError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
            reason: "the end precedes the start",
        });
    }
    info!("retrieving generation data from REE demand API from {start} to {end}");
    let mut tables = Vec::new();
    for day in start.iter_days().take_while(|day| *day <= end) {
        tables.push(client.get_generation(day, geo_limit).await?);
    }
    Ok(Table::concat(&tables))
}

/// Resolve where a retrieved series is written.
///
/// An existing directory receives `{prefix}_{YYYYMMDD}_{YYYYMMDD}.csv`; any
/// other path is used as given. Parent directories are created.
///
/// # Errors
///
/// Fails when the parent directory cannot be created.
pub fn resolve_output_path(
    save_path: &Utf8Path,
    prefix: &str,
    start: &ApiDate,
    end: &ApiDate,
) -> Result<Utf8PathBuf, ReeError> {
    let path = if pvstats_fs::is_dir(save_path) {
        save_path.join(format!(
            "{prefix}_{}_{}.csv",
            start.compact_date(),
            end.compact_date()
        ))
    } else {
        save_path.to_owned()
    };
    pvstats_fs::ensure_parent_dir(&path).map_err(|source| IoError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write a retrieved series as CSV to [`resolve_output_path`].
///
/// # Errors
///
/// Fails when the path cannot be prepared or the file cannot be written.
pub fn save_series(
    table: &Table,
    save_path: &Utf8Path,
    prefix: &str,
    start: &ApiDate,
    end: &ApiDate,
) -> Result<Utf8PathBuf, ReeError> {
    let path = resolve_output_path(save_path, prefix, start, end)?;
    write_table_csv(&path, table)?;
    info!("saved {} rows to {path}", table.height());
    Ok(path)
}
