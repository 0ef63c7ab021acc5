//! Client for the REE demand and generation service (`demanda.ree.es`).
//!
//! The service answers in JSONP: the JSON document is wrapped in a call to
//! the `callback` named in the query.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use pvstats_core::{Table, Value};
use serde_json::Value as JsonValue;
use url::Url;

use super::data_api::{host_url, parse_url};
use super::transport::ReeTransport;
use super::{ReeError, parse_date};
use crate::io::json::table_from_objects;

/// Default host of the demand and generation service.
pub const DEFAULT_DEMANDA_HOST: &str = "demanda.ree.es";

/// Category holding hourly generation per technology.
pub const GENERATION_CATEGORY: &str = "demandaGeneracionPeninsula";

const RESOURCES_PATH: &str = "WSvisionaMovilesPeninsulaRest/resources";
const JSONP_CALLBACK: &str = "angular.callbacks._0";
const ROWS_KEY: &str = "valoresHorariosGeneracion";
const TIMESTAMP_COLUMN: &str = "ts";
const DATE_COLUMN: &str = "Fecha";

/// Default renaming of the generation technology codes.
#[must_use]
pub fn default_generation_mapping() -> BTreeMap<String, String> {
    [
        ("dem", "Demanda"),
        ("eol", "Eólica"),
        ("nuc", "Nuclear"),
        ("car", "Carbón"),
        ("cc", "Ciclo combinado"),
        ("hid", "Hidráulica"),
        ("sol", "Solar"),
        ("solFot", "Solar fotovoltaica"),
        ("solTer", "Solar térmica"),
        ("termRenov", "Térmica renovable"),
        ("cogenResto", "Cogeneración y residuos"),
        ("inter", "Intercambios internacionales"),
        ("icb", "Enlace balear"),
        ("aut", "Régimen especial"),
        ("gf", "Generación auxiliar"),
    ]
    .into_iter()
    .map(|(code, name)| (code.to_owned(), name.to_owned()))
    .collect()
}

/// Extract the JSON between the first `(` and the last `)` of a JSONP body.
#[must_use]
pub fn strip_jsonp(body: &str) -> Option<&str> {
    let open = body.find('(')?;
    let close = body.rfind(')')?;
    body.get(open + 1..close)
}

/// Parse a generation timestamp.
///
/// On the night clocks go back the service labels the repeated hour `2A`
/// and `2B`; both map to 02:00.
///
/// # Errors
///
/// Returns [`ReeError::InvalidDate`] when the text is not a timestamp even
/// after that substitution.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, ReeError> {
    parse_date(text)
        .or_else(|_| parse_date(&text.replace("2A", "02").replace("2B", "02")))
        .map(|date| date.local())
}

/// Build a table from a generation document.
///
/// Adds a `Fecha` column parsed from `ts`, keeps the rows dated
/// `desired_date` (the service pads the day with neighbouring hours) and
/// renames columns through `mapping`.
///
/// # Errors
///
/// Fails when the rows are missing, a timestamp cannot be parsed, or the
/// table cannot be assembled.
pub fn parse_generation_response(
    data: &JsonValue,
    desired_date: NaiveDate,
    mapping: &BTreeMap<String, String>,
) -> Result<Table, ReeError> {
    let rows = data
        .get(ROWS_KEY)
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ReeError::UnexpectedPayload(format!("missing `{ROWS_KEY}` array")))?;
    let objects = rows
        .iter()
        .map(|row| {
            row.as_object()
                .ok_or_else(|| ReeError::UnexpectedPayload("generation row is not an object".to_owned()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut table = table_from_objects(objects)?;

    let timestamps = table
        .column(TIMESTAMP_COLUMN)?
        .iter()
        .map(|value| {
            let text = value.as_str().ok_or_else(|| {
                ReeError::UnexpectedPayload(format!("`{TIMESTAMP_COLUMN}` is not text: {value:?}"))
            })?;
            parse_timestamp(text)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let keep: Vec<bool> = timestamps
        .iter()
        .map(|timestamp| timestamp.date() == desired_date)
        .collect();
    table.push_column(
        DATE_COLUMN,
        timestamps
            .iter()
            .map(|timestamp| Value::Text(timestamp.format("%Y-%m-%d %H:%M:%S").to_string()))
            .collect(),
    )?;
    let mut table = table.filter(&keep)?;
    table.rename(mapping)?;
    Ok(table)
}

/// Client for `https://{host}/WSvisionaMovilesPeninsulaRest/resources`.
#[derive(Debug, Clone)]
pub struct ReeDemandaClient<T> {
    transport: T,
    base_url: String,
    mapping: BTreeMap<String, String>,
}

impl<T: ReeTransport> ReeDemandaClient<T> {
    /// Client against the default host with the default generation mapping.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_host(transport, DEFAULT_DEMANDA_HOST)
    }

    /// Client against `host` (a bare host name or a full origin).
    #[must_use]
    pub fn with_host(transport: T, host: &str) -> Self {
        Self {
            transport,
            base_url: format!("{}/{RESOURCES_PATH}", host_url(host)),
            mapping: default_generation_mapping(),
        }
    }

    /// Replace the column renaming applied to generation tables.
    #[must_use]
    pub fn with_generation_mapping(mut self, mapping: BTreeMap<String, String>) -> Self {
        self.mapping = mapping;
        self
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Full request URL for `category` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ReeError::Url`] when the host does not form a valid URL.
    pub fn endpoint(&self, category: &str, date: NaiveDate, geo_limit: &str) -> Result<Url, ReeError> {
        let mut url = parse_url(format!("{}/{category}", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("callback", JSONP_CALLBACK)
            .append_pair("fecha", &date.format("%Y-%m-%d").to_string())
            .append_pair("curva", geo_limit);
        Ok(url)
    }

    /// Fetch and unwrap the JSONP document for `category`.
    ///
    /// # Errors
    ///
    /// Propagates transport failures; fails with
    /// [`ReeError::MalformedJsonp`] or [`ReeError::Json`] on bad bodies.
    pub async fn get_data(
        &self,
        category: &str,
        date: NaiveDate,
        geo_limit: &str,
    ) -> Result<JsonValue, ReeError> {
        let url = self.endpoint(category, date, geo_limit)?;
        debug!("requesting data from {url}");
        let body = self.transport.get(&url).await?;
        let json = strip_jsonp(&body).ok_or_else(|| ReeError::MalformedJsonp {
            url: url.to_string(),
        })?;
        serde_json::from_str(json).map_err(|source| ReeError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// Hourly generation for `date` in `geo_limit` (e.g. `NACIONAL`).
    ///
    /// # Errors
    ///
    /// Propagates the failures of [`Self::get_data`] and
    /// [`parse_generation_response`].
    pub async fn get_generation(&self, date: NaiveDate, geo_limit: &str) -> Result<Table, ReeError> {
        debug!("getting generation data for {date} in {geo_limit}");
        let data = self.get_data(GENERATION_CATEGORY, date, geo_limit).await?;
        parse_generation_response(&data, date, &self.mapping)
    }
}
