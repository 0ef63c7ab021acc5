//! Client for the REE open data API (`apidatos.ree.es`).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use pvstats_core::{Table, Value};
use serde_json::Value as JsonValue;
use url::Url;

use super::transport::ReeTransport;
use super::{ApiDate, ReeError};
use crate::io::json::from_json;

/// Default host of the REE data API.
pub const DEFAULT_DATA_HOST: &str = "apidatos.ree.es";

const DEMAND_CATEGORY: &str = "demanda";
const DEMAND_WIDGET: &str = "demanda-tiempo-real";
const DATETIME_COLUMN: &str = "datetime";

/// Build `https://{host}` unless `host` already names a scheme.
pub(crate) fn host_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_owned()
    } else {
        format!("https://{host}")
    }
}

pub(crate) fn parse_url(raw: String) -> Result<Url, ReeError> {
    Url::parse(&raw).map_err(|source| ReeError::Url { url: raw, source })
}

macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $error:ident {
            $($(#[$variant_meta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            /// Query-string spelling.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ReeError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ReeError::$error(other.to_owned())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum! {
    /// Time aggregation of the requested series.
    TimeTrunc, InvalidTimeTrunc {
        /// Hourly values.
        Hour => "hour",
        /// Daily values.
        Day => "day",
        /// Monthly values.
        Month => "month",
        /// Yearly values.
        Year => "year",
    }
}

keyword_enum! {
    /// Geographic aggregation of the requested series.
    GeoTrunc, InvalidGeoTrunc {
        /// Aggregate per electrical system.
        ElectricSystem => "electric_system",
    }
}

keyword_enum! {
    /// Electrical system the request is restricted to.
    GeoLimit, InvalidGeoLimit {
        /// Mainland system.
        Peninsular => "peninsular",
        /// Canary Islands.
        Canarias => "canarias",
        /// Balearic Islands.
        Baleares => "baleares",
        /// Ceuta.
        Ceuta => "ceuta",
        /// Melilla.
        Melilla => "melilla",
        /// Autonomous communities.
        Ccaa => "ccaa",
    }
}

/// Response language of the data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    /// Spanish.
    #[default]
    Es,
    /// English.
    En,
}

impl Language {
    /// Parse a language code, falling back to Spanish with a warning.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim() {
            "es" => Self::Es,
            "en" => Self::En,
            other => {
                warn!("language `{other}` not supported; using Spanish as default");
                Self::Es
            }
        }
    }

    /// Path segment used in the API URL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }
}

/// Parameters of a single data API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    /// First instant requested.
    pub start: ApiDate,
    /// Last instant requested.
    pub end: ApiDate,
    /// Time aggregation.
    pub time_trunc: TimeTrunc,
    /// Optional geographic aggregation.
    pub geo_trunc: Option<GeoTrunc>,
    /// Optional electrical system restriction.
    pub geo_limit: Option<GeoLimit>,
    /// Identifier of the restricted system; required with `geo_limit`.
    pub geo_ids: Option<u32>,
}

impl DataRequest {
    /// A request for `start .. end` aggregated by `time_trunc`.
    #[must_use]
    pub const fn new(start: ApiDate, end: ApiDate, time_trunc: TimeTrunc) -> Self {
        Self {
            start,
            end,
            time_trunc,
            geo_trunc: None,
            geo_limit: None,
            geo_ids: None,
        }
    }

    /// Aggregate geographically.
    #[must_use]
    pub const fn with_geo_trunc(mut self, geo_trunc: GeoTrunc) -> Self {
        self.geo_trunc = Some(geo_trunc);
        self
    }

    /// Restrict to an electrical system.
    #[must_use]
    pub const fn with_geo_limit(mut self, geo_limit: GeoLimit, geo_ids: Option<u32>) -> Self {
        self.geo_limit = Some(geo_limit);
        self.geo_ids = geo_ids;
        self
    }

    fn query_pairs(&self) -> Result<Vec<(&'static str, String)>, ReeError> {
        let mut pairs = vec![
            ("start_date", self.start.to_string()),
            ("end_date", self.end.to_string()),
            ("time_trunc", self.time_trunc.to_string()),
        ];
        if let Some(geo_trunc) = self.geo_trunc {
            pairs.push(("geo_trunc", geo_trunc.to_string()));
        }
        if let Some(geo_limit) = self.geo_limit {
            let geo_ids = self.geo_ids.ok_or_else(|| ReeError::MissingGeoIds {
                geo_limit: geo_limit.to_string(),
            })?;
            pairs.push(("geo_limit", geo_limit.to_string()));
            pairs.push(("geo_ids", geo_ids.to_string()));
        }
        Ok(pairs)
    }
}

/// Client for `https://{host}/{language}/datos`.
#[derive(Debug, Clone)]
pub struct ReeDataClient<T> {
    transport: T,
    base_url: String,
}

impl<T: ReeTransport> ReeDataClient<T> {
    /// Client against the default host in Spanish.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_host(transport, DEFAULT_DATA_HOST, Language::Es)
    }

    /// Client against `host` (a bare host name or a full origin).
    #[must_use]
    pub fn with_host(transport: T, host: &str, language: Language) -> Self {
        Self {
            transport,
            base_url: format!("{}/{}/datos", host_url(host), language.as_str()),
        }
    }

    /// Base URL requests are issued under.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Full request URL for `category/widget` with the query of `request`.
    ///
    /// # Errors
    ///
    /// Fails with [`ReeError::MissingGeoIds`] when a geo limit lacks ids, or
    /// [`ReeError::Url`] when the host does not form a valid URL.
    pub fn endpoint(
        &self,
        category: &str,
        widget: &str,
        request: &DataRequest,
    ) -> Result<Url, ReeError> {
        let pairs = request.query_pairs()?;
        let mut url = parse_url(format!("{}/{category}/{widget}", self.base_url))?;
        url.query_pairs_mut().extend_pairs(pairs);
        Ok(url)
    }

    /// Fetch the raw JSON document for `category/widget`.
    ///
    /// # Errors
    ///
    /// Propagates validation, transport and JSON decoding failures.
    pub async fn get_data(
        &self,
        category: &str,
        widget: &str,
        request: &DataRequest,
    ) -> Result<JsonValue, ReeError> {
        let url = self.endpoint(category, widget, request)?;
        debug!("requesting data from {url}");
        let body = self.transport.get(&url).await?;
        serde_json::from_str(&body).map_err(|source| ReeError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch real-time demand and parse it with [`parse_response`].
    ///
    /// # Errors
    ///
    /// Propagates the failures of [`Self::get_data`] and [`parse_response`].
    pub async fn get_demand(&self, request: &DataRequest) -> Result<Table, ReeError> {
        debug!(
            "getting demand data from {} to {} in {}",
            request.start, request.end, request.time_trunc
        );
        let data = self
            .get_data(DEMAND_CATEGORY, DEMAND_WIDGET, request)
            .await?;
        parse_response(&data)
    }
}

fn attribute<'a>(entry: &'a JsonValue, key: &str) -> Result<&'a JsonValue, ReeError> {
    entry
        .get("attributes")
        .and_then(|attributes| attributes.get(key))
        .ok_or_else(|| ReeError::UnexpectedPayload(format!("included entry lacks attributes.{key}")))
}

/// Pivot a data API document into one row per datetime.
///
/// Every entry of `included` becomes a column named by its
/// `attributes.title`; each `{datetime, value}` pair fills a cell. Rows follow
/// the first appearance of each datetime and missing cells are null.
///
/// # Errors
///
/// Returns [`ReeError::UnexpectedPayload`] when `included`, a title, or a
/// value's `datetime` is missing.
pub fn parse_response(data: &JsonValue) -> Result<Table, ReeError> {
    let included = data
        .get("included")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| ReeError::UnexpectedPayload("missing `included` array".to_owned()))?;

    let mut datetimes: Vec<String> = Vec::new();
    let mut row_of: HashMap<String, usize> = HashMap::new();
    let mut series: Vec<(String, HashMap<usize, Value>)> = Vec::new();

    for entry in included {
        let title = attribute(entry, "title")?
            .as_str()
            .ok_or_else(|| ReeError::UnexpectedPayload("title is not a string".to_owned()))?;
        let values = attribute(entry, "values")?
            .as_array()
            .ok_or_else(|| ReeError::UnexpectedPayload("values is not an array".to_owned()))?;
        let position = series
            .iter()
            .position(|(name, _)| name == title)
            .unwrap_or_else(|| {
                series.push((title.to_owned(), HashMap::new()));
                series.len() - 1
            });
        for point in values {
            let datetime = point
                .get("datetime")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| ReeError::UnexpectedPayload("value lacks a datetime".to_owned()))?;
            let row = *row_of.entry(datetime.to_owned()).or_insert_with(|| {
                datetimes.push(datetime.to_owned());
                datetimes.len() - 1
            });
            let value = point.get("value").map_or(Value::Null, from_json);
            if let Some((_, cells)) = series.get_mut(position) {
                cells.insert(row, value);
            }
        }
    }

    let height = datetimes.len();
    let mut columns = Vec::with_capacity(series.len() + 1);
    columns.push((
        DATETIME_COLUMN.to_owned(),
        datetimes.into_iter().map(Value::Text).collect(),
    ));
    for (title, mut cells) in series {
        let values = (0..height)
            .map(|row| cells.remove(&row).unwrap_or_default())
            .collect();
        columns.push((title, values));
    }
    Ok(Table::from_columns(columns)?)
}
