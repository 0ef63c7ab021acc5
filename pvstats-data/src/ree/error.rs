//! Error types produced by the REE API clients.

use std::io;

use pvstats_core::TableError;
use thiserror::Error;

use crate::io::IoError;

/// Errors produced while building requests, calling the REE APIs or parsing
/// their responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReeError {
    /// The input is not an ISO-8601 date or date-time.
    #[error("invalid date `{input}`; expected ISO-8601 such as 2022-01-01T00:00")]
    InvalidDate {
        /// Rejected input.
        input: String,
    },
    /// The requested range cannot be split into request windows.
    #[error("invalid date range {start} .. {end}: {reason}")]
    InvalidRange {
        /// Range start as given.
        start: String,
        /// Range end as given.
        end: String,
        /// Why the range was rejected.
        reason: &'static str,
    },
    /// Time aggregation other than hour, day, month or year.
    #[error("time trunc must be hour, day, month or year, got `{0}`")]
    InvalidTimeTrunc(String),
    /// Geographic aggregation other than `electric_system`.
    #[error("geo trunc must be electric_system, got `{0}`")]
    InvalidGeoTrunc(String),
    /// Unknown electrical system.
    #[error("geo limit must be peninsular, canarias, baleares, ceuta, melilla or ccaa, got `{0}`")]
    InvalidGeoLimit(String),
    /// A geo limit was requested without the matching geo ids.
    #[error("geo limit `{geo_limit}` requires geo ids")]
    MissingGeoIds {
        /// Geo limit that was requested.
        geo_limit: String,
    },
    /// A URL could not be assembled from the configured host.
    #[error("invalid request URL `{url}`: {source}")]
    Url {
        /// URL text that failed to parse.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },
    /// The JSONP body has no callback parentheses around the payload.
    #[error("response from {url} is not JSONP")]
    MalformedJsonp {
        /// Request URL.
        url: String,
    },
    /// The response body is not valid JSON.
    #[error("invalid JSON from {url}: {source}")]
    Json {
        /// Request URL.
        url: String,
        /// Parser error.
        source: serde_json::Error,
    },
    /// The JSON payload lacks the expected structure.
    #[error("unexpected response payload: {0}")]
    UnexpectedPayload(String),
    /// The HTTP request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Assembling the result table failed.
    #[error(transparent)]
    Table(#[from] TableError),
    /// Saving the result failed.
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
        message: String,
    },
    /// The request failed before a status was received.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
}
