//! Clients for the REE (Red Eléctrica de España) statistics APIs.
//!
//! Two services are covered:
//!
//! - the open data API (`apidatos.ree.es`), queried through
//!   [`ReeDataClient`] with date ranges split by [`throttle_request_dates`];
//! - the demand and generation service (`demanda.ree.es`), queried one day at
//!   a time through [`ReeDemandaClient`].
//!
//! Both clients are generic over [`ReeTransport`]; [`HttpTransport`] issues
//! the real requests and `test_support::StubTransport` replays canned bodies.

mod data_api;
mod dates;
mod demanda_api;
mod error;
mod retrieve;
mod transport;

#[doc(hidden)]
pub mod test_support;

pub use data_api::{
    DEFAULT_DATA_HOST, DataRequest, GeoLimit, GeoTrunc, Language, ReeDataClient, TimeTrunc,
    parse_response,
};
pub use dates::{ApiDate, DateWindow, parse_date, throttle_request_dates};
pub use demanda_api::{
    DEFAULT_DEMANDA_HOST, GENERATION_CATEGORY, ReeDemandaClient, default_generation_mapping,
    parse_generation_response, parse_timestamp, strip_jsonp,
};
pub use error::{ReeError, TransportError};
pub use retrieve::{resolve_output_path, retrieve_demand, retrieve_generation, save_series};
pub use transport::{DEFAULT_USER_AGENT, HttpTransport, HttpTransportConfig, ReeTransport};

/// Default upper bound on the days covered by one data API request.
pub const DEFAULT_MAX_DAYS_PER_REQUEST: u32 = 31;
