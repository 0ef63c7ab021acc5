//! HTTP transport shared by the REE clients.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use super::{ReeError, TransportError};

/// Default user agent for REE requests.
pub const DEFAULT_USER_AGENT: &str = "pv-stats/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of raw response bodies for REE requests.
///
/// The clients only ever issue JSON `GET` requests, so a transport maps a
/// fully built URL to the body text.
#[async_trait(?Send)]
pub trait ReeTransport {
    /// Fetch `url` and return the body of a successful response.
    async fn get(&self, url: &Url) -> Result<String, TransportError>;
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpTransportConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// `reqwest`-backed [`ReeTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReeError::HttpClient`] when the HTTP client fails to build.
    pub fn new() -> Result<Self, ReeError> {
        Self::with_config(&HttpTransportConfig::default())
    }

    /// Build a transport with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReeError::HttpClient`] when the HTTP client fails to build.
    pub fn with_config(config: &HttpTransportConfig) -> Result<Self, ReeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ReeError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl ReeTransport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url.as_str()))?;
        info!("request status code: {}", response.status().as_u16());
        response
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url.as_str()))?
            .text()
            .await
            .map_err(|err| convert_reqwest_error(err, url.as_str()))
    }
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn config_builder_pattern() {
        let config = HttpTransportConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    fn default_transport_builds() {
        assert!(HttpTransport::new().is_ok());
    }
}
