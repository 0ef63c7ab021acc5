//! Shared fixtures for REE client tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;

use async_trait::async_trait;
use url::Url;

use super::{ReeTransport, TransportError};

/// Stub [`ReeTransport`] replaying queued bodies and recording requests.
///
/// Once the queue is exhausted every request fails with a 404.
#[derive(Debug, Default)]
pub struct StubTransport {
    responses: RefCell<VecDeque<Result<String, TransportError>>>,
    requests: RefCell<Vec<Url>>,
}

impl StubTransport {
    /// Queue a successful response body.
    #[must_use]
    pub fn with_body(self, body: impl Into<String>) -> Self {
        self.responses.borrow_mut().push_back(Ok(body.into()));
        self
    }

    /// Queue a transport failure.
    #[must_use]
    pub fn with_error(self, error: TransportError) -> Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Url> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ReeTransport for StubTransport {
    async fn get(&self, url: &Url) -> Result<String, TransportError> {
        self.requests.borrow_mut().push(url.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Http {
                    url: url.to_string(),
                    status: 404,
                    message: "no stubbed response".to_owned(),
                })
            })
    }
}

/// Drive `future` to completion on a current-thread runtime.
///
/// # Panics
///
/// Panics when the runtime cannot be built.
#[expect(
    clippy::expect_used,
    reason = "test helper; a runtime that cannot start is a broken environment"
)]
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime should build")
        .block_on(future)
}
