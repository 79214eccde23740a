//! Network dispatch for built requests.
//!
//! # Design
//! `Transport` is the only seam with I/O behind it, which keeps everything
//! above it deterministic and lets tests substitute canned replies. One
//! invocation is exactly one HTTP GET; there are no hidden retries and no
//! caching. Retry policy belongs to the caller, because idempotency varies
//! per operation.

use std::time::Duration;

use tracing::debug;

use crate::error::RtmError;
use crate::request::Request;

/// The production service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.rememberthemilk.com/services/rest/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches a built request and returns the raw reply body.
pub trait Transport {
    fn send(&self, request: &Request) -> Result<String, RtmError>;
}

/// Blocking HTTP transport over ureq.
///
/// HTTP status codes are not interpreted here: the service reports failures
/// inside the response envelope, so the body is handed to the decoder as-is.
#[derive(Debug)]
pub struct HttpTransport {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpTransport {
    /// Transport against the production endpoint with the default timeout.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Transport against an alternate endpoint (tests point this at a local
    /// mock server).
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self::with_endpoint_and_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_endpoint_and_timeout(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            endpoint: endpoint.to_string(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<String, RtmError> {
        let url = request.url(&self.endpoint)?;
        debug!(method = request.params().get("method"), "dispatching request");
        let mut response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| RtmError::Transport(e.to_string()))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| RtmError::Transport(e.to_string()))
    }
}
