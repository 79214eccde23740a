//! Error taxonomy shared by the request, transport, decoding and auth layers.
//!
//! # Design
//! Three wire-facing kinds plus one local kind, all disjoint:
//! - `Server` — the service understood the request and said no. Expected in
//!   normal operation (unknown id, expired frob, rate limit); carries the
//!   server's numeric code and message verbatim.
//! - `Protocol` — the reply violated the wire contract (unparseable body,
//!   missing fields, invariant breach). Fatal to the call, never retryable.
//! - `Transport` — network or timeout failure. Retryable at the caller's
//!   discretion; the library itself never retries.
//! - `Config` — programmer error caught before any I/O happens (reserved
//!   parameter collision, missing token, auth flow called out of order).

use thiserror::Error;

/// Errors surfaced by the RTM client core.
#[derive(Debug, Error)]
pub enum RtmError {
    /// The service reported a logical failure for this request.
    #[error("server error {code}: {msg}")]
    Server { code: i32, msg: String },

    /// The reply did not match the wire contract.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The network call itself failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The request could not be built; no network call was made.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RtmError {
    /// True only for failures a caller may reasonably retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RtmError::Transport(_))
    }

    /// The server-reported error code, if this is a server failure.
    pub fn server_code(&self) -> Option<i32> {
        match self {
            RtmError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}
