//! Composing signed and unsigned wire requests.
//!
//! # Design
//! A request's capability is a tagged union ([`RequestKind`]): plain requests
//! carry no credentials, signed requests carry the api key and a signature,
//! authenticated requests add the user token. The builder is a pure
//! function over an immutable `(api_key, shared_secret, token)` triple — no
//! I/O, no mutation of inputs — so multiple independent clients can coexist
//! in one process.

use url::Url;

use crate::error::RtmError;
use crate::method::Method;
use crate::params::Params;
use crate::sign::api_sig;
use crate::types::Token;

/// Reserved query key selecting the operation.
pub const METHOD_KEY: &str = "method";
/// Reserved query key carrying the application key.
pub const API_KEY_KEY: &str = "api_key";
/// Reserved query key carrying the user token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Reserved query key carrying the request signature; always the last
/// parameter rendered onto the outgoing URL.
pub const SIGNATURE_KEY: &str = "api_sig";
/// Reserved query key selecting the response format.
pub const FORMAT_KEY: &str = "format";

const FORMAT_JSON: &str = "json";

/// Keys the builder injects; caller parameters must not collide with these.
pub const RESERVED_KEYS: [&str; 5] =
    [METHOD_KEY, API_KEY_KEY, AUTH_TOKEN_KEY, SIGNATURE_KEY, FORMAT_KEY];

/// The immutable application credential pair shared by every request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub shared_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, shared_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            shared_secret: shared_secret.into(),
        }
    }
}

/// What credentials a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// No credentials at all.
    Plain,
    /// Api key plus signature, no user identity (time, reflection, auth flow).
    Signed,
    /// Api key, signature and user token (all user-data operations).
    Authenticated,
}

/// An immutable, ready-to-send request: final parameters, signature included
/// when the kind calls for one.
#[derive(Debug, Clone)]
pub struct Request {
    kind: RequestKind,
    params: Params,
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Render the request as a GET URL against `endpoint`. The signature,
    /// when present, is appended after every other parameter.
    pub fn url(&self, endpoint: &str) -> Result<Url, RtmError> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| RtmError::Config(format!("invalid endpoint {endpoint:?}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in self.params.to_ordered_pairs() {
                if name != SIGNATURE_KEY {
                    query.append_pair(name, value);
                }
            }
            if let Some(sig) = self.params.get(SIGNATURE_KEY) {
                query.append_pair(SIGNATURE_KEY, sig);
            }
        }
        Ok(url)
    }
}

/// Builds [`Request`] values from a fixed credential triple.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    credentials: Credentials,
    token: Option<Token>,
}

impl RequestBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials, token: None }
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Compose the final parameter set for `method` and sign it if the kind
    /// requires a signature. Reserved-key collisions and a missing token for
    /// an authenticated request are configuration errors; nothing has gone
    /// out on the wire when they are reported.
    pub fn build(
        &self,
        kind: RequestKind,
        method: Method,
        caller_params: Params,
    ) -> Result<Request, RtmError> {
        for key in RESERVED_KEYS {
            if caller_params.contains(key) {
                return Err(RtmError::Config(format!("caller parameter {key:?} is reserved")));
            }
        }

        let mut params = caller_params;
        params.insert(METHOD_KEY, method.wire_name());
        params.insert(API_KEY_KEY, self.credentials.api_key.as_str());
        params.insert(FORMAT_KEY, FORMAT_JSON);

        if kind == RequestKind::Authenticated {
            let token = self.token.as_ref().ok_or_else(|| {
                RtmError::Config(format!("{} requires an auth token", method.wire_name()))
            })?;
            params.insert(AUTH_TOKEN_KEY, token.as_str());
        }

        if kind != RequestKind::Plain {
            let sig = api_sig(&params, &self.credentials.shared_secret);
            params.insert(SIGNATURE_KEY, sig);
        }

        Ok(Request { kind, params })
    }
}
