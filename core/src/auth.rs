//! The three-legged authentication flow.
//!
//! # Design
//! `Unauthenticated → FrobIssued → TokenObtained`, driven at runtime so a
//! caller can retry the transition that failed without restarting the whole
//! flow. The browser-authorization leg between frob and token is the
//! caller's job; this module only constructs the URL for it. A server
//! failure leaves the machine in the last state it reached; a transport
//! failure while issuing the frob resets to the start, since there is no way
//! to know whether the server minted one.

use tracing::debug;

use crate::error::RtmError;
use crate::params::Params;
use crate::request::{Credentials, RequestBuilder, RequestKind, SIGNATURE_KEY};
use crate::response::Response;
use crate::sign::api_sig;
use crate::method::Method;
use crate::transport::{HttpTransport, Transport};
use crate::types::{Auth, Frob, Permission, Token};

/// Where the user's browser is sent to authorize a frob.
pub const AUTH_ENDPOINT: &str = "https://www.rememberthemilk.com/services/auth/";

/// Progress through the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    FrobIssued(Frob),
    /// Terminal for this flow instance. A token the server later rejects
    /// means starting over with a fresh `Authenticator`.
    TokenObtained(Token),
}

/// Drives the frob → authorize → token exchange.
#[derive(Debug)]
pub struct Authenticator<T = HttpTransport> {
    credentials: Credentials,
    transport: T,
    auth_endpoint: String,
    state: AuthState,
}

impl Authenticator<HttpTransport> {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_transport(credentials, HttpTransport::new())
    }
}

impl<T: Transport> Authenticator<T> {
    pub fn with_transport(credentials: Credentials, transport: T) -> Self {
        Self {
            credentials,
            transport,
            auth_endpoint: AUTH_ENDPOINT.to_string(),
            state: AuthState::Unauthenticated,
        }
    }

    /// Override the browser-authorization endpoint (tests).
    pub fn with_auth_endpoint(mut self, endpoint: &str) -> Self {
        self.auth_endpoint = endpoint.to_string();
        self
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Ask the server for a frob. On success the flow moves to
    /// `FrobIssued`; any failure leaves it at `Unauthenticated`.
    pub fn issue_frob(&mut self) -> Result<Frob, RtmError> {
        self.state = AuthState::Unauthenticated;
        let request = self
            .builder()
            .build(RequestKind::Signed, Method::AuthGetFrob, Params::new())?;
        let body = self.transport.send(&request)?;
        let frob = Response::decode(&body)?.frob()?;
        debug!(frob = frob.as_str(), "frob issued");
        self.state = AuthState::FrobIssued(frob.clone());
        Ok(frob)
    }

    /// The URL the end user must visit to authorize the issued frob at the
    /// requested permission level. Requires `FrobIssued`.
    pub fn auth_url(&self, perms: Permission) -> Result<String, RtmError> {
        let AuthState::FrobIssued(frob) = &self.state else {
            return Err(RtmError::Config(
                "authorization URL requires an issued frob".into(),
            ));
        };
        let mut params = Params::new();
        params.insert("api_key", self.credentials.api_key.as_str());
        params.insert("perms", perms.as_param());
        params.insert("frob", frob.as_str());
        let sig = api_sig(&params, &self.credentials.shared_secret);

        let mut url = url::Url::parse(&self.auth_endpoint)
            .map_err(|e| RtmError::Config(format!("invalid auth endpoint: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params.to_ordered_pairs() {
                query.append_pair(name, value);
            }
            query.append_pair(SIGNATURE_KEY, &sig);
        }
        Ok(url.into())
    }

    /// Trade the authorized frob for a durable token. Requires a frob; a
    /// server failure (not yet authorized, frob expired) keeps the frob so
    /// the exchange can be retried after the user finishes authorizing.
    pub fn exchange_token(&mut self) -> Result<Token, RtmError> {
        let frob = match &self.state {
            AuthState::FrobIssued(frob) => frob.clone(),
            AuthState::Unauthenticated => {
                return Err(RtmError::Config("token exchange requires an issued frob".into()));
            }
            AuthState::TokenObtained(_) => {
                return Err(RtmError::Config("token already obtained".into()));
            }
        };
        let mut params = Params::new();
        params.insert("frob", frob.as_str());
        let request = self
            .builder()
            .build(RequestKind::Signed, Method::AuthGetToken, params)?;
        let body = self.transport.send(&request)?;
        let auth = Response::decode(&body)?.auth()?;
        debug!(user = auth.user.username.as_str(), "token obtained");
        self.state = AuthState::TokenObtained(auth.token.clone());
        Ok(auth.token)
    }

    /// Verify a stored token is still accepted by the server. Stateless with
    /// respect to the flow; the caller decides whether to restart on failure.
    pub fn check_token(&self, token: &Token) -> Result<Auth, RtmError> {
        let request = self
            .builder()
            .with_token(token.clone())
            .build(RequestKind::Authenticated, Method::AuthCheckToken, Params::new())?;
        let body = self.transport.send(&request)?;
        Response::decode(&body)?.auth()
    }

    fn builder(&self) -> RequestBuilder {
        RequestBuilder::new(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::request::Request;

    /// Transport stub returning a scripted sequence of outcomes.
    struct Script {
        replies: RefCell<Vec<Result<String, RtmError>>>,
        calls: RefCell<u32>,
    }

    impl Script {
        fn new(replies: Vec<Result<String, RtmError>>) -> Self {
            Self { replies: RefCell::new(replies), calls: RefCell::new(0) }
        }

        fn calls(&self) -> u32 {
            *self.calls.borrow()
        }
    }

    impl Transport for &Script {
        fn send(&self, _request: &Request) -> Result<String, RtmError> {
            *self.calls.borrow_mut() += 1;
            self.replies.borrow_mut().remove(0)
        }
    }

    fn creds() -> Credentials {
        Credentials::new("abc123", "s3cr3t")
    }

    const FROB_OK: &str = r#"{"rsp":{"stat":"ok","frob":"frob-1"}}"#;
    const TOKEN_OK: &str = r#"{"rsp":{"stat":"ok","auth":{
        "token":"tok-1","perms":"delete",
        "user":{"id":"1","username":"bob"}}}}"#;
    const NOT_AUTHORIZED: &str =
        r#"{"rsp":{"stat":"fail","err":{"code":"101","msg":"Invalid frob - did you authenticate?"}}}"#;

    #[test]
    fn exchange_before_frob_is_a_state_error_with_no_network_call() {
        let script = Script::new(vec![]);
        let mut flow = Authenticator::with_transport(creds(), &script);
        let err = flow.exchange_token().unwrap_err();
        assert!(matches!(err, RtmError::Config(_)));
        assert_eq!(script.calls(), 0);
        assert_eq!(*flow.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn frob_then_token_reaches_the_terminal_state() {
        let script = Script::new(vec![Ok(FROB_OK.into()), Ok(TOKEN_OK.into())]);
        let mut flow = Authenticator::with_transport(creds(), &script);

        let frob = flow.issue_frob().unwrap();
        assert_eq!(frob.as_str(), "frob-1");
        assert_eq!(*flow.state(), AuthState::FrobIssued(Frob::new("frob-1")));

        let token = flow.exchange_token().unwrap();
        assert!(!token.as_str().is_empty());
        assert_eq!(*flow.state(), AuthState::TokenObtained(Token::new("tok-1")));
        assert_eq!(script.calls(), 2);
    }

    #[test]
    fn server_failure_during_exchange_keeps_the_frob_for_retry() {
        let script = Script::new(vec![
            Ok(FROB_OK.into()),
            Ok(NOT_AUTHORIZED.into()),
            Ok(TOKEN_OK.into()),
        ]);
        let mut flow = Authenticator::with_transport(creds(), &script);
        flow.issue_frob().unwrap();

        let err = flow.exchange_token().unwrap_err();
        assert_eq!(err.server_code(), Some(101));
        assert_eq!(*flow.state(), AuthState::FrobIssued(Frob::new("frob-1")));

        // Retrying the same transition succeeds once the user has authorized.
        flow.exchange_token().unwrap();
        assert_eq!(*flow.state(), AuthState::TokenObtained(Token::new("tok-1")));
    }

    #[test]
    fn transport_failure_during_frob_issue_resets_the_flow() {
        let script = Script::new(vec![Err(RtmError::Transport("timed out".into()))]);
        let mut flow = Authenticator::with_transport(creds(), &script);
        let err = flow.issue_frob().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(*flow.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn server_failure_during_frob_issue_stays_unauthenticated() {
        let script = Script::new(vec![Ok(
            r#"{"rsp":{"stat":"fail","err":{"code":"100","msg":"Invalid API Key"}}}"#.into(),
        )]);
        let mut flow = Authenticator::with_transport(creds(), &script);
        let err = flow.issue_frob().unwrap_err();
        assert_eq!(err.server_code(), Some(100));
        assert_eq!(*flow.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn auth_url_requires_a_frob_and_signs_its_parameters() {
        let script = Script::new(vec![Ok(FROB_OK.into())]);
        let mut flow = Authenticator::with_transport(creds(), &script);
        assert!(matches!(flow.auth_url(Permission::Delete), Err(RtmError::Config(_))));

        flow.issue_frob().unwrap();
        let url = flow.auth_url(Permission::Delete).unwrap();
        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("api_key=abc123"));
        assert!(url.contains("perms=delete"));
        assert!(url.contains("frob=frob-1"));
        assert!(url.contains("api_sig="));
    }

    #[test]
    fn check_token_round_trips_the_auth_payload() {
        let script = Script::new(vec![Ok(TOKEN_OK.into())]);
        let flow = Authenticator::with_transport(creds(), &script);
        let auth = flow.check_token(&Token::new("tok-1")).unwrap();
        assert_eq!(auth.token, Token::new("tok-1"));
        assert_eq!(auth.perms, Permission::Delete);
    }
}
