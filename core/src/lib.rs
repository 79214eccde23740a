//! Synchronous client core for the Remember The Milk REST service.
//!
//! # Overview
//! Everything between "I want to complete this task" and the single HTTP GET
//! that does it: parameter assembly, request signing, the three-legged
//! authentication flow, dispatch, and decoding of the JSON response envelope
//! into typed values.
//!
//! # Design
//! - `RtmClient` is stateless per call — one operation is at most one
//!   round trip, and nothing retries implicitly.
//! - The layers compose strictly downward: `client` over `request`/`response`
//!   over `sign`/`params`, with `transport` as the only seam doing I/O.
//! - Failures are one enum, [`RtmError`], split by who is at fault: the
//!   server, the wire, the network, or the caller's configuration.
//! - Wire quirks (string booleans, empty-string-for-absent dates) are
//!   normalized at the decoding boundary so `types` stays clean.

pub mod auth;
pub mod client;
pub mod dates;
pub mod error;
pub mod method;
pub mod params;
pub mod request;
pub mod response;
pub mod sign;
pub mod transport;
pub mod types;

pub use auth::{AuthState, Authenticator, AUTH_ENDPOINT};
pub use client::{PriorityDirection, RtmClient};
pub use dates::WireDate;
pub use error::RtmError;
pub use method::Method;
pub use params::Params;
pub use request::{Credentials, Request, RequestBuilder, RequestKind};
pub use response::Response;
pub use sign::api_sig;
pub use transport::{HttpTransport, Transport, DEFAULT_ENDPOINT};
pub use types::{
    Auth, Contact, DeletedTask, Frob, Group, Location, MethodArgument, MethodInfo, Note,
    Permission, Priority, Settings, SynchedTasks, Task, TaskList, TaskRef, Timezone, Token, User,
};
