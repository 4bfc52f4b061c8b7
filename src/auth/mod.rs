//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → credentials.rs (Sec-WebSocket-Protocol: "<id>-<key>")
//!     → Store::verify(id, key)
//!     → AuthResult { Error | Unauthenticated | Authenticated }
//!     → gate.rs (exactly one continuation)
//! ```
//!
//! # Design Decisions
//! - Missing or malformed credentials are "not authenticated", never an error
//! - Verifier failures are logged in full and answered with a generic body

pub mod credentials;
pub mod gate;

use axum::http::request::Parts;
use futures_util::future::BoxFuture;

use crate::store::{Identity, StoreError};

pub use credentials::{
    extract_credentials, parse_credentials, Credentials, HeaderAuthenticator, CREDENTIALS_HEADER,
};
pub use gate::{AuthGate, AuthenticatedHandler, ErrorContinuation, UnauthorizedContinuation};

/// Outcome of authenticating one request.
#[derive(Debug)]
pub enum AuthResult {
    /// The verifier itself failed.
    Error(StoreError),
    /// No usable credentials, or the store rejected them.
    Unauthenticated(String),
    /// The caller is known.
    Authenticated(Identity),
}

/// Classifies a request into an `AuthResult`.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate<'a>(&'a self, parts: &'a Parts) -> BoxFuture<'a, AuthResult>;
}
