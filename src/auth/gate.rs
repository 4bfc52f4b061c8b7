//! Authentication gate middleware.
//!
//! # Responsibilities
//! - Authenticate each request exactly once
//! - Branch to exactly one of: error, unauthorized, wrapped handler
//! - Keep verifier failures out of response bodies
//!
//! # Design Decisions
//! - Continuations are plain values so tests and callers can replace them
//! - Only the authenticated branch ever reaches the wrapped handler

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

use crate::auth::{AuthResult, Authenticator};
use crate::http::request::RequestIdExt;
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::routing::handler::Handler;
use crate::store::{Identity, StoreError};

/// A terminal handler that needs a verified identity.
pub trait AuthenticatedHandler: Send + Sync + 'static {
    fn call(&self, request: Request<Body>, identity: Identity) -> BoxFuture<'static, Response>;
}

impl<F, Fut> AuthenticatedHandler for F
where
    F: Fn(Request<Body>, Identity) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request<Body>, identity: Identity) -> BoxFuture<'static, Response> {
        Box::pin(self(request, identity))
    }
}

/// Produces the response when the verifier itself fails.
pub type ErrorContinuation = Arc<dyn Fn(&StoreError) -> Response + Send + Sync>;

/// Produces the response when no valid credentials were supplied.
pub type UnauthorizedContinuation = Arc<dyn Fn(&str) -> Response + Send + Sync>;

/// Wraps a handler so it only runs for authenticated requests.
#[derive(Clone)]
pub struct AuthGate {
    authenticator: Arc<dyn Authenticator>,
    on_error: ErrorContinuation,
    on_unauthorized: UnauthorizedContinuation,
    handler: Arc<dyn AuthenticatedHandler>,
}

impl AuthGate {
    pub fn new<H: AuthenticatedHandler>(authenticator: Arc<dyn Authenticator>, handler: H) -> Self {
        Self {
            authenticator,
            on_error: Arc::new(|_err: &StoreError| ApiError::server_error().into_response()),
            on_unauthorized: Arc::new(|_reason: &str| ApiError::unauthorized().into_response()),
            handler: Arc::new(handler),
        }
    }

    pub fn on_error(mut self, continuation: ErrorContinuation) -> Self {
        self.on_error = continuation;
        self
    }

    pub fn on_unauthorized(mut self, continuation: UnauthorizedContinuation) -> Self {
        self.on_unauthorized = continuation;
        self
    }

    /// Authenticate `request` and run exactly one continuation.
    pub async fn serve(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        let outcome = self.authenticator.authenticate(&parts).await;
        let request = Request::from_parts(parts, body);
        let request_id = request.request_id().to_owned();

        match outcome {
            AuthResult::Error(err) => {
                tracing::error!(
                    request_id = %request_id,
                    path = %request.uri().path(),
                    error = %err,
                    "Error during authentication"
                );
                metrics::record_auth("error");
                (self.on_error)(&err)
            }
            AuthResult::Unauthenticated(reason) => {
                tracing::info!(
                    request_id = %request_id,
                    path = %request.uri().path(),
                    reason = %reason,
                    "Request not authenticated"
                );
                metrics::record_auth("unauthenticated");
                (self.on_unauthorized)(&reason)
            }
            AuthResult::Authenticated(identity) => {
                tracing::info!(
                    request_id = %request_id,
                    identity = %identity.id,
                    "Agent authenticated"
                );
                metrics::record_auth("authenticated");
                self.handler.call(request, identity).await
            }
        }
    }
}

impl Handler for AuthGate {
    fn call(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let gate = self.clone();
        Box::pin(async move { gate.serve(request).await })
    }
}
