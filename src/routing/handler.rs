//! Terminal handler abstraction.

use std::future::Future;
use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};
use futures_util::future::BoxFuture;

/// A leaf that produces the response for one method on one path.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: Request<Body>) -> BoxFuture<'static, Response>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin(self(request))
    }
}

/// Shared, type-erased handler.
pub type SharedHandler = Arc<dyn Handler>;

/// Erase a handler's concrete type.
pub fn shared<H: Handler>(handler: H) -> SharedHandler {
    Arc::new(handler)
}
