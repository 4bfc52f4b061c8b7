//! Mounting compiled routes on the HTTP router.
//!
//! # Responsibilities
//! - Register one catch-all-method route per compiled path
//! - Let each `MethodDispatcher` decide how to answer the verb
//! - Answer unknown paths with the JSON not-found body
//!
//! # Design Decisions
//! - Immutable after construction (dispatchers shared via `Arc`, no locks)
//! - Method filtering happens in the dispatcher, never in the HTTP router

use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};

use crate::http::response::ApiError;
use crate::routing::tree::CompiledRoutes;

impl CompiledRoutes {
    /// Convert the compiled table into an axum router.
    pub fn into_router(self) -> Router {
        let mut router = Router::new();
        for (path, dispatcher) in self.into_inner() {
            let dispatcher = Arc::new(dispatcher);
            router = router.route(
                &path,
                any(move |request: Request<Body>| {
                    let dispatcher = Arc::clone(&dispatcher);
                    async move { dispatcher.dispatch(request).await }
                }),
            );
        }
        router.fallback(not_found)
    }
}

async fn not_found(request: Request<Body>) -> Response {
    tracing::debug!(path = %request.uri().path(), "No route matched");
    ApiError::not_found().into_response()
}
