//! Per-path method dispatch.
//!
//! # Responsibilities
//! - Hold the method → handler table for one path
//! - Route a request to its method's handler
//! - Answer unregistered methods through the bad-method constructor
//!
//! # Design Decisions
//! - Registration overwrites: the last handler bound to a method wins
//! - Tables are populated during setup and only read while serving

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::routing::handler::SharedHandler;

/// Builds the response for a method the dispatcher does not know.
///
/// Receives the request and the methods that are registered on the path.
pub type BadMethodConstructor = Arc<dyn Fn(&Request<Body>, &[Method]) -> Response + Send + Sync>;

/// Maps HTTP methods to terminal handlers for a single path.
#[derive(Clone)]
pub struct MethodDispatcher {
    methods: HashMap<Method, SharedHandler>,
    bad_method: BadMethodConstructor,
}

impl MethodDispatcher {
    /// Create an empty dispatcher answering unknown methods with the invalid-method body.
    pub fn new() -> Self {
        Self::with_bad_method(Arc::new(invalid_method_response))
    }

    pub fn with_bad_method(bad_method: BadMethodConstructor) -> Self {
        Self {
            methods: HashMap::new(),
            bad_method,
        }
    }

    /// Bind `handler` to `method`, replacing any previous binding.
    pub fn register(&mut self, method: Method, handler: SharedHandler) {
        if self.methods.insert(method.clone(), handler).is_some() {
            tracing::debug!(method = %method, "Replaced existing method binding");
        }
    }

    /// Dispatch a request to the handler registered for its method.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        match self.methods.get(request.method()) {
            Some(handler) => handler.call(request).await,
            None => {
                let allowed = self.allowed_methods();
                (self.bad_method)(&request, &allowed)
            }
        }
    }

    pub fn handles(&self, method: &Method) -> bool {
        self.methods.contains_key(method)
    }

    pub fn handler(&self, method: &Method) -> Option<SharedHandler> {
        self.methods.get(method).cloned()
    }

    /// Registered methods in a stable order.
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.methods.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Default for MethodDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MethodDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDispatcher")
            .field("methods", &self.allowed_methods())
            .finish()
    }
}

/// Default bad-method response: 405 with an `Allow` header.
pub fn invalid_method_response(request: &Request<Body>, allowed: &[Method]) -> Response {
    tracing::info!(
        method = %request.method(),
        path = %request.uri().path(),
        "Method not allowed"
    );
    let mut response = ApiError::invalid_method().into_response();
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::shared;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn status_handler(status: StatusCode) -> SharedHandler {
        shared(move |_req: Request<Body>| async move { status.into_response() })
    }

    fn request(method: Method) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/v1/users")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn dispatches_to_registered_method() {
        let mut dispatcher = MethodDispatcher::new();
        dispatcher.register(Method::POST, status_handler(StatusCode::CREATED));
        dispatcher.register(Method::GET, status_handler(StatusCode::OK));

        assert_eq!(dispatcher.dispatch(request(Method::POST)).await.status(), StatusCode::CREATED);
        assert_eq!(dispatcher.dispatch(request(Method::GET)).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut dispatcher = MethodDispatcher::new();
        for status in [StatusCode::OK, StatusCode::ACCEPTED, StatusCode::CREATED] {
            dispatcher.register(Method::POST, status_handler(status));
        }

        assert_eq!(dispatcher.len(), 1);
        assert_eq!(dispatcher.dispatch(request(Method::POST)).await.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn unknown_method_uses_bad_method_constructor_only() {
        let handled = Arc::new(AtomicUsize::new(0));
        let bad = Arc::new(AtomicUsize::new(0));

        let counter = handled.clone();
        let handler = shared(move |_req: Request<Body>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK.into_response()
            }
        });

        let bad_counter = bad.clone();
        let bad_method = move |req: &Request<Body>, _allowed: &[Method]| {
            assert_eq!(*req.method(), Method::DELETE);
            bad_counter.fetch_add(1, Ordering::SeqCst);
            StatusCode::IM_A_TEAPOT.into_response()
        };
        let mut dispatcher = MethodDispatcher::with_bad_method(Arc::new(bad_method));
        dispatcher.register(Method::POST, handler);

        let response = dispatcher.dispatch(request(Method::DELETE)).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(bad.load(Ordering::SeqCst), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn default_bad_method_lists_allowed_methods() {
        let mut dispatcher = MethodDispatcher::new();
        dispatcher.register(Method::POST, status_handler(StatusCode::CREATED));
        dispatcher.register(Method::GET, status_handler(StatusCode::OK));

        let response = dispatcher.dispatch(request(Method::DELETE)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }
}
