//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the compiled routes on an Axum router
//! - Wire up middleware (tracing, limits, request ID, metrics)
//! - Normalise trailing slashes before routing
//! - Serve on a bound listener until the shutdown future resolves

use std::future::Future;
use std::time::Duration;

use axum::{extract::Request, middleware, Router};
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    limit::RequestBodyLimitLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;
use crate::routing::CompiledRoutes;

/// HTTP front end serving a compiled route table.
pub struct HttpServer {
    app: NormalizePath<Router>,
}

impl HttpServer {
    pub fn new(routes: CompiledRoutes, config: &ListenerConfig) -> Self {
        let router = Self::build_router(routes, config);
        Self {
            app: NormalizePathLayer::trim_trailing_slash().layer(router),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(routes: CompiledRoutes, config: &ListenerConfig) -> Router {
        routes
            .into_router()
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The full service, for in-process use.
    pub fn app(&self) -> NormalizePath<Router> {
        self.app.clone()
    }

    /// Serve connections on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let service = axum::ServiceExt::<Request>::into_make_service(self.app);
        axum::serve(listener, service)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteSpec;
    use axum::{
        body::Body,
        http::{Method, StatusCode},
        response::IntoResponse,
    };
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let routes = RouteSpec::new()
            .route(
                "v1",
                RouteSpec::new().route(
                    "users",
                    RouteSpec::new().handle("POST", |_req: Request| async {
                        StatusCode::CREATED.into_response()
                    }),
                ),
            )
            .compile();
        HttpServer::new(routes, &ListenerConfig::default())
    }

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn trailing_slash_reaches_the_same_route() {
        let app = server().app();
        let with_slash = app.clone().oneshot(request(Method::POST, "/v1/users/")).await.unwrap();
        let without = app.oneshot(request(Method::POST, "/v1/users")).await.unwrap();
        assert_eq!(with_slash.status(), StatusCode::CREATED);
        assert_eq!(without.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = server().app().oneshot(request(Method::DELETE, "/v1/users/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = ListenerConfig::default();
        config.max_body_bytes = 8;
        let routes = RouteSpec::new()
            .route(
                "echo",
                RouteSpec::new().handle("POST", |req: Request| async move {
                    match axum::body::to_bytes(req.into_body(), usize::MAX).await {
                        Ok(_) => StatusCode::OK.into_response(),
                        Err(_) => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
                    }
                }),
            )
            .compile();
        let app = HttpServer::new(routes, &config).app();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .body(Body::from("far more than eight bytes"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
