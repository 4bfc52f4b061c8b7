//! Metrics collection and exposition.
//!
//! # Metrics
//! - `stack_requests_total` (counter): requests by method, status
//! - `stack_request_duration_seconds` (histogram): latency distribution
//! - `stack_auth_outcomes_total` (counter): authentication outcomes
//! - `stack_sessions_handed_off_total` (counter): hand-off outcomes
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus exporter is opt-in via configuration

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and start its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Middleware recording request count and latency.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "stack_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "stack_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_auth(outcome: &'static str) {
    metrics::counter!("stack_auth_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_handoff(outcome: &'static str) {
    metrics::counter!("stack_sessions_handed_off_total", "outcome" => outcome).increment(1);
}
