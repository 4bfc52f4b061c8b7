//! JSON response bodies.
//!
//! # Responsibilities
//! - Define the stable error body `{status, code, message, developer_message}`
//! - Render resources and errors as pretty-printed JSON
//!
//! # Design Decisions
//! - Internal error detail never reaches the body; callers log it instead
//! - Every error constructor fixes status and code together

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub code: u16,
    pub message: String,
    pub developer_message: String,
}

impl ApiError {
    pub fn custom(
        status: StatusCode,
        code: u16,
        message: impl Into<String>,
        developer_message: impl Into<String>,
    ) -> Self {
        Self {
            status: status.as_u16(),
            code,
            message: message.into(),
            developer_message: developer_message.into(),
        }
    }

    fn standard(status: StatusCode, developer_message: &str) -> Self {
        Self::custom(
            status,
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            developer_message,
        )
    }

    pub fn not_found() -> Self {
        Self::standard(StatusCode::NOT_FOUND, "Perhaps you have an incorrect id?")
    }

    pub fn server_error() -> Self {
        Self::standard(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
    }

    pub fn invalid_method() -> Self {
        Self::standard(
            StatusCode::METHOD_NOT_ALLOWED,
            "Perhaps you meant to GET instead of POST? Or vice versa?",
        )
    }

    pub fn unauthorized() -> Self {
        Self::standard(StatusCode::UNAUTHORIZED, "Check your key")
    }

    pub fn bad_request(developer_message: impl Into<String>) -> Self {
        let status = StatusCode::BAD_REQUEST;
        Self::custom(
            status,
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            developer_message,
        )
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        resource_response(self.status_code(), &self)
    }
}

/// Serialize `resource` as the response body with the given status.
pub fn resource_response<T: Serialize>(status: StatusCode, resource: &T) -> Response {
    match serde_json::to_vec_pretty(resource) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response body");
            let mut response = Response::new(Body::from("{}"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            response
        }
    }
}
