//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, trailing-slash normalisation)
//!     → request.rs (request ID assigned and propagated)
//!     → routes.rs (compiled route tree, every endpoint behind an AuthGate)
//!     → handlers.rs (REST terminal handlers against the store)
//!       or websocket.rs (upgrade, Session, hand-off queue)
//!     → response.rs (JSON bodies, ApiError)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod routes;
pub mod server;
pub mod websocket;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{resource_response, ApiError};
pub use routes::api_routes;
pub use server::HttpServer;
pub use websocket::ConnectionUpgrader;
