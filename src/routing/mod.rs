//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteSpec (nested segments → method tables)
//!     → tree.rs (depth-first flatten, join segments with "/")
//!     → CompiledRoutes (path → MethodDispatcher)
//!     → router.rs (mount on axum, freeze)
//!
//! Incoming Request (path, method):
//!     → axum path match
//!     → dispatcher.rs (method lookup)
//!     → Terminal handler, or bad-method response
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Malformed entries are warnings, never fatal
//! - Last registration wins, per method

pub mod dispatcher;
pub mod handler;
pub mod router;
pub mod tree;

pub use dispatcher::{BadMethodConstructor, MethodDispatcher};
pub use handler::{shared, Handler, SharedHandler};
pub use tree::{CompiledRoutes, RouteError, RouteNode, RouteSpec, RECOGNIZED_METHODS};
