//! Elos stack library: routing, authentication and session dispatch.

pub mod auth;
pub mod config;
pub mod context;
pub mod http;
pub mod hub;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod sandbox;
pub mod store;

pub use config::StackConfig;
pub use context::AppContext;
pub use http::HttpServer;
pub use lifecycle::{assemble, DispatchLoop, LoopState, Shutdown};
pub use routing::{CompiledRoutes, RouteSpec};
pub use store::{MemoryStore, SharedStore, Store};
