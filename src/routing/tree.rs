//! Declarative route tree and its compilation into path bindings.
//!
//! # Responsibilities
//! - Describe the URL hierarchy as nested segments ending in method tables
//! - Flatten the hierarchy depth-first into `path → MethodDispatcher`
//! - Report, skip and collect malformed entries
//!
//! # Design Decisions
//! - Paths are joined as `prefix + "/" + segment`; the empty root is never bound
//! - A path compiled twice merges into one dispatcher, last binding per method wins
//! - Compilation never fails: configuration errors are logged and kept as warnings
//! - Only literal segments compile, so every bound path is safe to mount

use std::collections::BTreeMap;

use axum::http::Method;
use thiserror::Error;

use crate::routing::dispatcher::MethodDispatcher;
use crate::routing::handler::{shared, Handler, SharedHandler};

/// Methods accepted as terminal keys.
pub const RECOGNIZED_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Look up a terminal key in the recognized method set.
pub fn recognized_method(key: &str) -> Option<Method> {
    RECOGNIZED_METHODS
        .iter()
        .find(|method| method.as_str() == key)
        .cloned()
}

/// Malformed route definitions found while compiling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    /// A terminal entry keyed by something other than a recognized method.
    #[error("unrecognized method `{key}` under `{path}`")]
    UnrecognizedMethod { path: String, key: String },

    /// A nested route with an empty segment.
    #[error("empty route segment under `{prefix}`")]
    EmptySegment { prefix: String },

    /// A segment the HTTP router would read as a capture or wildcard.
    #[error("invalid route segment `{segment}` under `{prefix}`")]
    InvalidSegment { prefix: String, segment: String },
}

/// Segments are literal: no capture braces, wildcards or `:` prefixes.
pub fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with(':')
        && !segment.contains(|c| matches!(c, '{' | '}' | '*'))
}

/// A value in the route tree.
#[derive(Clone)]
pub enum RouteNode {
    /// Nested sub-routes.
    Routes(RouteSpec),
    /// Terminal handler keyed by method name.
    Handler(SharedHandler),
}

/// Ordered, nested mapping from path segment to sub-route or terminal handler.
#[derive(Clone, Default)]
pub struct RouteSpec {
    entries: Vec<(String, RouteNode)>,
}

impl RouteSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nest `routes` under `segment`.
    pub fn route(mut self, segment: impl Into<String>, routes: RouteSpec) -> Self {
        self.entries.push((segment.into(), RouteNode::Routes(routes)));
        self
    }

    /// Bind a terminal handler. `key` should be a method name such as `"POST"`.
    pub fn handle<H: Handler>(self, key: impl Into<String>, handler: H) -> Self {
        self.handle_shared(key, shared(handler))
    }

    pub fn handle_shared(mut self, key: impl Into<String>, handler: SharedHandler) -> Self {
        self.entries.push((key.into(), RouteNode::Handler(handler)));
        self
    }

    pub fn entries(&self) -> &[(String, RouteNode)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten the tree into concrete path bindings.
    pub fn compile(&self) -> CompiledRoutes {
        let mut compiled = CompiledRoutes::default();
        compile_into(self, "", &mut compiled);
        compiled
    }
}

impl std::fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (key, node) in &self.entries {
            match node {
                RouteNode::Routes(routes) => map.entry(key, routes),
                RouteNode::Handler(_) => map.entry(key, &"<handler>"),
            };
        }
        map.finish()
    }
}

/// Join a route prefix with a segment: `join("/v1", "users") == "/v1/users"`.
pub fn join(prefix: &str, segment: &str) -> String {
    format!("{}/{}", prefix, segment)
}

fn compile_into(spec: &RouteSpec, prefix: &str, compiled: &mut CompiledRoutes) {
    let mut dispatcher = MethodDispatcher::new();

    for (key, node) in &spec.entries {
        match node {
            RouteNode::Routes(routes) => {
                if key.is_empty() {
                    compiled.warn(RouteError::EmptySegment {
                        prefix: display_prefix(prefix),
                    });
                    continue;
                }
                if !valid_segment(key) {
                    compiled.warn(RouteError::InvalidSegment {
                        prefix: display_prefix(prefix),
                        segment: key.clone(),
                    });
                    continue;
                }
                compile_into(routes, &join(prefix, key), compiled);
            }
            RouteNode::Handler(handler) => match recognized_method(key) {
                Some(method) => dispatcher.register(method, handler.clone()),
                None => compiled.warn(RouteError::UnrecognizedMethod {
                    path: display_prefix(prefix),
                    key: key.clone(),
                }),
            },
        }
    }

    if !prefix.is_empty() && !dispatcher.is_empty() {
        compiled.bind(prefix, dispatcher);
    }
}

fn display_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        "/".to_string()
    } else {
        prefix.to_string()
    }
}

/// Flattened, path-keyed dispatch table.
#[derive(Debug, Default)]
pub struct CompiledRoutes {
    routes: BTreeMap<String, MethodDispatcher>,
    warnings: Vec<RouteError>,
}

impl CompiledRoutes {
    fn bind(&mut self, path: &str, dispatcher: MethodDispatcher) {
        match self.routes.get_mut(path) {
            Some(existing) => {
                tracing::warn!(
                    path = %path,
                    "Path registered more than once, merging method bindings"
                );
                for method in dispatcher.allowed_methods() {
                    if let Some(handler) = dispatcher.handler(&method) {
                        existing.register(method, handler);
                    }
                }
            }
            None => {
                tracing::debug!(
                    path = %path,
                    methods = ?dispatcher.allowed_methods(),
                    "Route compiled"
                );
                self.routes.insert(path.to_string(), dispatcher);
            }
        }
    }

    fn warn(&mut self, error: RouteError) {
        tracing::warn!(error = %error, "Skipping malformed route entry");
        self.warnings.push(error);
    }

    pub fn get(&self, path: &str) -> Option<&MethodDispatcher> {
        self.routes.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Configuration errors encountered during compilation.
    pub fn warnings(&self) -> &[RouteError] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, MethodDispatcher> {
        self.routes
    }
}
