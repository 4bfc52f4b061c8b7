//! The served route tree.

use crate::context::AppContext;
use crate::http::handlers::{create_resource, create_user, list_resources};
use crate::http::websocket::ConnectionUpgrader;
use crate::routing::RouteSpec;
use crate::store::Kind;

/// Build the API route tree. Every endpoint requires authentication.
///
/// ```text
/// /v1/users         POST  create a user (field: name) and issue its key
/// /v1/events        POST  create an event (field: name)
///                   GET   list the caller's events
/// /v1/authenticate  GET   upgrade to a websocket session
/// ```
pub fn api_routes(ctx: &AppContext) -> RouteSpec {
    let users = RouteSpec::new().handle(
        "POST",
        ctx.authenticated(create_user(ctx.store.clone(), &["name"])),
    );

    let events = RouteSpec::new()
        .handle(
            "POST",
            ctx.authenticated(create_resource(ctx.store.clone(), Kind::Event, &["name"])),
        )
        .handle(
            "GET",
            ctx.authenticated(list_resources(ctx.store.clone(), Kind::Event)),
        );

    let authenticate = RouteSpec::new().handle(
        "GET",
        ctx.authenticated(ConnectionUpgrader::new(ctx.store.clone(), ctx.handoff.clone())),
    );

    RouteSpec::new().route(
        "v1",
        RouteSpec::new()
            .route("users", users)
            .route("events", events)
            .route("authenticate", authenticate),
    )
}
