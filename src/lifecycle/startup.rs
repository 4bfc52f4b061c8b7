//! Startup orchestration.
//!
//! # Responsibilities
//! - Wire the application context, routes and dispatch loop
//! - Start an agent for every stored user
//! - Bind the listener and report the bound address
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ListenerConfig, StackConfig};
use crate::context::AppContext;
use crate::http::routes::api_routes;
use crate::hub::{HandOffQueue, Hub};
use crate::lifecycle::dispatch::DispatchLoop;
use crate::lifecycle::shutdown::Shutdown;
use crate::store::{Kind, SharedStore, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bind the configured listener address.
pub async fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    let address = config.address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| StartupError::Bind { address, source })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}

/// Hand every stored user to the hub. Returns how many were started.
pub async fn start_user_agents(store: &SharedStore, hub: &dyn Hub) -> Result<usize, StoreError> {
    let users = store.query(Kind::User).await?;
    let started = users.len();
    for user in users {
        hub.start_user(user, store.clone());
    }
    tracing::info!(users = started, "User agents started");
    Ok(started)
}

/// Assemble a dispatch loop serving the API routes over `store`.
pub fn assemble(
    config: &StackConfig,
    store: SharedStore,
    hub: Arc<dyn Hub>,
    shutdown: Shutdown,
) -> DispatchLoop {
    let (handoff, arrivals) = HandOffQueue::bounded(
        config.handoff.capacity,
        Duration::from_millis(config.handoff.submit_timeout_ms),
    );
    let ctx = AppContext::new(store.clone(), handoff);
    let routes = api_routes(&ctx).compile();

    tracing::info!(
        routes = routes.len(),
        warnings = routes.warnings().len(),
        handoff_capacity = config.handoff.capacity,
        "Routes compiled"
    );

    DispatchLoop::new(store, hub, routes, arrivals, shutdown, config)
}
