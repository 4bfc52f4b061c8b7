//! Elos stack server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http server ──▶ compiled routes ──▶ method dispatcher
//!                                                                │
//!                                                                ▼
//!                                                            AuthGate ──verify──▶ store
//!                                                                │
//!                                  ┌─────────────────────────────┴──────────────┐
//!                                  ▼                                            ▼
//!                          REST terminal handler                      ConnectionUpgrader
//!                          (save / query store)                              │ Session
//!                                                                            ▼
//!                                                                     HandOffQueue
//!                                                                            │
//!                                                                            ▼
//!                                          shutdown ──────────────▶  DispatchLoop ──▶ hub
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use elos_stack::config::{load_config, StackConfig};
use elos_stack::hub::{AgentHub, IdleUserAgent};
use elos_stack::lifecycle::{assemble, spawn_signal_listener, Shutdown};
use elos_stack::observability::{logging, metrics};
use elos_stack::sandbox;
use elos_stack::store::MemoryStore;

#[derive(Parser)]
#[command(name = "elos-stack")]
#[command(about = "Routing and session dispatch server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.host
    #[arg(long)]
    host: Option<String>,

    /// Override listener.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Seed the store with a demo user
    #[arg(long)]
    sandbox: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => StackConfig::default(),
    };
    if let Some(host) = args.host {
        config.listener.host = host;
    }
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    config.sandbox |= args.sandbox;

    logging::init(&config.observability);
    tracing::info!("elos-stack v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        address = %config.listener.address(),
        request_timeout_secs = config.listener.request_timeout_secs,
        handoff_capacity = config.handoff.capacity,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = Arc::new(MemoryStore::new());
    if config.sandbox {
        sandbox::seed(&store).await?;
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let hub = AgentHub::default().with_user_agent(IdleUserAgent);
    let dispatch = assemble(&config, store, Arc::new(hub), shutdown);
    dispatch.serve().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
