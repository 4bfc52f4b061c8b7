//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → AppContext → compiled routes → DispatchLoop → bind listener
//!
//! Starting (dispatch.rs):
//!     stored users → Hub::start_user
//!
//! Running (dispatch.rs):
//!     HandOffQueue arrivals → hub registration
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Leave loop → Drain server → Stop hub → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: the server drain is abandoned after the deadline

pub mod dispatch;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use dispatch::{DispatchLoop, LoopState, LoopStateHandle};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::spawn_signal_listener;
pub use startup::{assemble, bind_listener, start_user_agents, StartupError};
