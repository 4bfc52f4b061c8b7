//! Session hand-off and hub subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionUpgrader (per-connection task)
//!     → session.rs (Session owns the duplex connection + identity + store)
//!     → handoff.rs (bounded FIFO, non-blocking submit)
//!     → DispatchLoop (single consumer)
//!     → agent.rs (Hub::register → supervised SessionAgent task)
//!
//! Boot:
//!     stored users → Hub::start_user → supervised UserAgent task
//! ```
//!
//! # Design Decisions
//! - Ownership of a session moves to the hub once enqueued
//! - Submission never suspends the submitting task
//! - Agents are supervised: failures are logged, shutdown aborts and drains

pub mod agent;
pub mod handoff;
pub mod session;

pub use agent::{AgentHub, DrainAgent, Hub, IdleUserAgent, SessionAgent, UserAgent};
pub use handoff::{Arrivals, HandOffQueue, Submission};
pub use session::{Duplex, Frame, MemoryDuplex, Session, SessionError};
