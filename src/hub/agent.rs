//! Hub registration and supervised agents.
//!
//! # Responsibilities
//! - Accept ownership of sessions from the dispatch loop
//! - Run one agent task per session, and one per stored user from boot
//! - Report agent failures and stop every agent on shutdown
//!
//! # Design Decisions
//! - Agents run inside a `JoinSet`, never as detached tasks
//! - Registration is synchronous and cheap; agent work is asynchronous
//! - Finished workers are reaped on every registration

use std::fmt;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::hub::session::{Frame, Session, SessionError};
use crate::store::{Record, SharedStore};

/// Owner of long-running session processing.
pub trait Hub: Send + Sync + 'static {
    /// Take ownership of a session and schedule its processing.
    fn register(&self, session: Session);

    /// Start the long-running agent for a stored user. Ignored by default.
    fn start_user(&self, user: Record, store: SharedStore) {
        let _ = (user, store);
    }

    /// Stop all session processing.
    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Per-session worker logic.
pub trait SessionAgent: Send + Sync + 'static {
    fn run(&self, session: Session) -> BoxFuture<'static, Result<(), SessionError>>;
}

/// Per-user worker logic, started once for every user known at boot.
pub trait UserAgent: Send + Sync + 'static {
    fn run(
        &self,
        user: Record,
        store: SharedStore,
    ) -> BoxFuture<'static, Result<(), SessionError>>;
}

/// Agent that consumes frames until the peer closes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DrainAgent;

impl SessionAgent for DrainAgent {
    fn run(&self, mut session: Session) -> BoxFuture<'static, Result<(), SessionError>> {
        Box::pin(async move {
            let session_id = session.id();
            while let Some(frame) = session.connection().next_frame().await {
                match frame? {
                    Frame::Close => break,
                    Frame::Text(text) => {
                        tracing::debug!(
                            session = %session_id,
                            bytes = text.len(),
                            "Text frame received"
                        )
                    }
                    Frame::Binary(bytes) => {
                        tracing::debug!(
                            session = %session_id,
                            bytes = bytes.len(),
                            "Binary frame received"
                        )
                    }
                }
            }
            Ok(())
        })
    }
}

/// User agent that holds its slot until the hub shuts down.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleUserAgent;

impl UserAgent for IdleUserAgent {
    fn run(
        &self,
        user: Record,
        _store: SharedStore,
    ) -> BoxFuture<'static, Result<(), SessionError>> {
        Box::pin(async move {
            tracing::debug!(user = %user.id, "User agent idle");
            std::future::pending::<()>().await;
            Ok(())
        })
    }
}

/// What a supervised task is working for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Worker {
    Session(Uuid),
    User(String),
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Worker::Session(id) => write!(f, "session {}", id),
            Worker::User(id) => write!(f, "user {}", id),
        }
    }
}

type Workers = JoinSet<(Worker, Result<(), SessionError>)>;

/// Hub running each agent in a supervised task set.
pub struct AgentHub {
    agent: Arc<dyn SessionAgent>,
    user_agent: Option<Arc<dyn UserAgent>>,
    workers: Mutex<Workers>,
}

impl AgentHub {
    pub fn new<A: SessionAgent>(agent: A) -> Self {
        Self {
            agent: Arc::new(agent),
            user_agent: None,
            workers: Mutex::new(JoinSet::new()),
        }
    }

    /// Run `agent` for every user passed to [`Hub::start_user`].
    pub fn with_user_agent<U: UserAgent>(mut self, agent: U) -> Self {
        self.user_agent = Some(Arc::new(agent));
        self
    }

    /// Number of agents not yet reaped.
    pub fn active_workers(&self) -> usize {
        let mut workers = self.workers.lock().expect("hub mutex poisoned");
        reap(&mut workers);
        workers.len()
    }
}

impl Default for AgentHub {
    fn default() -> Self {
        Self::new(DrainAgent)
    }
}

impl Hub for AgentHub {
    fn register(&self, session: Session) {
        let session_id = session.id();
        let identity = session.identity().id.clone();
        let work = self.agent.run(session);

        let mut workers = self.workers.lock().expect("hub mutex poisoned");
        reap(&mut workers);
        workers.spawn(async move { (Worker::Session(session_id), work.await) });

        tracing::info!(
            session = %session_id,
            identity = %identity,
            active = workers.len(),
            "Session registered with hub"
        );
    }

    fn start_user(&self, user: Record, store: SharedStore) {
        let Some(agent) = &self.user_agent else {
            tracing::debug!(user = %user.id, "No user agent configured");
            return;
        };
        let user_id = user.id.clone();
        let work = agent.run(user, store);

        let mut workers = self.workers.lock().expect("hub mutex poisoned");
        reap(&mut workers);
        let worker = Worker::User(user_id.clone());
        workers.spawn(async move { (worker, work.await) });

        tracing::info!(user = %user_id, active = workers.len(), "User agent started");
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut workers =
                std::mem::take(&mut *self.workers.lock().expect("hub mutex poisoned"));
            let remaining = workers.len();
            workers.abort_all();
            while let Some(joined) = workers.join_next().await {
                report(joined);
            }
            tracing::info!(stopped = remaining, "Hub shut down");
        })
    }
}

fn reap(workers: &mut Workers) {
    while let Some(joined) = workers.try_join_next() {
        report(joined);
    }
}

fn report(joined: Result<(Worker, Result<(), SessionError>), tokio::task::JoinError>) {
    match joined {
        Ok((worker, Ok(()))) => tracing::debug!(worker = %worker, "Agent finished"),
        Ok((worker, Err(e))) => tracing::warn!(worker = %worker, error = %e, "Agent failed"),
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::error!(error = %e, "Agent panicked"),
    }
}
