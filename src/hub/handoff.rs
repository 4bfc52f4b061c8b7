//! Bounded hand-off queue between upgraded connections and the dispatch loop.
//!
//! # Responsibilities
//! - Accept sessions from any number of connection tasks
//! - Deliver them in FIFO order to the single consumer
//! - Never make a submitting task wait on a busy consumer
//!
//! # Design Decisions
//! - Fast path is `try_send`; a full queue defers the session to a spawned
//!   hand-off task bounded by `submit_timeout`
//! - Sessions that cannot be delivered are logged and counted, never silently lost

use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};

use crate::hub::session::Session;
use crate::observability::metrics;

/// What happened to a submitted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Enqueued immediately.
    Queued,
    /// Queue was full; a hand-off task is waiting for room.
    Deferred,
    /// The consumer is gone; the session was dropped.
    Rejected,
}

/// Producer side of the hand-off queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HandOffQueue {
    tx: mpsc::Sender<Session>,
    submit_timeout: Duration,
}

/// Consumer side of the hand-off queue, owned by the dispatch loop.
#[derive(Debug)]
pub struct Arrivals {
    rx: mpsc::Receiver<Session>,
}

impl HandOffQueue {
    /// Create a queue holding at most `capacity` pending sessions.
    pub fn bounded(capacity: usize, submit_timeout: Duration) -> (Self, Arrivals) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, submit_timeout }, Arrivals { rx })
    }

    /// Submit a session without waiting on the consumer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, session: Session) -> Submission {
        match self.tx.try_send(session) {
            Ok(()) => {
                metrics::record_handoff("queued");
                Submission::Queued
            }
            Err(TrySendError::Full(session)) => {
                let tx = self.tx.clone();
                let timeout = self.submit_timeout;
                let session_id = session.id();
                tracing::debug!(session = %session_id, "Hand-off queue full, deferring session");
                metrics::record_handoff("deferred");
                tokio::spawn(async move {
                    match tx.send_timeout(session, timeout).await {
                        Ok(()) => {}
                        Err(SendTimeoutError::Timeout(session)) => {
                            tracing::error!(
                                session = %session.id(),
                                identity = %session.identity().id,
                                timeout_ms = timeout.as_millis() as u64,
                                "Hand-off timed out, dropping session"
                            );
                            metrics::record_handoff("timed_out");
                        }
                        Err(SendTimeoutError::Closed(session)) => {
                            tracing::warn!(
                                session = %session.id(),
                                "Dispatch loop gone, dropping session"
                            );
                            metrics::record_handoff("rejected");
                        }
                    }
                });
                Submission::Deferred
            }
            Err(TrySendError::Closed(session)) => {
                tracing::warn!(session = %session.id(), "Dispatch loop gone, dropping session");
                metrics::record_handoff("rejected");
                Submission::Rejected
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Arrivals {
    /// Next session in delivery order; `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<Session> {
        self.rx.recv().await
    }

    /// Stop accepting new sessions. Already queued sessions can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn try_recv(&mut self) -> Option<Session> {
        self.rx.try_recv().ok()
    }
}
