//! Upgraded, authenticated sessions.

use std::fmt;

use axum::extract::ws::{Message, WebSocket};
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::store::{Identity, SharedStore};

/// Errors raised while driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The underlying connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer went away.
    #[error("connection closed")]
    Closed,

    /// The agent gave up on the session.
    #[error("agent error: {0}")]
    Agent(String),
}

/// A frame on a duplex connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// Frame-level duplex connection owned by a session.
pub trait Duplex: Send + 'static {
    /// Next frame from the peer. `None` once the connection is gone.
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, SessionError>>>;

    fn send_frame(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), SessionError>>;
}

impl Duplex for WebSocket {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, SessionError>>> {
        Box::pin(async move {
            loop {
                let frame = match self.recv().await? {
                    Ok(Message::Text(text)) => Frame::Text(text.to_string()),
                    Ok(Message::Binary(bytes)) => Frame::Binary(bytes.to_vec()),
                    Ok(Message::Close(_)) => Frame::Close,
                    // Ping/pong are answered by the transport.
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                    Err(e) => return Some(Err(SessionError::Transport(e.to_string()))),
                };
                return Some(Ok(frame));
            }
        })
    }

    fn send_frame(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(async move {
            let message = match frame {
                Frame::Text(text) => Message::Text(text.into()),
                Frame::Binary(bytes) => Message::Binary(bytes.into()),
                Frame::Close => Message::Close(None),
            };
            self.send(message)
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))
        })
    }
}

/// In-process duplex connection; one end of a channel pair.
#[derive(Debug)]
pub struct MemoryDuplex {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<Frame>,
}

impl MemoryDuplex {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self {
                inbound: a_rx,
                outbound: b_tx,
            },
            Self {
                inbound: b_rx,
                outbound: a_tx,
            },
        )
    }
}

impl Duplex for MemoryDuplex {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, SessionError>>> {
        Box::pin(async move { self.inbound.recv().await.map(Ok) })
    }

    fn send_frame(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), SessionError>> {
        Box::pin(async move { self.outbound.send(frame).map_err(|_| SessionError::Closed) })
    }
}

/// A live, authenticated connection handed to the hub.
pub struct Session {
    id: Uuid,
    identity: Identity,
    store: SharedStore,
    connection: Box<dyn Duplex>,
}

impl Session {
    pub fn new(identity: Identity, store: SharedStore, connection: Box<dyn Duplex>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            store,
            connection,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn connection(&mut self) -> &mut dyn Duplex {
        self.connection.as_mut()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
