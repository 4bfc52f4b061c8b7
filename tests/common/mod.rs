//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use elos_stack::auth::Credentials;
use elos_stack::config::StackConfig;
use elos_stack::hub::{Hub, Session};
use elos_stack::lifecycle::{
    assemble, bind_listener, LoopState, LoopStateHandle, Shutdown, StartupError,
};
use elos_stack::store::MemoryStore;

/// Hub that hands every registered session to the test.
pub struct RecordingHub {
    tx: mpsc::UnboundedSender<Session>,
}

impl Hub for RecordingHub {
    fn register(&self, session: Session) {
        let _ = self.tx.send(session);
    }
}

/// A running stack on an ephemeral port.
pub struct TestStack {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub shutdown: Shutdown,
    pub state: LoopStateHandle,
    pub sessions: mpsc::UnboundedReceiver<Session>,
    pub task: JoinHandle<Result<(), StartupError>>,
}

#[allow(dead_code)]
impl TestStack {
    pub async fn start() -> Self {
        let mut config = StackConfig::default();
        config.listener.host = "127.0.0.1".to_string();
        config.listener.port = 0;
        config.lifecycle.shutdown_timeout_secs = 2;

        let store = Arc::new(MemoryStore::new());
        let (tx, sessions) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();

        let hub = Arc::new(RecordingHub { tx });
        let dispatch = assemble(&config, store.clone(), hub, shutdown.clone());
        let state = dispatch.state_handle();

        let listener = bind_listener(&config.listener).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(dispatch.run(listener));

        for _ in 0..100 {
            if state.get() == LoopState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Self {
            addr,
            store,
            shutdown,
            state,
            sessions,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Create a user and return its credentials.
    pub fn user(&self, name: &str) -> Credentials {
        let (record, key) = self.store.create_user(name);
        Credentials { id: record.id, key }
    }

    /// Wait for the next session the hub receives.
    pub async fn next_session(&mut self) -> Session {
        tokio::time::timeout(Duration::from_secs(5), self.sessions.recv())
            .await
            .expect("no session reached the hub")
            .expect("hub channel closed")
    }

    /// Trigger shutdown and wait for the loop to finish.
    pub async fn stop(self) -> Result<(), StartupError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("dispatch loop did not stop")
            .expect("dispatch loop panicked")
    }
}
