//! The top-level dispatch loop.
//!
//! # Responsibilities
//! - Start an agent for every stored user, then the HTTP server
//! - Forward hand-off arrivals to the hub, in delivery order
//! - Leave the loop on shutdown, drain the server, stop the hub
//!
//! # Data Flow
//! ```text
//! Starting ──listener live──▶ Running ──shutdown / queue closed──▶ ShuttingDown
//!                                                                      │
//!                                                                      ▼
//!                                                                   Stopped
//!
//! Starting:
//!     stored users → hub.start_user(user)
//!
//! Running:
//!     select (biased)
//!         shutdown signal  → break
//!         arrival(session) → hub.register(session)
//! ```
//!
//! # Design Decisions
//! - Shutdown wins over pending arrivals; sessions still queued are dropped
//! - State is published through `arc-swap` so observers never block the loop
//! - The server drain is bounded by the configured shutdown timeout

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::net::TcpListener;

use crate::config::{ListenerConfig, StackConfig};
use crate::http::HttpServer;
use crate::hub::{Arrivals, Hub};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup::{bind_listener, start_user_agents, StartupError};
use crate::routing::CompiledRoutes;
use crate::store::SharedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Starting => "starting",
            LoopState::Running => "running",
            LoopState::ShuttingDown => "shutting_down",
            LoopState::Stopped => "stopped",
        }
    }
}

/// Shared, lock-free view of a loop's state.
#[derive(Debug, Clone)]
pub struct LoopStateHandle {
    state: Arc<ArcSwap<LoopState>>,
}

impl LoopStateHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(ArcSwap::from_pointee(LoopState::Starting)),
        }
    }

    pub fn get(&self) -> LoopState {
        **self.state.load()
    }

    fn set(&self, next: LoopState) {
        let previous = self.state.swap(Arc::new(next));
        tracing::debug!(
            from = previous.as_str(),
            to = next.as_str(),
            "Dispatch loop state changed"
        );
    }
}

/// Owns the hand-off consumer and the server lifecycle.
pub struct DispatchLoop {
    store: SharedStore,
    hub: Arc<dyn Hub>,
    server: HttpServer,
    arrivals: Arrivals,
    shutdown: Shutdown,
    listener: ListenerConfig,
    shutdown_timeout: Duration,
    state: LoopStateHandle,
}

impl DispatchLoop {
    pub fn new(
        store: SharedStore,
        hub: Arc<dyn Hub>,
        routes: CompiledRoutes,
        arrivals: Arrivals,
        shutdown: Shutdown,
        config: &StackConfig,
    ) -> Self {
        Self {
            store,
            hub,
            server: HttpServer::new(routes, &config.listener),
            arrivals,
            shutdown,
            listener: config.listener.clone(),
            shutdown_timeout: Duration::from_secs(config.lifecycle.shutdown_timeout_secs),
            state: LoopStateHandle::new(),
        }
    }

    pub fn state_handle(&self) -> LoopStateHandle {
        self.state.clone()
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Bind the configured address and run until shutdown.
    pub async fn serve(self) -> Result<(), StartupError> {
        let listener = bind_listener(&self.listener).await?;
        self.run(listener).await
    }

    /// Run on an already bound listener until shutdown.
    pub async fn run(self, listener: TcpListener) -> Result<(), StartupError> {
        let DispatchLoop {
            store,
            hub,
            server,
            mut arrivals,
            shutdown,
            shutdown_timeout,
            state,
            ..
        } = self;

        if let Err(e) = start_user_agents(&store, &*hub).await {
            tracing::error!(error = %e, "Failed to start user agents");
        }

        let mut server_signal = shutdown.subscribe();
        let mut server_task =
            tokio::spawn(server.run(listener, async move { server_signal.recv().await }));

        state.set(LoopState::Running);
        tracing::info!("Dispatch loop running");

        let mut signal = shutdown.subscribe();
        let mut registered: u64 = 0;
        loop {
            tokio::select! {
                biased;

                _ = signal.recv() => {
                    tracing::info!(registered, "Shutdown signal received, leaving dispatch loop");
                    break;
                }

                arrival = arrivals.recv() => match arrival {
                    Some(session) => {
                        tracing::debug!(
                            session = %session.id(),
                            identity = %session.identity().id,
                            "Forwarding session to hub"
                        );
                        hub.register(session);
                        registered += 1;
                    }
                    None => {
                        tracing::warn!("Hand-off queue closed, shutting down");
                        break;
                    }
                },
            }
        }

        state.set(LoopState::ShuttingDown);
        shutdown.trigger();

        arrivals.close();
        let mut dropped = 0usize;
        while arrivals.try_recv().is_some() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped sessions still queued at shutdown");
        }

        let served = match tokio::time::timeout(shutdown_timeout, &mut server_task).await {
            Ok(Ok(result)) => result.map_err(StartupError::Serve),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "HTTP server task failed");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = shutdown_timeout.as_secs(),
                    "HTTP server did not drain in time, aborting"
                );
                server_task.abort();
                Ok(())
            }
        };

        hub.shutdown().await;
        state.set(LoopState::Stopped);
        tracing::info!("Dispatch loop stopped");
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{HandOffQueue, MemoryDuplex, Session, Submission};
    use crate::store::{Identity, MemoryStore, Record};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recording {
        sessions: Mutex<Vec<Uuid>>,
        users: Mutex<Vec<String>>,
        stopped: AtomicBool,
    }

    impl Hub for Recording {
        fn register(&self, session: Session) {
            self.sessions.lock().unwrap().push(session.id());
        }

        fn start_user(&self, user: Record, _store: SharedStore) {
            self.users.lock().unwrap().push(user.id);
        }

        fn shutdown(&self) -> futures_util::future::BoxFuture<'_, ()> {
            Box::pin(async move { self.stopped.store(true, Ordering::SeqCst) })
        }
    }

    struct Fixture {
        dispatch: DispatchLoop,
        handoff: HandOffQueue,
        hub: Arc<Recording>,
        store: SharedStore,
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryStore::new()))
    }

    fn fixture_with(store: SharedStore) -> Fixture {
        let hub = Arc::new(Recording::default());
        let (handoff, arrivals) = HandOffQueue::bounded(4, Duration::from_millis(100));
        let mut config = StackConfig::default();
        config.lifecycle.shutdown_timeout_secs = 2;
        let dispatch = DispatchLoop::new(
            store.clone(),
            hub.clone(),
            CompiledRoutes::default(),
            arrivals,
            Shutdown::new(),
            &config,
        );
        Fixture {
            dispatch,
            handoff,
            hub,
            store,
        }
    }

    fn session(store: &SharedStore) -> Session {
        let (near, _far) = MemoryDuplex::pair();
        Session::new(Identity::user("u1"), store.clone(), Box::new(near))
    }

    async fn listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn forwards_arrivals_and_stops_on_shutdown() {
        let Fixture {
            dispatch,
            handoff,
            hub,
            store,
        } = fixture();
        let state = dispatch.state_handle();
        let shutdown = dispatch.shutdown_handle();
        assert_eq!(state.get(), LoopState::Starting);

        let task = tokio::spawn(dispatch.run(listener().await));

        let first = session(&store);
        let second = session(&store);
        let expected = vec![first.id(), second.id()];
        assert_eq!(handoff.submit(first), Submission::Queued);
        assert_eq!(handoff.submit(second), Submission::Queued);

        for _ in 0..100 {
            if hub.sessions.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*hub.sessions.lock().unwrap(), expected);
        assert_eq!(state.get(), LoopState::Running);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop must terminate after shutdown")
            .unwrap()
            .unwrap();

        assert_eq!(state.get(), LoopState::Stopped);
        assert!(hub.stopped.load(Ordering::SeqCst));
        assert_eq!(handoff.submit(session(&store)), Submission::Rejected);
        assert_eq!(hub.sessions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_takes_priority_over_queued_sessions() {
        let Fixture {
            dispatch,
            handoff,
            hub,
            store,
        } = fixture();
        let state = dispatch.state_handle();

        assert_eq!(handoff.submit(session(&store)), Submission::Queued);
        dispatch.shutdown_handle().trigger();

        tokio::time::timeout(Duration::from_secs(5), dispatch.run(listener().await))
            .await
            .expect("loop must terminate")
            .unwrap();

        assert!(hub.sessions.lock().unwrap().is_empty());
        assert_eq!(state.get(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn repeated_shutdown_is_harmless() {
        let Fixture { dispatch, hub, .. } = fixture();
        let shutdown = dispatch.shutdown_handle();
        let task = tokio::spawn(dispatch.run(listener().await));

        shutdown.trigger();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop must terminate")
            .unwrap()
            .unwrap();
        shutdown.trigger();
        assert!(hub.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn closed_queue_is_treated_as_shutdown() {
        let Fixture {
            dispatch, handoff, ..
        } = fixture();
        let state = dispatch.state_handle();
        let shutdown = dispatch.shutdown_handle();
        drop(handoff);

        tokio::time::timeout(Duration::from_secs(5), dispatch.run(listener().await))
            .await
            .expect("loop must terminate")
            .unwrap();

        assert!(shutdown.is_triggered());
        assert_eq!(state.get(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn stored_users_get_agents_before_running() {
        let memory = Arc::new(MemoryStore::new());
        let (user, _) = memory.create_user("Sandy");
        let Fixture {
            dispatch,
            hub,
            handoff: _handoff,
            ..
        } = fixture_with(memory);
        let state = dispatch.state_handle();
        let shutdown = dispatch.shutdown_handle();

        let task = tokio::spawn(dispatch.run(listener().await));
        for _ in 0..100 {
            if state.get() == LoopState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.get(), LoopState::Running);
        assert_eq!(*hub.users.lock().unwrap(), vec![user.id]);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop must terminate")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn unreachable_store_does_not_block_startup() {
        let memory = Arc::new(MemoryStore::new());
        memory.set_offline(true);
        let Fixture { dispatch, hub, .. } = fixture_with(memory);
        let state = dispatch.state_handle();
        dispatch.shutdown_handle().trigger();

        tokio::time::timeout(Duration::from_secs(5), dispatch.run(listener().await))
            .await
            .expect("loop must terminate")
            .unwrap();

        assert!(hub.users.lock().unwrap().is_empty());
        assert_eq!(state.get(), LoopState::Stopped);
    }
}
