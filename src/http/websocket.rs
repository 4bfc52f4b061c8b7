//! WebSocket upgrade for authenticated identities.
//!
//! # Responsibilities
//! - Complete the upgrade handshake for an authenticated request
//! - Echo the client's sub-protocol so compliant clients accept the handshake
//! - Wrap the upgraded socket in a `Session` and hand it off
//!
//! # Data Flow
//! ```text
//! AuthGate (identity) → ConnectionUpgrader
//!     → handshake rejected: log, transport rejection goes to the peer
//!     → upgraded: Session { socket, identity, store } → HandOffQueue
//! ```
//!
//! # Design Decisions
//! - Upgrade failures are logged here and never re-signalled upward
//! - Hand-off happens on the upgrade task and never waits on the consumer

use axum::{
    body::Body,
    extract::{ws::WebSocketUpgrade, FromRequestParts},
    http::Request,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

use crate::auth::{AuthenticatedHandler, CREDENTIALS_HEADER};
use crate::hub::{HandOffQueue, Session, Submission};
use crate::store::{Identity, SharedStore};

/// Terminal handler upgrading authenticated requests to sessions.
#[derive(Clone)]
pub struct ConnectionUpgrader {
    store: SharedStore,
    handoff: HandOffQueue,
}

impl ConnectionUpgrader {
    pub fn new(store: SharedStore, handoff: HandOffQueue) -> Self {
        Self { store, handoff }
    }

    pub async fn upgrade(&self, request: Request<Body>, identity: Identity) -> Response {
        let (mut parts, _body) = request.into_parts();
        let protocol = parts
            .headers
            .get(CREDENTIALS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => {
                tracing::warn!(
                    identity = %identity.id,
                    error = %rejection,
                    "Error upgrading to the websocket protocol"
                );
                return rejection.into_response();
            }
        };
        let upgrade = match protocol {
            Some(protocol) => upgrade.protocols([protocol]),
            None => upgrade,
        };

        let store = self.store.clone();
        let handoff = self.handoff.clone();
        let failed_identity = identity.id.clone();

        upgrade
            .on_failed_upgrade(move |err| {
                tracing::error!(
                    identity = %failed_identity,
                    error = %err,
                    "Websocket upgrade failed after handshake"
                );
            })
            .on_upgrade(move |socket| async move {
                tracing::info!(identity = %identity.id, "Agent connected over websocket");
                let session = Session::new(identity, store, Box::new(socket));
                if handoff.submit(session) == Submission::Rejected {
                    tracing::warn!("Session dropped, server is shutting down");
                }
            })
    }
}

impl AuthenticatedHandler for ConnectionUpgrader {
    fn call(&self, request: Request<Body>, identity: Identity) -> BoxFuture<'static, Response> {
        let upgrader = self.clone();
        Box::pin(async move { upgrader.upgrade(request, identity).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn plain_request_is_rejected_without_hand_off() {
        let (handoff, mut arrivals) = HandOffQueue::bounded(1, Duration::from_secs(1));
        let upgrader = ConnectionUpgrader::new(Arc::new(MemoryStore::new()), handoff);

        let request = Request::builder()
            .uri("/v1/authenticate")
            .header(CREDENTIALS_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = upgrader.upgrade(request, Identity::user("abc")).await;

        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(arrivals.try_recv().is_none());
    }
}
