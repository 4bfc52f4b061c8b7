//! Explicit application context.
//!
//! Built once at startup and handed to route construction; replaces any
//! process-wide default authenticator or store.

use std::sync::Arc;

use crate::auth::{AuthGate, AuthenticatedHandler, Authenticator, HeaderAuthenticator};
use crate::hub::HandOffQueue;
use crate::store::SharedStore;

/// Capabilities shared by every route.
#[derive(Clone)]
pub struct AppContext {
    pub store: SharedStore,
    pub authenticator: Arc<dyn Authenticator>,
    pub handoff: HandOffQueue,
}

impl AppContext {
    /// Context authenticating against `store` with header credentials.
    pub fn new(store: SharedStore, handoff: HandOffQueue) -> Self {
        let authenticator = Arc::new(HeaderAuthenticator::new(store.clone()));
        Self {
            store,
            authenticator,
            handoff,
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Wrap `handler` in an authentication gate using this context's authenticator.
    pub fn authenticated<H: AuthenticatedHandler>(&self, handler: H) -> AuthGate {
        AuthGate::new(self.authenticator.clone(), handler)
    }
}
