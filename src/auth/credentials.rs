//! Credential extraction and the store-backed authenticator.

use axum::http::{header::SEC_WEBSOCKET_PROTOCOL, request::Parts, HeaderMap, HeaderName};
use futures_util::future::BoxFuture;

use crate::auth::{AuthResult, Authenticator};
use crate::store::SharedStore;

/// Header carrying the `id-key` pair.
pub const CREDENTIALS_HEADER: HeaderName = SEC_WEBSOCKET_PROTOCOL;

/// Separator between the id and key tokens.
pub const CREDENTIALS_DELIMITER: char = '-';

/// An id/key pair supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub key: String,
}

impl Credentials {
    /// Encode as a header value.
    pub fn header_value(&self) -> String {
        format!("{}{}{}", self.id, CREDENTIALS_DELIMITER, self.key)
    }
}

/// Parse a raw header value. Anything other than exactly two non-empty tokens is `None`.
pub fn parse_credentials(value: &str) -> Option<Credentials> {
    let tokens: Vec<&str> = value.trim().split(CREDENTIALS_DELIMITER).collect();
    match tokens.as_slice() {
        [id, key] if !id.is_empty() && !key.is_empty() => Some(Credentials {
            id: (*id).to_string(),
            key: (*key).to_string(),
        }),
        _ => None,
    }
}

/// Read credentials from the protocol-negotiation header.
pub fn extract_credentials(headers: &HeaderMap) -> Option<Credentials> {
    headers
        .get(CREDENTIALS_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_credentials)
}

/// Authenticates requests by checking header credentials against the store.
#[derive(Clone)]
pub struct HeaderAuthenticator {
    store: SharedStore,
}

impl HeaderAuthenticator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl Authenticator for HeaderAuthenticator {
    fn authenticate<'a>(&'a self, parts: &'a Parts) -> BoxFuture<'a, AuthResult> {
        Box::pin(async move {
            let Some(credentials) = extract_credentials(&parts.headers) else {
                return AuthResult::Unauthenticated("no credentials supplied".into());
            };

            match self.store.verify(&credentials.id, &credentials.key).await {
                Ok(Some(identity)) => AuthResult::Authenticated(identity),
                Ok(None) => AuthResult::Unauthenticated("credentials rejected".into()),
                Err(e) => AuthResult::Error(e),
            }
        })
    }
}
