//! Persistence capability consumed by the routing core.
//!
//! # Data Flow
//! ```text
//! AuthGate ──verify(id, key)──▶ Store
//! Terminal handlers ──save / query──▶ Store
//! Sessions carry a SharedStore handle into the hub
//! ```
//!
//! # Design Decisions
//! - The core only depends on the `Store` trait; schema, persistence and
//!   domain rules live behind it
//! - `memory.rs` is the in-process implementation used by the sandbox and tests
//! - Identifiers are hyphen-free so they survive the `id-key` credential format

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

/// Shared handle to the store, cloned into every component that needs it.
pub type SharedStore = Arc<dyn Store>;

/// Entity kinds known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    User,
    Event,
    Task,
    Routine,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::User => "user",
            Kind::Event => "event",
            Kind::Task => "task",
            Kind::Routine => "routine",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored entity. Attribute semantics belong to the domain layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record with a fresh identifier.
    pub fn new(kind: Kind) -> Self {
        Self {
            id: new_id(),
            kind,
            owner: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub kind: Kind,
}

impl Identity {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: Kind::User,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Errors raised by a store implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the operation.
    #[error("store rejected operation: {0}")]
    Rejected(String),
}

/// Storage capability used by the routing core.
pub trait Store: Send + Sync + 'static {
    /// Check an id/key pair.
    ///
    /// `Ok(None)` means the pair was rejected; `Err` means the check itself failed.
    fn verify<'a>(
        &'a self,
        id: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Identity>, StoreError>>;

    /// Persist a record, returning the stored version.
    fn save(&self, record: Record) -> BoxFuture<'_, Result<Record, StoreError>>;

    /// Fetch every record of a kind.
    fn query(&self, kind: Kind) -> BoxFuture<'_, Result<Vec<Record>, StoreError>>;

    /// Persist a user record and issue it a key. Returns the stored record and the key.
    fn register_user(&self, record: Record) -> BoxFuture<'_, Result<(Record, String), StoreError>>;
}

/// Generate an identifier with no `-` separators.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_contain_no_credential_delimiter() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
    }

    #[test]
    fn record_serializes_kind_lowercase() {
        let record = Record::new(Kind::Event).with_attr("name", "Sandy's Party");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "event");
        assert_eq!(json["attrs"]["name"], "Sandy's Party");
        assert!(json.get("owner").is_none());
    }
}
