//! In-memory store backed by concurrent maps.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use futures_util::future::BoxFuture;

use super::{new_id, Identity, Kind, Record, Store, StoreError};

/// Concurrent in-process store.
///
/// Records are keyed by `(kind, id)`; credentials map a user id to its key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<(Kind, String), Record>,
    credentials: DashMap<String, String>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user record and issue it a key. Returns the record and key.
    pub fn create_user(&self, name: &str) -> (Record, String) {
        let record = Record::new(Kind::User).with_attr("name", name);
        let key = self.issue(&record);
        (record, key)
    }

    fn issue(&self, record: &Record) -> String {
        let key = new_id();
        self.credentials.insert(record.id.clone(), key.clone());
        self.records
            .insert((Kind::User, record.id.clone()), record.clone());
        key
    }

    /// Register a credential pair directly.
    pub fn insert_credentials(&self, id: impl Into<String>, key: impl Into<String>) {
        self.credentials.insert(id.into(), key.into());
    }

    /// Simulate the backing store going away. Every operation fails while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn verify<'a>(
        &'a self,
        id: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Identity>, StoreError>> {
        Box::pin(async move {
            self.ensure_online()?;
            let matches = self
                .credentials
                .get(id)
                .map(|stored| stored.value() == key)
                .unwrap_or(false);
            Ok(matches.then(|| Identity::user(id)))
        })
    }

    fn save(&self, record: Record) -> BoxFuture<'_, Result<Record, StoreError>> {
        Box::pin(async move {
            self.ensure_online()?;
            if record.id.is_empty() {
                return Err(StoreError::Rejected("record has no id".into()));
            }
            self.records
                .insert((record.kind, record.id.clone()), record.clone());
            tracing::debug!(kind = %record.kind, id = %record.id, "Record saved");
            Ok(record)
        })
    }

    fn register_user(&self, record: Record) -> BoxFuture<'_, Result<(Record, String), StoreError>> {
        Box::pin(async move {
            self.ensure_online()?;
            if record.kind != Kind::User {
                return Err(StoreError::Rejected(format!("cannot register a {}", record.kind)));
            }
            if record.id.is_empty() {
                return Err(StoreError::Rejected("record has no id".into()));
            }
            let key = self.issue(&record);
            tracing::debug!(id = %record.id, "User registered");
            Ok((record, key))
        })
    }

    fn query(&self, kind: Kind) -> BoxFuture<'_, Result<Vec<Record>, StoreError>> {
        Box::pin(async move {
            self.ensure_online()?;
            let mut found: Vec<Record> = self
                .records
                .iter()
                .filter(|entry| entry.key().0 == kind)
                .map(|entry| entry.value().clone())
                .collect();
            found.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(found)
        })
    }
}
