//! Migration mutex
//!
//! A single record named `migrations_running_mutex` in the migrations
//! table marks that some process is running migrations. It is taken with
//! an atomic conditional insert and released by deleting it. The record
//! does not expire: a crashed holder leaves it behind until it is removed
//! by hand.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::{MigrationError, MigrationResult};
use super::MIGRATIONS_TABLE;
use crate::document::{format_timestamp, Clock, Document, SystemClock};
use crate::query::Query;
use crate::store::DocumentStore;

/// Name of the mutex record
pub const MUTEX_NAME: &str = "migrations_running_mutex";

/// Distributed advisory lock for migration runs
pub struct MigrationMutex {
    store: Arc<dyn DocumentStore>,
    hostname: String,
    clock: Arc<dyn Clock>,
}

impl MigrationMutex {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        Self {
            store,
            hostname,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Takes the mutex or fails with `MutexLocked`.
    pub async fn acquire(&self) -> MigrationResult<()> {
        let mut fields = Map::new();
        fields.insert("name".into(), json!(MUTEX_NAME));
        fields.insert("hostname".into(), json!(self.hostname));
        fields.insert("date".into(), json!(format_timestamp(self.clock.now())));
        let record = Document::new(Uuid::new_v4(), fields);

        if self.store.insert_if_absent(MIGRATIONS_TABLE, "name", record).await? {
            info!(hostname = %self.hostname, "migration mutex acquired");
            return Ok(());
        }

        let holder = self
            .holder()
            .await?
            .and_then(|record| record.fields.get("hostname").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        warn!(%holder, "migration mutex is locked");
        Err(MigrationError::MutexLocked { holder })
    }

    /// The current mutex record, if any
    pub async fn holder(&self) -> MigrationResult<Option<Document>> {
        let query = Query::table(MIGRATIONS_TABLE).filter_eq("name", MUTEX_NAME);
        Ok(self.store.execute(&query).await?.into_iter().next())
    }

    /// Releases the mutex. Returns `false` if it was not held.
    pub async fn release(&self) -> MigrationResult<bool> {
        let Some(record) = self.holder().await? else {
            return Ok(false);
        };

        let removed = self.store.delete(MIGRATIONS_TABLE, record.id).await?.is_some();
        info!(hostname = %self.hostname, "migration mutex released");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_acquire_release() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let first = MigrationMutex::new(Arc::clone(&store)).with_hostname("alpha");
        let second = MigrationMutex::new(Arc::clone(&store)).with_hostname("beta");

        first.acquire().await.unwrap();
        let err = second.acquire().await.unwrap_err();
        assert!(matches!(err, MigrationError::MutexLocked { ref holder } if holder == "alpha"));
        assert_eq!(err.to_string(), "mutex locked (held by alpha)");

        assert!(first.release().await.unwrap());
        assert!(!first.release().await.unwrap());
        second.acquire().await.unwrap();
    }
}
