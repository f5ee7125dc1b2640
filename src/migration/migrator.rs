//! Migration runner
//!
//! Migrations run in name order. Each applied migration is recorded in the
//! migrations table. `up` and `down` hold the migration mutex for the
//! whole run and release it whether or not the run succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use super::errors::{MigrationError, MigrationResult};
use super::mutex::{MigrationMutex, MUTEX_NAME};
use super::MIGRATIONS_TABLE;
use crate::document::{format_timestamp, BoxError, Clock, Document, SystemClock};
use crate::query::Query;
use crate::store::DocumentStore;

/// A named, ordered data migration
#[async_trait]
pub trait Migration: Send + Sync {
    fn name(&self) -> &str;

    async fn up(&self, store: &dyn DocumentStore) -> Result<(), BoxError>;

    /// Whether `down` is implemented
    fn reversible(&self) -> bool {
        false
    }

    async fn down(&self, _store: &dyn DocumentStore) -> Result<(), BoxError> {
        Err(format!("migration '{}' does not have a down step", self.name()).into())
    }
}

/// A migration with its applied status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub name: String,
    pub applied: bool,
    pub reversible: bool,
}

/// Applies and rolls back migrations
pub struct Migrator {
    store: Arc<dyn DocumentStore>,
    migrations: Vec<Arc<dyn Migration>>,
    mutex: MigrationMutex,
    clock: Arc<dyn Clock>,
}

impl Migrator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            mutex: MigrationMutex::new(Arc::clone(&store)),
            store,
            migrations: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_mutex(mut self, mutex: MigrationMutex) -> Self {
        self.mutex = mutex;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Adds a migration; the set stays sorted by name.
    pub fn register(&mut self, migration: Arc<dyn Migration>) -> &mut Self {
        self.migrations.push(migration);
        self.migrations.sort_by(|a, b| a.name().cmp(b.name()));
        self
    }

    pub fn mutex(&self) -> &MigrationMutex {
        &self.mutex
    }

    /// Every registered migration with its applied status, in name order.
    pub async fn list(&self) -> MigrationResult<Vec<MigrationStatus>> {
        let applied = self.applied_names().await?;

        Ok(self
            .migrations
            .iter()
            .map(|m| MigrationStatus {
                name: m.name().to_string(),
                applied: applied.iter().any(|name| name == m.name()),
                reversible: m.reversible(),
            })
            .collect())
    }

    /// Applies pending migrations, or only the named one.
    ///
    /// Returns the names of the migrations applied.
    pub async fn up(&self, name: Option<&str>) -> MigrationResult<Vec<String>> {
        self.mutex.acquire().await?;
        let result = self.apply_pending(name).await;
        let released = self.mutex.release().await;

        let applied = result?;
        released?;
        Ok(applied)
    }

    /// Rolls back one applied migration.
    pub async fn down(&self, name: &str) -> MigrationResult<()> {
        self.mutex.acquire().await?;
        let result = self.roll_back(name).await;
        let released = self.mutex.release().await;

        result?;
        released?;
        Ok(())
    }

    async fn apply_pending(&self, name: Option<&str>) -> MigrationResult<Vec<String>> {
        let statuses = self.list().await?;
        let pending: Vec<&MigrationStatus> = statuses
            .iter()
            .filter(|s| !s.applied && name.map_or(true, |n| n == s.name))
            .collect();

        if pending.is_empty() {
            info!("no pending migrations found");
            return Ok(Vec::new());
        }

        let mut applied = Vec::with_capacity(pending.len());
        for status in pending {
            let migration = self.find(&status.name)?;
            info!(migration = %status.name, "migrating");

            migration
                .up(self.store.as_ref())
                .await
                .map_err(|e| failed(&status.name, e))?;
            self.record(&status.name).await?;
            applied.push(status.name.clone());
        }

        Ok(applied)
    }

    async fn roll_back(&self, name: &str) -> MigrationResult<()> {
        let statuses = self.list().await?;
        let status = statuses
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| MigrationError::UnknownMigration(name.to_string()))?;

        if !status.applied {
            return Err(MigrationError::NotApplied(name.to_string()));
        }
        if !status.reversible {
            return Err(MigrationError::NoDownStep(name.to_string()));
        }

        info!(migration = name, "rolling back");
        self.find(name)?
            .down(self.store.as_ref())
            .await
            .map_err(|e| failed(name, e))?;

        for record in self.records().await? {
            if record.fields.get("name").and_then(Value::as_str) == Some(name) {
                self.store.delete(MIGRATIONS_TABLE, record.id).await?;
            }
        }
        Ok(())
    }

    fn find(&self, name: &str) -> MigrationResult<&Arc<dyn Migration>> {
        self.migrations
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| MigrationError::UnknownMigration(name.to_string()))
    }

    async fn record(&self, name: &str) -> MigrationResult<()> {
        let mut fields = Map::new();
        fields.insert("name".into(), json!(name));
        fields.insert("date".into(), json!(format_timestamp(self.clock.now())));
        self.store
            .insert(MIGRATIONS_TABLE, Document::new(Uuid::new_v4(), fields))
            .await?;
        Ok(())
    }

    async fn records(&self) -> MigrationResult<Vec<Document>> {
        Ok(self.store.execute(&Query::table(MIGRATIONS_TABLE)).await?)
    }

    async fn applied_names(&self) -> MigrationResult<Vec<String>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter_map(|r| r.fields.get("name").and_then(Value::as_str).map(str::to_string))
            .filter(|name| name != MUTEX_NAME)
            .collect())
    }
}

fn failed(name: &str, error: BoxError) -> MigrationError {
    MigrationError::Failed {
        name: name.to_string(),
        reason: error.to_string(),
    }
}
