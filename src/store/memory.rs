//! In-memory document store
//!
//! Tables live in a `RwLock`ed map and every write is published on a
//! broadcast channel. Writes publish while holding the write lock and
//! subscriptions take their snapshot under the read lock, so a subscriber
//! sees every change exactly once: in the replay or on the live stream.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::{ChangeStream, DocumentStore, RawChange};
use crate::document::Document;
use crate::query::Query;

/// Default capacity of the change channel
pub const DEFAULT_FEED_BUFFER: usize = 256;

/// A change published to subscribers
#[derive(Debug, Clone)]
struct StoreEvent {
    table: String,
    old_val: Option<Document>,
    new_val: Option<Document>,
}

/// Reference `DocumentStore` keeping everything in memory.
///
/// Documents keep insertion order within a table.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Document>>>,
    changes: broadcast::Sender<StoreEvent>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_feed_buffer(DEFAULT_FEED_BUFFER)
    }

    /// Creates a store whose change channel holds `buffer` records per
    /// subscriber before it lags.
    pub fn with_feed_buffer(buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(buffer.max(1));
        Self {
            tables: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Number of documents in a table
    pub async fn table_len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    fn publish(&self, table: &str, old_val: Option<Document>, new_val: Option<Document>) {
        // No subscribers is not an error.
        let receivers = self
            .changes
            .send(StoreEvent {
                table: table.to_string(),
                old_val,
                new_val,
            })
            .unwrap_or(0);
        trace!(table, receivers, "change published");
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, table: &str, id: Uuid) -> StoreResult<Option<Document>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn insert(&self, table: &str, doc: Document) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let docs = tables.entry(table.to_string()).or_default();

        if docs.iter().any(|d| d.id == doc.id) {
            return Err(StoreError::DuplicateId {
                table: table.to_string(),
                id: doc.id,
            });
        }

        docs.push(doc.clone());
        self.publish(table, None, Some(doc));
        Ok(())
    }

    async fn replace(&self, table: &str, doc: Document) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .get_mut(table)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == doc.id))
            .ok_or_else(|| StoreError::Missing {
                table: table.to_string(),
                id: doc.id,
            })?;

        let old = std::mem::replace(slot, doc.clone());
        self.publish(table, Some(old), Some(doc));
        Ok(())
    }

    async fn delete(&self, table: &str, id: Uuid) -> StoreResult<Option<Document>> {
        let mut tables = self.tables.write().await;
        let Some(docs) = tables.get_mut(table) else {
            return Ok(None);
        };
        let Some(position) = docs.iter().position(|d| d.id == id) else {
            return Ok(None);
        };

        let removed = docs.remove(position);
        self.publish(table, Some(removed.clone()), None);
        Ok(Some(removed))
    }

    async fn execute(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let tables = self.tables.read().await;
        let docs = tables.get(&query.table).cloned().unwrap_or_default();
        Ok(query.apply(docs))
    }

    async fn subscribe(&self, query: &Query) -> StoreResult<ChangeStream> {
        let tables = self.tables.read().await;
        let receiver = self.changes.subscribe();
        let snapshot = query.apply(tables.get(&query.table).cloned().unwrap_or_default());
        drop(tables);

        let replay = stream::iter(
            snapshot
                .into_iter()
                .map(|doc| Ok(RawChange::record(None, Some(doc)))),
        );
        let ready = stream::once(async { Ok(RawChange::Ready) });
        let live = stream::unfold((receiver, query.clone()), |(mut receiver, query)| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if event.table != query.table {
                            continue;
                        }
                        let relevant = event.old_val.iter().chain(event.new_val.iter()).any(|d| query.matches(d));
                        if !relevant {
                            continue;
                        }
                        let change = RawChange::record(event.old_val, event.new_val);
                        return Some((Ok(change), (receiver, query)));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        return Some((Err(StoreError::Lagged(skipped)), (receiver, query)));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Ok(replay.chain(ready).chain(live).boxed())
    }

    async fn insert_if_absent(&self, table: &str, key_field: &str, doc: Document) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let docs = tables.entry(table.to_string()).or_default();

        let key = doc.get(key_field).map(|v| v.into_owned());
        let conflict = docs
            .iter()
            .any(|d| d.get(key_field).map(|v| v.into_owned()) == key);
        if conflict {
            return Ok(false);
        }

        docs.push(doc.clone());
        self.publish(table, None, Some(doc));
        Ok(true)
    }
}
