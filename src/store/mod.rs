//! Document store contract
//!
//! Resources are persisted one table per resource, named by the schema's
//! plural name. Stores execute `Query` values natively and expose a live
//! change stream for a query.
//!
//! # Change streams
//!
//! A subscription first replays every document currently matching the
//! query as an insert record, then sends `Ready`, then forwards live
//! changes whose old or new value matches the query filters.

mod errors;
mod memory;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use uuid::Uuid;

use crate::document::Document;
use crate::query::Query;

pub use errors::{StoreError, StoreResult};
pub use memory::InMemoryStore;

/// A raw change record as produced by a store
#[derive(Debug, Clone, PartialEq)]
pub enum RawChange {
    /// A change with its before and after images
    Record {
        old_val: Option<Document>,
        new_val: Option<Document>,
    },
    /// The initial replay has finished
    Ready,
}

impl RawChange {
    pub fn record(old_val: Option<Document>, new_val: Option<Document>) -> Self {
        RawChange::Record { old_val, new_val }
    }
}

/// Stream of raw change records
pub type ChangeStream = BoxStream<'static, StoreResult<RawChange>>;

/// Storage backend for documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id.
    async fn get(&self, table: &str, id: Uuid) -> StoreResult<Option<Document>>;

    /// Inserts a new document; the id must not exist yet.
    async fn insert(&self, table: &str, doc: Document) -> StoreResult<()>;

    /// Replaces a whole document; the id must exist.
    async fn replace(&self, table: &str, doc: Document) -> StoreResult<()>;

    /// Removes a document, returning it if it existed.
    async fn delete(&self, table: &str, id: Uuid) -> StoreResult<Option<Document>>;

    /// Runs a query.
    async fn execute(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Counts the documents a query returns.
    async fn count(&self, query: &Query) -> StoreResult<usize> {
        Ok(self.execute(query).await?.len())
    }

    /// Opens a change stream for a query.
    async fn subscribe(&self, query: &Query) -> StoreResult<ChangeStream>;

    /// Inserts a document unless one with the same `key_field` value exists.
    ///
    /// The check and the insert are atomic. Returns `false` when a
    /// conflicting document was found.
    async fn insert_if_absent(&self, table: &str, key_field: &str, doc: Document) -> StoreResult<bool>;
}
