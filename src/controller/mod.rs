//! # Resource Controllers
//!
//! The capability set a transport layer exposes per resource:
//! `all`, `find`, `create`, `update`, `replace`, `delete` and `watch`.
//!
//! `ResourceController` provides the standard behavior for every operation
//! on top of one required accessor, `mutator()`. Implementors override the
//! operations they need to change and reach the standard behavior through
//! the `standard_*` functions.

mod resources;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::{Document, DocumentMutator, MergePatch, ResourceResult};
use crate::feed::ChangeFeed;
use crate::query::RequestParams;
use crate::schema::{Reason, Schema, ValidationError};

pub use resources::Resources;

/// Status a transport layer reports for a successful create
pub const STATUS_CREATED: u16 = 201;

/// Status a transport layer reports for other successful operations
pub const STATUS_OK: u16 = 200;

/// Controller operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    All,
    Find,
    Create,
    Update,
    Replace,
    Delete,
    Watch,
}

impl Operation {
    /// HTTP status code for a successful operation
    pub fn success_status(&self) -> u16 {
        match self {
            Operation::Create => STATUS_CREATED,
            _ => STATUS_OK,
        }
    }
}

/// A live feed together with the number of documents its query matches
#[derive(Debug)]
pub struct Watch {
    pub feed: ChangeFeed,
    pub count: usize,
}

/// Per-resource operations with standard defaults
#[async_trait]
pub trait ResourceController: Send + Sync {
    /// Mutator of the controlled resource
    fn mutator(&self) -> &DocumentMutator;

    fn schema(&self) -> &Arc<Schema> {
        self.mutator().schema()
    }

    async fn all(&self, params: &RequestParams) -> ResourceResult<Vec<Document>> {
        standard_all(self.mutator(), params).await
    }

    async fn find(&self, id: &str) -> ResourceResult<Document> {
        standard_find(self.mutator(), id).await
    }

    async fn create(&self, data: Value) -> ResourceResult<Document> {
        standard_create(self.mutator(), data).await
    }

    async fn update(&self, id: &str, patch: Value) -> ResourceResult<Document> {
        standard_update(self.mutator(), id, patch).await
    }

    async fn replace(&self, id: &str, data: Value) -> ResourceResult<Document> {
        standard_replace(self.mutator(), id, data).await
    }

    async fn delete(&self, id: &str) -> ResourceResult<Document> {
        standard_delete(self.mutator(), id).await
    }

    async fn watch(&self, params: &RequestParams) -> ResourceResult<Watch> {
        standard_watch(self.mutator(), params).await
    }
}

pub async fn standard_all(mutator: &DocumentMutator, params: &RequestParams) -> ResourceResult<Vec<Document>> {
    mutator.all(params).await
}

pub async fn standard_find(mutator: &DocumentMutator, id: &str) -> ResourceResult<Document> {
    mutator.find(id).await
}

pub async fn standard_create(mutator: &DocumentMutator, data: Value) -> ResourceResult<Document> {
    mutator.create(data).await
}

/// Applies `patch` as a merge patch; `null` members delete fields.
pub async fn standard_update(mutator: &DocumentMutator, id: &str, patch: Value) -> ResourceResult<Document> {
    // NotFound wins over a malformed body.
    mutator.find(id).await?;
    let patch = MergePatch::from_value(patch)
        .ok_or_else(|| ValidationError::single("$root", Reason::TypeMismatch("object")))?;
    mutator.update(id, patch).await
}

pub async fn standard_replace(mutator: &DocumentMutator, id: &str, data: Value) -> ResourceResult<Document> {
    mutator.replace(id, data).await
}

pub async fn standard_delete(mutator: &DocumentMutator, id: &str) -> ResourceResult<Document> {
    mutator.delete(id).await
}

/// Opens the feed and counts the matching documents concurrently.
pub async fn standard_watch(mutator: &DocumentMutator, params: &RequestParams) -> ResourceResult<Watch> {
    let query = mutator.query(params);
    let store = mutator.store().as_ref();

    let (feed, count) = tokio::try_join!(ChangeFeed::open(store, &query), store.count(&query))?;
    Ok(Watch { feed, count })
}

/// The stock controller
pub struct StandardController {
    mutator: DocumentMutator,
}

impl StandardController {
    pub fn new(mutator: DocumentMutator) -> Self {
        Self { mutator }
    }
}

#[async_trait]
impl ResourceController for StandardController {
    fn mutator(&self) -> &DocumentMutator {
        &self.mutator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ResourceError;
    use crate::schema::FieldSpec;
    use crate::store::InMemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mutator() -> DocumentMutator {
        let schema = Schema::new("thing", "things")
            .with_id()
            .with_property("name", FieldSpec::string())
            .requiring(["name"]);
        DocumentMutator::new(Arc::new(schema), Arc::new(InMemoryStore::new())).unwrap()
    }

    /// Counts creates, then defers to the standard behavior.
    struct CountingController {
        mutator: DocumentMutator,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl ResourceController for CountingController {
        fn mutator(&self) -> &DocumentMutator {
            &self.mutator
        }

        async fn create(&self, data: Value) -> ResourceResult<Document> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            standard_create(self.mutator(), data).await
        }
    }

    #[tokio::test]
    async fn test_override_reaches_standard_behavior() {
        let controller = CountingController {
            mutator: mutator(),
            creates: AtomicUsize::new(0),
        };

        let doc = controller.create(json!({ "name": "x" })).await.unwrap();
        assert_eq!(controller.creates.load(Ordering::SeqCst), 1);
        assert_eq!(controller.find(&doc.id.to_string()).await.unwrap(), doc);
        assert_eq!(controller.all(&RequestParams::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_non_object_patch() {
        let controller = StandardController::new(mutator());
        let doc = controller.create(json!({ "name": "x" })).await.unwrap();

        let err = controller.update(&doc.id.to_string(), json!(5)).await.unwrap_err();
        assert_eq!(err.status_code(), 422);

        let err = controller
            .update(&uuid::Uuid::new_v4().to_string(), json!(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_watch_counts_matches() {
        let controller = StandardController::new(mutator());
        controller.create(json!({ "name": "a" })).await.unwrap();
        controller.create(json!({ "name": "b" })).await.unwrap();

        let params = RequestParams::new().with("name", "a");
        let watch = controller.watch(&params).await.unwrap();
        assert_eq!(watch.count, 1);
    }

    #[test]
    fn test_success_status() {
        assert_eq!(Operation::Create.success_status(), 201);
        assert_eq!(Operation::Find.success_status(), 200);
    }
}
