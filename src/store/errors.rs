//! Store errors

use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Insert of an id that already exists
    #[error("document {id} already exists in '{table}'")]
    DuplicateId { table: String, id: Uuid },

    /// Replace of a document that does not exist
    #[error("document {id} does not exist in '{table}'")]
    Missing { table: String, id: Uuid },

    /// A change stream subscriber fell behind and lost records
    #[error("change stream lagged, {0} records skipped")]
    Lagged(u64),

    /// The change stream ended
    #[error("change stream closed")]
    Closed,

    /// Backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend(reason.into())
    }
}
