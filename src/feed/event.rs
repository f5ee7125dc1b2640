//! # Feed Events
//!
//! Typed events emitted by a change feed.

use serde::Serialize;
use thiserror::Error;

use crate::document::Document;
use crate::store::StoreError;

/// A classified change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "document", rename_all = "camelCase")]
pub enum ChangeEvent {
    /// Document was part of the initial snapshot
    ExistedDuringInitialLoad(Document),
    /// Document was inserted after the snapshot
    Created(Document),
    /// Document was changed; carries the new value
    Updated(Document),
    /// Document was removed; carries the old value
    Deleted(Document),
    /// The initial snapshot has been delivered
    InitialLoadComplete,
}

impl ChangeEvent {
    /// Short event name
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::ExistedDuringInitialLoad(_) => "existed",
            ChangeEvent::Created(_) => "created",
            ChangeEvent::Updated(_) => "updated",
            ChangeEvent::Deleted(_) => "deleted",
            ChangeEvent::InitialLoadComplete => "all:loaded",
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            ChangeEvent::ExistedDuringInitialLoad(doc)
            | ChangeEvent::Created(doc)
            | ChangeEvent::Updated(doc)
            | ChangeEvent::Deleted(doc) => Some(doc),
            ChangeEvent::InitialLoadComplete => None,
        }
    }
}

/// Feed errors
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// The underlying stream reported an error
    #[error("{0}")]
    Store(#[from] StoreError),

    /// A change record carried neither an old nor a new value
    #[error("change record has neither an old nor a new value")]
    EmptyRecord,
}

/// What a feed delivers to its sink
#[derive(Debug, Clone)]
pub enum FeedItem {
    Event(ChangeEvent),
    Error(FeedError),
}

impl FeedItem {
    pub fn event(&self) -> Option<&ChangeEvent> {
        match self {
            FeedItem::Event(event) => Some(event),
            FeedItem::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FeedItem::Error(_))
    }
}

/// A decoded change record
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Inserted { new: Document },
    Removed { old: Document },
    Changed { old: Document, new: Document },
}

impl Change {
    /// Decodes the before and after images of a raw record.
    pub fn decode(old_val: Option<Document>, new_val: Option<Document>) -> Result<Self, FeedError> {
        match (old_val, new_val) {
            (None, Some(new)) => Ok(Change::Inserted { new }),
            (Some(old), None) => Ok(Change::Removed { old }),
            (Some(old), Some(new)) => Ok(Change::Changed { old, new }),
            (None, None) => Err(FeedError::EmptyRecord),
        }
    }
}
