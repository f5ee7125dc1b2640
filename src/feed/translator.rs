//! Change classification
//!
//! ```text
//! Loading --Ready--> Live
//! ```
//!
//! While loading, inserts are snapshot documents; once live they are new.
//! The transition happens once and emits `InitialLoadComplete`; later
//! ready signals are ignored.

use tracing::debug;

use super::event::{Change, ChangeEvent, FeedItem};
use crate::store::{RawChange, StoreResult};

/// Translator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedState {
    #[default]
    Loading,
    Live,
}

/// Classifies raw change records of one stream.
#[derive(Debug, Default)]
pub struct ChangeFeedTranslator {
    state: FeedState,
}

impl ChangeFeedTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == FeedState::Live
    }

    /// Translates one raw stream item. Returns `None` for items that
    /// produce nothing (a repeated ready signal).
    pub fn translate(&mut self, item: StoreResult<RawChange>) -> Option<FeedItem> {
        let raw = match item {
            Ok(raw) => raw,
            Err(e) => return Some(FeedItem::Error(e.into())),
        };

        match raw {
            RawChange::Ready => {
                if self.is_live() {
                    return None;
                }
                self.state = FeedState::Live;
                debug!("change feed initial load complete");
                Some(FeedItem::Event(ChangeEvent::InitialLoadComplete))
            }
            RawChange::Record { old_val, new_val } => match Change::decode(old_val, new_val) {
                Ok(change) => Some(FeedItem::Event(self.classify(change))),
                Err(e) => Some(FeedItem::Error(e)),
            },
        }
    }

    fn classify(&self, change: Change) -> ChangeEvent {
        match change {
            Change::Inserted { new } if self.is_live() => ChangeEvent::Created(new),
            Change::Inserted { new } => ChangeEvent::ExistedDuringInitialLoad(new),
            Change::Removed { old } => ChangeEvent::Deleted(old),
            Change::Changed { new, .. } => ChangeEvent::Updated(new),
        }
    }
}
