//! # Change Feeds
//!
//! Turns a raw insert/update/delete stream into named events.
//!
//! A feed first replays the documents that currently match its query
//! (`ExistedDuringInitialLoad`), then signals `InitialLoadComplete` exactly
//! once, then reports live `Created`/`Updated`/`Deleted` events in stream
//! order. Stream errors are forwarded to the sink, never retried.
//!
//! Every feed owns its translator; feeds share no state.

mod event;
mod listener;
mod translator;

pub use event::{Change, ChangeEvent, FeedError, FeedItem};
pub use listener::{ChangeFeed, FeedHandle};
pub use translator::{ChangeFeedTranslator, FeedState};
