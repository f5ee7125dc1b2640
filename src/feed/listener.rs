//! Feed delivery
//!
//! A `ChangeFeed` pairs a raw store stream with its own translator. It can
//! be pulled item by item, consumed as a `Stream`, or handed to a sink with
//! `listen`, which forwards items on a spawned task until the stream ends
//! or the returned handle detaches.

use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::event::FeedItem;
use super::translator::{ChangeFeedTranslator, FeedState};
use crate::query::Query;
use crate::store::{ChangeStream, DocumentStore, StoreResult};

/// A live feed over one query
pub struct ChangeFeed {
    stream: ChangeStream,
    translator: ChangeFeedTranslator,
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("state", &self.translator.state())
            .finish_non_exhaustive()
    }
}

impl ChangeFeed {
    pub fn new(stream: ChangeStream) -> Self {
        Self {
            stream,
            translator: ChangeFeedTranslator::new(),
        }
    }

    /// Subscribes to a query on a store.
    pub async fn open(store: &dyn DocumentStore, query: &Query) -> StoreResult<Self> {
        Ok(Self::new(store.subscribe(query).await?))
    }

    pub fn state(&self) -> FeedState {
        self.translator.state()
    }

    /// Next translated item; `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<FeedItem> {
        loop {
            let raw = self.stream.next().await?;
            if let Some(item) = self.translator.translate(raw) {
                return Some(item);
            }
        }
    }

    /// Consumes the feed as a stream of items.
    pub fn into_stream(self) -> impl Stream<Item = FeedItem> + Send {
        stream::unfold(self, |mut feed| async move {
            let item = feed.next().await?;
            Some((item, feed))
        })
    }

    /// Forwards every item to `sink` on a spawned task.
    pub fn listen<S>(mut self, mut sink: S) -> FeedHandle
    where
        S: FnMut(FeedItem) + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut attached = true;
            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed(), if attached => match changed {
                        Ok(()) if *stop_rx.borrow() => {
                            debug!("change feed detached");
                            break;
                        }
                        Ok(()) => {}
                        // Handle dropped without detaching; keep delivering.
                        Err(_) => attached = false,
                    },
                    item = self.next() => match item {
                        Some(item) => sink(item),
                        None => break,
                    },
                }
            }
        });

        FeedHandle { stop: stop_tx, task }
    }
}

/// Controls a listening feed
#[derive(Debug)]
pub struct FeedHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Stops delivery at the next record boundary.
    pub fn detach(&self) {
        // The task may already be gone; nothing to stop then.
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the forwarding task to end.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            debug!(error = %e, "change feed task ended abnormally");
        }
    }
}
