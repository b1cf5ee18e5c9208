//! In-process change feed for tests and wiring experiments.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::FeedError;
use crate::events::ChangeBatch;
use crate::feed::{ChangeFeed, DEFAULT_CHANNEL_CAPACITY, FeedSubscription};

/// A change feed whose batches are pushed by the caller.
///
/// Every batch handed to [`push`](Self::push) is delivered verbatim to all
/// live subscriptions, in push order. There is no initial sync: the memory
/// feed has no backing collection to replay.
///
/// # Examples
///
/// ```
/// use qab_core::Document;
/// use qab_feed::{ChangeBatch, ChangeEvent, ChangeFeed, MemoryFeed};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), qab_feed::FeedError> {
/// let feed = MemoryFeed::new();
/// let mut sub = feed.subscribe("generated_tests").await?;
///
/// let batch = ChangeBatch::from_events([ChangeEvent::added(Document::new("doc-1"))]);
/// feed.push(batch).await;
///
/// let received = sub.recv().await.expect("delivered batch");
/// assert_eq!(received.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    /// Live subscriber channels.
    subscribers: Arc<Mutex<Vec<mpsc::Sender<ChangeBatch>>>>,
}

impl MemoryFeed {
    /// Creates a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a batch to every live subscription.
    ///
    /// Returns the number of subscriptions that received the batch. Closed
    /// subscriptions are pruned on the way.
    pub async fn push(&self, batch: ChangeBatch) -> usize {
        // Snapshot the senders so the lock is not held across await points.
        let senders: Vec<_> = self.subscribers.lock().clone();

        let mut delivered = 0;
        for sender in &senders {
            if sender.send(batch.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        self.subscribers.lock().retain(|tx| !tx.is_closed());
        delivered
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl ChangeFeed for MemoryFeed {
    #[allow(clippy::unused_async)] // Async per the trait contract; setup is sync
    async fn subscribe(&self, collection: &str) -> Result<FeedSubscription, FeedError> {
        let (batch_tx, batch_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        self.subscribers.lock().push(batch_tx);
        Ok(FeedSubscription::from_parts(batch_rx, None, None, collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeEvent;
    use qab_core::Document;

    fn batch_of(ids: &[&str]) -> ChangeBatch {
        ids.iter()
            .map(|id| ChangeEvent::added(Document::new(*id)))
            .collect()
    }

    #[tokio::test]
    async fn test_push_delivers_to_subscription() {
        let feed = MemoryFeed::new();
        let mut sub = feed.subscribe("generated_tests").await.expect("subscribe");

        let delivered = feed.push(batch_of(&["a", "b"])).await;
        assert_eq!(delivered, 1);

        let batch = sub.recv().await.expect("batch");
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_push_fans_out_to_all_subscriptions() {
        let feed = MemoryFeed::new();
        let mut first = feed.subscribe("generated_tests").await.expect("subscribe");
        let mut second = feed.subscribe("generated_tests").await.expect("subscribe");
        assert_eq!(feed.subscriber_count(), 2);

        let delivered = feed.push(batch_of(&["a"])).await;
        assert_eq!(delivered, 2);

        assert_eq!(first.recv().await.expect("batch").len(), 1);
        assert_eq!(second.recv().await.expect("batch").len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let feed = MemoryFeed::new();
        let sub = feed.subscribe("generated_tests").await.expect("subscribe");
        drop(sub);

        let delivered = feed.push(batch_of(&["a"])).await;
        assert_eq!(delivered, 0);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_push_without_subscribers() {
        let feed = MemoryFeed::new();
        assert_eq!(feed.push(batch_of(&["a"])).await, 0);
    }
}
