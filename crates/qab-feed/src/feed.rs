//! The change feed capability and its subscription handle.
//!
//! A [`ChangeFeed`] hands out a [`FeedSubscription`] for a named collection.
//! The subscription delivers [`ChangeBatch`]es over a bounded tokio mpsc
//! channel; the transport behind it (local spool, in-process test feed,
//! anything network-side) stays behind the trait.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::FeedError;
use crate::events::ChangeBatch;

/// Default channel capacity for batch delivery.
pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// A source of document change batches for a named collection.
///
/// Implementations own the transport; consumers only ever see the
/// [`FeedSubscription`]. The subscription contract:
///
/// 1. On first delivery, every pre-existing document in the collection
///    arrives as a synthetic `Added` event (initial sync). This repeats on
///    every new subscription, so a restarted consumer re-receives full
///    history - consumers must be idempotent.
/// 2. Live changes follow as further batches, in transport order.
/// 3. The subscription ends when [`FeedSubscription::unsubscribe`] is called
///    or the handle is dropped.
#[allow(async_fn_in_trait)] // consumers are generic, not boxed
pub trait ChangeFeed {
    /// Subscribes to the given collection.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] if the transport cannot be established.
    async fn subscribe(&self, collection: &str) -> Result<FeedSubscription, FeedError>;
}

/// A live subscription streaming change batches to an async consumer.
///
/// # Lifecycle
///
/// 1. **Creation**: obtained from [`ChangeFeed::subscribe`].
/// 2. **Delivery**: use [`recv`](Self::recv) or [`try_recv`](Self::try_recv)
///    to receive batches. The feed delivers on its own context; this handle
///    only ever reads the channel.
/// 3. **Shutdown**: call [`unsubscribe`](Self::unsubscribe) for a graceful
///    stop, or simply drop the handle. Dropping signals shutdown without
///    awaiting the transport task.
pub struct FeedSubscription {
    /// Shutdown signal sender.
    ///
    /// Sending on this channel signals the transport task to stop.
    /// Set to `None` after shutdown is initiated.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the transport task, if the feed runs one.
    ///
    /// Used to await completion and surface transport errors during
    /// unsubscribe.
    task_handle: Option<JoinHandle<Result<(), FeedError>>>,

    /// Batch receiver for async consumption.
    batch_rx: mpsc::Receiver<ChangeBatch>,

    /// The collection this subscription covers.
    collection: String,
}

impl std::fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("collection", &self.collection)
            .field("is_active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl FeedSubscription {
    /// Assembles a subscription from its transport parts.
    ///
    /// Feeds without a dedicated transport task (the in-process feed) pass
    /// `None` for both the shutdown sender and the task handle.
    pub(crate) fn from_parts(
        batch_rx: mpsc::Receiver<ChangeBatch>,
        shutdown_tx: Option<oneshot::Sender<()>>,
        task_handle: Option<JoinHandle<Result<(), FeedError>>>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            shutdown_tx,
            task_handle,
            batch_rx,
            collection: collection.into(),
        }
    }

    /// Receives the next change batch asynchronously.
    ///
    /// Returns `None` when the feed has shut down or the channel is closed.
    pub async fn recv(&mut self) -> Option<ChangeBatch> {
        self.batch_rx.recv().await
    }

    /// Tries to receive a change batch without blocking.
    pub fn try_recv(&mut self) -> Result<ChangeBatch, mpsc::error::TryRecvError> {
        self.batch_rx.try_recv()
    }

    /// Returns a mutable reference to the batch receiver.
    ///
    /// Useful when the receiver needs to participate in `tokio::select!`
    /// alongside other channels.
    pub fn batches(&mut self) -> &mut mpsc::Receiver<ChangeBatch> {
        &mut self.batch_rx
    }

    /// Returns the collection this subscription covers.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns `true` while the subscription can still deliver batches.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match (&self.shutdown_tx, &self.task_handle) {
            (Some(_), Some(handle)) => !handle.is_finished(),
            (_, None) => !self.batch_rx.is_closed(),
            (None, Some(_)) => false,
        }
    }

    /// Gracefully ends the subscription.
    ///
    /// Signals the transport task to stop, awaits its completion, and
    /// surfaces any error the transport ended with.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport task failed or panicked.
    pub async fn unsubscribe(mut self) -> Result<(), FeedError> {
        // Send shutdown signal
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if receiver is already dropped
            let _ = tx.send(());
        }

        // Await task completion
        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(FeedError::ChannelClosed),
            }
        }

        Ok(())
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        // Send shutdown signal on drop. The transport task stops when it
        // receives the signal; Drop is sync so it is not awaited here.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeEvent;
    use qab_core::Document;

    #[tokio::test]
    async fn test_recv_sees_sent_batches() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = FeedSubscription::from_parts(rx, None, None, "generated_tests");

        let batch = ChangeBatch::from_events([ChangeEvent::added(Document::new("d1"))]);
        tx.send(batch).await.expect("send");

        let received = sub.recv().await.expect("batch");
        assert_eq!(received.len(), 1);
        assert_eq!(sub.collection(), "generated_tests");
    }

    #[tokio::test]
    async fn test_recv_none_after_sender_drop() {
        let (tx, rx) = mpsc::channel::<ChangeBatch>(4);
        let mut sub = FeedSubscription::from_parts(rx, None, None, "generated_tests");

        drop(tx);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_without_task_is_ok() {
        let (_tx, rx) = mpsc::channel::<ChangeBatch>(4);
        let sub = FeedSubscription::from_parts(rx, None, None, "generated_tests");
        assert!(sub.unsubscribe().await.is_ok());
    }

    #[tokio::test]
    async fn test_is_active_tracks_channel_for_taskless_feeds() {
        let (tx, rx) = mpsc::channel::<ChangeBatch>(4);
        let sub = FeedSubscription::from_parts(rx, None, None, "generated_tests");
        assert!(sub.is_active());

        drop(tx);
        assert!(!sub.is_active());
    }
}
