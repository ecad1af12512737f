//! Push subscriptions delivering full ordered snapshots

use tokio::sync::mpsc;

use crate::document::Document;
use crate::error::StoreResult;

/// Complete ordered result set of a query at one point in time
pub type Snapshot = Vec<Document>;

pub(crate) type SnapshotSender = mpsc::UnboundedSender<StoreResult<Snapshot>>;

type CancelFn = Box<dyn FnOnce() + Send>;

/// Live query handle.
///
/// Every item is the entire current result set, never a diff. Dropping the
/// handle (or calling [`Subscription::unsubscribe`]) releases the
/// store-side watcher; nothing is delivered afterwards.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<StoreResult<Snapshot>>,
    cancel: Option<CancelFn>,
}

impl Subscription {
    pub(crate) fn channel() -> (SnapshotSender, mpsc::UnboundedReceiver<StoreResult<Snapshot>>) {
        mpsc::unbounded_channel()
    }

    pub(crate) fn new<F>(receiver: mpsc::UnboundedReceiver<StoreResult<Snapshot>>, cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Wait for the next snapshot. `None` once the store closes the stream.
    pub async fn next(&mut self) -> Option<StoreResult<Snapshot>> {
        self.receiver.recv().await
    }

    /// Next snapshot if one is already queued
    pub fn try_next(&mut self) -> Option<StoreResult<Snapshot>> {
        self.receiver.try_recv().ok()
    }

    /// Stop the subscription and release the store-side watcher
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
