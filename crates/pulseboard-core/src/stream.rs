// ── Reactive view streams ──
//
// Subscription type for consuming view snapshots published by the stores.

use std::sync::Arc;

use tokio::sync::watch;

/// A subscription to one published view snapshot.
///
/// Provides point-in-time snapshot access and change notification via
/// [`changed`](Self::changed).
pub struct ViewStream<S: Send + Sync + 'static> {
    receiver: watch::Receiver<Arc<S>>,
}

impl<S: Send + Sync + 'static> ViewStream<S> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<S>>) -> Self {
        Self { receiver }
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<S> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the owning store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<S>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl<S: Send + Sync + 'static> Clone for ViewStream<S> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
        }
    }
}
