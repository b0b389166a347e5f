//! Change feed subscription

use tokio::sync::broadcast;

use super::core::QueueStore;
use super::types::StoreEvent;

impl QueueStore {
    /// Subscribe to every change made through this store or its clones
    ///
    /// The receiver sees events published after this call. A receiver that
    /// falls more than the configured capacity behind gets
    /// `RecvError::Lagged` and must rescan the namespaces it cares about.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}
