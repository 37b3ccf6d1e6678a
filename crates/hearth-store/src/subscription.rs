//! Subscription handles with guaranteed cleanup.

use tokio::sync::mpsc;

use crate::change::ChangeBatch;

/// Teardown callback invoked when a [`Subscription`] is dropped.
pub type UnsubscribeFn = Box<dyn FnOnce() + Send>;

/// A live change subscription.
///
/// Receives [`ChangeBatch`]es in server order and unsubscribes from the
/// store when dropped. Holding the handle is what keeps the listener alive;
/// there is no separate unsubscribe call to forget.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeBatch>,
    unsubscribe: Option<UnsubscribeFn>,
}

impl Subscription {
    /// Pair a batch receiver with its teardown callback.
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeBatch>, unsubscribe: UnsubscribeFn) -> Self {
        Self {
            rx,
            unsubscribe: Some(unsubscribe),
        }
    }

    /// Wait for the next change batch.
    ///
    /// Returns `None` once the store side has gone away.
    pub async fn next_batch(&mut self) -> Option<ChangeBatch> {
        self.rx.recv().await
    }

    /// Take the next batch if one is already queued.
    pub fn try_next_batch(&mut self) -> Option<ChangeBatch> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
