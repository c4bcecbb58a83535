//! Badge-unlock event channel.
//!
//! An explicit notifier object handed to whoever needs unlock events, in
//! place of a process-wide listener registry. Subscribers that lag simply
//! miss events; unlock records themselves are already durable in the store.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
pub struct BadgeUnlockEvent {
    pub user_uid: String,
    pub badge_id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct UnlockNotifier {
    tx: broadcast::Sender<BadgeUnlockEvent>,
}

impl UnlockNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BadgeUnlockEvent> {
        self.tx.subscribe()
    }

    /// Publish an unlock. Having no live subscribers is not an error.
    pub fn notify(&self, event: BadgeUnlockEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("badge unlock event dropped: no subscribers");
        }
    }
}

impl Default for UnlockNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}
