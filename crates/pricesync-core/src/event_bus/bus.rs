use super::types::SyncEvent;
use tokio::sync::broadcast;

/// Broadcast-based event bus for live sync events.
///
/// Uses `tokio::broadcast` so any number of subscribers receive the same
/// events. Delivery is best-effort: a subscriber that falls behind by more
/// than the channel capacity misses events (lagged) instead of blocking
/// the reconciliation loop, and there is no replay of missed events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all active subscribers.
    ///
    /// Returns the number of subscribers that received the event; with no
    /// subscribers the event is silently dropped.
    pub fn publish(&self, event: SyncEvent) -> usize {
        // send() errors only when there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
