//! Run registry
//!
//! In-memory guard for the one-run-per-shop invariant. The flag is
//! deliberately not durable: after a process restart every shop is idle
//! again no matter what the persisted session rows say.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Tracks which shops currently have a reconciliation loop in flight.
///
/// Clones share the underlying set, so the service and its spawned
/// runners observe the same flags.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    running: Arc<RwLock<HashSet<Uuid>>>,
}

impl RunRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the running slot for a shop.
    ///
    /// Returns `false` when a run already holds it. Check and insert
    /// happen under one write lock, so two racing starts cannot both win.
    pub async fn try_acquire(&self, shop_id: Uuid) -> bool {
        self.running.write().await.insert(shop_id)
    }

    /// Release the slot. Safe to call when it is not held.
    pub async fn release(&self, shop_id: Uuid) {
        self.running.write().await.remove(&shop_id);
    }

    /// Whether a run currently holds the slot for this shop.
    pub async fn is_running(&self, shop_id: Uuid) -> bool {
        self.running.read().await.contains(&shop_id)
    }
}
