//! Sync orchestrator
//!
//! Owns per-shop run state, drives the row-by-row reconciliation loop and
//! broadcasts progress to live subscribers. At most one `running` session
//! exists per shop, enforced by the in-memory [`RunRegistry`]; the flag is
//! not durable, so after a process restart every shop is idle again
//! regardless of what the session table says.

mod factory;
mod runner;

#[cfg(test)]
mod tests;

pub use factory::{ClientFactory, LiveClientFactory};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, SyncEvent};
use crate::registry::RunRegistry;
use crate::store::SyncStore;
use crate::types::SyncSession;
use runner::SyncRunner;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Drives sync runs and exposes their live status.
pub struct SyncService {
    store: Arc<SyncStore>,
    registry: RunRegistry,
    events: EventBus,
    factory: Arc<dyn ClientFactory>,
    config: SyncConfig,
}

impl SyncService {
    /// Create a service over the given store and client factory.
    pub fn new(store: Arc<SyncStore>, factory: Arc<dyn ClientFactory>, config: SyncConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            store,
            registry: RunRegistry::new(),
            events,
            factory,
            config,
        }
    }

    /// Broadcast bus for live subscribers.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Start a reconciliation run for a shop.
    ///
    /// Returns the new session id as soon as the run is launched; the loop
    /// itself completes in a detached task, independent of the caller.
    /// Fails with [`Error::AlreadyRunning`] when a run is in flight and
    /// [`Error::NotFound`] when the shop cannot be loaded; neither failure
    /// mutates any state.
    pub async fn start_sync(&self, shop_id: Uuid, sheet_id: &str) -> Result<Uuid> {
        if self.registry.is_running(shop_id).await {
            return Err(Error::AlreadyRunning(shop_id));
        }
        let shop = self.store.get_shop(shop_id).await?;

        if !self.registry.try_acquire(shop_id).await {
            // lost the race between the peek above and the claim
            return Err(Error::AlreadyRunning(shop_id));
        }

        let clients = self
            .factory
            .catalog(&shop)
            .and_then(|catalog| self.factory.sheet(&shop).map(|sheet| (catalog, sheet)));
        let (catalog, sheet) = match clients {
            Ok(pair) => pair,
            Err(e) => {
                self.registry.release(shop_id).await;
                return Err(e);
            }
        };

        let session = SyncSession::new(shop_id, sheet_id);
        if let Err(e) = self.store.create_session(&session).await {
            self.registry.release(shop_id).await;
            return Err(e);
        }

        let session_id = session.id;
        let runner = SyncRunner::new(
            Arc::clone(&self.store),
            self.registry.clone(),
            self.events.clone(),
            self.config.row_delay(),
            shop,
            session_id,
            sheet_id.to_string(),
            catalog,
            sheet,
        );

        info!(%shop_id, %session_id, sheet = sheet_id, "sync run launched");
        let task = tokio::spawn(runner.run());

        // watch the detached task only to log a panic and free the slot;
        // the runner releases the registry itself on every normal path
        let registry = self.registry.clone();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!(%shop_id, %session_id, error = %e, "sync task aborted unexpectedly");
                registry.release(shop_id).await;
            }
        });

        Ok(session_id)
    }

    /// Request a running sync to stop at its next row boundary.
    ///
    /// Clears the in-memory flag and marks the persisted session stopped
    /// right away. This is a logical request: the loop may still be inside
    /// the current row and will finalize idempotently on top of this.
    pub async fn stop_sync(&self, shop_id: Uuid) -> Result<()> {
        self.registry.release(shop_id).await;
        let stopped = self.store.stop_running_session(shop_id).await?;
        if stopped {
            info!(%shop_id, "sync stop requested");
        } else {
            debug!(%shop_id, "stop requested with no running session");
        }
        Ok(())
    }

    /// Stop any active run and tell observers to reset, even when idle.
    pub async fn clear_session(&self, shop_id: Uuid) -> Result<()> {
        self.stop_sync(shop_id).await?;
        self.events.publish(SyncEvent::Complete {
            shop_id,
            session_id: None,
            status: None,
        });
        Ok(())
    }

    /// Snapshot of the currently running session, if any.
    pub async fn get_sync_status(&self, shop_id: Uuid) -> Result<Option<SyncSession>> {
        self.store.running_session_for_shop(shop_id).await
    }
}
