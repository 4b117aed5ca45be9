//! EventBus - broadcast-based fan-out of live sync events.
//!
//! Publishes an event per reconciled row plus terminal events so WebSocket
//! clients and internal subscribers can follow a run as it happens.

/// Core event bus implementation (broadcast channel).
pub mod bus;
/// Event type definitions for the sync run lifecycle.
pub mod types;

pub use bus::EventBus;
pub use types::SyncEvent;

#[cfg(test)]
mod tests;
