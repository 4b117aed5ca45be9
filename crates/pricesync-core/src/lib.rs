//! PriceSync Core - the sync engine
//!
//! Reconciles spreadsheet pricing rows against Shopify product variants:
//! per-shop run state, the row-by-row reconciliation loop, persistence of
//! sessions and per-row outcomes, and the live event broadcast.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event_bus;
pub mod registry;
pub mod store;
pub mod sync;
pub mod types;

pub use error::{Error, Result};
pub use event_bus::{EventBus, SyncEvent};
pub use registry::RunRegistry;
pub use store::SyncStore;
pub use sync::{ClientFactory, LiveClientFactory, SyncService};
pub use types::{LogOutcome, Shop, SyncLog, SyncSession, SyncStatus};
