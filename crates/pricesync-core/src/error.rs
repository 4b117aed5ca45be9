//! Error types for pricesync-core

use thiserror::Error;
use uuid::Uuid;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A sync run is already in flight for the shop
    #[error("sync already running for shop {0}")]
    AlreadyRunning(Uuid),

    /// A referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// External client error
    #[error("client error: {0}")]
    Client(#[from] pricesync_clients::Error),

    /// Stored data failed validation on load
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
