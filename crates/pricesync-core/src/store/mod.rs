//! Sync storage using SQLite
//!
//! Persists shops, sync sessions and per-row sync logs.

mod migrations;
mod queries;


use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

use crate::error::{Error, Result};

/// SQLite-backed store for the sync engine
pub struct SyncStore {
    pub(super) pool: Pool<Sqlite>,
}

impl SyncStore {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn from_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("failed to create database directory: {e}"))
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }
}
