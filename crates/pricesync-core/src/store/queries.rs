use super::SyncStore;
use crate::error::{Error, Result};
use crate::types::{LogRow, SessionRow, Shop, ShopRow, SyncLog, SyncSession, SyncStatus};
use chrono::Utc;
use uuid::Uuid;

impl SyncStore {
    /// Create a new shop
    pub async fn create_shop(&self, shop: &Shop) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shops (
                id, domain, access_token, sheet_name, service_account_json,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(shop.id.to_string())
        .bind(&shop.domain)
        .bind(&shop.access_token)
        .bind(&shop.sheet_name)
        .bind(&shop.service_account_json)
        .bind(shop.created_at)
        .bind(shop.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a shop by id
    pub async fn get_shop(&self, id: Uuid) -> Result<Shop> {
        let row: ShopRow = sqlx::query_as("SELECT * FROM shops WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("shop {id}")))?;

        row.try_into()
    }

    /// List all shops, newest first
    pub async fn list_shops(&self) -> Result<Vec<Shop>> {
        let rows: Vec<ShopRow> = sqlx::query_as("SELECT * FROM shops ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Delete a shop and, via cascade, its sessions and logs
    pub async fn delete_shop(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM shops WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("shop {id}")));
        }

        Ok(())
    }

    /// Create a new sync session
    pub async fn create_session(&self, session: &SyncSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_sessions (
                id, shop_id, sheet_id, status, total_rows, processed_rows,
                updated_count, not_found_count, error_count, started_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.shop_id.to_string())
        .bind(&session.sheet_id)
        .bind(session.status.as_str())
        .bind(session.total_rows)
        .bind(session.processed_rows)
        .bind(session.updated_count)
        .bind(session.not_found_count)
        .bind(session.error_count)
        .bind(session.started_at)
        .bind(session.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a session by id
    pub async fn get_session(&self, id: Uuid) -> Result<SyncSession> {
        let row: SessionRow = sqlx::query_as("SELECT * FROM sync_sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("sync session {id}")))?;

        row.try_into()
    }

    /// Persist the total row count before the first row is processed
    pub async fn set_session_total(&self, id: Uuid, total_rows: i64) -> Result<()> {
        sqlx::query("UPDATE sync_sessions SET total_rows = ? WHERE id = ?")
            .bind(total_rows)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Persist the running counters after a row
    pub async fn update_session_counts(
        &self,
        id: Uuid,
        processed_rows: i64,
        updated_count: i64,
        not_found_count: i64,
        error_count: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sync_sessions SET
                processed_rows = ?, updated_count = ?, not_found_count = ?, error_count = ?
            WHERE id = ?
            "#,
        )
        .bind(processed_rows)
        .bind(updated_count)
        .bind(not_found_count)
        .bind(error_count)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Move a running session to a terminal status.
    ///
    /// The transition is write-once: only a session still in `running`
    /// state is touched, so a stop request racing the loop's own finalize
    /// cannot flip an already-terminal status. Returns whether this call
    /// performed the transition.
    pub async fn finalize_session(&self, id: Uuid, status: SyncStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sync_sessions SET status = ?, completed_at = ? WHERE id = ? AND status = 'running'",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The currently running session for a shop, if any
    pub async fn running_session_for_shop(&self, shop_id: Uuid) -> Result<Option<SyncSession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT * FROM sync_sessions WHERE shop_id = ? AND status = 'running' ORDER BY started_at DESC LIMIT 1",
        )
        .bind(shop_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Mark the shop's running session stopped, if one exists.
    ///
    /// Returns whether a session was actually transitioned.
    pub async fn stop_running_session(&self, shop_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sync_sessions SET status = 'stopped', completed_at = ? WHERE shop_id = ? AND status = 'running'",
        )
        .bind(Utc::now())
        .bind(shop_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recent sessions for a shop, newest first
    pub async fn sessions_for_shop(&self, shop_id: Uuid, limit: i64) -> Result<Vec<SyncSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT * FROM sync_sessions WHERE shop_id = ? ORDER BY started_at DESC LIMIT ?",
        )
        .bind(shop_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Append one row outcome
    pub async fn insert_log(&self, log: &SyncLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_logs (
                id, session_id, sku, outcome, old_price, new_price,
                old_compare_at_price, new_compare_at_price, message, variant_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.id.to_string())
        .bind(log.session_id.to_string())
        .bind(&log.sku)
        .bind(log.outcome.as_str())
        .bind(log.old_price)
        .bind(log.new_price)
        .bind(log.old_compare_at_price)
        .bind(log.new_compare_at_price)
        .bind(&log.message)
        .bind(log.variant_id)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All row outcomes of a session, in processing order
    pub async fn logs_for_session(&self, session_id: Uuid) -> Result<Vec<SyncLog>> {
        // rowid keeps insertion order even when timestamps collide
        let rows: Vec<LogRow> =
            sqlx::query_as("SELECT * FROM sync_logs WHERE session_id = ? ORDER BY rowid ASC")
                .bind(session_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Recent row outcomes across all sessions, newest first.
    ///
    /// Used to backfill the live log view when a subscriber connects.
    pub async fn recent_logs(&self, limit: i64) -> Result<Vec<SyncLog>> {
        let rows: Vec<LogRow> =
            sqlx::query_as("SELECT * FROM sync_logs ORDER BY rowid DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
