use super::SyncStore;
use crate::error::Result;

impl SyncStore {
    /// Run database migrations
    pub(super) async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shops (
                id TEXT PRIMARY KEY,
                domain TEXT NOT NULL UNIQUE,
                access_token TEXT NOT NULL,
                sheet_name TEXT NOT NULL DEFAULT 'Sheet1',
                service_account_json TEXT,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_sessions (
                id TEXT PRIMARY KEY,
                shop_id TEXT NOT NULL,
                sheet_id TEXT NOT NULL,
                status TEXT NOT NULL,
                total_rows INTEGER NOT NULL DEFAULT 0,
                processed_rows INTEGER NOT NULL DEFAULT 0,
                updated_count INTEGER NOT NULL DEFAULT 0,
                not_found_count INTEGER NOT NULL DEFAULT 0,
                error_count INTEGER NOT NULL DEFAULT 0,
                started_at TIMESTAMP NOT NULL,
                completed_at TIMESTAMP,
                FOREIGN KEY (shop_id) REFERENCES shops(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sync_logs (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                sku TEXT NOT NULL,
                outcome TEXT NOT NULL,
                old_price REAL,
                new_price REAL,
                old_compare_at_price REAL,
                new_compare_at_price REAL,
                message TEXT,
                variant_id INTEGER,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sync_sessions(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_shop_status ON sync_sessions(shop_id, status)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_logs_session ON sync_logs(session_id)")
            .execute(&mut *tx)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_logs_created ON sync_logs(created_at)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
