//! Sync engine domain types
//!
//! Shops, sync sessions and per-row sync logs, plus the sqlx row types
//! they are loaded from.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A connected storefront: catalog credentials plus sheet defaults.
#[derive(Debug, Clone)]
pub struct Shop {
    /// Unique shop id
    pub id: Uuid,
    /// Shop domain, e.g. `my-store.myshopify.com`
    pub domain: String,
    /// Admin API access token
    pub access_token: String,
    /// Spreadsheet tab holding the pricing rows
    pub sheet_name: String,
    /// Per-shop service-account payload; the process-wide fallback applies
    /// when absent
    pub service_account_json: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    /// Create a new shop record with the default sheet tab name.
    pub fn new(domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            access_token: access_token.into(),
            sheet_name: "Sheet1".to_string(),
            service_account_json: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the sheet tab name
    #[must_use]
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Set a per-shop service-account payload
    #[must_use]
    pub fn with_service_account_json(mut self, json: impl Into<String>) -> Self {
        self.service_account_json = Some(json.into());
        self
    }
}

/// Lifecycle status of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Reconciliation loop in flight
    Running,
    /// All rows processed
    Completed,
    /// Setup or bulk fetch failed before/outside the row loop
    Failed,
    /// Stop request observed at a row boundary
    Stopped,
}

impl SyncStatus {
    /// Stable string form used in storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    /// Whether this status ends a session.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "stopped" => Ok(Self::Stopped),
            other => Err(Error::InvalidData(format!("unknown sync status: {other}"))),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciliation attempt for one shop.
///
/// Counters are monotonically non-decreasing while the session runs and
/// satisfy `updated + not_found + error = processed <= total` after every
/// row.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSession {
    /// Unique session id
    pub id: Uuid,
    /// Shop the run belongs to
    pub shop_id: Uuid,
    /// Source spreadsheet id
    pub sheet_id: String,
    /// Current lifecycle status
    pub status: SyncStatus,
    /// Row count persisted before the first row is processed
    pub total_rows: i64,
    /// Rows accounted for so far
    pub processed_rows: i64,
    /// Rows whose variant price was updated
    pub updated_count: i64,
    /// Rows with no matching catalog variant
    pub not_found_count: i64,
    /// Rows that errored during lookup/update
    pub error_count: i64,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
    /// Terminal timestamp; `None` while running
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncSession {
    /// Create a fresh `running` session.
    pub fn new(shop_id: Uuid, sheet_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            shop_id,
            sheet_id: sheet_id.into(),
            status: SyncStatus::Running,
            total_rows: 0,
            processed_rows: 0,
            updated_count: 0,
            not_found_count: 0,
            error_count: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Outcome bucket of one reconciled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutcome {
    /// Variant found and price updated
    Success,
    /// No catalog variant carries the SKU
    NotFound,
    /// Lookup or update raised an error
    Error,
}

impl LogOutcome {
    /// Stable string form used in storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "not_found" => Ok(Self::NotFound),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidData(format!("unknown log outcome: {other}"))),
        }
    }
}

/// The immutable record of one reconciled spreadsheet row.
#[derive(Debug, Clone, Serialize)]
pub struct SyncLog {
    /// Unique log id
    pub id: Uuid,
    /// Owning session
    pub session_id: Uuid,
    /// SKU of the reconciled row
    pub sku: String,
    /// Outcome bucket
    pub outcome: LogOutcome,
    /// Variant price before the update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_price: Option<f64>,
    /// Price written (for `not_found`: the price that would have been
    /// written)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_price: Option<f64>,
    /// Compare-at price before the update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_compare_at_price: Option<f64>,
    /// Compare-at price after the update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_compare_at_price: Option<f64>,
    /// Diagnostic message (only for `error`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Catalog variant id (only for `success`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl SyncLog {
    /// Record a successful price update.
    #[allow(clippy::too_many_arguments)]
    pub fn success(
        session_id: Uuid,
        sku: impl Into<String>,
        old_price: Option<f64>,
        new_price: f64,
        old_compare_at_price: Option<f64>,
        new_compare_at_price: Option<f64>,
        variant_id: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            sku: sku.into(),
            outcome: LogOutcome::Success,
            old_price,
            new_price: Some(new_price),
            old_compare_at_price,
            new_compare_at_price,
            message: None,
            variant_id: Some(variant_id),
            created_at: Utc::now(),
        }
    }

    /// Record a SKU with no matching variant, keeping the price that would
    /// have been written.
    pub fn not_found(
        session_id: Uuid,
        sku: impl Into<String>,
        target_price: f64,
        target_compare_at_price: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            sku: sku.into(),
            outcome: LogOutcome::NotFound,
            old_price: None,
            new_price: Some(target_price),
            old_compare_at_price: None,
            new_compare_at_price: target_compare_at_price,
            message: None,
            variant_id: None,
            created_at: Utc::now(),
        }
    }

    /// Record a row whose lookup or update errored.
    pub fn error(session_id: Uuid, sku: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            sku: sku.into(),
            outcome: LogOutcome::Error,
            old_price: None,
            new_price: None,
            old_compare_at_price: None,
            new_compare_at_price: None,
            message: Some(message.into()),
            variant_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Internal row type for shop queries
#[derive(FromRow)]
pub(crate) struct ShopRow {
    pub id: String,
    pub domain: String,
    pub access_token: String,
    pub sheet_name: String,
    pub service_account_json: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ShopRow> for Shop {
    type Error = Error;

    fn try_from(row: ShopRow) -> Result<Self> {
        Ok(Shop {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| Error::InvalidData(format!("invalid shop id: {e}")))?,
            domain: row.domain,
            access_token: row.access_token,
            sheet_name: row.sheet_name,
            service_account_json: row.service_account_json,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for session queries
#[derive(FromRow)]
pub(crate) struct SessionRow {
    pub id: String,
    pub shop_id: String,
    pub sheet_id: String,
    pub status: String,
    pub total_rows: i64,
    pub processed_rows: i64,
    pub updated_count: i64,
    pub not_found_count: i64,
    pub error_count: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for SyncSession {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(SyncSession {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| Error::InvalidData(format!("invalid session id: {e}")))?,
            shop_id: Uuid::parse_str(&row.shop_id)
                .map_err(|e| Error::InvalidData(format!("invalid shop id: {e}")))?,
            sheet_id: row.sheet_id,
            status: row.status.parse()?,
            total_rows: row.total_rows,
            processed_rows: row.processed_rows,
            updated_count: row.updated_count,
            not_found_count: row.not_found_count,
            error_count: row.error_count,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

/// Internal row type for log queries
#[derive(FromRow)]
pub(crate) struct LogRow {
    pub id: String,
    pub session_id: String,
    pub sku: String,
    pub outcome: String,
    pub old_price: Option<f64>,
    pub new_price: Option<f64>,
    pub old_compare_at_price: Option<f64>,
    pub new_compare_at_price: Option<f64>,
    pub message: Option<String>,
    pub variant_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LogRow> for SyncLog {
    type Error = Error;

    fn try_from(row: LogRow) -> Result<Self> {
        Ok(SyncLog {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| Error::InvalidData(format!("invalid log id: {e}")))?,
            session_id: Uuid::parse_str(&row.session_id)
                .map_err(|e| Error::InvalidData(format!("invalid session id: {e}")))?,
            sku: row.sku,
            outcome: row.outcome.parse()?,
            old_price: row.old_price,
            new_price: row.new_price,
            old_compare_at_price: row.old_compare_at_price,
            new_compare_at_price: row.new_compare_at_price,
            message: row.message,
            variant_id: row.variant_id,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            SyncStatus::Running,
            SyncStatus::Completed,
            SyncStatus::Failed,
            SyncStatus::Stopped,
        ] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("paused".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SyncStatus::Running.is_terminal());
        assert!(SyncStatus::Completed.is_terminal());
        assert!(SyncStatus::Failed.is_terminal());
        assert!(SyncStatus::Stopped.is_terminal());
    }

    #[test]
    fn test_new_session_starts_running_with_zero_counters() {
        let shop_id = Uuid::new_v4();
        let session = SyncSession::new(shop_id, "sheet-1");
        assert_eq!(session.status, SyncStatus::Running);
        assert_eq!(session.total_rows, 0);
        assert_eq!(session.processed_rows, 0);
        assert!(session.completed_at.is_none());
    }

    #[test]
    fn test_not_found_log_records_target_price() {
        let log = SyncLog::not_found(Uuid::new_v4(), "ABC-1", 12.5, Some(15.0));
        assert_eq!(log.outcome, LogOutcome::NotFound);
        assert_eq!(log.new_price, Some(12.5));
        assert_eq!(log.new_compare_at_price, Some(15.0));
        assert!(log.old_price.is_none());
        assert!(log.variant_id.is_none());
    }

    #[test]
    fn test_error_log_carries_message_only() {
        let log = SyncLog::error(Uuid::new_v4(), "ABC-1", "api error: status 500");
        assert_eq!(log.outcome, LogOutcome::Error);
        assert_eq!(log.message.as_deref(), Some("api error: status 500"));
        assert!(log.new_price.is_none());
    }
}
