use crate::types::{SyncLog, SyncStatus};
use serde::Serialize;
use uuid::Uuid;

/// Events broadcast while a sync run progresses.
///
/// Ordering within a run follows row order; nothing is guaranteed across
/// different shops' concurrent runs. Access tokens and credentials never
/// appear in events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A row is about to be reconciled
    Progress {
        /// Shop the run belongs to
        shop_id: Uuid,
        /// Running session
        session_id: Uuid,
        /// SKU of the current row
        sku: String,
        /// Rows accounted for before this one
        processed: i64,
        /// Total rows in the run
        total: i64,
    },
    /// One row finished with a recorded outcome
    Log {
        /// Shop the run belongs to
        shop_id: Uuid,
        /// Running session
        session_id: Uuid,
        /// The recorded row outcome
        entry: SyncLog,
    },
    /// The run reached a terminal state, or a session was cleared
    Complete {
        /// Shop the event belongs to
        shop_id: Uuid,
        /// Finished session; `None` for a bare clear request
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<Uuid>,
        /// Terminal status; `None` for a bare clear request
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<SyncStatus>,
    },
    /// The run aborted before or outside the row loop
    Error {
        /// Shop the event belongs to
        shop_id: Uuid,
        /// Failed session, when one had been created
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<Uuid>,
        /// Sanitized failure description
        message: String,
    },
}

impl SyncEvent {
    /// Shop the event belongs to, used for per-shop subscriber filtering.
    #[must_use]
    pub fn shop_id(&self) -> Uuid {
        match self {
            Self::Progress { shop_id, .. }
            | Self::Log { shop_id, .. }
            | Self::Complete { shop_id, .. }
            | Self::Error { shop_id, .. } => *shop_id,
        }
    }
}
