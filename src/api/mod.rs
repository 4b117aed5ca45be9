//! REST API for PriceSync
//!
//! Thin wrappers over the sync engine:
//! - Shop management and connectivity probes
//! - Sync start/stop/clear/status
//! - Recent-log backfill for the live dashboard

pub mod health;
pub mod shops;
pub mod sync;

use crate::server::AppState;
use axum::http::StatusCode;
use axum::Router;
use pricesync_core::Error;
use serde::Serialize;

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Map a core error onto an HTTP status.
pub(crate) fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::AlreadyRunning(_) => StatusCode::CONFLICT,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Create the API router with all endpoints
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(shops::routes())
        .merge(sync::routes())
}
