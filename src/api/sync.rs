//! Sync control endpoints
//!
//! POST /api/shops/:id/sync        - Start a run
//! POST /api/shops/:id/sync/stop   - Request a stop
//! POST /api/shops/:id/sync/clear  - Stop and reset observers
//! GET  /api/shops/:id/sync/status - Live status snapshot
//! GET  /api/shops/:id/sessions    - Recent run history
//! GET  /api/logs                  - Recent row outcomes across all runs

use crate::api::{error_status, ApiResponse};
use crate::server::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use pricesync_core::{SyncLog, SyncSession};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to start a run
#[derive(Debug, Deserialize)]
pub struct StartSyncRequest {
    pub sheet_id: String,
}

/// Response carrying the launched session id
#[derive(Debug, Serialize)]
pub struct StartSyncResponse {
    pub session_id: Uuid,
}

/// Live status projection
#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SyncSession>,
}

/// Paging parameter for history queries
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

async fn start_sync(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StartSyncRequest>,
) -> (StatusCode, Json<ApiResponse<StartSyncResponse>>) {
    match state.sync.start_sync(id, &request.sheet_id).await {
        Ok(session_id) => (
            StatusCode::ACCEPTED,
            Json(ApiResponse::success(StartSyncResponse { session_id })),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn stop_sync(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match state.sync.stop_sync(id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn clear_sync(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match state.sync.clear_session(id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn sync_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<SyncStatusResponse>>) {
    match state.sync.get_sync_status(id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(SyncStatusResponse {
                active: session.is_some(),
                session,
            })),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn list_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<SyncSession>>>) {
    match state.store.sessions_for_shop(id, query.limit).await {
        Ok(sessions) => (StatusCode::OK, Json(ApiResponse::success(sessions))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Recent row outcomes across all runs, used to backfill the live log.
async fn recent_logs(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<SyncLog>>>) {
    match state.store.recent_logs(query.limit).await {
        Ok(logs) => (StatusCode::OK, Json(ApiResponse::success(logs))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Sync routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/shops/:id/sync", post(start_sync))
        .route("/api/shops/:id/sync/stop", post(stop_sync))
        .route("/api/shops/:id/sync/clear", post(clear_sync))
        .route("/api/shops/:id/sync/status", get(sync_status))
        .route("/api/shops/:id/sessions", get(list_sessions))
        .route("/api/logs", get(recent_logs))
}
