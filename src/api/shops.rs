//! Shop management endpoints
//!
//! POST   /api/shops            - Register a shop
//! GET    /api/shops            - List shops
//! GET    /api/shops/:id        - Get one shop
//! DELETE /api/shops/:id        - Remove a shop
//! POST   /api/shops/:id/probe  - Test catalog and sheet connectivity

use crate::api::{error_status, ApiResponse};
use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use pricesync_clients::{CatalogApi, SheetApi};
use pricesync_core::Shop;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shop view for API responses; credentials never leave the server.
#[derive(Debug, Serialize)]
pub struct ShopView {
    pub id: Uuid,
    pub domain: String,
    pub sheet_name: String,
    pub has_service_account: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Shop> for ShopView {
    fn from(shop: Shop) -> Self {
        Self {
            id: shop.id,
            domain: shop.domain,
            sheet_name: shop.sheet_name,
            has_service_account: shop.service_account_json.is_some(),
            created_at: shop.created_at,
        }
    }
}

/// Request to register a shop
#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    pub domain: String,
    pub access_token: String,
    pub sheet_name: Option<String>,
    pub service_account_json: Option<String>,
}

/// Request body for the connectivity probe
#[derive(Debug, Deserialize)]
pub struct ProbeRequest {
    pub sheet_id: String,
}

/// Probe outcome per platform
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub catalog: bool,
    pub sheet: bool,
}

async fn create_shop(
    State(state): State<AppState>,
    Json(request): Json<CreateShopRequest>,
) -> (StatusCode, Json<ApiResponse<ShopView>>) {
    let mut shop = Shop::new(request.domain, request.access_token);
    if let Some(sheet_name) = request.sheet_name {
        shop = shop.with_sheet_name(sheet_name);
    }
    if let Some(json) = request.service_account_json {
        shop = shop.with_service_account_json(json);
    }

    match state.store.create_shop(&shop).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(shop.into())),
        ),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn list_shops(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<ShopView>>>) {
    match state.store.list_shops().await {
        Ok(shops) => {
            let views = shops.into_iter().map(ShopView::from).collect();
            (StatusCode::OK, Json(ApiResponse::success(views)))
        }
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<ShopView>>) {
    match state.store.get_shop(id).await {
        Ok(shop) => (StatusCode::OK, Json(ApiResponse::success(shop.into()))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn delete_shop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match state.store.delete_shop(id).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Exercise both platform probes for a shop.
async fn probe_shop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProbeRequest>,
) -> (StatusCode, Json<ApiResponse<ProbeResponse>>) {
    let shop = match state.store.get_shop(id).await {
        Ok(shop) => shop,
        Err(e) => return (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    };

    let catalog = match state.factory.catalog(&shop) {
        Ok(client) => client.test_connection().await,
        Err(_) => false,
    };
    let sheet = match state.factory.sheet(&shop) {
        Ok(client) => client.test_access(&request.sheet_id).await,
        Err(_) => false,
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(ProbeResponse { catalog, sheet })),
    )
}

/// Shop routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/shops", post(create_shop).get(list_shops))
        .route("/api/shops/:id", get(get_shop).delete(delete_shop))
        .route("/api/shops/:id/probe", post(probe_shop))
}
