//! HTTP server wiring
//!
//! Builds the shared state, mounts the REST API and the live event
//! WebSocket, and serves until the process is terminated.

use crate::{api, websocket};
use anyhow::Result;
use axum::Router;
use pricesync_core::config::AppConfig;
use pricesync_core::store::SyncStore;
use pricesync_core::sync::{ClientFactory, LiveClientFactory, SyncService};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer
    pub store: Arc<SyncStore>,
    /// Sync orchestrator
    pub sync: Arc<SyncService>,
    /// Per-run client construction (also used by connectivity probes)
    pub factory: Arc<dyn ClientFactory>,
}

/// Run the server until shutdown.
pub async fn run(config: AppConfig) -> Result<()> {
    let store = Arc::new(SyncStore::from_path(&config.database.path).await?);
    let factory: Arc<dyn ClientFactory> = Arc::new(LiveClientFactory::new(
        config.shopify.clone(),
        config.sheets.clone(),
    ));
    let sync = Arc::new(SyncService::new(
        Arc::clone(&store),
        Arc::clone(&factory),
        config.sync.clone(),
    ));

    let state = AppState {
        store,
        sync,
        factory,
    };

    let app = Router::new()
        .merge(api::router())
        .merge(websocket::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
