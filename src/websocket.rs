//! Live event stream
//!
//! `/ws/events` upgrades to a WebSocket and forwards every broadcast
//! [`SyncEvent`] to the client as JSON. Delivery is fire-and-forget: a
//! client that falls behind misses events rather than slowing a run, and
//! there is no replay (the REST backfill endpoint covers reconnects).

use crate::server::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use pricesync_core::SyncEvent;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Optional per-shop filter
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub shop_id: Option<Uuid>,
}

/// WebSocket upgrade handler
async fn events_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.sync.events().subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, rx, query.shop_id))
}

/// Forward bus events to one socket until either side goes away.
async fn stream_events(
    socket: WebSocket,
    mut rx: broadcast::Receiver<SyncEvent>,
    shop_filter: Option<Uuid>,
) {
    info!(?shop_filter, "event stream subscriber connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(shop_id) = shop_filter {
                            if event.shop_id() != shop_id {
                                continue;
                            }
                        }
                        let Ok(json) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "event subscriber lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // ignore client chatter (pings are answered by axum)
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("event stream subscriber disconnected");
}

/// WebSocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/events", get(events_handler))
}
