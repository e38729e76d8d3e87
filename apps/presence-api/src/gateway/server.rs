//! WebSocket upgrade handler and per-connection event loop.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use campus_common::id::{prefix, prefixed_ulid};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use crate::AppState;

use super::handler::{apply_message, Dropped};
use super::registry::OutboundReceiver;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let connection_id = prefixed_ulid(prefix::CONNECTION);
    let (ws_tx, mut ws_rx) = socket.split();

    // Bootstrap is queued and the connection registered before any inbound
    // frame is read.
    let outbound = state.broadcast.attach(connection_id.clone());
    let writer = tokio::spawn(run_writer(connection_id.clone(), ws_tx, outbound));

    tracing::info!(%connection_id, "presence connection opened");

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(reason) = apply_message(&state, &text) {
                    log_dropped(&connection_id, &reason);
                }
            }
            Ok(Message::Binary(_)) => {
                log_dropped(
                    &connection_id,
                    &Dropped::Malformed("binary frames are not supported".to_string()),
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(?e, %connection_id, "ws read error");
                break;
            }
        }
    }

    state.broadcast.detach(&connection_id);
    writer.abort();

    tracing::info!(%connection_id, "presence connection closed");
}

/// Drain the connection's outbound queue into the socket.
async fn run_writer(
    connection_id: String,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: OutboundReceiver,
) {
    while let Some(payload) = outbound.recv().await {
        if let Err(e) = ws_tx.send(Message::Text(payload.to_string().into())).await {
            tracing::debug!(?e, %connection_id, "ws write error");
            break;
        }
    }
}

fn log_dropped(connection_id: &str, reason: &Dropped) {
    match reason {
        Dropped::UnknownUser(_) | Dropped::UnknownKind(_) => {
            tracing::warn!(%connection_id, %reason, "inbound message dropped");
        }
        _ => {
            tracing::debug!(%connection_id, %reason, "inbound message dropped");
        }
    }
}
