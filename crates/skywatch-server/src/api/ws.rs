//! WebSocket push channel for live subscribers.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};

use crate::api::auth::AuthContext;
use crate::state::AppState;

/// Handler for WebSocket connections. Auth ran in the middleware; the
/// token may arrive as `?token=` since browsers cannot set headers on
/// the upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> impl IntoResponse {
    tracing::info!("Subscriber connecting: {}", ctx.email);
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    // The subscription unsubscribes itself when the send task ends.
    let mut subscription = state.bus.subscribe();
    let subscriber_id = subscription.id;

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = subscription.rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(err) => tracing::error!("Failed to encode push event: {}", err),
            }
        }
    });

    // Drain the client side so pings and close frames are honored.
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!("Subscriber {} disconnected", subscriber_id);
}
