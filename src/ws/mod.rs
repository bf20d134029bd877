pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::ServerMessage;
use crate::state::{AppState, RoomHandle};
use crate::types::{PlayerId, RoomId};

/// WebSocket upgrade handler for `/ws/{room_id}/{client_id}`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_id, client_id)): Path<(RoomId, PlayerId)>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={}, client={}",
        room_id,
        client_id
    );

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, client_id, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

/// Open the room for a new connection and build its first projection.
/// Connecting changes nothing in the room, so no tick is broadcast.
async fn attach(
    state: &AppState,
    room_id: &str,
    client_id: &str,
) -> (Arc<RoomHandle>, broadcast::Receiver<()>, ServerMessage) {
    let handle = state.room(room_id).await;
    // Subscribe before the first projection so no change slips in between
    let updates = handle.subscribe();
    let initial = ServerMessage::StateUpdate(handle.view_for(client_id).await);
    (handle, updates, initial)
}

/// Handle one participant's connection
async fn handle_socket(socket: WebSocket, room_id: RoomId, client_id: PlayerId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (handle, mut updates, initial) = attach(&state, &room_id, &client_id).await;
    if let Some(msg) = encode(&initial) {
        if sender.send(msg).await.is_err() {
            tracing::error!("Failed to send initial state to {}", client_id);
            return;
        }
    }

    tracing::info!("WebSocket connected: room={}, client={}", room_id, client_id);

    loop {
        tokio::select! {
            // The room changed: send this participant's own projection
            update = updates.recv() => {
                match update {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        let view = ServerMessage::StateUpdate(handle.view_for(&client_id).await);
                        if let Some(msg) = encode(&view) {
                            if sender.send(msg).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", client_id, text);

                        if let Some(reply) =
                            handlers::handle_text(&state, &room_id, &client_id, &text).await
                        {
                            if let Some(msg) = encode(&reply) {
                                if sender.send(msg).await.is_err() {
                                    tracing::error!("Failed to send reply to {}", client_id);
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by {}", client_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.disconnect(&room_id, &client_id).await;
    tracing::info!(
        "WebSocket connection closed: room={}, client={}",
        room_id,
        client_id
    );
}
