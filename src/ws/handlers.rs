//! WebSocket frame dispatch
//!
//! Frames are parsed here and handed to the room registry. Frames that do
//! not parse are dropped without an answer.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// Handle one raw text frame and return the private reply, if any.
/// Broadcasts happen through the room's update channel.
pub async fn handle_text(
    state: &AppState,
    room_id: &str,
    client_id: &str,
    text: &str,
) -> Option<ServerMessage> {
    let msg = match ClientMessage::parse(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!("Dropping unparseable frame from {}: {}", client_id, e);
            return None;
        }
    };

    let kind = msg.kind();
    let dispatch = state.handle_message(room_id, client_id, msg).await;
    tracing::debug!(
        "{} from {} in room {}: broadcast={}",
        kind,
        client_id,
        room_id,
        dispatch.broadcast
    );
    dispatch.reply
}
