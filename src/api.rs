//! Read-only HTTP endpoints for inspecting rooms.
//!
//! The game itself is driven over the websocket; these exist for the host
//! UI and for debugging.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::state::{AppState, RoomSummary};
use crate::types::is_operator;

/// List all rooms.
///
/// GET /api/rooms
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.list_rooms().await)
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub viewer: String,
}

/// The projection of a room as one viewer would receive it.
///
/// GET /api/rooms/{room_id}/view?viewer=<id>
///
/// Unknown rooms answer 404 and are not created. The endpoint is
/// unauthenticated, so operator ids are refused with 403 unless
/// `OPERATOR_HTTP_VIEWS` is enabled.
pub async fn room_view(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Response {
    if is_operator(&query.viewer) && !state.operator_http_views() {
        tracing::debug!("Refusing operator view of room {} over HTTP", room_id);
        return (
            StatusCode::FORBIDDEN,
            "Operator views are disabled over HTTP".to_string(),
        )
            .into_response();
    }

    match state.view(&room_id, &query.viewer).await {
        Some(view) => Json(view).into_response(),
        None => (StatusCode::NOT_FOUND, format!("Room {} not found", room_id)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::protocol::ClientMessage;

    #[tokio::test]
    async fn test_list_rooms_endpoint() {
        let state = AppState::with_seed(Content::default(), 1);
        state
            .handle_message(
                "r1",
                "p1",
                ClientMessage::Join {
                    name: "Alice".to_string(),
                },
            )
            .await;

        let Json(rooms) = list_rooms(State(state)).await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, "r1");
        assert_eq!(rooms[0].player_count, 1);
    }

    #[tokio::test]
    async fn test_room_view_unknown_room() {
        let state = AppState::with_seed(Content::default(), 1);
        let response = room_view(
            State(state.clone()),
            Path("ghost".to_string()),
            Query(ViewQuery {
                viewer: "p1".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(state.get_room("ghost").await.is_none());
    }

    async fn view_status(state: AppState, viewer: &str) -> StatusCode {
        room_view(
            State(state),
            Path("r1".to_string()),
            Query(ViewQuery {
                viewer: viewer.to_string(),
            }),
        )
        .await
        .status()
    }

    #[tokio::test]
    async fn test_room_view_known_room() {
        let state = AppState::with_seed(Content::default(), 1);
        state.room("r1").await;

        assert_eq!(view_status(state, "p1").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_operator_view_refused_unless_enabled() {
        let state = AppState::with_seed(Content::default(), 1);
        state.room("r1").await;
        assert_eq!(view_status(state.clone(), "HOST-1").await, StatusCode::FORBIDDEN);

        let state = state.with_operator_http_views(true);
        assert_eq!(view_status(state, "HOST-1").await, StatusCode::OK);
    }
}
