mod player;
mod room;

pub use room::{ModeState, Room};

use crate::content::Content;
use crate::game::{Dispatch, GameEngine, GameRng};
use crate::protocol::ClientMessage;
use crate::types::*;
use crate::view::{self, RoomView, Viewer};
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard, RwLock};

/// A room together with its private random source
pub struct RoomSlot {
    pub room: Room,
    pub rng: GameRng,
}

/// One registry entry. The mutex serializes every message for the room;
/// the broadcast channel tells connected participants to re-render.
pub struct RoomHandle {
    slot: Mutex<RoomSlot>,
    updates: broadcast::Sender<()>,
}

impl RoomHandle {
    fn new(room_id: RoomId, rng: GameRng) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            slot: Mutex::new(RoomSlot {
                room: Room::new(room_id),
                rng,
            }),
            updates: tx,
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, RoomSlot> {
        self.slot.lock().await
    }

    /// Receive a tick every time the room changed
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.updates.subscribe()
    }

    pub fn notify(&self) {
        // No subscribers is fine
        let _ = self.updates.send(());
    }

    /// Projection of the room for one viewer
    pub async fn view_for(&self, viewer_id: &str) -> RoomView {
        let slot = self.lock().await;
        view::project(&slot.room, &Viewer::from_client_id(viewer_id))
    }
}

/// Summary row for the room listing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub phase: Phase,
    pub mode: GameMode,
    pub player_count: usize,
}

/// Shared application state: the room registry plus the game engine.
/// Rooms are created on first reference and live for the process lifetime.
#[derive(Clone)]
pub struct AppState {
    rooms: Arc<RwLock<HashMap<RoomId, Arc<RoomHandle>>>>,
    pub engine: Arc<GameEngine>,
    rng_seed: Option<u64>,
    operator_http_views: bool,
}

impl AppState {
    pub fn new(content: Content) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            engine: Arc::new(GameEngine::new(Arc::new(content))),
            rng_seed: None,
            operator_http_views: false,
        }
    }

    /// Every room's random source is derived from `seed` and the room id
    pub fn with_seed(content: Content, seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::new(content)
        }
    }

    /// Allow the HTTP view endpoint to serve operator projections
    pub fn with_operator_http_views(mut self, enabled: bool) -> Self {
        self.operator_http_views = enabled;
        self
    }

    pub fn operator_http_views(&self) -> bool {
        self.operator_http_views
    }

    fn room_rng(&self, room_id: &str) -> GameRng {
        match self.rng_seed {
            Some(seed) => {
                let mixed = room_id
                    .bytes()
                    .fold(seed, |acc, b| acc.rotate_left(5) ^ u64::from(b));
                GameRng::seed_from_u64(mixed)
            }
            None => GameRng::from_os_rng(),
        }
    }

    /// Look up a room, creating it if absent
    pub async fn room(&self, room_id: &str) -> Arc<RoomHandle> {
        if let Some(handle) = self.rooms.read().await.get(room_id) {
            return handle.clone();
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                tracing::info!("Creating room {}", room_id);
                Arc::new(RoomHandle::new(room_id.to_string(), self.room_rng(room_id)))
            })
            .clone()
    }

    /// Look up a room without creating it
    pub async fn get_room(&self, room_id: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let handles: Vec<Arc<RoomHandle>> = self.rooms.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let slot = handle.lock().await;
            summaries.push(RoomSummary {
                room_id: slot.room.room_id.clone(),
                phase: slot.room.phase,
                mode: slot.room.mode(),
                player_count: slot.room.players.len(),
            });
        }
        summaries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        summaries
    }

    /// Apply one inbound message to a room. Participants are notified when
    /// the result asks for a broadcast.
    pub async fn handle_message(
        &self,
        room_id: &str,
        client_id: &str,
        msg: ClientMessage,
    ) -> Dispatch {
        let handle = self.room(room_id).await;
        let dispatch = {
            let mut slot = handle.lock().await;
            let RoomSlot { room, rng } = &mut *slot;
            self.engine.process_message(room, rng, client_id, &msg)
        };

        if dispatch.broadcast {
            handle.notify();
        }
        dispatch
    }

    /// Clear a player's connectivity flag after their socket closed
    pub async fn disconnect(&self, room_id: &str, client_id: &str) {
        let Some(handle) = self.get_room(room_id).await else {
            return;
        };
        let changed = handle.lock().await.room.disconnect_player(client_id);
        if changed {
            tracing::info!("Player {} disconnected from room {}", client_id, room_id);
            handle.notify();
        }
    }

    /// Projection of a room for one viewer, if the room exists
    pub async fn view(&self, room_id: &str, viewer_id: &str) -> Option<RoomView> {
        let handle = self.get_room(room_id).await?;
        Some(handle.view_for(viewer_id).await)
    }
}
