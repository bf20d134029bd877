use super::Room;
use crate::types::*;

impl Room {
    /// Insert a player, or rename and reconnect an existing one
    pub fn add_player(&mut self, player_id: &str, name: &str) -> &Player {
        let player = self
            .players
            .entry(player_id.to_string())
            .and_modify(|p| {
                p.name = name.to_string();
                p.is_connected = true;
            })
            .or_insert_with(|| Player::new(player_id.to_string(), name.to_string()));
        player
    }

    /// Mark a player as disconnected. Players are never removed mid-game.
    pub fn disconnect_player(&mut self, player_id: &str) -> bool {
        match self.players.get_mut(player_id) {
            Some(player) if player.is_connected => {
                player.is_connected = false;
                true
            }
            _ => false,
        }
    }

    /// Display name for a player id, if they are in the roster
    pub fn player_name(&self, player_id: &str) -> Option<&str> {
        self.players.get(player_id).map(|p| p.name.as_str())
    }

    /// Whether every player has acted this round
    pub fn all_answered(&self) -> bool {
        self.players.values().all(|p| p.has_answered)
    }
}
