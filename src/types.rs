use serde::{Deserialize, Serialize};

/// Opaque ID types for readability
pub type RoomId = String;
pub type PlayerId = String;
pub type AnswerId = String;

/// Client ids starting with this prefix belong to the shared host display
pub const OPERATOR_ID_PREFIX: &str = "HOST-";

/// Whether a client id is an operator (host display) identity
pub fn is_operator(client_id: &str) -> bool {
    client_id.starts_with(OPERATOR_ID_PREFIX)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Lobby,
    Instruction,
    Answering,
    Judging,
    Result,
    Description,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    #[default]
    Sympathy,
    WordWolf,
    SekaiNoMikata,
    Ito,
    OneNightWerewolf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub player_id: PlayerId,
    pub name: String,
    pub score: u32,
    /// Per-round "has acted" flag (answered, voted, played a card)
    pub has_answered: bool,
    pub is_connected: bool,
    /// Remaining uses of the one-time Sympathy shuffle power
    pub shuffle_remaining: u32,
}

impl Player {
    pub fn new(player_id: PlayerId, name: String) -> Self {
        Self {
            player_id,
            name,
            score: 0,
            has_answered: false,
            is_connected: true,
            shuffle_remaining: 1,
        }
    }
}

/// Game-wide switches, changed only through UPDATE_CONFIG
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomConfig {
    pub speed_star: bool,
    pub shuffle: bool,
    pub discussion_seconds: u32,
    pub ito_coop: bool,
    pub ito_close_call: bool,
    pub werewolf_madman: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            speed_star: true,
            shuffle: true,
            discussion_seconds: 180,
            ito_coop: true,
            ito_close_call: false,
            werewolf_madman: false,
        }
    }
}
