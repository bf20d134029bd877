//! Ito: everyone holds a secret number and the table must play them in
//! ascending order, hinting only through the topic.

use super::{draw_fresh, Ctx, GameRng, ModeEngine};
use crate::protocol::ClientMessage;
use crate::state::{ModeState, Room};
use crate::types::*;
use indexmap::{IndexMap, IndexSet};
use rand::seq::index;
use serde::Serialize;

pub const MAX_NUMBER: u32 = 100;
pub const MAX_STAGE: u32 = 3;
pub const MAX_LIFE: u32 = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItoPlayedCard {
    pub player_id: PlayerId,
    pub player_name: String,
    pub number: u32,
    /// 1-based play position
    pub order: u32,
    pub is_failed: bool,
}

#[derive(Debug, Clone)]
pub struct ItoState {
    pub is_coop_mode: bool,
    /// Display-only flag for the "just barely" celebration
    pub close_call_enabled: bool,
    pub current_topic: String,
    pub used_topics: IndexSet<String>,
    pub player_numbers: IndexMap<PlayerId, u32>,
    pub played_cards: Vec<ItoPlayedCard>,
    pub last_played_number: u32,
    pub stage: u32,
    pub life: u32,
    pub is_failed: bool,
    pub stage_cleared: bool,
    pub game_cleared: bool,
    pub game_over: bool,
}

impl ItoState {
    pub fn is_finished(&self) -> bool {
        self.game_over || self.game_cleared
    }
}

/// Distinct numbers in 1..=100, one per player (at most 100 players get one)
pub fn deal_numbers(player_ids: &[PlayerId], rng: &mut GameRng) -> IndexMap<PlayerId, u32> {
    let amount = player_ids.len().min(MAX_NUMBER as usize);
    index::sample(rng, MAX_NUMBER as usize, amount)
        .into_iter()
        .zip(player_ids)
        .map(|(i, id)| (id.clone(), i as u32 + 1))
        .collect()
}

pub struct ItoEngine;

impl ItoEngine {
    /// New topic and numbers, cleared table
    fn deal(room: &mut Room, ctx: &mut Ctx<'_>) {
        let player_ids: Vec<PlayerId> = room.players.keys().cloned().collect();
        let Some(state) = room.mode_state.ito_mut() else {
            return;
        };

        state.current_topic =
            draw_fresh(&ctx.content.ito_topics, &mut state.used_topics, ctx.rng).unwrap_or_default();
        state.player_numbers = deal_numbers(&player_ids, ctx.rng);
        state.played_cards.clear();
        state.last_played_number = 0;
        state.is_failed = false;
        state.stage_cleared = false;

        for player in room.players.values_mut() {
            player.has_answered = false;
        }
    }

    fn play_card(room: &mut Room, client_id: &str) -> bool {
        if room.phase != Phase::Answering {
            return false;
        }
        let Some(state) = room.mode_state.ito_mut() else {
            return false;
        };
        if state.is_finished() {
            return false;
        }
        let Some(player) = room.players.get(client_id) else {
            return false;
        };
        if player.has_answered {
            return false;
        }
        let Some(&number) = state.player_numbers.get(client_id) else {
            return false;
        };
        let player_name = player.name.clone();

        // Out of order against the table, or someone still holding a lower card
        let is_failed = number < state.last_played_number
            || state.player_numbers.iter().any(|(id, &other)| {
                id != client_id
                    && other < number
                    && room.players.get(id).is_some_and(|p| !p.has_answered)
            });

        state.played_cards.push(ItoPlayedCard {
            player_id: client_id.to_string(),
            player_name,
            number,
            order: state.played_cards.len() as u32 + 1,
            is_failed,
        });
        if let Some(player) = room.players.get_mut(client_id) {
            player.has_answered = true;
        }

        if is_failed {
            state.is_failed = true;
            tracing::info!("Ito card {} failed in room {}", number, room.room_id);
            if state.is_coop_mode {
                state.life = state.life.saturating_sub(1);
                if state.life == 0 {
                    tracing::info!("Ito game over in room {}", room.room_id);
                    state.game_over = true;
                    room.phase = Phase::Result;
                    return true;
                }
            }
        }
        state.last_played_number = number;

        let all_played = state
            .player_numbers
            .keys()
            .all(|id| room.players.get(id).map_or(true, |p| p.has_answered));
        if all_played {
            if state.is_coop_mode {
                if !state.is_failed {
                    state.stage_cleared = true;
                    state.game_cleared = state.stage >= MAX_STAGE;
                }
            } else {
                state.stage_cleared = !state.is_failed;
            }
            tracing::info!(
                "Ito stage {} finished in room {}: cleared {}",
                state.stage,
                room.room_id,
                state.stage_cleared
            );
            room.phase = Phase::Result;
        }
        true
    }

    fn next_stage(room: &mut Room, ctx: &mut Ctx<'_>) -> bool {
        if room.phase == Phase::Lobby {
            return false;
        }
        let Some(state) = room.mode_state.ito_mut() else {
            return false;
        };
        if state.is_finished() {
            return false;
        }

        if state.stage_cleared {
            state.stage += 1;
            state.life = (state.life + 1).min(MAX_LIFE);
            if state.stage > MAX_STAGE {
                state.game_cleared = true;
                room.phase = Phase::Result;
                return true;
            }
        }

        Self::deal(room, ctx);
        room.phase = Phase::Answering;
        true
    }
}

impl ModeEngine for ItoEngine {
    fn mode(&self) -> GameMode {
        GameMode::Ito
    }

    fn setup(&self, room: &mut Room, ctx: &mut Ctx<'_>) {
        if room.players.is_empty() {
            tracing::warn!("Ito needs players, room {} is empty", room.room_id);
            return;
        }

        room.mode_state = ModeState::Ito(Some(ItoState {
            is_coop_mode: room.config.ito_coop,
            close_call_enabled: room.config.ito_close_call,
            current_topic: String::new(),
            used_topics: IndexSet::new(),
            player_numbers: IndexMap::new(),
            played_cards: Vec::new(),
            last_played_number: 0,
            stage: 1,
            life: MAX_LIFE,
            is_failed: false,
            stage_cleared: false,
            game_cleared: false,
            game_over: false,
        }));
        Self::deal(room, ctx);
        room.phase = Phase::Instruction;
    }

    fn handle(
        &self,
        room: &mut Room,
        ctx: &mut Ctx<'_>,
        client_id: &str,
        msg: &ClientMessage,
    ) -> bool {
        match msg {
            ClientMessage::ItoPlayCard {} => Self::play_card(room, client_id),
            ClientMessage::ItoNextStage {} => Self::next_stage(room, ctx),
            ClientMessage::ItoShowResult {} => {
                if matches!(room.phase, Phase::Lobby | Phase::Result) || room.mode_state.ito().is_none() {
                    return false;
                }
                room.phase = Phase::Result;
                true
            }
            ClientMessage::NextRound {} => {
                if room.phase != Phase::Instruction {
                    return false;
                }
                room.phase = Phase::Answering;
                true
            }
            _ => false,
        }
    }
}
