//! Per-viewer projections of a room.
//!
//! Every view is built field by field from the stored state; nothing is
//! copied wholesale and then redacted. A field that is not listed here is
//! never sent. Operators (host displays) bypass the per-player redactions.

use crate::game::ito::{ItoPlayedCard, ItoState};
use crate::game::sekai::{SekaiAnswer, SekaiState};
use crate::game::sympathy::SympathyState;
use crate::game::werewolf::{Ballot, NightPhase, WerewolfResult, WerewolfRole, WerewolfState};
use crate::game::word_wolf::{WordWolfResult, WordWolfState};
use crate::state::{ModeState, Room};
use crate::types::*;
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Who is looking
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub id: String,
    pub is_operator: bool,
}

impl Viewer {
    pub fn from_client_id(client_id: &str) -> Self {
        Self {
            id: client_id.to_string(),
            is_operator: is_operator(client_id),
        }
    }

    fn sees_all(&self) -> bool {
        self.is_operator
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub room_id: RoomId,
    pub viewer_id: String,
    pub is_operator: bool,
    pub phase: Phase,
    pub mode: GameMode,
    pub players: Vec<PlayerView>,
    pub winner_id: Option<PlayerId>,
    pub config: RoomConfig,
    pub mode_view: Option<ModeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub name: String,
    pub score: u32,
    pub has_answered: bool,
    pub is_connected: bool,
    pub shuffle_remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeView {
    Sympathy(SympathyView),
    WordWolf(WordWolfView),
    Sekai(SekaiView),
    Ito(ItoView),
    Werewolf(WerewolfView),
}

#[derive(Debug, Clone, Serialize)]
pub struct SympathyView {
    pub current_question: Option<String>,
    pub answers: Vec<AnswerView>,
    pub shuffle_triggered: bool,
    pub speed_star_id: Option<PlayerId>,
    pub bomb_owner_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerView {
    pub answer_id: AnswerId,
    pub player_id: PlayerId,
    pub player_name: String,
    /// Empty while answers are still being collected
    pub text: String,
    pub normalized_text: String,
    pub group_id: AnswerId,
    pub used_shuffle: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WordWolfView {
    /// Only populated for the wolf themself (and operators). The result
    /// names the wolf once voting is over.
    pub wolf_ids: Vec<PlayerId>,
    pub topics: IndexMap<PlayerId, String>,
    pub votes: IndexMap<PlayerId, PlayerId>,
    pub vote_count: usize,
    pub discussion_deadline: DateTime<Utc>,
    /// Revealed with the result
    pub majority_topic: Option<String>,
    pub minority_topic: Option<String>,
    pub result: Option<WordWolfResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SekaiView {
    pub reader_id: Option<PlayerId>,
    pub reader_order: Vec<PlayerId>,
    pub current_question: String,
    pub word_choices: IndexMap<PlayerId, Vec<String>>,
    pub submitted_count: usize,
    pub answers: Vec<SekaiAnswer>,
    pub selected_answer_id: Option<AnswerId>,
    pub round_number: u32,
    pub winning_score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItoView {
    pub is_coop_mode: bool,
    pub close_call_enabled: bool,
    pub current_topic: String,
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

#[derive(Debug, Clone, Serialize)]
pub struct WerewolfView {
    pub original_roles: IndexMap<PlayerId, WerewolfRole>,
    pub current_roles: IndexMap<PlayerId, WerewolfRole>,
    pub graveyard: Vec<WerewolfRole>,
    pub night_info: IndexMap<PlayerId, String>,
    pub night_phase: NightPhase,
    pub night_actions_done: IndexSet<PlayerId>,
    pub seer_target: Option<String>,
    pub thief_target: Option<PlayerId>,
    pub thief_swapped: Option<bool>,
    pub votes: IndexMap<PlayerId, Ballot>,
    pub vote_count: usize,
    pub discussion_deadline: Option<DateTime<Utc>>,
    pub result: Option<WerewolfResult>,
}

/// Private answer to WEREWOLF_PEEK
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeekView {
    pub role: Option<WerewolfRole>,
    pub night_info: Option<String>,
    pub original_roles: Option<IndexMap<PlayerId, WerewolfRole>>,
    pub current_roles: Option<IndexMap<PlayerId, WerewolfRole>>,
    pub graveyard: Option<Vec<WerewolfRole>>,
}

/// Entries of `map` the viewer may see: all of them for operators,
/// otherwise only the viewer's own.
fn own_entries<V: Clone>(map: &IndexMap<PlayerId, V>, viewer: &Viewer) -> IndexMap<PlayerId, V> {
    if viewer.sees_all() {
        return map.clone();
    }
    map.get_key_value(viewer.id.as_str())
        .map(|(k, v)| (k.clone(), v.clone()))
        .into_iter()
        .collect()
}

/// Build the projection of `room` for `viewer`
pub fn project(room: &Room, viewer: &Viewer) -> RoomView {
    let players = room
        .players
        .values()
        .map(|p| PlayerView {
            player_id: p.player_id.clone(),
            name: p.name.clone(),
            score: p.score,
            has_answered: p.has_answered,
            is_connected: p.is_connected,
            shuffle_remaining: p.shuffle_remaining,
        })
        .collect();

    let mode_view = match &room.mode_state {
        ModeState::Sympathy(state) => Some(ModeView::Sympathy(sympathy_view(state, room.phase))),
        ModeState::WordWolf(state) => state
            .as_ref()
            .map(|s| ModeView::WordWolf(word_wolf_view(s, room.phase, viewer))),
        ModeState::Sekai(state) => state
            .as_ref()
            .map(|s| ModeView::Sekai(sekai_view(s, room.phase, viewer))),
        ModeState::Ito(state) => state.as_ref().map(|s| ModeView::Ito(ito_view(s, viewer))),
        ModeState::Werewolf(state) => state
            .as_ref()
            .map(|s| ModeView::Werewolf(werewolf_view(s, room.phase, viewer))),
    };

    RoomView {
        room_id: room.room_id.clone(),
        viewer_id: viewer.id.clone(),
        is_operator: viewer.is_operator,
        phase: room.phase,
        mode: room.mode(),
        players,
        winner_id: room.winner_id.clone(),
        config: room.config.clone(),
        mode_view,
    }
}

/// Answer texts stay blank for everyone until answering is over
fn sympathy_view(state: &SympathyState, phase: Phase) -> SympathyView {
    let hide_text = phase == Phase::Answering;
    SympathyView {
        current_question: state.current_question.clone(),
        answers: state
            .answers
            .iter()
            .map(|a| AnswerView {
                answer_id: a.answer_id.clone(),
                player_id: a.player_id.clone(),
                player_name: a.player_name.clone(),
                text: if hide_text { String::new() } else { a.raw_text.clone() },
                normalized_text: if hide_text {
                    String::new()
                } else {
                    a.normalized_text.clone()
                },
                group_id: a.group_id.clone(),
                used_shuffle: a.used_shuffle,
            })
            .collect(),
        shuffle_triggered: state.shuffle_triggered,
        speed_star_id: state.speed_star_id.clone(),
        bomb_owner_id: state.bomb_owner_id.clone(),
    }
}

fn word_wolf_view(state: &WordWolfState, phase: Phase, viewer: &Viewer) -> WordWolfView {
    let revealed = phase == Phase::Result;
    let viewer_is_wolf = state.wolf_ids.contains(&viewer.id);

    WordWolfView {
        wolf_ids: if viewer.sees_all() || viewer_is_wolf {
            state.wolf_ids.clone()
        } else {
            Vec::new()
        },
        topics: own_entries(&state.topics, viewer),
        votes: if viewer.sees_all() || revealed {
            state.votes.clone()
        } else {
            IndexMap::new()
        },
        vote_count: state.votes.len(),
        discussion_deadline: state.discussion_deadline,
        majority_topic: (viewer.sees_all() || revealed).then(|| state.majority_topic.clone()),
        minority_topic: (viewer.sees_all() || revealed).then(|| state.minority_topic.clone()),
        result: state.result.clone(),
    }
}

fn sekai_view(state: &SekaiState, phase: Phase, viewer: &Viewer) -> SekaiView {
    let answers = if viewer.sees_all() {
        if state.display_answers.is_empty() {
            state.submitted_answers.clone()
        } else {
            state.display_answers.clone()
        }
    } else {
        match phase {
            // Still writing: nobody sees other answers, only the count
            Phase::Answering => Vec::new(),
            Phase::Judging => state
                .display_answers
                .iter()
                .map(|a| SekaiAnswer {
                    answer_id: a.answer_id.clone(),
                    player_id: None,
                    player_name: None,
                    text: a.text.clone(),
                    is_dummy: a.is_dummy,
                })
                .collect(),
            _ => state.display_answers.clone(),
        }
    };

    SekaiView {
        reader_id: state.current_reader_id().map(str::to_string),
        reader_order: state.reader_order.clone(),
        current_question: state.current_question.clone(),
        word_choices: own_entries(&state.word_choices, viewer),
        submitted_count: state.submitted_answers.len(),
        answers,
        selected_answer_id: state.selected_answer_id.clone(),
        round_number: state.round_number,
        winning_score: state.winning_score,
    }
}

fn ito_view(state: &ItoState, viewer: &Viewer) -> ItoView {
    ItoView {
        is_coop_mode: state.is_coop_mode,
        close_call_enabled: state.close_call_enabled,
        current_topic: state.current_topic.clone(),
        player_numbers: own_entries(&state.player_numbers, viewer),
        played_cards: state.played_cards.clone(),
        last_played_number: state.last_played_number,
        stage: state.stage,
        life: state.life,
        is_failed: state.is_failed,
        stage_cleared: state.stage_cleared,
        game_cleared: state.game_cleared,
        game_over: state.game_over,
    }
}

fn werewolf_view(state: &WerewolfState, phase: Phase, viewer: &Viewer) -> WerewolfView {
    let revealed = phase == Phase::Result;
    let all = viewer.sees_all();

    let mut original_roles = own_entries(&state.original_roles, viewer);
    if !all && state.original_roles.get(viewer.id.as_str()) == Some(&WerewolfRole::Werewolf) {
        for id in state.fellow_werewolves(&viewer.id) {
            original_roles.insert(id.clone(), WerewolfRole::Werewolf);
        }
    }

    WerewolfView {
        original_roles,
        current_roles: own_entries(&state.current_roles, viewer),
        graveyard: if all || revealed {
            state.graveyard.clone()
        } else {
            Vec::new()
        },
        night_info: own_entries(&state.night_info, viewer),
        night_phase: state.night_phase,
        night_actions_done: state
            .night_actions_done
            .iter()
            .filter(|id| all || **id == viewer.id)
            .cloned()
            .collect(),
        seer_target: if all { state.seer_target.clone() } else { None },
        thief_target: if all { state.thief_target.clone() } else { None },
        thief_swapped: all.then_some(state.thief_swapped),
        votes: if all || revealed {
            state.votes.clone()
        } else {
            IndexMap::new()
        },
        vote_count: state.votes.len(),
        discussion_deadline: state.discussion_deadline,
        result: state.result.clone(),
    }
}
