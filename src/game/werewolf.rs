//! One Night Werewolf: hidden roles, a single scripted night, one vote.
//!
//! The night runs WAITING -> CLOSING_EYES -> WEREWOLF -> SEER -> THIEF -> DONE,
//! one step per WEREWOLF_ADVANCE_NIGHT. Night actions are gated by the role a
//! player was dealt, so a thief who swapped still acted as the thief.

use super::{Ctx, ModeEngine};
use crate::protocol::{ClientMessage, NightAction};
use crate::state::{ModeState, Room};
use crate::types::*;
use crate::view::PeekView;
use chrono::{DateTime, Duration, Utc};
use indexmap::{IndexMap, IndexSet};
use rand::seq::SliceRandom;
use serde::{Serialize, Serializer};

pub const MIN_PLAYERS: usize = 3;
/// Ballot meaning "there is no werewolf among us"
pub const PEACE_VILLAGE: &str = "PEACE_VILLAGE";
const GRAVEYARD_PREFIX: &str = "graveyard_";
const THIEF_SKIP: &str = "skip";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WerewolfRole {
    Villager,
    Werewolf,
    Seer,
    Thief,
    Madman,
}

impl WerewolfRole {
    pub fn display_name(self) -> &'static str {
        match self {
            WerewolfRole::Villager => "Villager",
            WerewolfRole::Werewolf => "Werewolf",
            WerewolfRole::Seer => "Seer",
            WerewolfRole::Thief => "Thief",
            WerewolfRole::Madman => "Madman",
        }
    }

    /// What the seer sees: the madman reads as a villager
    pub fn seer_reading(self) -> WerewolfRole {
        match self {
            WerewolfRole::Madman => WerewolfRole::Villager,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NightPhase {
    #[default]
    Waiting,
    ClosingEyes,
    Werewolf,
    Seer,
    Thief,
    Done,
}

impl NightPhase {
    /// Next step of the night, `None` once the night is over or not started
    pub fn next(self) -> Option<NightPhase> {
        match self {
            NightPhase::ClosingEyes => Some(NightPhase::Werewolf),
            NightPhase::Werewolf => Some(NightPhase::Seer),
            NightPhase::Seer => Some(NightPhase::Thief),
            NightPhase::Thief => Some(NightPhase::Done),
            NightPhase::Waiting | NightPhase::Done => None,
        }
    }
}

/// One cast vote
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ballot {
    Player(PlayerId),
    PeaceVillage,
}

impl Ballot {
    fn parse(target: &str) -> Self {
        if target == PEACE_VILLAGE {
            Ballot::PeaceVillage
        } else {
            Ballot::Player(target.to_string())
        }
    }
}

impl Serialize for Ballot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ballot::Player(id) => serializer.serialize_str(id),
            Ballot::PeaceVillage => serializer.serialize_str(PEACE_VILLAGE),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WerewolfResult {
    pub executed_ids: Vec<PlayerId>,
    pub village_won: bool,
    pub peace_village: bool,
    pub no_execution: bool,
    pub winning_reason: String,
}

#[derive(Debug, Clone)]
pub struct WerewolfState {
    /// Roles as dealt
    pub original_roles: IndexMap<PlayerId, WerewolfRole>,
    /// Roles after the thief's swap
    pub current_roles: IndexMap<PlayerId, WerewolfRole>,
    pub graveyard: Vec<WerewolfRole>,
    /// Private "what I learned tonight" text per player
    pub night_info: IndexMap<PlayerId, String>,
    pub night_phase: NightPhase,
    /// Players who acted in the current night step
    pub night_actions_done: IndexSet<PlayerId>,
    /// Player id or `graveyard`
    pub seer_target: Option<String>,
    pub seer_graveyard_index: Option<usize>,
    pub thief_target: Option<PlayerId>,
    pub thief_swapped: bool,
    pub votes: IndexMap<PlayerId, Ballot>,
    pub discussion_deadline: Option<DateTime<Utc>>,
    pub result: Option<WerewolfResult>,
}

/// Role deck for `player_count` players: two werewolves, seer, thief, an
/// optional madman, villagers for the rest. Always two cards more than players.
pub fn build_deck(player_count: usize, madman: bool) -> Vec<WerewolfRole> {
    let mut deck = vec![
        WerewolfRole::Werewolf,
        WerewolfRole::Werewolf,
        WerewolfRole::Seer,
        WerewolfRole::Thief,
    ];
    if madman && player_count >= 4 {
        deck.push(WerewolfRole::Madman);
    }
    let total = player_count + 2;
    while deck.len() < total {
        deck.push(WerewolfRole::Villager);
    }
    deck
}

impl WerewolfState {
    pub fn has_werewolf(&self) -> bool {
        self.current_roles.values().any(|r| *r == WerewolfRole::Werewolf)
    }

    /// Original werewolves other than `player_id`
    pub fn fellow_werewolves(&self, player_id: &str) -> Vec<&PlayerId> {
        self.original_roles
            .iter()
            .filter(|(id, role)| **role == WerewolfRole::Werewolf && id.as_str() != player_id)
            .map(|(id, _)| id)
            .collect()
    }

    /// Resolve the vote.
    ///
    /// In order: no votes at all, a tie across every cast choice, peace
    /// village holding the top count, and finally execution of every player
    /// tied for the top count.
    pub fn calculate_vote_results(&mut self) {
        let has_werewolf = self.has_werewolf();

        let mut counts: IndexMap<&Ballot, usize> = IndexMap::new();
        for ballot in self.votes.values() {
            *counts.entry(ballot).or_default() += 1;
        }
        let max = counts.values().max().copied().unwrap_or(0);
        let peace_votes = counts.get(&Ballot::PeaceVillage).copied().unwrap_or(0);

        let result = if counts.is_empty() {
            WerewolfResult {
                executed_ids: Vec::new(),
                village_won: !has_werewolf,
                peace_village: false,
                no_execution: true,
                winning_reason: if has_werewolf {
                    "Nobody voted and the werewolves got away.".to_string()
                } else {
                    "Nobody voted, and there was no werewolf.".to_string()
                },
            }
        } else if counts.len() > 1 && counts.values().all(|c| *c == max) {
            WerewolfResult {
                executed_ids: Vec::new(),
                village_won: !has_werewolf,
                peace_village: false,
                no_execution: true,
                winning_reason: if has_werewolf {
                    "The vote was split evenly. Nobody was executed and the werewolves won.".to_string()
                } else {
                    "The vote was split evenly, and there was no werewolf.".to_string()
                },
            }
        } else if peace_votes == max {
            WerewolfResult {
                executed_ids: Vec::new(),
                village_won: !has_werewolf,
                peace_village: true,
                no_execution: false,
                winning_reason: if has_werewolf {
                    "The village declared peace, but a werewolf was hiding among them.".to_string()
                } else {
                    "The village declared peace, and there really was no werewolf.".to_string()
                },
            }
        } else {
            let executed_ids: Vec<PlayerId> = counts
                .iter()
                .filter(|(_, count)| **count == max)
                .filter_map(|(ballot, _)| match ballot {
                    Ballot::Player(id) => Some(id.clone()),
                    Ballot::PeaceVillage => None,
                })
                .collect();
            let werewolf_executed = executed_ids
                .iter()
                .any(|id| self.current_roles.get(id) == Some(&WerewolfRole::Werewolf));
            WerewolfResult {
                executed_ids,
                village_won: werewolf_executed,
                peace_village: false,
                no_execution: false,
                winning_reason: if werewolf_executed {
                    "A werewolf was executed. The village wins!".to_string()
                } else {
                    "No werewolf was executed. The werewolves win!".to_string()
                },
            }
        };

        tracing::info!(
            "Werewolf tally: {} votes, executed {:?}, village won: {}",
            self.votes.len(),
            result.executed_ids,
            result.village_won
        );
        self.result = Some(result);
    }
}

/// Private answer to WEREWOLF_PEEK. Players get their own dealt role and
/// night knowledge; operators additionally get every role and the graveyard.
pub fn peek(room: &Room, client_id: &str) -> Option<PeekView> {
    let state = room.mode_state.werewolf()?;
    if is_operator(client_id) {
        return Some(PeekView {
            role: None,
            night_info: None,
            original_roles: Some(state.original_roles.clone()),
            current_roles: Some(state.current_roles.clone()),
            graveyard: Some(state.graveyard.clone()),
        });
    }
    let role = *state.original_roles.get(client_id)?;
    Some(PeekView {
        role: Some(role),
        night_info: state.night_info.get(client_id).cloned(),
        original_roles: None,
        current_roles: None,
        graveyard: None,
    })
}

pub struct WerewolfEngine;

impl WerewolfEngine {
    fn start_night(room: &mut Room) -> bool {
        if room.phase != Phase::Instruction {
            return false;
        }
        let Some(state) = room.mode_state.werewolf_mut() else {
            return false;
        };
        if state.night_phase != NightPhase::Waiting {
            return false;
        }
        state.night_phase = NightPhase::ClosingEyes;
        room.phase = Phase::Answering;
        tracing::info!("Night falls in room {}", room.room_id);
        true
    }

    fn advance_night(room: &mut Room) -> bool {
        if room.phase != Phase::Answering {
            return false;
        }
        let Some(state) = room.mode_state.werewolf_mut() else {
            return false;
        };
        let Some(next) = state.night_phase.next() else {
            return false;
        };
        state.night_phase = next;
        state.night_actions_done.clear();
        tracing::info!("Night advanced to {:?} in room {}", next, room.room_id);
        true
    }

    fn night_action(room: &mut Room, client_id: &str, action: &NightAction) -> bool {
        if room.phase != Phase::Answering {
            return false;
        }
        // Names are resolved up front; the state borrow below is exclusive
        let names: IndexMap<PlayerId, String> = room
            .players
            .iter()
            .map(|(id, p)| (id.clone(), p.name.clone()))
            .collect();
        let name_of = |id: &str| names.get(id).cloned().unwrap_or_else(|| "???".to_string());

        let Some(state) = room.mode_state.werewolf_mut() else {
            return false;
        };
        let Some(&role) = state.original_roles.get(client_id) else {
            return false;
        };
        if state.night_actions_done.contains(client_id) {
            return false;
        }

        let info = match action {
            NightAction::WerewolfConfirm {} => {
                if role != WerewolfRole::Werewolf || state.night_phase != NightPhase::Werewolf {
                    return false;
                }
                let partners: Vec<String> = state
                    .fellow_werewolves(client_id)
                    .into_iter()
                    .map(|id| name_of(id.as_str()))
                    .collect();
                if partners.is_empty() {
                    "You are the only werewolf.".to_string()
                } else {
                    format!("Fellow werewolves: {}", partners.join(", "))
                }
            }

            NightAction::SeerLook { target } => {
                if role != WerewolfRole::Seer || state.night_phase != NightPhase::Seer {
                    return false;
                }
                if let Some(index) = target.strip_prefix(GRAVEYARD_PREFIX) {
                    let Some((index, card)) = index
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| state.graveyard.get(i).map(|card| (i, *card)))
                    else {
                        return false;
                    };
                    state.seer_target = Some("graveyard".to_string());
                    state.seer_graveyard_index = Some(index);
                    format!(
                        "Graveyard card {}: {}",
                        index + 1,
                        card.seer_reading().display_name()
                    )
                } else {
                    if target == client_id {
                        return false;
                    }
                    let Some(&seen) = state.current_roles.get(target) else {
                        return false;
                    };
                    state.seer_target = Some(target.clone());
                    format!("{} is a {}", name_of(target.as_str()), seen.seer_reading().display_name())
                }
            }

            NightAction::ThiefSwap { target } => {
                if role != WerewolfRole::Thief || state.night_phase != NightPhase::Thief {
                    return false;
                }
                if target == THIEF_SKIP {
                    state.thief_swapped = false;
                    "You did not swap. You are still the Thief.".to_string()
                } else {
                    if target == client_id {
                        return false;
                    }
                    let (Some(&taken), Some(&own)) =
                        (state.current_roles.get(target), state.current_roles.get(client_id))
                    else {
                        return false;
                    };
                    state.current_roles.insert(client_id.to_string(), taken);
                    state.current_roles.insert(target.clone(), own);
                    state.thief_target = Some(target.clone());
                    state.thief_swapped = true;
                    format!(
                        "You swapped with {}. You are now the {}!",
                        name_of(target.as_str()),
                        taken.display_name()
                    )
                }
            }
        };

        tracing::debug!("Night action {:?} by {} in room {}", action, client_id, room.room_id);
        state.night_info.insert(client_id.to_string(), info);
        state.night_actions_done.insert(client_id.to_string());
        true
    }

    fn start_discussion(room: &mut Room, ctx: &Ctx<'_>) -> bool {
        if !matches!(room.phase, Phase::Instruction | Phase::Answering) {
            return false;
        }
        let deadline = ctx.now + Duration::seconds(i64::from(room.config.discussion_seconds));
        let Some(state) = room.mode_state.werewolf_mut() else {
            return false;
        };
        state.night_phase = NightPhase::Done;
        state.discussion_deadline = Some(deadline);
        for player in room.players.values_mut() {
            player.has_answered = false;
        }
        room.phase = Phase::Judging;
        true
    }

    fn vote(room: &mut Room, client_id: &str, target: &str) -> bool {
        if room.phase != Phase::Judging {
            return false;
        }
        let ballot = Ballot::parse(target);
        if let Ballot::Player(target) = &ballot {
            if target == client_id || !room.players.contains_key(target) {
                return false;
            }
        }
        let Some(voter) = room.players.get_mut(client_id) else {
            return false;
        };
        let Some(state) = room.mode_state.werewolf_mut() else {
            return false;
        };
        state.votes.insert(client_id.to_string(), ballot);
        voter.has_answered = true;
        true
    }

    fn finish_voting(room: &mut Room) -> bool {
        if room.phase != Phase::Judging {
            return false;
        }
        let Some(state) = room.mode_state.werewolf_mut() else {
            return false;
        };
        state.calculate_vote_results();
        room.phase = Phase::Result;
        true
    }
}

impl ModeEngine for WerewolfEngine {
    fn mode(&self) -> GameMode {
        GameMode::OneNightWerewolf
    }

    fn setup(&self, room: &mut Room, ctx: &mut Ctx<'_>) {
        let player_ids: Vec<PlayerId> = room.players.keys().cloned().collect();
        if player_ids.len() < MIN_PLAYERS {
            tracing::warn!(
                "Werewolf needs at least {} players, room {} has {}",
                MIN_PLAYERS,
                room.room_id,
                player_ids.len()
            );
            return;
        }

        let mut deck = build_deck(player_ids.len(), room.config.werewolf_madman);
        deck.shuffle(ctx.rng);
        let graveyard = deck.split_off(player_ids.len());
        let original_roles: IndexMap<PlayerId, WerewolfRole> =
            player_ids.into_iter().zip(deck).collect();

        tracing::info!(
            "Werewolf dealt in room {}: {} players, graveyard {:?}",
            room.room_id,
            original_roles.len(),
            graveyard
        );

        room.mode_state = ModeState::Werewolf(Some(WerewolfState {
            current_roles: original_roles.clone(),
            original_roles,
            graveyard,
            night_info: IndexMap::new(),
            night_phase: NightPhase::Waiting,
            night_actions_done: IndexSet::new(),
            seer_target: None,
            seer_graveyard_index: None,
            thief_target: None,
            thief_swapped: false,
            votes: IndexMap::new(),
            discussion_deadline: None,
            result: None,
        }));
        for player in room.players.values_mut() {
            player.has_answered = false;
        }
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
            ClientMessage::WerewolfStartNight {} => Self::start_night(room),
            ClientMessage::WerewolfAdvanceNight {} => Self::advance_night(room),
            ClientMessage::WerewolfNightAction(action) => Self::night_action(room, client_id, action),
            ClientMessage::WerewolfStartDiscussion {} => Self::start_discussion(room, ctx),
            ClientMessage::WerewolfVote { target_player_id } => {
                Self::vote(room, client_id, target_player_id)
            }
            ClientMessage::WerewolfFinishVoting {} => Self::finish_voting(room),
            _ => false,
        }
    }
}
