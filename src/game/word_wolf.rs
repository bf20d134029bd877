//! WordWolf: one player secretly got a different topic; find them by vote

use super::{Ctx, ModeEngine};
use crate::protocol::ClientMessage;
use crate::state::{ModeState, Room};
use crate::types::*;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WordWolfResult {
    pub wolf_won: bool,
    pub winning_reason: String,
    pub wolf_name: String,
}

#[derive(Debug, Clone)]
pub struct WordWolfState {
    pub wolf_ids: Vec<PlayerId>,
    /// player -> assigned topic
    pub topics: IndexMap<PlayerId, String>,
    /// voter -> target
    pub votes: IndexMap<PlayerId, PlayerId>,
    pub discussion_deadline: DateTime<Utc>,
    pub majority_topic: String,
    pub minority_topic: String,
    pub result: Option<WordWolfResult>,
}

impl WordWolfState {
    /// Tally the votes. The wolf is caught when they are among the most
    /// voted players; no votes at all means the wolf got away.
    pub fn calculate_vote_results(&mut self, players: &IndexMap<PlayerId, Player>) {
        let wolf_name = self
            .wolf_ids
            .first()
            .and_then(|id| players.get(id))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for target in self.votes.values() {
            *counts.entry(target.as_str()).or_default() += 1;
        }

        let result = match counts.values().max().copied() {
            None => WordWolfResult {
                wolf_won: true,
                winning_reason: "No votes were cast.".to_string(),
                wolf_name,
            },
            Some(max) => {
                let caught = counts
                    .iter()
                    .filter(|(_, count)| **count == max)
                    .any(|(id, _)| self.wolf_ids.iter().any(|w| w == id));
                if caught {
                    WordWolfResult {
                        wolf_won: false,
                        winning_reason: "The citizens saw through the wolf!".to_string(),
                        wolf_name,
                    }
                } else {
                    WordWolfResult {
                        wolf_won: true,
                        winning_reason: "The wolf stayed hidden!".to_string(),
                        wolf_name,
                    }
                }
            }
        };

        tracing::info!(
            "WordWolf tally: {} votes, wolf won: {}",
            self.votes.len(),
            result.wolf_won
        );
        self.result = Some(result);
    }
}

pub struct WordWolfEngine;

impl WordWolfEngine {
    fn deadline(room: &Room, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(i64::from(room.config.discussion_seconds))
    }

    fn vote(room: &mut Room, client_id: &str, target: Option<&str>) -> bool {
        if !matches!(room.phase, Phase::Answering | Phase::Judging) {
            return false;
        }
        let Some(target) = target.filter(|t| room.players.contains_key(*t)) else {
            return false;
        };
        let Some(voter) = room.players.get_mut(client_id) else {
            return false;
        };
        let Some(state) = room.mode_state.word_wolf_mut() else {
            return false;
        };

        state.votes.insert(client_id.to_string(), target.to_string());
        voter.has_answered = true;

        if state.votes.len() == room.players.len() {
            state.calculate_vote_results(&room.players);
            room.phase = Phase::Result;
        }
        true
    }

    fn finish(room: &mut Room) -> bool {
        if !matches!(room.phase, Phase::Answering | Phase::Judging) {
            return false;
        }
        let Some(state) = room.mode_state.word_wolf_mut() else {
            return false;
        };
        state.calculate_vote_results(&room.players);
        room.phase = Phase::Result;
        true
    }
}

impl ModeEngine for WordWolfEngine {
    fn mode(&self) -> GameMode {
        GameMode::WordWolf
    }

    fn setup(&self, room: &mut Room, ctx: &mut Ctx<'_>) {
        let (majority, minority) = match ctx.content.word_wolf_topics.choose(ctx.rng) {
            Some(pair) => (pair.majority.clone(), pair.minority.clone()),
            None => ("Topic A".to_string(), "Topic B".to_string()),
        };

        let player_ids: Vec<PlayerId> = room.players.keys().cloned().collect();
        let wolf_ids: Vec<PlayerId> = player_ids.choose(ctx.rng).cloned().into_iter().collect();

        let topics = player_ids
            .iter()
            .map(|id| {
                let topic = if wolf_ids.contains(id) { &minority } else { &majority };
                (id.clone(), topic.clone())
            })
            .collect();

        tracing::info!(
            "WordWolf setup in room {}: {} players, topics {} / {}",
            room.room_id,
            player_ids.len(),
            majority,
            minority
        );

        room.mode_state = ModeState::WordWolf(Some(WordWolfState {
            wolf_ids,
            topics,
            votes: IndexMap::new(),
            discussion_deadline: Self::deadline(room, ctx.now),
            majority_topic: majority,
            minority_topic: minority,
            result: None,
        }));
        room.phase = Phase::Description;
    }

    fn handle(
        &self,
        room: &mut Room,
        ctx: &mut Ctx<'_>,
        client_id: &str,
        msg: &ClientMessage,
    ) -> bool {
        match msg {
            ClientMessage::StartDiscussion {} => {
                if room.phase != Phase::Description {
                    return false;
                }
                let deadline = Self::deadline(room, ctx.now);
                let Some(state) = room.mode_state.word_wolf_mut() else {
                    return false;
                };
                state.discussion_deadline = deadline;
                room.phase = Phase::Answering;
                true
            }
            ClientMessage::SkipToJudging {} => {
                if room.phase != Phase::Answering {
                    return false;
                }
                room.phase = Phase::Judging;
                true
            }
            ClientMessage::VoteWolf { target_player_id } => {
                Self::vote(room, client_id, target_player_id.as_deref())
            }
            ClientMessage::FinishJudging {} => Self::finish(room),
            ClientMessage::NextRound {} => {
                if room.phase == Phase::Lobby {
                    return false;
                }
                room.reset_round();
                self.setup(room, ctx);
                true
            }
            _ => false,
        }
    }
}
