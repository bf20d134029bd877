//! Sekai no Mikata: fill in the blank with a word from your hand, and the
//! reader picks the answer they like best. Decoys from the deck cost everyone.

use super::{answer_id, draw_fresh, Ctx, GameRng, ModeEngine};
use crate::protocol::ClientMessage;
use crate::state::{ModeState, Room};
use crate::types::*;
use indexmap::{IndexMap, IndexSet};
use rand::seq::{index, SliceRandom};
use serde::Serialize;

/// Words dealt to each non-reader per round
pub const HAND_SIZE: usize = 8;
/// The used-word history resets once fewer than this many words remain
pub const MIN_FRESH_WORDS: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SekaiAnswer {
    pub answer_id: AnswerId,
    /// `None` for decoys drawn from the deck
    pub player_id: Option<PlayerId>,
    pub player_name: Option<String>,
    pub text: String,
    pub is_dummy: bool,
}

#[derive(Debug, Clone)]
pub struct SekaiState {
    pub reader_order: Vec<PlayerId>,
    pub current_reader_index: usize,
    pub current_question: String,
    /// player -> hand of words for this round
    pub word_choices: IndexMap<PlayerId, Vec<String>>,
    pub submitted_answers: Vec<SekaiAnswer>,
    pub dummy_answers: Vec<SekaiAnswer>,
    /// Real and decoy answers, shuffled once when judging starts
    pub display_answers: Vec<SekaiAnswer>,
    pub selected_answer_id: Option<AnswerId>,
    pub round_number: u32,
    pub winning_score: u32,
    pub used_questions: IndexSet<String>,
    pub used_words: IndexSet<String>,
}

impl SekaiState {
    pub fn current_reader_id(&self) -> Option<&str> {
        self.reader_order
            .get(self.current_reader_index)
            .map(String::as_str)
    }

    pub fn is_reader(&self, player_id: &str) -> bool {
        self.current_reader_id() == Some(player_id)
    }
}

/// 5 points to win with up to four players, 3 with more
pub fn winning_score(player_count: usize) -> u32 {
    if player_count <= 4 {
        5
    } else {
        3
    }
}

/// Decoys mixed into the judged answers
pub fn decoy_count(player_count: usize) -> usize {
    if player_count <= 3 {
        2
    } else {
        1
    }
}

fn sample(pool: &[&String], amount: usize, rng: &mut GameRng) -> Vec<String> {
    let amount = amount.min(pool.len());
    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect()
}

/// Deal a hand to every non-reader. Words already dealt this round are
/// avoided unless that leaves fewer than a full hand.
fn deal_hands(
    words: &[String],
    used_words: &mut IndexSet<String>,
    recipients: &[PlayerId],
    rng: &mut GameRng,
) -> IndexMap<PlayerId, Vec<String>> {
    let mut available: Vec<&String> = words.iter().filter(|w| !used_words.contains(*w)).collect();
    if available.len() < MIN_FRESH_WORDS {
        used_words.clear();
        available = words.iter().collect();
    }

    let mut dealt: IndexSet<String> = IndexSet::new();
    let mut hands = IndexMap::new();
    for player_id in recipients {
        let fresh: Vec<&String> = available
            .iter()
            .copied()
            .filter(|w| !dealt.contains(*w))
            .collect();
        let pool = if fresh.len() < HAND_SIZE { &available } else { &fresh };
        let hand = sample(pool, HAND_SIZE, rng);
        dealt.extend(hand.iter().cloned());
        hands.insert(player_id.clone(), hand);
    }

    used_words.extend(dealt);
    hands
}

pub struct SekaiEngine;

impl SekaiEngine {
    fn start_round(room: &mut Room, ctx: &mut Ctx<'_>) {
        let Some(state) = room.mode_state.sekai_mut() else {
            return;
        };
        let reader_id = state.current_reader_id().map(str::to_string);

        state.current_question =
            draw_fresh(&ctx.content.sekai_questions, &mut state.used_questions, ctx.rng)
                .unwrap_or_default();

        let recipients: Vec<PlayerId> = room
            .players
            .keys()
            .filter(|id| Some(*id) != reader_id.as_ref())
            .cloned()
            .collect();
        state.word_choices = deal_hands(&ctx.content.sekai_words, &mut state.used_words, &recipients, ctx.rng);

        state.submitted_answers.clear();
        state.dummy_answers.clear();
        state.display_answers.clear();
        state.selected_answer_id = None;

        for player in room.players.values_mut() {
            // The reader does not answer
            player.has_answered = Some(&player.player_id) == reader_id.as_ref();
        }

        tracing::info!(
            "Sekai round {} in room {}: reader {:?}",
            state.round_number,
            room.room_id,
            reader_id
        );
        room.phase = Phase::Answering;
    }

    fn submit_answer(room: &mut Room, ctx: &mut Ctx<'_>, client_id: &str, text: &str) -> bool {
        if room.phase != Phase::Answering || text.trim().is_empty() {
            return false;
        }
        let Some(state) = room.mode_state.sekai_mut() else {
            return false;
        };
        if state.is_reader(client_id) {
            return false;
        }
        let Some(player) = room.players.get_mut(client_id) else {
            return false;
        };
        if player.has_answered {
            return false;
        }

        state.submitted_answers.push(SekaiAnswer {
            answer_id: answer_id(ctx.rng),
            player_id: Some(client_id.to_string()),
            player_name: Some(player.name.clone()),
            text: text.to_string(),
            is_dummy: false,
        });
        player.has_answered = true;

        if room.all_answered() {
            Self::prepare_judging(room, ctx);
        }
        true
    }

    /// Mix in decoys and fix the display order
    fn prepare_judging(room: &mut Room, ctx: &mut Ctx<'_>) {
        let player_count = room.players.len();
        let Some(state) = room.mode_state.sekai_mut() else {
            return;
        };

        let deck: Vec<&String> = ctx.content.sekai_words.iter().collect();
        state.dummy_answers = sample(&deck, decoy_count(player_count), ctx.rng)
            .into_iter()
            .map(|word| SekaiAnswer {
                answer_id: answer_id(ctx.rng),
                player_id: None,
                player_name: None,
                text: word,
                is_dummy: true,
            })
            .collect();

        let mut display: Vec<SekaiAnswer> = state
            .submitted_answers
            .iter()
            .chain(state.dummy_answers.iter())
            .cloned()
            .collect();
        display.shuffle(ctx.rng);
        state.display_answers = display;

        tracing::info!(
            "Sekai judging in room {}: {} answers, {} decoys",
            room.room_id,
            state.submitted_answers.len(),
            state.dummy_answers.len()
        );
        room.phase = Phase::Judging;
    }

    fn select_answer(room: &mut Room, client_id: &str, answer_id: &str) -> bool {
        if room.phase != Phase::Judging {
            return false;
        }
        let Some(state) = room.mode_state.sekai_mut() else {
            return false;
        };
        if !is_operator(client_id) && !state.is_reader(client_id) {
            return false;
        }
        let Some(selected) = state
            .display_answers
            .iter()
            .find(|a| a.answer_id == answer_id)
            .cloned()
        else {
            return false;
        };

        state.selected_answer_id = Some(selected.answer_id.clone());

        if selected.is_dummy {
            for player in room.players.values_mut() {
                player.score = player.score.saturating_sub(1);
            }
        } else if let Some(player) = selected
            .player_id
            .as_ref()
            .and_then(|id| room.players.get_mut(id))
        {
            player.score += 1;
        }

        let winning_score = state.winning_score;
        if let Some(winner) = room.players.values().find(|p| p.score >= winning_score) {
            tracing::info!("Sekai winner in room {}: {}", room.room_id, winner.player_id);
            room.winner_id = Some(winner.player_id.clone());
        }

        room.phase = Phase::Result;
        true
    }

    fn next_round(room: &mut Room, ctx: &mut Ctx<'_>) -> bool {
        if room.winner_id.is_some() || room.phase == Phase::Lobby {
            return false;
        }
        let Some(state) = room.mode_state.sekai_mut() else {
            return false;
        };
        if state.reader_order.is_empty() {
            return false;
        }
        state.current_reader_index = (state.current_reader_index + 1) % state.reader_order.len();
        state.round_number += 1;
        Self::start_round(room, ctx);
        true
    }
}

impl ModeEngine for SekaiEngine {
    fn mode(&self) -> GameMode {
        GameMode::SekaiNoMikata
    }

    fn setup(&self, room: &mut Room, ctx: &mut Ctx<'_>) {
        if room.players.is_empty() {
            tracing::warn!("Sekai needs players, room {} is empty", room.room_id);
            return;
        }

        for player in room.players.values_mut() {
            player.score = 0;
        }
        room.winner_id = None;

        let mut reader_order: Vec<PlayerId> = room.players.keys().cloned().collect();
        reader_order.shuffle(ctx.rng);

        room.mode_state = ModeState::Sekai(Some(SekaiState {
            reader_order,
            current_reader_index: 0,
            current_question: String::new(),
            word_choices: IndexMap::new(),
            submitted_answers: Vec::new(),
            dummy_answers: Vec::new(),
            display_answers: Vec::new(),
            selected_answer_id: None,
            round_number: 1,
            winning_score: winning_score(room.players.len()),
            used_questions: IndexSet::new(),
            used_words: IndexSet::new(),
        }));
        Self::start_round(room, ctx);
    }

    fn handle(
        &self,
        room: &mut Room,
        ctx: &mut Ctx<'_>,
        client_id: &str,
        msg: &ClientMessage,
    ) -> bool {
        match msg {
            ClientMessage::SekaiSubmitAnswer { text } => Self::submit_answer(room, ctx, client_id, text),
            ClientMessage::SekaiSelectAnswer { answer_id } => {
                Self::select_answer(room, client_id, answer_id)
            }
            ClientMessage::SekaiNextRound {} => Self::next_round(room, ctx),
            _ => false,
        }
    }
}
