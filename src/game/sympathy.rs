//! Sympathy: everyone answers the same prompt and scores by matching the crowd

use super::{draw_fresh, Ctx, GameRng, ModeEngine};
use crate::protocol::{ClientMessage, GroupingUpdate};
use crate::state::Room;
use crate::types::*;
use indexmap::IndexMap;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::Serialize;

/// Score needed to win, provided the player is not holding the bomb
pub const WINNING_SCORE: u32 = 8;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Answer {
    pub answer_id: AnswerId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub raw_text: String,
    pub normalized_text: String,
    /// Canonical answer of this answer's group (its own id when alone)
    pub group_id: AnswerId,
    /// Submission time in unix millis
    pub timestamp: i64,
    pub used_shuffle: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SympathyState {
    pub current_question: Option<String>,
    /// Submission order
    pub answers: Vec<Answer>,
    pub shuffle_triggered: bool,
    pub speed_star_id: Option<PlayerId>,
    pub bomb_owner_id: Option<PlayerId>,
}

impl SympathyState {
    fn answer_mut(&mut self, answer_id: &str) -> Option<&mut Answer> {
        self.answers.iter_mut().find(|a| a.answer_id == answer_id)
    }

    fn has_answer(&self, answer_id: &str) -> bool {
        self.answers.iter().any(|a| a.answer_id == answer_id)
    }

    /// Redistribute all texts randomly over the existing answer slots
    fn shuffle_texts(&mut self, rng: &mut GameRng) {
        let mut texts: Vec<String> = self.answers.iter().map(|a| a.raw_text.clone()).collect();
        texts.shuffle(rng);
        for (answer, text) in self.answers.iter_mut().zip(texts) {
            answer.normalized_text = text.trim().to_string();
            answer.raw_text = text;
        }
    }

    /// Group answers with equal case-insensitive text. The earliest answer
    /// of each text becomes the canonical id.
    pub fn auto_group(&mut self) {
        let mut canonical: IndexMap<String, AnswerId> = IndexMap::new();
        for answer in &mut self.answers {
            let key = answer.normalized_text.to_lowercase();
            let group = canonical
                .entry(key)
                .or_insert_with(|| answer.answer_id.clone());
            answer.group_id = group.clone();
        }
    }

    /// Apply client-side regrouping. Unknown answers and unknown target
    /// groups are ignored.
    pub fn apply_grouping(&mut self, updates: &IndexMap<AnswerId, GroupingUpdate>) {
        for (answer_id, update) in updates {
            let group_id = update.group_id.clone().unwrap_or_else(|| answer_id.clone());
            if !self.has_answer(&group_id) {
                continue;
            }
            if let Some(answer) = self.answer_mut(answer_id) {
                answer.group_id = group_id;
            }
        }
    }

    /// Answers grouped by `group_id`, in order of first appearance
    pub fn groups(&self) -> IndexMap<&str, Vec<&Answer>> {
        let mut groups: IndexMap<&str, Vec<&Answer>> = IndexMap::new();
        for answer in &self.answers {
            groups.entry(answer.group_id.as_str()).or_default().push(answer);
        }
        groups
    }

    /// Score the round: majority points, speed star and bomb assignment.
    /// Returns the winner, if any.
    pub fn calculate_results(
        &mut self,
        players: &mut IndexMap<PlayerId, Player>,
        speed_star: bool,
        rng: &mut GameRng,
    ) -> Option<PlayerId> {
        self.speed_star_id = None;

        let groups = self.groups();
        if groups.is_empty() {
            return None;
        }

        let max_size = groups.values().map(Vec::len).max().unwrap_or(0);
        let mut scorers: Vec<PlayerId> = Vec::new();
        let mut fastest: Option<(i64, PlayerId)> = None;

        if max_size > 1 {
            for members in groups.values().filter(|m| m.len() == max_size) {
                for answer in members {
                    scorers.push(answer.player_id.clone());
                    if speed_star
                        && answer.timestamp > 0
                        && fastest.as_ref().map_or(true, |(t, _)| answer.timestamp < *t)
                    {
                        fastest = Some((answer.timestamp, answer.player_id.clone()));
                    }
                }
            }
        }

        let bomb_candidates: Vec<PlayerId> = groups
            .values()
            .filter(|m| m.len() == 1)
            .map(|m| m[0].player_id.clone())
            .collect();

        for player_id in &scorers {
            if let Some(player) = players.get_mut(player_id) {
                player.score += 1;
            }
        }

        if let Some((_, player_id)) = fastest {
            if let Some(player) = players.get_mut(&player_id) {
                player.score += 1;
                self.speed_star_id = Some(player_id);
            }
        }

        if !bomb_candidates.is_empty() {
            let keeps = self
                .bomb_owner_id
                .as_ref()
                .is_some_and(|owner| bomb_candidates.contains(owner));
            if !keeps {
                self.bomb_owner_id = bomb_candidates.choose(rng).cloned();
            }
        }

        players
            .values()
            .find(|p| {
                p.score >= WINNING_SCORE && Some(&p.player_id) != self.bomb_owner_id.as_ref()
            })
            .map(|p| p.player_id.clone())
    }
}

pub struct SympathyEngine;

impl SympathyEngine {
    fn draw_question(room: &mut Room, ctx: &mut Ctx<'_>) {
        let question = draw_fresh(&ctx.content.questions, &mut room.used_questions, ctx.rng);
        if let Some(state) = room.mode_state.sympathy_mut() {
            state.current_question = question;
        }
    }

    fn start_round(room: &mut Room, ctx: &mut Ctx<'_>) -> bool {
        if room.phase != Phase::Instruction {
            return false;
        }
        let needs_question = room
            .mode_state
            .sympathy()
            .is_some_and(|s| s.current_question.is_none());
        if needs_question {
            Self::draw_question(room, ctx);
        }
        room.phase = Phase::Answering;
        true
    }

    fn submit_answer(
        room: &mut Room,
        ctx: &mut Ctx<'_>,
        client_id: &str,
        text: &str,
        use_shuffle: bool,
    ) -> bool {
        if room.phase != Phase::Answering || text.trim().is_empty() {
            return false;
        }
        let shuffle_enabled = room.config.shuffle;
        let Some(player) = room.players.get_mut(client_id) else {
            return false;
        };
        if player.has_answered {
            return false;
        }
        let Some(state) = room.mode_state.sympathy_mut() else {
            return false;
        };

        player.has_answered = true;
        let used_shuffle = use_shuffle && shuffle_enabled && player.shuffle_remaining > 0;
        if used_shuffle {
            player.shuffle_remaining -= 1;
            state.shuffle_triggered = true;
            tracing::info!("Player {} used their shuffle", client_id);
        }

        let answer_id = super::answer_id(ctx.rng);
        state.answers.push(Answer {
            answer_id: answer_id.clone(),
            player_id: client_id.to_string(),
            player_name: player.name.clone(),
            raw_text: text.to_string(),
            normalized_text: text.trim().to_string(),
            group_id: answer_id,
            timestamp: ctx.now.timestamp_millis(),
            used_shuffle,
        });
        true
    }

    fn skip_to_judging(room: &mut Room, ctx: &mut Ctx<'_>) -> bool {
        if room.phase != Phase::Answering {
            return false;
        }
        let Some(state) = room.mode_state.sympathy_mut() else {
            return false;
        };
        if state.shuffle_triggered {
            tracing::info!("Shuffling {} answers in room {}", state.answers.len(), room.room_id);
            state.shuffle_texts(ctx.rng);
        }
        state.auto_group();
        room.phase = Phase::Judging;
        true
    }

    fn finish_judging(room: &mut Room, ctx: &mut Ctx<'_>) -> bool {
        if room.phase != Phase::Judging {
            return false;
        }
        let speed_star = room.config.speed_star;
        let Some(state) = room.mode_state.sympathy_mut() else {
            return false;
        };
        room.winner_id = state.calculate_results(&mut room.players, speed_star, ctx.rng);
        tracing::info!(
            "Sympathy round scored in room {}: speed star {:?}, bomb {:?}, winner {:?}",
            room.room_id,
            state.speed_star_id,
            state.bomb_owner_id,
            room.winner_id
        );
        room.phase = Phase::Result;
        true
    }

    fn next_round(room: &mut Room, ctx: &mut Ctx<'_>) -> bool {
        if room.phase == Phase::Lobby {
            return false;
        }
        room.reset_round();
        Self::draw_question(room, ctx);
        room.phase = Phase::Answering;
        true
    }
}

impl ModeEngine for SympathyEngine {
    fn mode(&self) -> GameMode {
        GameMode::Sympathy
    }

    fn setup(&self, room: &mut Room, _ctx: &mut Ctx<'_>) {
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
            ClientMessage::StartRound {} => Self::start_round(room, ctx),
            ClientMessage::SubmitAnswer { text, use_shuffle } => {
                Self::submit_answer(room, ctx, client_id, text, *use_shuffle)
            }
            ClientMessage::SkipToJudging {} => Self::skip_to_judging(room, ctx),
            ClientMessage::UpdateGrouping { answers } => {
                if room.phase != Phase::Judging {
                    return false;
                }
                match room.mode_state.sympathy_mut() {
                    Some(state) => {
                        state.apply_grouping(answers);
                        true
                    }
                    None => false,
                }
            }
            ClientMessage::FinishJudging {} => Self::finish_judging(room, ctx),
            ClientMessage::NextRound {} => Self::next_round(room, ctx),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::GameEngine;
    use super::*;
    use crate::content::Content;
    use std::sync::Arc;

    struct Harness {
        engine: GameEngine,
        rng: GameRng,
        room: Room,
        clock: i64,
    }

    impl Harness {
        fn new(players: &[&str]) -> Self {
            let mut h = Self {
                engine: GameEngine::new(Arc::new(Content::default())),
                rng: rng(11),
                room: room_with_players(players),
                clock: 1_000,
            };
            h.send("HOST-1", ClientMessage::StartGame { mode: GameMode::Sympathy });
            h.send("HOST-1", ClientMessage::StartRound {});
            h
        }

        fn send(&mut self, id: &str, msg: ClientMessage) -> bool {
            self.clock += 10;
            let mut ctx = Ctx {
                content: self.engine.content(),
                rng: &mut self.rng,
                now: at(self.clock),
            };
            self.engine
                .process_message_at(&mut self.room, &mut ctx, id, &msg)
                .broadcast
        }

        fn submit(&mut self, id: &str, text: &str) -> bool {
            self.send(
                id,
                ClientMessage::SubmitAnswer {
                    text: text.to_string(),
                    use_shuffle: false,
                },
            )
        }

        fn state(&self) -> &SympathyState {
            self.room.mode_state.sympathy().unwrap()
        }
    }

    #[test]
    fn test_round_flow_phases() {
        let mut h = Harness::new(&["p1", "p2"]);
        assert_eq!(h.room.phase, Phase::Answering);
        assert!(h.state().current_question.is_some());

        assert!(!h.send("HOST-1", ClientMessage::FinishJudging {}));
        h.submit("p1", "cat");
        h.send("HOST-1", ClientMessage::SkipToJudging {});
        assert_eq!(h.room.phase, Phase::Judging);
        h.send("HOST-1", ClientMessage::FinishJudging {});
        assert_eq!(h.room.phase, Phase::Result);

        h.send("HOST-1", ClientMessage::NextRound {});
        assert_eq!(h.room.phase, Phase::Answering);
        assert!(h.state().answers.is_empty());
        assert!(!h.room.players["p1"].has_answered);
    }

    #[test]
    fn test_submit_rejections() {
        let mut h = Harness::new(&["p1"]);
        assert!(!h.submit("p1", ""));
        assert!(!h.submit("p1", "   "));
        assert!(!h.submit("ghost", "cat"));
        assert!(h.submit("p1", "cat"));
        assert!(!h.submit("p1", "dog"));
        assert_eq!(h.state().answers.len(), 1);
        assert!(h.room.players["p1"].has_answered);
        // Each answer starts in its own group
        let answer = &h.state().answers[0];
        assert_eq!(answer.group_id, answer.answer_id);
    }

    #[test]
    fn test_scenario_apple_apple_banana() {
        let mut h = Harness::new(&["p1", "p2", "p3"]);
        h.submit("p1", "Apple");
        h.submit("p2", "apple ");
        h.submit("p3", "Banana");
        h.send("HOST-1", ClientMessage::SkipToJudging {});

        let groups = h.state().groups();
        assert_eq!(groups.len(), 2);
        let first_id = h.state().answers[0].answer_id.clone();
        assert_eq!(groups[first_id.as_str()].len(), 2);
        assert_eq!(h.state().answers[1].group_id, first_id);

        h.send("HOST-1", ClientMessage::FinishJudging {});
        assert_eq!(h.room.players["p1"].score, 2);
        assert_eq!(h.room.players["p2"].score, 1);
        assert_eq!(h.room.players["p3"].score, 0);
        assert_eq!(h.state().speed_star_id.as_deref(), Some("p1"));
        assert_eq!(h.state().bomb_owner_id.as_deref(), Some("p3"));
    }

    #[test]
    fn test_no_speed_star_when_disabled() {
        let mut h = Harness::new(&["p1", "p2"]);
        h.room.config.speed_star = false;
        h.submit("p1", "x");
        h.submit("p2", "X");
        h.send("HOST-1", ClientMessage::SkipToJudging {});
        h.send("HOST-1", ClientMessage::FinishJudging {});
        assert_eq!(h.room.players["p1"].score, 1);
        assert_eq!(h.room.players["p2"].score, 1);
        assert!(h.state().speed_star_id.is_none());
    }

    #[test]
    fn test_all_distinct_scores_nobody() {
        let mut h = Harness::new(&["p1", "p2"]);
        h.submit("p1", "x");
        h.submit("p2", "y");
        h.send("HOST-1", ClientMessage::SkipToJudging {});
        h.send("HOST-1", ClientMessage::FinishJudging {});
        assert!(h.room.players.values().all(|p| p.score == 0));
        let bomb = h.state().bomb_owner_id.clone().unwrap();
        assert!(bomb == "p1" || bomb == "p2");
    }

    #[test]
    fn test_auto_group_is_idempotent() {
        let mut h = Harness::new(&["p1", "p2", "p3", "p4"]);
        for (id, text) in [("p1", "Sun"), ("p2", "moon"), ("p3", " sun"), ("p4", "MOON")] {
            h.submit(id, text);
        }
        h.send("HOST-1", ClientMessage::SkipToJudging {});

        let state = h.room.mode_state.sympathy_mut().unwrap();
        let before: Vec<_> = state.answers.iter().map(|a| a.group_id.clone()).collect();
        state.auto_group();
        let after: Vec<_> = state.answers.iter().map(|a| a.group_id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_update_grouping_merges_and_ignores_unknown() {
        let mut h = Harness::new(&["p1", "p2"]);
        h.submit("p1", "kitten");
        h.submit("p2", "cat");
        h.send("HOST-1", ClientMessage::SkipToJudging {});

        let a1 = h.state().answers[0].answer_id.clone();
        let a2 = h.state().answers[1].answer_id.clone();
        let mut answers = IndexMap::new();
        answers.insert(a2.clone(), GroupingUpdate { group_id: Some(a1.clone()) });
        answers.insert("ghost".to_string(), GroupingUpdate { group_id: Some(a1.clone()) });
        h.send("HOST-1", ClientMessage::UpdateGrouping { answers });
        assert_eq!(h.state().answers[1].group_id, a1);

        // A target that is not an answer leaves the grouping alone
        let mut answers = IndexMap::new();
        answers.insert(a2.clone(), GroupingUpdate { group_id: Some("nope".to_string()) });
        h.send("HOST-1", ClientMessage::UpdateGrouping { answers });
        assert_eq!(h.state().answers[1].group_id, a1);

        h.send("HOST-1", ClientMessage::FinishJudging {});
        assert_eq!(h.room.players["p1"].score, 2);
        assert_eq!(h.room.players["p2"].score, 1);
    }

    #[test]
    fn test_shuffle_consumes_credit_once() {
        let mut h = Harness::new(&["p1", "p2"]);
        h.send(
            "p1",
            ClientMessage::SubmitAnswer {
                text: "red".to_string(),
                use_shuffle: true,
            },
        );
        assert_eq!(h.room.players["p1"].shuffle_remaining, 0);
        assert!(h.state().shuffle_triggered);
        assert!(h.state().answers[0].used_shuffle);
        h.submit("p2", "blue");

        h.send("HOST-1", ClientMessage::SkipToJudging {});
        let mut texts: Vec<_> = h.state().answers.iter().map(|a| a.raw_text.clone()).collect();
        texts.sort();
        assert_eq!(texts, vec!["blue", "red"]);

        // Next round: no credit left
        h.send("HOST-1", ClientMessage::FinishJudging {});
        h.send("HOST-1", ClientMessage::NextRound {});
        h.send(
            "p1",
            ClientMessage::SubmitAnswer {
                text: "green".to_string(),
                use_shuffle: true,
            },
        );
        assert!(!h.state().shuffle_triggered);
        assert!(!h.state().answers[0].used_shuffle);
    }

    #[test]
    fn test_shuffle_disabled_by_config() {
        let mut h = Harness::new(&["p1"]);
        h.room.config.shuffle = false;
        h.send(
            "p1",
            ClientMessage::SubmitAnswer {
                text: "red".to_string(),
                use_shuffle: true,
            },
        );
        assert_eq!(h.room.players["p1"].shuffle_remaining, 1);
        assert!(!h.state().shuffle_triggered);
    }

    #[test]
    fn test_bomb_holder_keeps_bomb_while_candidate() {
        let mut players = room_with_players(&["p1", "p2", "p3"]).players;
        let mut state = SympathyState {
            bomb_owner_id: Some("p3".to_string()),
            ..Default::default()
        };
        for (i, (id, text)) in [("p1", "a"), ("p2", "b"), ("p3", "c")].iter().enumerate() {
            state.answers.push(Answer {
                answer_id: format!("a{}", i),
                player_id: id.to_string(),
                player_name: id.to_string(),
                raw_text: text.to_string(),
                normalized_text: text.to_string(),
                group_id: format!("a{}", i),
                timestamp: 100 + i as i64,
                used_shuffle: false,
            });
        }
        let mut rng = rng(5);
        state.calculate_results(&mut players, true, &mut rng);
        assert_eq!(state.bomb_owner_id.as_deref(), Some("p3"));
    }

    #[test]
    fn test_winner_requires_no_bomb() {
        let mut h = Harness::new(&["p1", "p2", "p3"]);
        h.room.players["p1"].score = 7;
        h.room.players["p3"].score = 9;
        h.room.mode_state.sympathy_mut().unwrap().bomb_owner_id = Some("p3".to_string());

        h.submit("p1", "same");
        h.submit("p2", "same");
        h.submit("p3", "different");
        h.send("HOST-1", ClientMessage::SkipToJudging {});
        h.send("HOST-1", ClientMessage::FinishJudging {});

        // p1: 7 + 1 + speed star; p3 keeps the bomb despite 9 points
        assert_eq!(h.room.players["p1"].score, 9);
        assert_eq!(h.state().bomb_owner_id.as_deref(), Some("p3"));
        assert_eq!(h.room.winner_id.as_deref(), Some("p1"));
    }
}
