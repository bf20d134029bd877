//! Message dispatch and the five mode engines
//!
//! Common messages (join, start, config, reset) are applied to the room here;
//! everything else goes to the engine selected by the room's mode. Nothing in
//! this module fails: invalid messages are no-ops that report "no broadcast".

pub mod ito;
pub mod sekai;
pub mod sympathy;
pub mod werewolf;
pub mod word_wolf;

use crate::content::Content;
use crate::protocol::{ClientMessage, ConfigUpdate, ServerMessage};
use crate::state::{ModeState, Room};
use crate::types::*;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::sync::Arc;

pub use ito::ItoEngine;
pub use sekai::SekaiEngine;
pub use sympathy::SympathyEngine;
pub use werewolf::WerewolfEngine;
pub use word_wolf::WordWolfEngine;

/// Random source injected into every engine call (seedable in tests)
pub type GameRng = rand::rngs::StdRng;

/// Everything an engine may use besides the room itself
pub struct Ctx<'a> {
    pub content: &'a Content,
    pub rng: &'a mut GameRng,
    pub now: DateTime<Utc>,
}

/// Result of handling one message
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Whether every participant needs a fresh projection
    pub broadcast: bool,
    /// Private answer for the sender only
    pub reply: Option<ServerMessage>,
}

impl Dispatch {
    pub fn broadcast() -> Self {
        Self {
            broadcast: true,
            reply: None,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn reply(msg: ServerMessage) -> Self {
        Self {
            broadcast: false,
            reply: Some(msg),
        }
    }
}

impl From<bool> for Dispatch {
    fn from(broadcast: bool) -> Self {
        Self {
            broadcast,
            reply: None,
        }
    }
}

/// A pluggable game mode. Engines hold no state of their own; everything
/// lives in the room they are handed.
pub trait ModeEngine: Send + Sync {
    fn mode(&self) -> GameMode;

    /// Called when the mode starts
    fn setup(&self, room: &mut Room, ctx: &mut Ctx<'_>);

    /// Apply a mode-specific message. Returns true when the room changed.
    fn handle(
        &self,
        room: &mut Room,
        ctx: &mut Ctx<'_>,
        client_id: &str,
        msg: &ClientMessage,
    ) -> bool;
}

/// Engine for a mode
pub fn engine_for(mode: GameMode) -> &'static dyn ModeEngine {
    match mode {
        GameMode::Sympathy => &SympathyEngine,
        GameMode::WordWolf => &WordWolfEngine,
        GameMode::SekaiNoMikata => &SekaiEngine,
        GameMode::Ito => &ItoEngine,
        GameMode::OneNightWerewolf => &WerewolfEngine,
    }
}

/// The dispatcher. Shared by all rooms; owns only the immutable content.
pub struct GameEngine {
    content: Arc<Content>,
}

impl GameEngine {
    pub fn new(content: Arc<Content>) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Apply one message from `client_id` to `room`
    pub fn process_message(
        &self,
        room: &mut Room,
        rng: &mut GameRng,
        client_id: &str,
        msg: &ClientMessage,
    ) -> Dispatch {
        let mut ctx = Ctx {
            content: &self.content,
            rng,
            now: Utc::now(),
        };
        self.process_message_at(room, &mut ctx, client_id, msg)
    }

    /// Same as `process_message` with an explicit context (fixed clock in tests)
    pub fn process_message_at(
        &self,
        room: &mut Room,
        ctx: &mut Ctx<'_>,
        client_id: &str,
        msg: &ClientMessage,
    ) -> Dispatch {
        match msg {
            ClientMessage::Join { name } => {
                if is_operator(client_id) {
                    tracing::debug!("Ignoring JOIN from operator {}", client_id);
                    return Dispatch::none();
                }
                tracing::info!("Player {} joined room {} as {}", client_id, room.room_id, name);
                room.add_player(client_id, name);
                Dispatch::broadcast()
            }

            ClientMessage::StartGame { mode } => {
                self.start_game(room, ctx, *mode);
                Dispatch::broadcast()
            }

            ClientMessage::UpdateConfig(update) => {
                update_config(room, update);
                Dispatch::broadcast()
            }

            ClientMessage::ResetGame {} => {
                tracing::info!("Resetting room {}", room.room_id);
                room.reset_game();
                Dispatch::broadcast()
            }

            ClientMessage::WerewolfPeek {} => match werewolf::peek(room, client_id) {
                Some(view) => Dispatch::reply(ServerMessage::WerewolfPeek(view)),
                None => Dispatch::none(),
            },

            other => {
                let engine = engine_for(room.mode());
                let changed = engine.handle(room, ctx, client_id, other);
                if !changed {
                    tracing::debug!(
                        "{} from {} ignored in room {} ({:?}/{:?})",
                        other.kind(),
                        client_id,
                        room.room_id,
                        room.mode(),
                        room.phase
                    );
                }
                changed.into()
            }
        }
    }

    /// Switch the room to `mode`, reset round state and run the mode's setup
    pub fn start_game(&self, room: &mut Room, ctx: &mut Ctx<'_>, mode: GameMode) {
        tracing::info!(
            "Starting {:?} in room {} with {} players",
            mode,
            room.room_id,
            room.players.len()
        );
        room.mode_state = ModeState::empty(mode);
        room.winner_id = None;
        room.reset_round();
        engine_for(mode).setup(room, ctx);
    }
}

/// Apply one whitelisted config change
pub fn update_config(room: &mut Room, update: &ConfigUpdate) {
    tracing::info!("Room {} config update: {:?}", room.room_id, update);
    match *update {
        ConfigUpdate::SpeedStar(value) => room.config.speed_star = value,
        ConfigUpdate::Shuffle(value) => room.config.shuffle = value,
        ConfigUpdate::DiscussionTime(value) => room.config.discussion_seconds = value,
        ConfigUpdate::ItoCoop(value) => {
            room.config.ito_coop = value;
            if let Some(state) = room.mode_state.ito_mut() {
                state.is_coop_mode = value;
            }
        }
        ConfigUpdate::ItoCloseCall(value) => {
            room.config.ito_close_call = value;
            if let Some(state) = room.mode_state.ito_mut() {
                state.close_call_enabled = value;
            }
        }
        ConfigUpdate::WerewolfMadman(value) => room.config.werewolf_madman = value,
    }
}

/// Opaque answer id drawn from the room's random source. Carries no
/// timestamp, so sorting ids says nothing about submission order.
pub(crate) fn answer_id(rng: &mut GameRng) -> AnswerId {
    ulid::Ulid::from_parts(0, rng.random::<u128>()).to_string()
}

/// Pick an item from `pool` that is not in `used`, then record it.
/// When every item has been used the history is cleared first.
/// Returns `None` only for an empty pool.
pub(crate) fn draw_fresh(
    pool: &[String],
    used: &mut IndexSet<String>,
    rng: &mut GameRng,
) -> Option<String> {
    let mut available: Vec<&String> = pool.iter().filter(|q| !used.contains(*q)).collect();
    if available.is_empty() {
        used.clear();
        available = pool.iter().collect();
    }
    let picked = available.choose(rng).map(|q| (*q).clone())?;
    used.insert(picked.clone());
    Some(picked)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn run(engine: &GameEngine, room: &mut Room, rng: &mut GameRng, id: &str, msg: ClientMessage) -> Dispatch {
        engine.process_message(room, rng, id, &msg)
    }

    #[test]
    fn test_join_and_start_game() {
        let engine = GameEngine::new(Arc::new(Content::default()));
        let mut rng = rng(1);
        let mut room = Room::new("r".to_string());

        let d = run(&engine, &mut room, &mut rng, "p1", ClientMessage::Join { name: "Alice".into() });
        assert!(d.broadcast);
        run(&engine, &mut room, &mut rng, "p2", ClientMessage::Join { name: "Bob".into() });

        let d = run(
            &engine,
            &mut room,
            &mut rng,
            "HOST-x",
            ClientMessage::StartGame { mode: GameMode::WordWolf },
        );
        assert!(d.broadcast);
        assert_eq!(room.mode(), GameMode::WordWolf);
        assert_eq!(room.phase, Phase::Description);
        assert!(room.mode_state.word_wolf().is_some());
    }

    #[test]
    fn test_operator_join_ignored() {
        let engine = GameEngine::new(Arc::new(Content::default()));
        let mut rng = rng(1);
        let mut room = Room::new("r".to_string());

        let d = run(&engine, &mut room, &mut rng, "HOST-abc", ClientMessage::Join { name: "Host".into() });
        assert!(!d.broadcast);
        assert!(room.players.is_empty());
    }

    #[test]
    fn test_update_config_whitelist_and_ito_propagation() {
        let engine = GameEngine::new(Arc::new(Content::default()));
        let mut rng = rng(1);
        let mut room = room_with_players(&["p1", "p2"]);

        run(&engine, &mut room, &mut rng, "HOST-x", ClientMessage::StartGame { mode: GameMode::Ito });
        assert!(room.mode_state.ito().unwrap().is_coop_mode);

        run(
            &engine,
            &mut room,
            &mut rng,
            "HOST-x",
            ClientMessage::UpdateConfig(ConfigUpdate::ItoCoop(false)),
        );
        assert!(!room.config.ito_coop);
        assert!(!room.mode_state.ito().unwrap().is_coop_mode);

        run(
            &engine,
            &mut room,
            &mut rng,
            "HOST-x",
            ClientMessage::UpdateConfig(ConfigUpdate::DiscussionTime(60)),
        );
        assert_eq!(room.config.discussion_seconds, 60);
    }

    #[test]
    fn test_mode_message_for_wrong_mode_is_noop() {
        let engine = GameEngine::new(Arc::new(Content::default()));
        let mut rng = rng(1);
        let mut room = room_with_players(&["p1", "p2", "p3"]);

        // Sympathy is active; Sekai and Werewolf messages do nothing
        let d = run(&engine, &mut room, &mut rng, "p1", ClientMessage::SekaiSubmitAnswer { text: "x".into() });
        assert!(!d.broadcast);
        let d = run(&engine, &mut room, &mut rng, "p1", ClientMessage::WerewolfPeek {});
        assert!(!d.broadcast);
        assert!(d.reply.is_none());
    }

    #[test]
    fn test_reset_game_returns_to_lobby() {
        let engine = GameEngine::new(Arc::new(Content::default()));
        let mut rng = rng(1);
        let mut room = room_with_players(&["p1", "p2", "p3"]);
        run(&engine, &mut room, &mut rng, "HOST-x", ClientMessage::StartGame { mode: GameMode::Ito });

        run(&engine, &mut room, &mut rng, "HOST-x", ClientMessage::ResetGame {});
        assert_eq!(room.phase, Phase::Lobby);
        assert!(room.players.is_empty());
        assert!(room.mode_state.ito().is_none());
    }

    #[test]
    fn test_draw_fresh_avoids_repeats_until_exhausted() {
        let pool: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut used = IndexSet::new();
        let mut rng = rng(3);

        let mut drawn: Vec<String> = (0..3)
            .map(|_| draw_fresh(&pool, &mut used, &mut rng).unwrap())
            .collect();
        drawn.sort();
        assert_eq!(drawn, pool);

        // Exhausted: history resets and drawing continues
        let next = draw_fresh(&pool, &mut used, &mut rng).unwrap();
        assert!(pool.contains(&next));
        assert_eq!(used.len(), 1);

        assert!(draw_fresh(&[], &mut IndexSet::new(), &mut rng).is_none());
    }

    #[test]
    fn test_engine_registry_covers_every_mode() {
        for mode in [
            GameMode::Sympathy,
            GameMode::WordWolf,
            GameMode::SekaiNoMikata,
            GameMode::Ito,
            GameMode::OneNightWerewolf,
        ] {
            assert_eq!(engine_for(mode).mode(), mode);
        }
    }
}
