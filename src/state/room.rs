use crate::game::ito::ItoState;
use crate::game::sekai::SekaiState;
use crate::game::sympathy::SympathyState;
use crate::game::werewolf::WerewolfState;
use crate::game::word_wolf::WordWolfState;
use crate::types::*;
use indexmap::{IndexMap, IndexSet};

/// One game session: roster, phase, config and the state of the active mode.
/// Pure data; every mutation goes through the game engine.
#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: RoomId,
    pub phase: Phase,
    /// Insertion-ordered so random draws over the roster are reproducible
    pub players: IndexMap<PlayerId, Player>,
    pub mode_state: ModeState,
    /// Sympathy questions already asked this session
    pub used_questions: IndexSet<String>,
    pub winner_id: Option<PlayerId>,
    pub config: RoomConfig,
}

/// State of the active mode. The variant is the mode, so a mode and a
/// foreign state can never be paired. `None` means setup has not produced
/// a playable state yet (e.g. too few players for Werewolf).
#[derive(Debug, Clone)]
pub enum ModeState {
    Sympathy(SympathyState),
    WordWolf(Option<WordWolfState>),
    Sekai(Option<SekaiState>),
    Ito(Option<ItoState>),
    Werewolf(Option<WerewolfState>),
}

impl Default for ModeState {
    fn default() -> Self {
        ModeState::Sympathy(SympathyState::default())
    }
}

impl ModeState {
    /// Fresh, not-yet-set-up state for a mode
    pub fn empty(mode: GameMode) -> Self {
        match mode {
            GameMode::Sympathy => ModeState::Sympathy(SympathyState::default()),
            GameMode::WordWolf => ModeState::WordWolf(None),
            GameMode::SekaiNoMikata => ModeState::Sekai(None),
            GameMode::Ito => ModeState::Ito(None),
            GameMode::OneNightWerewolf => ModeState::Werewolf(None),
        }
    }

    pub fn mode(&self) -> GameMode {
        match self {
            ModeState::Sympathy(_) => GameMode::Sympathy,
            ModeState::WordWolf(_) => GameMode::WordWolf,
            ModeState::Sekai(_) => GameMode::SekaiNoMikata,
            ModeState::Ito(_) => GameMode::Ito,
            ModeState::Werewolf(_) => GameMode::OneNightWerewolf,
        }
    }

    pub fn sympathy(&self) -> Option<&SympathyState> {
        match self {
            ModeState::Sympathy(state) => Some(state),
            _ => None,
        }
    }

    pub fn sympathy_mut(&mut self) -> Option<&mut SympathyState> {
        match self {
            ModeState::Sympathy(state) => Some(state),
            _ => None,
        }
    }

    pub fn word_wolf(&self) -> Option<&WordWolfState> {
        match self {
            ModeState::WordWolf(state) => state.as_ref(),
            _ => None,
        }
    }

    pub fn word_wolf_mut(&mut self) -> Option<&mut WordWolfState> {
        match self {
            ModeState::WordWolf(state) => state.as_mut(),
            _ => None,
        }
    }

    pub fn sekai(&self) -> Option<&SekaiState> {
        match self {
            ModeState::Sekai(state) => state.as_ref(),
            _ => None,
        }
    }

    pub fn sekai_mut(&mut self) -> Option<&mut SekaiState> {
        match self {
            ModeState::Sekai(state) => state.as_mut(),
            _ => None,
        }
    }

    pub fn ito(&self) -> Option<&ItoState> {
        match self {
            ModeState::Ito(state) => state.as_ref(),
            _ => None,
        }
    }

    pub fn ito_mut(&mut self) -> Option<&mut ItoState> {
        match self {
            ModeState::Ito(state) => state.as_mut(),
            _ => None,
        }
    }

    pub fn werewolf(&self) -> Option<&WerewolfState> {
        match self {
            ModeState::Werewolf(state) => state.as_ref(),
            _ => None,
        }
    }

    pub fn werewolf_mut(&mut self) -> Option<&mut WerewolfState> {
        match self {
            ModeState::Werewolf(state) => state.as_mut(),
            _ => None,
        }
    }
}

impl Room {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            phase: Phase::Lobby,
            players: IndexMap::new(),
            mode_state: ModeState::default(),
            used_questions: IndexSet::new(),
            winner_id: None,
            config: RoomConfig::default(),
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode_state.mode()
    }

    /// Clear per-round answer data and "has acted" flags
    pub fn reset_round(&mut self) {
        if let Some(state) = self.mode_state.sympathy_mut() {
            state.answers.clear();
            state.shuffle_triggered = false;
        }
        for player in self.players.values_mut() {
            player.has_answered = false;
        }
    }

    /// Back to LOBBY with an empty roster and no history. Mode and config are kept.
    pub fn reset_game(&mut self) {
        self.phase = Phase::Lobby;
        self.players.clear();
        self.used_questions.clear();
        self.winner_id = None;
        self.mode_state = ModeState::empty(self.mode());
    }
}
