use crate::types::*;
use crate::view::{PeekView, RoomView};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Inbound messages. On the wire every frame is `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    // Common
    Join {
        #[serde(default = "default_player_name")]
        name: String,
    },
    StartGame {
        #[serde(default)]
        mode: GameMode,
    },
    UpdateConfig(ConfigUpdate),
    ResetGame {},

    // Sympathy (FINISH_JUDGING / NEXT_ROUND are shared with other modes)
    StartRound {},
    SubmitAnswer {
        #[serde(default)]
        text: String,
        #[serde(default)]
        use_shuffle: bool,
    },
    SkipToJudging {},
    UpdateGrouping {
        #[serde(default)]
        answers: IndexMap<AnswerId, GroupingUpdate>,
    },
    FinishJudging {},
    NextRound {},

    // WordWolf
    StartDiscussion {},
    VoteWolf {
        #[serde(default)]
        target_player_id: Option<PlayerId>,
    },

    // Sekai no Mikata
    SekaiSubmitAnswer {
        #[serde(default)]
        text: String,
    },
    SekaiSelectAnswer {
        #[serde(default)]
        answer_id: AnswerId,
    },
    SekaiNextRound {},

    // Ito
    ItoPlayCard {},
    ItoNextStage {},
    ItoShowResult {},

    // One Night Werewolf
    WerewolfStartNight {},
    WerewolfAdvanceNight {},
    WerewolfNightAction(NightAction),
    WerewolfStartDiscussion {},
    WerewolfVote {
        #[serde(default)]
        target_player_id: String,
    },
    WerewolfFinishVoting {},
    /// Answered privately to the requester, never broadcast
    WerewolfPeek {},
}

fn default_player_name() -> String {
    "Unknown".to_string()
}

/// Whitelisted UPDATE_CONFIG keys, `{"type": <key>, "value": <value>}`.
/// Unknown keys fail to parse and are dropped like any unknown frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigUpdate {
    SpeedStar(bool),
    Shuffle(bool),
    DiscussionTime(u32),
    ItoCoop(bool),
    ItoCloseCall(bool),
    WerewolfMadman(bool),
}

/// Client-side regrouping of one Sympathy answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupingUpdate {
    #[serde(default)]
    pub group_id: Option<AnswerId>,
}

/// Werewolf night actions, `{"action": ..., "target": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NightAction {
    WerewolfConfirm {},
    /// `target` is a player id or `graveyard_<index>`
    SeerLook {
        #[serde(default)]
        target: String,
    },
    /// `target` is a player id or `skip`
    ThiefSwap {
        #[serde(default)]
        target: String,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl ClientMessage {
    /// Parse a raw `{type, data}` frame. A missing or null `data` is read as `{}`.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let data = if envelope.data.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            envelope.data
        };
        serde_json::from_value(serde_json::json!({ "type": envelope.kind, "data": data }))
    }

    /// Wire name of the message, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "JOIN",
            ClientMessage::StartGame { .. } => "START_GAME",
            ClientMessage::UpdateConfig(_) => "UPDATE_CONFIG",
            ClientMessage::ResetGame {} => "RESET_GAME",
            ClientMessage::StartRound {} => "START_ROUND",
            ClientMessage::SubmitAnswer { .. } => "SUBMIT_ANSWER",
            ClientMessage::SkipToJudging {} => "SKIP_TO_JUDGING",
            ClientMessage::UpdateGrouping { .. } => "UPDATE_GROUPING",
            ClientMessage::FinishJudging {} => "FINISH_JUDGING",
            ClientMessage::NextRound {} => "NEXT_ROUND",
            ClientMessage::StartDiscussion {} => "START_DISCUSSION",
            ClientMessage::VoteWolf { .. } => "VOTE_WOLF",
            ClientMessage::SekaiSubmitAnswer { .. } => "SEKAI_SUBMIT_ANSWER",
            ClientMessage::SekaiSelectAnswer { .. } => "SEKAI_SELECT_ANSWER",
            ClientMessage::SekaiNextRound {} => "SEKAI_NEXT_ROUND",
            ClientMessage::ItoPlayCard {} => "ITO_PLAY_CARD",
            ClientMessage::ItoNextStage {} => "ITO_NEXT_STAGE",
            ClientMessage::ItoShowResult {} => "ITO_SHOW_RESULT",
            ClientMessage::WerewolfStartNight {} => "WEREWOLF_START_NIGHT",
            ClientMessage::WerewolfAdvanceNight {} => "WEREWOLF_ADVANCE_NIGHT",
            ClientMessage::WerewolfNightAction(_) => "WEREWOLF_NIGHT_ACTION",
            ClientMessage::WerewolfStartDiscussion {} => "WEREWOLF_START_DISCUSSION",
            ClientMessage::WerewolfVote { .. } => "WEREWOLF_VOTE",
            ClientMessage::WerewolfFinishVoting {} => "WEREWOLF_FINISH_VOTING",
            ClientMessage::WerewolfPeek {} => "WEREWOLF_PEEK",
        }
    }
}

/// Outbound messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Viewer-specific projection of the whole room
    StateUpdate(RoomView),
    /// Private answer to WEREWOLF_PEEK
    WerewolfPeek(PeekView),
}
