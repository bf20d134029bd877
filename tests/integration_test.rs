use partybox::content::Content;
use partybox::game::werewolf::PEACE_VILLAGE;
use partybox::protocol::ServerMessage;
use partybox::state::AppState;
use partybox::types::{GameMode, Phase};
use partybox::view::{ModeView, RoomView};
use partybox::ws::handlers::handle_text;

const ROOM: &str = "living-room";
const HOST: &str = "HOST-screen";

fn new_state() -> AppState {
    AppState::with_seed(Content::default(), 2024)
}

async fn send(state: &AppState, client_id: &str, frame: &str) -> Option<ServerMessage> {
    handle_text(state, ROOM, client_id, frame).await
}

async fn join_all(state: &AppState, ids: &[&str]) {
    for id in ids {
        let frame = format!(r#"{{"type":"JOIN","data":{{"name":"{}"}}}}"#, id.to_uppercase());
        send(state, id, &frame).await;
    }
}

async fn start(state: &AppState, mode: &str) {
    let frame = format!(r#"{{"type":"START_GAME","data":{{"mode":"{}"}}}}"#, mode);
    send(state, HOST, &frame).await;
}

async fn view(state: &AppState, viewer: &str) -> RoomView {
    state.view(ROOM, viewer).await.expect("Room should exist")
}

fn score(view: &RoomView, player_id: &str) -> u32 {
    view.players
        .iter()
        .find(|p| p.player_id == player_id)
        .map(|p| p.score)
        .expect("Player should be listed")
}

/// Sympathy: answer, auto-group, score the majority
#[tokio::test]
async fn test_sympathy_round() {
    let state = new_state();
    join_all(&state, &["p1", "p2", "p3"]).await;
    start(&state, "SYMPATHY").await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Instruction);

    send(&state, HOST, r#"{"type":"START_ROUND"}"#).await;
    assert_eq!(view(&state, "p1").await.phase, Phase::Answering);

    send(&state, "p1", r#"{"type":"SUBMIT_ANSWER","data":{"text":"Cat"}}"#).await;
    send(&state, "p2", r#"{"type":"SUBMIT_ANSWER","data":{"text":"cat "}}"#).await;
    send(&state, "p3", r#"{"type":"SUBMIT_ANSWER","data":{"text":"Dog"}}"#).await;
    // A second answer from the same player is ignored
    send(&state, "p3", r#"{"type":"SUBMIT_ANSWER","data":{"text":"Cat"}}"#).await;

    send(&state, HOST, r#"{"type":"SKIP_TO_JUDGING"}"#).await;
    let judging = view(&state, HOST).await;
    assert_eq!(judging.phase, Phase::Judging);
    match judging.mode_view {
        Some(ModeView::Sympathy(ref s)) => {
            assert_eq!(s.answers.len(), 3);
            assert_eq!(s.answers[0].group_id, s.answers[1].group_id);
            assert_ne!(s.answers[0].group_id, s.answers[2].group_id);
        }
        ref other => panic!("Expected sympathy view, got {:?}", other),
    }

    send(&state, HOST, r#"{"type":"FINISH_JUDGING"}"#).await;
    let result = view(&state, "p3").await;
    assert_eq!(result.phase, Phase::Result);
    // Majority point for both, speed star for the first
    assert_eq!(score(&result, "p1"), 2);
    assert_eq!(score(&result, "p2"), 1);
    assert_eq!(score(&result, "p3"), 0);
    match result.mode_view {
        Some(ModeView::Sympathy(ref s)) => {
            assert_eq!(s.bomb_owner_id.as_deref(), Some("p3"));
            assert_eq!(s.speed_star_id.as_deref(), Some("p1"));
        }
        ref other => panic!("Expected sympathy view, got {:?}", other),
    }

    send(&state, HOST, r#"{"type":"NEXT_ROUND"}"#).await;
    let next = view(&state, "p1").await;
    assert_eq!(next.phase, Phase::Answering);
    assert!(next.players.iter().all(|p| !p.has_answered));
}

/// WordWolf: the village finds the outlier
#[tokio::test]
async fn test_word_wolf_caught() {
    let state = new_state();
    join_all(&state, &["p1", "p2", "p3"]).await;
    start(&state, "WORD_WOLF").await;

    let host = view(&state, HOST).await;
    assert_eq!(host.phase, Phase::Description);
    let wolf = match host.mode_view {
        Some(ModeView::WordWolf(ref w)) => w.wolf_ids[0].clone(),
        ref other => panic!("Expected word wolf view, got {:?}", other),
    };
    let citizens: Vec<String> = ["p1", "p2", "p3"]
        .iter()
        .filter(|id| **id != wolf)
        .map(|id| id.to_string())
        .collect();

    send(&state, HOST, r#"{"type":"START_DISCUSSION"}"#).await;
    send(&state, HOST, r#"{"type":"SKIP_TO_JUDGING"}"#).await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Judging);

    let vote = |target: &str| format!(r#"{{"type":"VOTE_WOLF","data":{{"target_player_id":"{}"}}}}"#, target);
    send(&state, &citizens[0], &vote(&wolf)).await;
    send(&state, &citizens[1], &vote(&wolf)).await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Judging);
    send(&state, &wolf, &vote(&citizens[0])).await;

    let result = view(&state, &citizens[0]).await;
    assert_eq!(result.phase, Phase::Result);
    match result.mode_view {
        Some(ModeView::WordWolf(ref w)) => {
            let outcome = w.result.as_ref().expect("Result should be recorded");
            assert!(!outcome.wolf_won);
            assert_eq!(outcome.wolf_name, wolf.to_uppercase());
            assert_eq!(w.votes.len(), 3);
        }
        ref other => panic!("Expected word wolf view, got {:?}", other),
    }
}

/// Sekai no Mikata: a writer's answer gets picked, the reader rotates
#[tokio::test]
async fn test_sekai_round_and_rotation() {
    let state = new_state();
    join_all(&state, &["p1", "p2", "p3"]).await;
    start(&state, "SEKAI_NO_MIKATA").await;

    let host = view(&state, HOST).await;
    assert_eq!(host.phase, Phase::Answering);
    let (reader, order) = match host.mode_view {
        Some(ModeView::Sekai(ref s)) => (s.reader_id.clone().expect("Reader"), s.reader_order.clone()),
        ref other => panic!("Expected sekai view, got {:?}", other),
    };
    let writers: Vec<&str> = ["p1", "p2", "p3"]
        .into_iter()
        .filter(|id| *id != reader)
        .collect();

    // The reader cannot answer
    send(&state, &reader, r#"{"type":"SEKAI_SUBMIT_ANSWER","data":{"text":"nope"}}"#).await;
    send(&state, writers[0], r#"{"type":"SEKAI_SUBMIT_ANSWER","data":{"text":"courage"}}"#).await;
    send(&state, writers[1], r#"{"type":"SEKAI_SUBMIT_ANSWER","data":{"text":"snacks"}}"#).await;

    let host = view(&state, HOST).await;
    assert_eq!(host.phase, Phase::Judging);
    let pick = match host.mode_view {
        Some(ModeView::Sekai(ref s)) => {
            assert_eq!(s.answers.len(), 4);
            s.answers
                .iter()
                .find(|a| a.player_id.as_deref() == Some(writers[0]))
                .expect("Writer's answer should be on display")
                .answer_id
                .clone()
        }
        ref other => panic!("Expected sekai view, got {:?}", other),
    };

    // Only the reader (or the host) may choose
    let select = format!(r#"{{"type":"SEKAI_SELECT_ANSWER","data":{{"answer_id":"{}"}}}}"#, pick);
    send(&state, writers[1], &select).await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Judging);
    send(&state, &reader, &select).await;

    let result = view(&state, HOST).await;
    assert_eq!(result.phase, Phase::Result);
    assert_eq!(score(&result, writers[0]), 1);
    assert_eq!(score(&result, writers[1]), 0);

    send(&state, HOST, r#"{"type":"SEKAI_NEXT_ROUND"}"#).await;
    let next = view(&state, HOST).await;
    assert_eq!(next.phase, Phase::Answering);
    match next.mode_view {
        Some(ModeView::Sekai(ref s)) => {
            assert_eq!(s.reader_id.as_deref(), Some(order[1].as_str()));
            assert_eq!(s.round_number, 2);
        }
        ref other => panic!("Expected sekai view, got {:?}", other),
    }
}

/// Ito: cards played lowest first clear the stage
#[tokio::test]
async fn test_ito_clean_stage() {
    let state = new_state();
    join_all(&state, &["p1", "p2", "p3"]).await;
    start(&state, "ITO").await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Instruction);
    send(&state, HOST, r#"{"type":"NEXT_ROUND"}"#).await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Answering);

    let mut hands: Vec<(String, u32)> = match view(&state, HOST).await.mode_view {
        Some(ModeView::Ito(ito)) => ito.player_numbers.into_iter().collect(),
        other => panic!("Expected ito view, got {:?}", other),
    };
    hands.sort_by_key(|(_, n)| *n);

    for (id, _) in &hands {
        send(&state, id, r#"{"type":"ITO_PLAY_CARD"}"#).await;
    }

    let result = view(&state, "p1").await;
    assert_eq!(result.phase, Phase::Result);
    match result.mode_view {
        Some(ModeView::Ito(ref ito)) => {
            assert!(ito.stage_cleared);
            assert!(!ito.is_failed);
            assert_eq!(ito.life, 3);
            assert_eq!(ito.played_cards.len(), 3);
        }
        ref other => panic!("Expected ito view, got {:?}", other),
    }

    send(&state, HOST, r#"{"type":"ITO_NEXT_STAGE"}"#).await;
    match view(&state, HOST).await.mode_view {
        Some(ModeView::Ito(ito)) => {
            assert_eq!(ito.stage, 2);
            assert!(ito.played_cards.is_empty());
        }
        other => panic!("Expected ito view, got {:?}", other),
    }
}

/// One Night Werewolf: full night, discussion and a peaceful vote
#[tokio::test]
async fn test_werewolf_night_and_vote() {
    let state = new_state();
    join_all(&state, &["p1", "p2", "p3", "p4"]).await;
    start(&state, "ONE_NIGHT_WEREWOLF").await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Instruction);

    // Each player privately learns exactly their own role
    for id in ["p1", "p2", "p3", "p4"] {
        match send(&state, id, r#"{"type":"WEREWOLF_PEEK"}"#).await {
            Some(ServerMessage::WerewolfPeek(peek)) => {
                assert!(peek.role.is_some());
                assert!(peek.current_roles.is_none());
                assert!(peek.graveyard.is_none());
            }
            other => panic!("Expected peek reply, got {:?}", other),
        }
    }
    match send(&state, HOST, r#"{"type":"WEREWOLF_PEEK"}"#).await {
        Some(ServerMessage::WerewolfPeek(peek)) => {
            assert_eq!(peek.original_roles.map(|r| r.len()), Some(4));
            assert_eq!(peek.graveyard.map(|g| g.len()), Some(2));
        }
        other => panic!("Expected peek reply, got {:?}", other),
    }

    send(&state, HOST, r#"{"type":"WEREWOLF_START_NIGHT"}"#).await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Answering);
    for _ in 0..4 {
        send(&state, HOST, r#"{"type":"WEREWOLF_ADVANCE_NIGHT"}"#).await;
    }

    send(&state, HOST, r#"{"type":"WEREWOLF_START_DISCUSSION"}"#).await;
    assert_eq!(view(&state, HOST).await.phase, Phase::Judging);

    let peace_vote = format!(
        r#"{{"type":"WEREWOLF_VOTE","data":{{"target_player_id":"{}"}}}}"#,
        PEACE_VILLAGE
    );
    for id in ["p1", "p2", "p3", "p4"] {
        send(&state, id, &peace_vote).await;
    }
    // Nobody else sees the ballots before the result
    match view(&state, "p1").await.mode_view {
        Some(ModeView::Werewolf(w)) => {
            assert!(w.votes.is_empty());
            assert_eq!(w.vote_count, 4);
        }
        other => panic!("Expected werewolf view, got {:?}", other),
    }

    send(&state, HOST, r#"{"type":"WEREWOLF_FINISH_VOTING"}"#).await;
    let result = view(&state, "p2").await;
    assert_eq!(result.phase, Phase::Result);
    match result.mode_view {
        Some(ModeView::Werewolf(ref w)) => {
            let outcome = w.result.as_ref().expect("Result should be recorded");
            assert!(outcome.peace_village);
            assert!(outcome.executed_ids.is_empty());
            assert_eq!(w.votes.len(), 4);
        }
        ref other => panic!("Expected werewolf view, got {:?}", other),
    }
}

/// Reset sends everyone back to an empty lobby, keeping the mode
#[tokio::test]
async fn test_reset_game() {
    let state = new_state();
    join_all(&state, &["p1", "p2"]).await;
    start(&state, "ITO").await;

    send(&state, "p1", r#"{"type":"RESET_GAME"}"#).await;
    let lobby = view(&state, HOST).await;
    assert_eq!(lobby.phase, Phase::Lobby);
    assert!(lobby.players.is_empty());
    assert_eq!(lobby.mode, GameMode::Ito);
    assert!(lobby.mode_view.is_none());
}
