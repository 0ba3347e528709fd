use doodledash::protocol::{ClientMessage, ServerMessage, SettingsPatch};
use doodledash::room::timers::TimerKind;
use doodledash::room::{Room, RoomEvent};
use doodledash::types::*;
use tokio::sync::mpsc;

struct TestClient {
    session_id: SessionId,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

fn new_room() -> Room {
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    Room::new("ROOM1", events_tx)
}

fn join(room: &mut Room, nickname: &str) -> TestClient {
    let session_id = ulid::Ulid::new().to_string();
    let (tx, rx) = mpsc::unbounded_channel();
    room.handle_event(RoomEvent::Join {
        session_id: session_id.clone(),
        nickname: nickname.to_string(),
        sender: tx,
    });
    TestClient { session_id, rx }
}

fn send(room: &mut Room, client: &TestClient, msg: ClientMessage) {
    room.handle_event(RoomEvent::Message {
        session_id: client.session_id.clone(),
        msg,
    });
}

fn drain(client: &mut TestClient) -> Vec<ServerMessage> {
    let mut msgs = Vec::new();
    while let Ok(msg) = client.rx.try_recv() {
        msgs.push(msg);
    }
    msgs
}

/// Synthesize the expiry of a currently armed timer, without sleeping.
fn fire(room: &mut Room, kind: TimerKind) {
    let token = room
        .timers
        .current(&kind)
        .unwrap_or_else(|| panic!("timer {:?} should be armed", kind));
    room.handle_event(RoomEvent::TimerFired(token));
}

fn secret_word(msgs: &[ServerMessage]) -> Option<String> {
    msgs.iter().rev().find_map(|m| match m {
        ServerMessage::SecretWord { word } => Some(word.clone()),
        _ => None,
    })
}

/// The invariants that must hold after every handled event.
fn assert_invariants(room: &Room) {
    let state = &room.state;

    let drawer_count = state
        .players
        .values()
        .filter(|p| p.role == Role::Drawer)
        .count();
    if matches!(state.phase, GamePhase::WordSelect | GamePhase::Drawing) {
        assert_eq!(drawer_count, 1, "exactly one drawer during a round");
        let drawer = state.current_drawer.as_deref().expect("current drawer set");
        let player = state.player(drawer).expect("drawer exists");
        assert!(player.is_connected, "drawer is connected");
    } else {
        assert_eq!(drawer_count, 0, "no drawer role outside a round");
        assert!(
            state.current_drawer.is_none(),
            "no current drawer outside a round"
        );
    }

    for session_id in state.player_scores.keys() {
        assert!(
            state.players.contains_key(session_id),
            "scoreboard only tracks present players"
        );
    }

    for (team_index, team) in state.teams.iter().enumerate() {
        let mut seen = std::collections::HashSet::new();
        for session_id in &team.drawer_queue {
            assert!(seen.insert(session_id.clone()), "queue entries are unique");
            let player = state.player(session_id).expect("queued player exists");
            assert_eq!(player.team_index, team_index as i32);
        }
    }
    for player in state.players.values() {
        if player.team_index < 0 {
            assert!(
                !state
                    .teams
                    .iter()
                    .any(|t| t.drawer_queue.contains(&player.session_id)),
                "spectators never appear in a drawer queue"
            );
        }
    }

    if state.connected_count() > 0 {
        assert_eq!(
            state.players.values().filter(|p| p.is_host).count(),
            1,
            "exactly one host while anyone is connected"
        );
    }

    if state.is_sudden_death {
        for player in state.players.values() {
            if player.role == Role::Guesser {
                assert!(
                    state.winner_session_ids.contains(&player.session_id),
                    "sudden-death guessers are all tied players"
                );
            }
        }
    }
}

fn stroke(x: f32, y: f32) -> DrawStroke {
    DrawStroke {
        points: vec![(x, y), (x + 0.1, y + 0.1)],
        color: "#222222".to_string(),
        width: 4,
        tool: Tool::Pen,
    }
}

/// Scenario: FFA two-player quick game, first round end to end.
#[tokio::test]
async fn ffa_two_player_quick_game() {
    let mut room = new_room();
    let mut host = join(&mut room, "Ada");
    let mut guest = join(&mut room, "Bo");

    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    assert_eq!(room.state.phase, GamePhase::Lobby);

    send(&mut room, &host, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    assert_invariants(&room);

    assert_eq!(room.state.phase, GamePhase::WordSelect);
    assert_eq!(room.state.current_round, 1);
    assert_eq!(room.state.current_drawer.as_deref(), Some(host.session_id.as_str()));

    // only the drawer sees word choices
    let host_msgs = drain(&mut host);
    assert!(host_msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::WordChoices { words } if words.len() == 3)));
    let guest_msgs = drain(&mut guest);
    assert!(!guest_msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::WordChoices { .. })));

    send(&mut room, &host, ClientMessage::SelectWord { word_index: 0 });
    assert_invariants(&room);
    assert_eq!(room.state.phase, GamePhase::Drawing);
    assert_eq!(room.state.time_remaining, 75);

    let word = secret_word(&drain(&mut host)).expect("drawer receives the secret word");
    assert!(secret_word(&drain(&mut guest)).is_none());

    // case and whitespace do not matter
    send(
        &mut room,
        &guest,
        ClientMessage::Guess {
            text: format!("  {}  ", word.to_uppercase()),
        },
    );
    assert_invariants(&room);

    assert_eq!(room.state.player_scores[&guest.session_id], 1);
    assert_eq!(room.state.phase, GamePhase::RoundEnd);
    let guest_msgs = drain(&mut guest);
    assert!(guest_msgs.iter().any(|m| matches!(
        m,
        ServerMessage::CorrectGuess { player_id, .. } if *player_id == guest.session_id
    )));
    assert!(guest_msgs.iter().any(|m| matches!(
        m,
        ServerMessage::RoundResult { word: w, was_correct: true, .. } if *w == word
    )));

    // after the 5s pause the next round starts with the guest drawing
    fire(&mut room, TimerKind::RoundAdvance);
    assert_invariants(&room);
    assert_eq!(room.state.phase, GamePhase::WordSelect);
    assert_eq!(room.state.current_round, 2);
    assert_eq!(
        room.state.current_drawer.as_deref(),
        Some(guest.session_id.as_str())
    );
    assert!(room.strokes.is_empty());
}

/// Scenario: 2v2 teams game to a points win at target 2.
#[tokio::test]
async fn teams_win_by_points() {
    let mut room = new_room();
    let mut a = join(&mut room, "A1");
    let mut b = join(&mut room, "B1");
    let c = join(&mut room, "C1");
    let d = join(&mut room, "D1");

    send(
        &mut room,
        &a,
        ClientMessage::SetGameMode {
            game_mode: "teams".to_string(),
        },
    );
    send(&mut room, &a, ClientMessage::JoinTeam { team_index: 0 });
    send(&mut room, &b, ClientMessage::JoinTeam { team_index: 0 });
    send(&mut room, &c, ClientMessage::JoinTeam { team_index: 1 });
    send(&mut room, &d, ClientMessage::JoinTeam { team_index: 1 });
    assert_invariants(&room);

    send(
        &mut room,
        &a,
        ClientMessage::StartGame {
            settings: Some(SettingsPatch {
                target_score: Some(2),
                draw_time: Some(30),
                ..Default::default()
            }),
        },
    );
    fire(&mut room, TimerKind::StartDelay);
    assert_invariants(&room);

    // round 1: Blaze draws (A), B guesses right
    assert_eq!(room.state.active_team_index, 0);
    assert_eq!(room.state.current_drawer.as_deref(), Some(a.session_id.as_str()));
    send(&mut room, &a, ClientMessage::SelectWord { word_index: 0 });
    let word = secret_word(&drain(&mut a)).unwrap();
    send(&mut room, &b, ClientMessage::Guess { text: word });
    assert_eq!(room.state.teams[0].score, 1);
    fire(&mut room, TimerKind::RoundAdvance);
    assert_invariants(&room);

    // round 2: Wave draws (C) and nobody gets it before the clock runs out
    assert_eq!(room.state.active_team_index, 1);
    assert_eq!(room.state.current_drawer.as_deref(), Some(c.session_id.as_str()));
    send(&mut room, &c, ClientMessage::SelectWord { word_index: 1 });
    for _ in 0..30 {
        fire(&mut room, TimerKind::DrawTick);
    }
    assert_eq!(room.state.phase, GamePhase::RoundEnd);
    assert_eq!(room.state.teams[1].score, 0);
    fire(&mut room, TimerKind::RoundAdvance);
    assert_invariants(&room);

    // round 3: Blaze again, B draws this time, A scores the winning point
    assert_eq!(room.state.active_team_index, 0);
    assert_eq!(room.state.current_drawer.as_deref(), Some(b.session_id.as_str()));
    send(&mut room, &b, ClientMessage::SelectWord { word_index: 2 });
    let word = secret_word(&drain(&mut b)).unwrap();
    send(&mut room, &a, ClientMessage::Guess { text: word });
    assert_eq!(room.state.teams[0].score, 2);
    assert_eq!(room.state.phase, GamePhase::RoundEnd);

    fire(&mut room, TimerKind::RoundAdvance);
    assert_invariants(&room);
    assert_eq!(room.state.phase, GamePhase::GameOver);
    assert_eq!(room.state.winning_team_index, 0);
}

/// Scenario: hint reveals accumulate one random letter per interval while
/// masked slots stay masked.
#[tokio::test]
async fn hint_progression_during_drawing() {
    let mut room = new_room();
    let mut host = join(&mut room, "Ada");
    let guest = join(&mut room, "Bo");
    let _ = guest;

    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(&mut room, &host, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    send(&mut room, &host, ClientMessage::SelectWord { word_index: 0 });

    let word = secret_word(&drain(&mut host)).unwrap();
    let letters = word.chars().filter(|c| *c != ' ').count();
    assert_eq!(room.state.word_hint.matches('_').count(), letters);

    for revealed in 1..=3 {
        fire(&mut room, TimerKind::HintReveal);
        assert_eq!(
            room.state.word_hint.matches('_').count(),
            letters - revealed,
            "one more letter uncovered per interval"
        );
    }

    // revealed characters really are the word's letters, in position
    let rendered: Vec<&str> = room.state.word_hint.split(' ').collect();
    let expected: Vec<String> = word
        .chars()
        .map(|c| if c == ' ' { String::new() } else { c.to_string() })
        .collect();
    assert_eq!(rendered.len(), expected.len());
    for (shown, truth) in rendered.iter().zip(expected.iter()) {
        if *shown != "_" {
            assert_eq!(*shown, truth.as_str());
        }
    }
}

/// Scenario: a guesser drops mid-draw and rejoins inside the grace window
/// under the same nickname.
#[tokio::test]
async fn reconnect_mid_draw_replays_strokes_and_identity() {
    let mut room = new_room();
    let mut host = join(&mut room, "Ada");
    let guest = join(&mut room, "Bo");

    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(&mut room, &host, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    send(&mut room, &host, ClientMessage::SelectWord { word_index: 0 });

    let old_color = room.state.player(&guest.session_id).unwrap().avatar_color.clone();
    let pool_slot = room.state.teams[0]
        .drawer_queue
        .iter()
        .position(|id| *id == guest.session_id)
        .expect("guest is pooled");

    send(&mut room, &host, ClientMessage::Draw { stroke: stroke(0.1, 0.1) });
    send(&mut room, &host, ClientMessage::Draw { stroke: stroke(0.5, 0.5) });

    room.handle_event(RoomEvent::Leave {
        session_id: guest.session_id.clone(),
        consented: false,
    });
    let stale_grace = room
        .timers
        .current(&TimerKind::Grace(guest.session_id.clone()))
        .unwrap();

    // one more stroke lands while the guest is away
    send(&mut room, &host, ClientMessage::Draw { stroke: stroke(0.9, 0.2) });

    // rejoin with different capitalization
    let mut rejoined = join(&mut room, "bo");
    assert_invariants(&room);

    let player = room.state.player(&rejoined.session_id).expect("remapped");
    assert!(player.is_connected);
    assert_eq!(player.role, Role::Guesser);
    assert_eq!(player.avatar_color, old_color);
    assert!(!player.is_host);
    assert_eq!(player.team_index, 0);
    assert!(room.state.player(&guest.session_id).is_none());
    assert_eq!(
        room.state.teams[0].drawer_queue[pool_slot],
        rejoined.session_id,
        "reconnect keeps the queue slot"
    );

    let msgs = drain(&mut rejoined);
    let history = msgs.iter().find_map(|m| match m {
        ServerMessage::StrokeHistory { strokes } => Some(strokes.clone()),
        _ => None,
    });
    assert_eq!(history.expect("stroke replay").len(), 3);

    // the old grace window must not reap the remapped player
    room.handle_event(RoomEvent::TimerFired(stale_grace));
    assert!(room.state.player(&rejoined.session_id).is_some());
    assert_invariants(&room);
}

/// Scenario: three-way FFA ends in a tie, sudden death picks the non-tied
/// drawer, and the first tied player to guess wins outright.
#[tokio::test]
async fn ffa_sudden_death_tiebreak() {
    let mut room = new_room();
    let mut x = join(&mut room, "Xeno");
    let mut y = join(&mut room, "Yara");
    let mut z = join(&mut room, "Zed");

    send(
        &mut room,
        &x,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(
        &mut room,
        &x,
        ClientMessage::StartGame {
            settings: Some(SettingsPatch {
                win_mode: Some(WinMode::Rounds),
                total_rounds: Some(2),
                ..Default::default()
            }),
        },
    );
    fire(&mut room, TimerKind::StartDelay);

    // round 1: X draws, Z guesses right
    assert_eq!(room.state.current_drawer.as_deref(), Some(x.session_id.as_str()));
    send(&mut room, &x, ClientMessage::SelectWord { word_index: 0 });
    let word = secret_word(&drain(&mut x)).unwrap();
    send(&mut room, &z, ClientMessage::Guess { text: word });
    assert_eq!(room.state.player_scores[&z.session_id], 1);
    fire(&mut room, TimerKind::RoundAdvance);

    // round 2: Y draws, X equalizes on the final round
    assert_eq!(room.state.current_drawer.as_deref(), Some(y.session_id.as_str()));
    send(&mut room, &y, ClientMessage::SelectWord { word_index: 0 });
    let word = secret_word(&drain(&mut y)).unwrap();
    send(&mut room, &x, ClientMessage::Guess { text: word });
    assert_eq!(room.state.player_scores[&x.session_id], 1);
    assert_eq!(room.state.phase, GamePhase::RoundEnd);

    fire(&mut room, TimerKind::RoundAdvance);
    assert_invariants(&room);

    // sudden death: Y is the only non-tied player, so Y draws
    assert!(room.state.is_sudden_death);
    assert_eq!(room.state.phase, GamePhase::WordSelect);
    assert_eq!(room.state.current_drawer.as_deref(), Some(y.session_id.as_str()));
    assert_eq!(room.state.winner_session_ids.len(), 2);
    assert!(room.state.winner_session_ids.contains(&x.session_id));
    assert!(room.state.winner_session_ids.contains(&z.session_id));
    assert_eq!(room.state.player(&x.session_id).unwrap().role, Role::Guesser);
    assert_eq!(room.state.player(&z.session_id).unwrap().role, Role::Guesser);

    send(&mut room, &y, ClientMessage::SelectWord { word_index: 0 });
    let word = secret_word(&drain(&mut y)).unwrap();

    // first tied player to answer takes the whole game, no 5s delay
    send(&mut room, &x, ClientMessage::Guess { text: word });
    assert!(!room.state.is_sudden_death);
    assert_eq!(room.state.phase, GamePhase::GameOver);
    assert_eq!(room.state.winner_session_ids, vec![x.session_id.clone()]);
    assert_invariants(&room);
    drain(&mut z);
}

/// A rounds-mode FFA game still reaches game-over after its score leader
/// walks out: the departed player's score must not linger as the max.
#[tokio::test]
async fn ffa_rounds_game_ends_after_leader_departs() {
    let mut room = new_room();
    let mut x = join(&mut room, "Xeno");
    let mut y = join(&mut room, "Yara");
    let z = join(&mut room, "Zed");

    send(
        &mut room,
        &x,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(
        &mut room,
        &x,
        ClientMessage::StartGame {
            settings: Some(SettingsPatch {
                win_mode: Some(WinMode::Rounds),
                total_rounds: Some(2),
                ..Default::default()
            }),
        },
    );
    fire(&mut room, TimerKind::StartDelay);

    // round 1: X draws, Z takes the lead, then leaves for good
    send(&mut room, &x, ClientMessage::SelectWord { word_index: 0 });
    let word = secret_word(&drain(&mut x)).unwrap();
    send(&mut room, &z, ClientMessage::Guess { text: word });
    assert_eq!(room.state.phase, GamePhase::RoundEnd);
    room.handle_event(RoomEvent::Leave {
        session_id: z.session_id.clone(),
        consented: true,
    });
    assert!(!room.state.player_scores.contains_key(&z.session_id));
    assert_invariants(&room);

    // round 2 (the last): X equalizes and must win outright, not loop forever
    fire(&mut room, TimerKind::RoundAdvance);
    assert_eq!(room.state.current_drawer.as_deref(), Some(y.session_id.as_str()));
    send(&mut room, &y, ClientMessage::SelectWord { word_index: 0 });
    let word = secret_word(&drain(&mut y)).unwrap();
    send(&mut room, &x, ClientMessage::Guess { text: word });

    fire(&mut room, TimerKind::RoundAdvance);
    assert_eq!(room.state.phase, GamePhase::GameOver);
    assert_eq!(room.state.winner_session_ids, vec![x.session_id.clone()]);
    assert_invariants(&room);
}

/// Sudden-death guessing is locked down to the tied players.
#[tokio::test]
async fn sudden_death_rejects_non_tied_guessers() {
    let mut room = new_room();
    let x = join(&mut room, "Xeno");
    let mut y = join(&mut room, "Yara");
    let z = join(&mut room, "Zed");

    send(
        &mut room,
        &x,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(
        &mut room,
        &x,
        ClientMessage::StartGame {
            settings: Some(SettingsPatch {
                win_mode: Some(WinMode::Rounds),
                total_rounds: Some(1),
                ..Default::default()
            }),
        },
    );
    fire(&mut room, TimerKind::StartDelay);

    // manufacture a tie on the final round: Y and Z both hold a point
    room.state.award_player_point(&y.session_id);
    room.state.award_player_point(&z.session_id);
    fire(&mut room, TimerKind::WordAutoPick); // X auto-picks and draws
    for _ in 0..75 {
        fire(&mut room, TimerKind::DrawTick);
    }
    fire(&mut room, TimerKind::RoundAdvance);

    assert!(room.state.is_sudden_death);
    assert_eq!(room.state.current_drawer.as_deref(), Some(x.session_id.as_str()));

    fire(&mut room, TimerKind::WordAutoPick);
    assert_eq!(room.state.phase, GamePhase::Drawing);
    drain(&mut y);

    // a spectator outside the tie is locked out of guessing
    let mut w = join(&mut room, "Wren");
    drain(&mut w);
    send(
        &mut room,
        &w,
        ClientMessage::Guess {
            text: "anything".to_string(),
        },
    );
    let msgs = drain(&mut w);
    assert!(msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::Error { message } if message.contains("sudden death"))));
    assert_invariants(&room);
}

/// Scenario: undo and clear shape what a late joiner is told about the canvas.
#[tokio::test]
async fn undo_stream_and_late_joiners() {
    let mut room = new_room();
    let host = join(&mut room, "Ada");
    let guest = join(&mut room, "Bo");
    let _ = guest;

    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(&mut room, &host, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    send(&mut room, &host, ClientMessage::SelectWord { word_index: 0 });

    send(&mut room, &host, ClientMessage::Draw { stroke: stroke(0.1, 0.1) });
    send(&mut room, &host, ClientMessage::Draw { stroke: stroke(0.2, 0.2) });
    send(&mut room, &host, ClientMessage::Draw { stroke: stroke(0.3, 0.3) });
    send(&mut room, &host, ClientMessage::Undo);
    assert_eq!(room.strokes.len(), 2);

    let mut after_undo = join(&mut room, "Cam");
    let msgs = drain(&mut after_undo);
    let history = msgs.iter().find_map(|m| match m {
        ServerMessage::StrokeHistory { strokes } => Some(strokes.clone()),
        _ => None,
    });
    let history = history.expect("joiner during drawing gets history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], stroke(0.1, 0.1));
    assert_eq!(history[1], stroke(0.2, 0.2));

    send(&mut room, &host, ClientMessage::ClearCanvas);
    assert!(room.strokes.is_empty());

    // nothing to replay after a clear: no history message at all
    let mut after_clear = join(&mut room, "Dee");
    let msgs = drain(&mut after_clear);
    assert!(!msgs
        .iter()
        .any(|m| matches!(m, ServerMessage::StrokeHistory { .. })));
}

/// Law: play_again returns the room to a state indistinguishable from a
/// fresh mode-select, and the same setup sequence starts clean.
#[tokio::test]
async fn play_again_resets_to_fresh_start() {
    let mut room = new_room();
    let mut host = join(&mut room, "Ada");
    let guest = join(&mut room, "Bo");

    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(
        &mut room,
        &host,
        ClientMessage::StartGame {
            settings: Some(SettingsPatch {
                target_score: Some(1),
                ..Default::default()
            }),
        },
    );
    fire(&mut room, TimerKind::StartDelay);
    send(&mut room, &host, ClientMessage::SelectWord { word_index: 0 });
    let word = secret_word(&drain(&mut host)).unwrap();
    send(&mut room, &guest, ClientMessage::Guess { text: word });
    fire(&mut room, TimerKind::RoundAdvance);
    assert_eq!(room.state.phase, GamePhase::GameOver);

    send(&mut room, &host, ClientMessage::PlayAgain);
    assert_invariants(&room);

    let state = &room.state;
    assert_eq!(state.phase, GamePhase::ModeSelect);
    assert_eq!(state.settings.game_mode, GameMode::Teams);
    assert_eq!(state.current_round, 0);
    assert_eq!(state.winning_team_index, -1);
    assert!(state.player_scores.is_empty());
    assert!(state.winner_session_ids.is_empty());
    assert!(state.guesses.is_empty());
    assert!(!state.is_sudden_death);
    assert_eq!(state.teams.len(), 2);
    assert!(state.teams.iter().all(|t| t.score == 0 && t.drawer_queue.is_empty()));
    for player in state.players.values() {
        assert_eq!(player.role, Role::Spectator);
        assert_eq!(player.team_index, -1);
    }
    assert!(room.strokes.is_empty());

    // the same sequence brings up a working first round again
    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(&mut room, &host, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    assert_eq!(room.state.phase, GamePhase::WordSelect);
    assert_eq!(room.state.current_round, 1);
    assert_invariants(&room);
}

/// Guards: wrong-role guesses answer with an error, opponent chat is free,
/// guesser chat during drawing is blocked.
#[tokio::test]
async fn role_guards_on_guess_and_chat() {
    let mut room = new_room();
    let mut a = join(&mut room, "A1");
    let b = join(&mut room, "B1");
    let mut c = join(&mut room, "C1");
    let d = join(&mut room, "D1");

    send(
        &mut room,
        &a,
        ClientMessage::SetGameMode {
            game_mode: "teams".to_string(),
        },
    );
    send(&mut room, &a, ClientMessage::JoinTeam { team_index: 0 });
    send(&mut room, &b, ClientMessage::JoinTeam { team_index: 0 });
    send(&mut room, &c, ClientMessage::JoinTeam { team_index: 1 });
    send(&mut room, &d, ClientMessage::JoinTeam { team_index: 1 });
    send(&mut room, &a, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    send(&mut room, &a, ClientMessage::SelectWord { word_index: 0 });
    assert_eq!(room.state.phase, GamePhase::Drawing);
    drain(&mut a);
    drain(&mut c);

    // the opposing team cannot guess
    send(
        &mut room,
        &c,
        ClientMessage::Guess {
            text: "whatever".to_string(),
        },
    );
    assert!(drain(&mut c)
        .iter()
        .any(|m| matches!(m, ServerMessage::Error { .. })));
    assert!(room.state.guesses.is_empty());

    // the drawer cannot guess either
    send(
        &mut room,
        &a,
        ClientMessage::Guess {
            text: "whatever".to_string(),
        },
    );
    assert!(drain(&mut a)
        .iter()
        .any(|m| matches!(m, ServerMessage::Error { .. })));

    // a guesser must stay quiet in chat while the round runs
    let guesser = &b;
    send(
        &mut room,
        guesser,
        ClientMessage::Chat {
            text: "it is obviously a giraffe".to_string(),
        },
    );
    assert!(room.state.chat_messages.is_empty());

    // opponents may chat
    send(
        &mut room,
        &c,
        ClientMessage::Chat {
            text: "good luck".to_string(),
        },
    );
    assert_eq!(room.state.chat_messages.len(), 1);

    // empty guesses are dropped without a reply
    send(
        &mut room,
        guesser,
        ClientMessage::Guess {
            text: "   ".to_string(),
        },
    );
    assert!(room.state.guesses.is_empty());
    assert_invariants(&room);
}

/// The word-select auto-pick kicks in when the drawer never chooses.
#[tokio::test]
async fn word_auto_pick_fires_after_timeout() {
    let mut room = new_room();
    let host = join(&mut room, "Ada");
    let guest = join(&mut room, "Bo");
    let _ = guest;

    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(&mut room, &host, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    assert_eq!(room.state.phase, GamePhase::WordSelect);

    fire(&mut room, TimerKind::WordAutoPick);
    assert_eq!(room.state.phase, GamePhase::Drawing);
    assert!(room.round.secret_word().is_some());
    assert_invariants(&room);
}

/// A drawer who disconnects mid-round takes the round down with them.
#[tokio::test]
async fn drawer_disconnect_ends_the_round() {
    let mut room = new_room();
    let host = join(&mut room, "Ada");
    let mut guest = join(&mut room, "Bo");

    send(
        &mut room,
        &host,
        ClientMessage::SetGameMode {
            game_mode: "ffa".to_string(),
        },
    );
    send(&mut room, &host, ClientMessage::StartGame { settings: None });
    fire(&mut room, TimerKind::StartDelay);
    send(&mut room, &host, ClientMessage::SelectWord { word_index: 0 });
    assert_eq!(room.state.phase, GamePhase::Drawing);
    drain(&mut guest);

    room.handle_event(RoomEvent::Leave {
        session_id: host.session_id.clone(),
        consented: false,
    });

    assert_eq!(room.state.phase, GamePhase::RoundEnd);
    assert!(drain(&mut guest).iter().any(|m| matches!(
        m,
        ServerMessage::RoundResult { was_correct: false, .. }
    )));
}
