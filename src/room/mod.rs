//! One isolated game session. A room owns its `GameState`, stroke history,
//! and timers, and processes all mutations on a single serial event stream:
//! client messages, join/leave, and timer expirations all arrive through the
//! same channel, so handlers never race each other.

pub mod roster;
pub mod round;
pub mod score;
pub mod timers;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::*;
use round::RoundCtl;
use std::collections::HashMap;
use timers::{TimerKind, Timers, RECONNECT_GRACE, START_GAME_DELAY};
use tokio::sync::mpsc;

/// Everything a room reacts to, in arrival order.
#[derive(Debug)]
pub enum RoomEvent {
    Join {
        session_id: SessionId,
        nickname: String,
        sender: mpsc::UnboundedSender<ServerMessage>,
    },
    Message {
        session_id: SessionId,
        msg: ClientMessage,
    },
    Leave {
        session_id: SessionId,
        consented: bool,
    },
    TimerFired(timers::TimerToken),
}

/// Cheap handle the transport layer keeps per connection.
#[derive(Clone)]
pub struct RoomHandle {
    pub code: String,
    events: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn send(&self, event: RoomEvent) {
        // a send failure means the room already disposed; callers can't react
        let _ = self.events.send(event);
    }
}

/// Outbound fan-out: one unbounded sender per connected client. Per-client
/// order is delivery order, which gives strokes their broadcast ordering
/// guarantee.
#[derive(Default)]
pub struct Outbound {
    clients: HashMap<SessionId, mpsc::UnboundedSender<ServerMessage>>,
}

impl Outbound {
    pub fn attach(&mut self, session_id: SessionId, sender: mpsc::UnboundedSender<ServerMessage>) {
        self.clients.insert(session_id, sender);
    }

    pub fn detach(&mut self, session_id: &str) {
        self.clients.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn send_to(&self, session_id: &str, msg: ServerMessage) {
        if let Some(sender) = self.clients.get(session_id) {
            let _ = sender.send(msg);
        }
    }

    pub fn broadcast(&self, msg: ServerMessage) {
        for sender in self.clients.values() {
            let _ = sender.send(msg.clone());
        }
    }

    pub fn broadcast_except(&self, except: &str, msg: ServerMessage) {
        for (session_id, sender) in &self.clients {
            if session_id != except {
                let _ = sender.send(msg.clone());
            }
        }
    }
}

pub struct Room {
    pub code: String,
    pub state: GameState,
    pub round: RoundCtl,
    pub timers: Timers,
    pub out: Outbound,
    /// Authoritative stroke history for the current drawing; replayed to
    /// clients that join mid-round. Not part of the replicated snapshot.
    pub strokes: Vec<DrawStroke>,
    color_index: usize,
    join_seq: u64,
    had_players: bool,
    last_snapshot: Option<String>,
}

impl Room {
    pub fn new(code: &str, events: mpsc::UnboundedSender<RoomEvent>) -> Self {
        Self {
            code: code.to_string(),
            state: GameState::new(),
            round: RoundCtl::new(),
            timers: Timers::new(events),
            out: Outbound::default(),
            strokes: Vec::new(),
            color_index: 0,
            join_seq: 0,
            had_players: false,
            last_snapshot: None,
        }
    }

    /// Spawn the room's event loop. `disposed` is notified with the room code
    /// once the last player is gone so the registry can drop its handle.
    pub fn spawn(code: String, disposed: mpsc::UnboundedSender<String>) -> RoomHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let room = Room::new(&code, events_tx.clone());
        let handle = RoomHandle {
            code,
            events: events_tx,
        };
        tokio::spawn(room.run(events_rx, disposed));
        handle
    }

    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<RoomEvent>,
        disposed: mpsc::UnboundedSender<String>,
    ) {
        while let Some(event) = events.recv().await {
            let dispose = self.handle_event(event);
            self.sync_state();
            if dispose {
                break;
            }
        }
        self.timers.cancel_all();
        tracing::info!(code = %self.code, "Room disposed");
        let _ = disposed.send(self.code);
    }

    /// Process one event to completion. Returns true once the room is empty
    /// and should be disposed.
    pub fn handle_event(&mut self, event: RoomEvent) -> bool {
        match event {
            RoomEvent::Join {
                session_id,
                nickname,
                sender,
            } => self.handle_join(session_id, nickname, sender),
            RoomEvent::Message { session_id, msg } => self.handle_message(&session_id, msg),
            RoomEvent::Leave {
                session_id,
                consented,
            } => self.handle_leave(&session_id, consented),
            RoomEvent::TimerFired(token) => self.handle_timer(token),
        }
        self.had_players && self.state.players.is_empty()
    }

    /// Push a fresh snapshot to every client whenever the last event changed
    /// anything observable.
    fn sync_state(&mut self) {
        match serde_json::to_string(&self.state) {
            Ok(snapshot) => {
                if self.last_snapshot.as_deref() != Some(snapshot.as_str()) {
                    self.last_snapshot = Some(snapshot);
                    self.out.broadcast(ServerMessage::State {
                        state: self.state.clone(),
                    });
                }
            }
            Err(e) => tracing::error!("Failed to serialize room state: {}", e),
        }
    }

    // ---- join / leave / reconnect ----

    fn handle_join(
        &mut self,
        session_id: SessionId,
        nickname: String,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) {
        if self.out.len() >= MAX_CLIENTS {
            let _ = sender.send(ServerMessage::Error {
                message: "Room is full".to_string(),
            });
            return;
        }
        let nickname: String = nickname.trim().chars().take(MAX_NICKNAME_CHARS).collect();
        if nickname.is_empty() {
            let _ = sender.send(ServerMessage::Error {
                message: "Nickname must not be empty".to_string(),
            });
            return;
        }

        let reconnect_target = self
            .state
            .players
            .values()
            .find(|p| !p.is_connected && p.nickname.eq_ignore_ascii_case(&nickname))
            .map(|p| p.session_id.clone());

        if let Some(old_id) = reconnect_target {
            self.remap_session(&old_id, &session_id);
        } else {
            let player = Player {
                session_id: session_id.clone(),
                nickname,
                avatar_color: AVATAR_PALETTE[self.color_index % AVATAR_PALETTE.len()].to_string(),
                team_index: -1,
                role: Role::Spectator,
                is_host: self.state.players.is_empty(),
                is_connected: true,
                join_order: self.join_seq,
            };
            self.color_index += 1;
            self.join_seq += 1;
            tracing::info!(code = %self.code, nickname = %player.nickname, "Player joined");
            self.state.players.insert(session_id.clone(), player);
        }

        self.had_players = true;
        self.out.attach(session_id.clone(), sender);
        self.out.send_to(
            &session_id,
            ServerMessage::Welcome {
                session_id: session_id.clone(),
                room_code: self.code.clone(),
            },
        );
        self.state.ensure_host();

        // late joiners and reconnects catch up on the canvas
        if self.state.phase == GamePhase::Drawing && !self.strokes.is_empty() {
            self.out.send_to(
                &session_id,
                ServerMessage::StrokeHistory {
                    strokes: self.strokes.clone(),
                },
            );
        }
    }

    /// Reconnection remap: a fresh connection takes over a disconnected
    /// player's identity, keeping role, team, color, host flag, and the
    /// session's slot in its drawer queue.
    fn remap_session(&mut self, old_id: &str, new_id: &str) {
        self.timers.cancel(&TimerKind::Grace(old_id.to_string()));

        let Some(old_player) = self.state.players.remove(old_id) else {
            return;
        };
        tracing::info!(code = %self.code, nickname = %old_player.nickname, "Player reconnected");

        if old_player.team_index >= 0 {
            if let Some(team) = self.state.teams.get_mut(old_player.team_index as usize) {
                if let Some(slot) = team.drawer_queue.iter_mut().find(|id| *id == old_id) {
                    *slot = new_id.to_string();
                } else {
                    team.drawer_queue.push_back(new_id.to_string());
                }
            }
        }
        if self.state.current_drawer.as_deref() == Some(old_id) {
            self.state.current_drawer = Some(new_id.to_string());
        }
        if let Some(score) = self.state.player_scores.remove(old_id) {
            self.state.player_scores.insert(new_id.to_string(), score);
        }
        for id in &mut self.state.winner_session_ids {
            if id == old_id {
                *id = new_id.to_string();
            }
        }

        self.state.players.insert(
            new_id.to_string(),
            Player {
                session_id: new_id.to_string(),
                is_connected: true,
                ..old_player
            },
        );
    }

    fn handle_leave(&mut self, session_id: &str, consented: bool) {
        if !self.state.players.contains_key(session_id) {
            self.out.detach(session_id);
            return;
        }
        if consented {
            self.remove_player(session_id);
        } else {
            self.out.detach(session_id);
            self.state.set_connected(session_id, false);
            if let Some(p) = self.state.player(session_id) {
                tracing::info!(code = %self.code, nickname = %p.nickname, "Player disconnected, grace window open");
            }
            self.end_round_if_drawer_gone(session_id);
            self.timers
                .arm(TimerKind::Grace(session_id.to_string()), RECONNECT_GRACE);
        }
    }

    /// A round cannot continue without its drawer.
    fn end_round_if_drawer_gone(&mut self, session_id: &str) {
        if self.state.is_current_drawer(session_id)
            && matches!(
                self.state.phase,
                GamePhase::WordSelect | GamePhase::Drawing
            )
        {
            self.round
                .end_round(&mut self.state, &mut self.timers, &self.out, false);
        }
    }

    fn remove_player(&mut self, session_id: &str) {
        self.out.detach(session_id);
        // scrub the session from queues and scoreboards before any round-end
        // bookkeeping, so a departing leader can no longer win
        self.state.remove_from_queues(session_id);
        self.state.player_scores.remove(session_id);
        self.state
            .winner_session_ids
            .retain(|id| id != session_id);
        self.end_round_if_drawer_gone(session_id);
        if let Some(player) = self.state.players.remove(session_id) {
            tracing::info!(code = %self.code, nickname = %player.nickname, "Player left");
        }
        self.state.ensure_host();
    }

    // ---- timers ----

    fn handle_timer(&mut self, token: timers::TimerToken) {
        if !self.timers.accept(&token) {
            return;
        }
        match token.kind {
            TimerKind::StartDelay => self.round.start_game(
                &mut self.state,
                &mut self.timers,
                &self.out,
                &mut self.strokes,
            ),
            TimerKind::WordAutoPick => {
                self.round
                    .auto_pick_word(&mut self.state, &mut self.timers, &self.out)
            }
            TimerKind::DrawTick => self
                .round
                .tick(&mut self.state, &mut self.timers, &self.out),
            TimerKind::HintReveal => self
                .round
                .reveal_hint_letter(&mut self.state, &mut self.timers),
            TimerKind::RoundAdvance => self.round.advance(
                &mut self.state,
                &mut self.timers,
                &self.out,
                &mut self.strokes,
            ),
            TimerKind::Grace(session_id) => {
                let expired = self
                    .state
                    .player(&session_id)
                    .is_some_and(|p| !p.is_connected);
                if expired {
                    tracing::info!(code = %self.code, "Reconnection grace expired");
                    self.remove_player(&session_id);
                }
            }
        }
    }

    // ---- message dispatch ----

    /// Guards run in order: phase, then sender identity, then payload.
    /// Most violations are dropped silently; the authorization failures the
    /// client should learn about answer with a directed error.
    fn handle_message(&mut self, session_id: &str, msg: ClientMessage) {
        match msg {
            ClientMessage::SetGameMode { game_mode } => {
                if self.state.phase != GamePhase::ModeSelect {
                    return;
                }
                if !self.state.is_host(session_id) {
                    self.send_error(session_id, "Only the host can set the game mode");
                    return;
                }
                match game_mode.as_str() {
                    "teams" => {
                        self.state.settings.game_mode = GameMode::Teams;
                        if self.state.teams.is_empty() {
                            self.state.init_teams(2);
                        }
                        self.state.phase = GamePhase::Lobby;
                    }
                    // the FFA pool is built at game start, not here
                    "ffa" => {
                        self.state.settings.game_mode = GameMode::Ffa;
                        self.state.phase = GamePhase::Lobby;
                    }
                    other => {
                        self.send_error(session_id, &format!("Unknown game mode: {}", other));
                    }
                }
            }

            ClientMessage::JoinTeam { team_index } => {
                if self.state.phase != GamePhase::Lobby {
                    return;
                }
                if let Err(reason) = self.state.join_team(session_id, team_index) {
                    tracing::debug!(code = %self.code, "Rejected join_team: {}", reason);
                }
            }

            ClientMessage::Spectate => {
                if self.state.phase != GamePhase::Lobby {
                    return;
                }
                self.state.set_spectator(session_id);
            }

            ClientMessage::StartGame { settings } => {
                if self.state.phase != GamePhase::Lobby {
                    return;
                }
                if !self.state.is_host(session_id) {
                    self.send_error(session_id, "Only the host can start the game");
                    return;
                }
                if let Err(reason) = self.state.can_start_game() {
                    self.send_error(session_id, &reason);
                    return;
                }
                if let Some(patch) = settings {
                    patch.apply(&mut self.state.settings);
                }
                self.timers.arm(TimerKind::StartDelay, START_GAME_DELAY);
            }

            ClientMessage::SelectWord { word_index } => {
                if self.state.phase != GamePhase::WordSelect {
                    return;
                }
                if !self.state.is_current_drawer(session_id) {
                    return;
                }
                self.round
                    .select_word(&mut self.state, &mut self.timers, &self.out, word_index);
            }

            ClientMessage::Draw { stroke } => {
                if self.state.phase != GamePhase::Drawing
                    || !self.state.is_current_drawer(session_id)
                    || !stroke.is_valid()
                {
                    return;
                }
                self.strokes.push(stroke.clone());
                self.out
                    .broadcast_except(session_id, ServerMessage::Draw { stroke });
            }

            ClientMessage::ClearCanvas => {
                if self.state.phase != GamePhase::Drawing
                    || !self.state.is_current_drawer(session_id)
                {
                    return;
                }
                self.strokes.clear();
                self.out.broadcast(ServerMessage::ClearCanvas);
            }

            ClientMessage::Undo => {
                if self.state.phase != GamePhase::Drawing
                    || !self.state.is_current_drawer(session_id)
                {
                    return;
                }
                self.strokes.pop();
                self.out.broadcast(ServerMessage::Undo);
            }

            ClientMessage::Guess { text } => {
                if self.state.phase != GamePhase::Drawing {
                    return;
                }
                let Some(player) = self.state.player(session_id) else {
                    return;
                };
                let nickname = player.nickname.clone();
                let role = player.role;
                match self.state.settings.game_mode {
                    GameMode::Teams => {
                        if role != Role::Guesser {
                            self.send_error(session_id, "Only guessers can submit guesses");
                            return;
                        }
                    }
                    GameMode::Ffa => {
                        if self.state.is_current_drawer(session_id) {
                            self.send_error(session_id, "The drawer cannot guess");
                            return;
                        }
                        if self.state.is_sudden_death
                            && !self
                                .state
                                .winner_session_ids
                                .iter()
                                .any(|id| id == session_id)
                        {
                            self.send_error(
                                session_id,
                                "Only the tied players can guess in sudden death",
                            );
                            return;
                        }
                    }
                }
                if text.trim().is_empty() {
                    return;
                }
                self.round.process_guess(
                    &mut self.state,
                    &mut self.timers,
                    &self.out,
                    session_id,
                    &nickname,
                    &text,
                );
            }

            ClientMessage::Chat { text } => {
                let Some(player) = self.state.player(session_id) else {
                    return;
                };
                if self.state.phase == GamePhase::Drawing && player.role == Role::Guesser {
                    self.send_error(session_id, "Guessers cannot chat while the round runs");
                    return;
                }
                let text = text.trim().to_string();
                if text.is_empty() {
                    return;
                }
                let entry = ChatEntry {
                    player_id: session_id.to_string(),
                    nickname: player.nickname.clone(),
                    text,
                    timestamp: now_ms(),
                };
                self.state.chat_messages.push(entry);
                if self.state.chat_messages.len() > 100 {
                    self.state.chat_messages.drain(..50);
                }
            }

            ClientMessage::PlayAgain => {
                if !self.state.is_host(session_id) {
                    return;
                }
                self.play_again();
            }
        }
    }

    /// Back to mode-select with a clean slate, keeping the people (and the
    /// chat log) in the room.
    fn play_again(&mut self) {
        self.round.reset(&mut self.timers);
        self.strokes.clear();
        self.out.broadcast(ServerMessage::ClearCanvas);

        let state = &mut self.state;
        state.current_round = 0;
        state.active_team_index = 0;
        state.current_drawer = None;
        state.word_hint.clear();
        state.time_remaining = 0;
        state.guesses.clear();
        state.winning_team_index = -1;
        state.player_scores.clear();
        state.winner_session_ids.clear();
        state.is_sudden_death = false;
        for player in state.players.values_mut() {
            player.role = Role::Spectator;
            player.team_index = -1;
        }
        state.init_teams(2);
        state.settings.game_mode = GameMode::Teams;
        state.phase = GamePhase::ModeSelect;
    }

    fn send_error(&self, session_id: &str, message: &str) {
        self.out.send_to(
            session_id,
            ServerMessage::Error {
                message: message.to_string(),
            },
        );
    }
}
