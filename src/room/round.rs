//! The per-room phase state machine: round start, word selection, the
//! drawing countdown with hint reveals, guess arbitration, and the
//! advance to the next round, game over, or sudden death.

use super::timers::{
    TimerKind, Timers, DRAW_TICK, HINT_INTERVAL, ROUND_END_DELAY, WORD_PICK_TIMEOUT,
};
use super::Outbound;
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::words::{self, WordHint};
use rand::Rng;

const WORD_CHOICE_COUNT: usize = 3;

/// What happens when the 5s round-end delay elapses.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundAdvance {
    NextRound,
    TeamsGameOver(usize),
    FfaGameOver(SessionId),
    SuddenDeath(Vec<SessionId>),
}

/// Round controller. Holds the room-local secrets (the word and its hint
/// state) that must never enter the replicated snapshot.
#[derive(Default)]
pub struct RoundCtl {
    current_word: Option<String>,
    word_choices: Vec<String>,
    hint: Option<WordHint>,
    pending: Option<RoundAdvance>,
}

impl RoundCtl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secret_word(&self) -> Option<&str> {
        self.current_word.as_deref()
    }

    pub fn word_choice_count(&self) -> usize {
        self.word_choices.len()
    }

    pub fn pending_advance(&self) -> Option<&RoundAdvance> {
        self.pending.as_ref()
    }

    /// Full reset for `play_again`. Grace timers stay armed: a pending
    /// reconnection window outlives the game that was running.
    pub fn reset(&mut self, timers: &mut Timers) {
        timers.cancel_round_timers();
        timers.cancel(&TimerKind::StartDelay);
        self.current_word = None;
        self.word_choices.clear();
        self.hint = None;
        self.pending = None;
    }

    pub fn start_game(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        strokes: &mut Vec<DrawStroke>,
    ) {
        state.current_round = 0;
        state.active_team_index = 0;
        state.winning_team_index = -1;
        state.is_sudden_death = false;
        state.winner_session_ids.clear();

        match state.settings.game_mode {
            GameMode::Teams => state.reset_team_scores(),
            GameMode::Ffa => {
                state.reset_player_scores();
                state.init_ffa();
            }
        }

        self.start_next_round(state, timers, out, strokes);
    }

    pub fn start_next_round(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        strokes: &mut Vec<DrawStroke>,
    ) {
        timers.cancel_round_timers();

        strokes.clear();
        out.broadcast(ServerMessage::ClearCanvas);

        state.guesses.clear();
        state.word_hint.clear();
        state.time_remaining = 0;
        self.current_word = None;
        self.hint = None;
        self.pending = None;

        state.current_round += 1;

        let drawer = match state.settings.game_mode {
            GameMode::Teams => {
                let team_count = state.teams.len();
                if team_count == 0 {
                    None
                } else {
                    // skip teams with nobody left who could draw
                    for _ in 0..team_count {
                        if state.has_connected_drawer(state.active_team_index) {
                            break;
                        }
                        state.active_team_index = (state.active_team_index + 1) % team_count;
                    }
                    state.next_drawer(state.active_team_index)
                }
            }
            GameMode::Ffa => state.next_ffa_drawer(),
        };

        let Some(drawer) = drawer else {
            tracing::warn!(round = state.current_round, "No drawer available, aborting round");
            state.current_drawer = None;
            state.phase = GamePhase::Lobby;
            return;
        };

        match state.settings.game_mode {
            GameMode::Teams => state.assign_roles(&drawer, state.active_team_index),
            GameMode::Ffa => state.assign_ffa_roles(&drawer),
        }
        state.current_drawer = Some(drawer.clone());

        self.offer_word_choices(state, timers, out, &drawer);
    }

    /// Send 3 word choices to the drawer only, enter word-select, and arm
    /// the auto-pick fallback.
    fn offer_word_choices(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        drawer: &str,
    ) {
        self.word_choices = words::pick_words(&state.settings.word_category, WORD_CHOICE_COUNT);
        out.send_to(
            drawer,
            ServerMessage::WordChoices {
                words: self.word_choices.clone(),
            },
        );
        state.phase = GamePhase::WordSelect;
        timers.arm(TimerKind::WordAutoPick, WORD_PICK_TIMEOUT);
    }

    /// The drawer never picked: choose uniformly at random for them.
    pub fn auto_pick_word(&mut self, state: &mut GameState, timers: &mut Timers, out: &Outbound) {
        if state.phase != GamePhase::WordSelect || self.word_choices.is_empty() {
            return;
        }
        let index = rand::rng().random_range(0..self.word_choices.len());
        self.select_word(state, timers, out, index);
    }

    pub fn select_word(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        index: usize,
    ) {
        if state.phase != GamePhase::WordSelect || index >= self.word_choices.len() {
            return;
        }
        timers.cancel(&TimerKind::WordAutoPick);

        let word = self.word_choices[index].clone();
        let hint = WordHint::new(&word);
        state.word_hint = hint.render();
        self.hint = Some(hint);
        self.current_word = Some(word.clone());

        state.time_remaining = state.settings.draw_time;
        state.phase = GamePhase::Drawing;

        if let Some(drawer) = state.current_drawer.clone() {
            out.send_to(&drawer, ServerMessage::SecretWord { word });
        }

        timers.arm(TimerKind::DrawTick, DRAW_TICK);
        timers.arm(TimerKind::HintReveal, HINT_INTERVAL);
    }

    /// One second of drawing time elapsed.
    pub fn tick(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
    ) {
        if state.phase != GamePhase::Drawing {
            return;
        }
        state.time_remaining = state.time_remaining.saturating_sub(1);
        if state.time_remaining == 0 {
            self.end_round(state, timers, out, false);
        } else {
            timers.arm(TimerKind::DrawTick, DRAW_TICK);
        }
    }

    /// Reveal one more hint letter and re-arm the interval.
    pub fn reveal_hint_letter(&mut self, state: &mut GameState, timers: &mut Timers) {
        if state.phase != GamePhase::Drawing {
            return;
        }
        if let Some(hint) = &mut self.hint {
            if hint.reveal_random_letter() {
                state.word_hint = hint.render();
            }
        }
        timers.arm(TimerKind::HintReveal, HINT_INTERVAL);
    }

    /// Arbitrate a guess from an already role/phase-checked sender.
    pub fn process_guess(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        player_id: &str,
        nickname: &str,
        text: &str,
    ) {
        let Some(word) = self.current_word.clone() else {
            return;
        };
        let is_correct = text.trim().to_lowercase() == word.trim().to_lowercase();

        // the answer must not leak through the guess log
        let logged_text = if is_correct {
            "✓ Correct!".to_string()
        } else {
            text.trim().to_string()
        };
        state.guesses.push(GuessEntry {
            player_id: player_id.to_string(),
            nickname: nickname.to_string(),
            text: logged_text,
            timestamp: now_ms(),
            is_correct,
        });

        if !is_correct {
            return;
        }

        out.broadcast(ServerMessage::CorrectGuess {
            player_id: player_id.to_string(),
            nickname: nickname.to_string(),
            word: word.clone(),
        });

        match state.settings.game_mode {
            GameMode::Teams => {
                state.award_point(state.active_team_index);
                self.end_round(state, timers, out, true);
            }
            GameMode::Ffa if state.is_sudden_death => {
                self.end_sudden_death_win(state, timers, player_id);
            }
            GameMode::Ffa => {
                state.award_player_point(player_id);
                self.end_round(state, timers, out, true);
            }
        }
    }

    pub fn end_round(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        was_correct: bool,
    ) {
        timers.cancel_round_timers();
        state.phase = GamePhase::RoundEnd;
        state.current_drawer = None;
        state.clear_roles();

        let word = self.current_word.clone().unwrap_or_default();
        let (team_index, team_name) = match state.settings.game_mode {
            GameMode::Teams => (
                state.active_team_index as i32,
                state
                    .teams
                    .get(state.active_team_index)
                    .map(|t| t.name.clone()),
            ),
            GameMode::Ffa => (-1, None),
        };
        out.broadcast(ServerMessage::RoundResult {
            word,
            was_correct,
            team_index,
            team_name,
        });

        self.pending = Some(match state.settings.game_mode {
            GameMode::Teams => {
                let winner = state.check_win_condition();
                if winner >= 0 {
                    RoundAdvance::TeamsGameOver(winner as usize)
                } else {
                    if !state.teams.is_empty() {
                        state.active_team_index =
                            (state.active_team_index + 1) % state.teams.len();
                    }
                    RoundAdvance::NextRound
                }
            }
            GameMode::Ffa => {
                let winners = state.check_ffa_win_condition();
                match winners.len() {
                    0 => RoundAdvance::NextRound,
                    1 => RoundAdvance::FfaGameOver(winners[0].clone()),
                    _ => RoundAdvance::SuddenDeath(winners),
                }
            }
        });

        timers.arm(TimerKind::RoundAdvance, ROUND_END_DELAY);
    }

    /// The 5s round-end pause elapsed: apply whatever was decided.
    pub fn advance(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        strokes: &mut Vec<DrawStroke>,
    ) {
        match self.pending.take() {
            Some(RoundAdvance::NextRound) => {
                self.start_next_round(state, timers, out, strokes)
            }
            Some(RoundAdvance::TeamsGameOver(winner)) => {
                state.winning_team_index = winner as i32;
                state.phase = GamePhase::GameOver;
            }
            Some(RoundAdvance::FfaGameOver(winner)) => {
                state.winner_session_ids = vec![winner];
                state.phase = GamePhase::GameOver;
            }
            Some(RoundAdvance::SuddenDeath(tied)) => {
                self.start_sudden_death(state, timers, out, strokes, tied)
            }
            None => {}
        }
    }

    /// Tie-breaker round: a non-tied player draws, only the tied players may
    /// guess, and the first correct guess wins the whole game.
    pub fn start_sudden_death(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        out: &Outbound,
        strokes: &mut Vec<DrawStroke>,
        tied: Vec<SessionId>,
    ) {
        timers.cancel_round_timers();

        strokes.clear();
        out.broadcast(ServerMessage::ClearCanvas);

        state.is_sudden_death = true;
        state.winner_session_ids = tied.clone();
        state.guesses.clear();
        state.word_hint.clear();
        state.time_remaining = 0;
        self.current_word = None;
        self.hint = None;
        self.pending = None;

        let Some(drawer) = state.sudden_death_drawer(&tied) else {
            tracing::warn!("No sudden-death drawer available, aborting round");
            state.current_drawer = None;
            state.phase = GamePhase::Lobby;
            return;
        };

        for player in state.players.values_mut() {
            player.role = if player.session_id == drawer {
                Role::Drawer
            } else if tied.contains(&player.session_id) {
                Role::Guesser
            } else {
                Role::Spectator
            };
        }
        state.current_drawer = Some(drawer.clone());

        self.offer_word_choices(state, timers, out, &drawer);
    }

    pub fn end_sudden_death_win(
        &mut self,
        state: &mut GameState,
        timers: &mut Timers,
        winner: &str,
    ) {
        timers.cancel_round_timers();
        state.is_sudden_death = false;
        state.winner_session_ids = vec![winner.to_string()];
        state.current_drawer = None;
        state.clear_roles();
        state.phase = GamePhase::GameOver;
    }
}
