use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Host picks teams vs. free-for-all; moves the room out of mode-select.
    /// The mode arrives as a raw string so unknown values can be answered
    /// with an error instead of a parse failure.
    SetGameMode {
        game_mode: String,
    },
    JoinTeam {
        team_index: i32,
    },
    Spectate,
    StartGame {
        #[serde(default)]
        settings: Option<SettingsPatch>,
    },
    SelectWord {
        word_index: usize,
    },
    Draw {
        stroke: DrawStroke,
    },
    ClearCanvas,
    Undo,
    Guess {
        text: String,
    },
    Chat {
        text: String,
    },
    PlayAgain,
}

/// Partial settings sent with `start_game`; absent fields keep their
/// current values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub game_mode: Option<GameMode>,
    pub win_mode: Option<WinMode>,
    pub target_score: Option<u32>,
    pub total_rounds: Option<u32>,
    pub draw_time: Option<u32>,
    pub word_category: Option<String>,
}

impl SettingsPatch {
    /// Merge into existing settings, clamping to sane bounds
    pub fn apply(&self, settings: &mut GameSettings) {
        if let Some(mode) = self.game_mode {
            settings.game_mode = mode;
        }
        if let Some(mode) = self.win_mode {
            settings.win_mode = mode;
        }
        if let Some(score) = self.target_score {
            settings.target_score = score.max(1);
        }
        if let Some(rounds) = self.total_rounds {
            settings.total_rounds = rounds.max(1);
        }
        if let Some(secs) = self.draw_time {
            settings.draw_time = secs.clamp(MIN_DRAW_TIME, MAX_DRAW_TIME);
        }
        if let Some(ref category) = self.word_category {
            settings.word_category = category.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message after a socket attaches: the transport-assigned identity
    Welcome {
        session_id: SessionId,
        room_code: String,
    },
    /// Full replicated snapshot, pushed whenever it changed after an event
    State {
        state: GameState,
    },
    /// Drawer only: the three candidate words for this round
    WordChoices {
        words: Vec<String>,
    },
    /// Drawer only: the chosen secret word
    SecretWord {
        word: String,
    },
    /// Sent to a client that joins (or rejoins) while drawing is underway
    StrokeHistory {
        strokes: Vec<DrawStroke>,
    },
    Draw {
        stroke: DrawStroke,
    },
    ClearCanvas,
    Undo,
    CorrectGuess {
        player_id: SessionId,
        nickname: String,
        word: String,
    },
    RoundResult {
        word: String,
        was_correct: bool,
        team_index: i32,
        team_name: Option<String>,
    },
    Error {
        message: String,
    },
}
