use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Opaque ID type for type safety
pub type SessionId = String;

/// Maximum simultaneously connected clients per room
pub const MAX_CLIENTS: usize = 16;
/// Maximum nickname length in characters
pub const MAX_NICKNAME_CHARS: usize = 20;

/// Avatar colors handed out round-robin by join order
pub const AVATAR_PALETTE: [&str; 12] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4",
    "#46f0f0", "#f032e6", "#bcf60c", "#fabebe", "#008080", "#e6beff",
];

/// Name + color pairs used when (re)initializing teams
pub const TEAM_PRESETS: [(&str, &str); 4] = [
    ("Blaze", "#ff5722"),
    ("Wave", "#2196f3"),
    ("Forest", "#4caf50"),
    ("Violet", "#9c27b0"),
];

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GamePhase {
    ModeSelect,
    Lobby,
    WordSelect,
    Drawing,
    RoundEnd,
    GameOver,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Teams,
    Ffa,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WinMode {
    Points,
    Rounds,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Drawer,
    Guesser,
    Opponent,
    Spectator,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Eraser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub session_id: SessionId,
    pub nickname: String,
    pub avatar_color: String,
    /// −1 = unassigned/spectator, else index into `teams`
    pub team_index: i32,
    pub role: Role,
    pub is_host: bool,
    pub is_connected: bool,
    /// Monotonic join sequence within the room; orders host promotion and
    /// the FFA pool
    pub join_order: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    pub color: String,
    pub score: u32,
    /// Round-robin drawer rotation; front is next to draw
    pub drawer_queue: VecDeque<SessionId>,
}

impl Team {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            score: 0,
            drawer_queue: VecDeque::new(),
        }
    }
}

pub const MIN_DRAW_TIME: u32 = 30;
pub const MAX_DRAW_TIME: u32 = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub game_mode: GameMode,
    pub win_mode: WinMode,
    pub target_score: u32,
    pub total_rounds: u32,
    /// Seconds per drawing phase, clamped to 30..=120
    pub draw_time: u32,
    pub word_category: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            game_mode: GameMode::Teams,
            win_mode: WinMode::Points,
            target_score: 10,
            total_rounds: 10,
            draw_time: 75,
            word_category: "mixed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessEntry {
    pub player_id: SessionId,
    pub nickname: String,
    pub text: String,
    pub timestamp: i64,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub player_id: SessionId,
    pub nickname: String,
    pub text: String,
    pub timestamp: i64,
}

/// One polyline drawn by the drawer, all points normalized to [0,1]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrawStroke {
    pub points: Vec<(f32, f32)>,
    pub color: String,
    pub width: u32,
    pub tool: Tool,
}

impl DrawStroke {
    /// Server-side sanity check before a stroke is accepted into history
    pub fn is_valid(&self) -> bool {
        self.width >= 1
            && !self.points.is_empty()
            && self
                .points
                .iter()
                .all(|&(x, y)| (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y))
    }
}

/// Authoritative snapshot of one room, replicated to clients after every
/// handled event. The secret word is deliberately not part of this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: GamePhase,
    pub players: HashMap<SessionId, Player>,
    pub teams: Vec<Team>,
    pub settings: GameSettings,
    /// 1-indexed during play, 0 pre-game
    pub current_round: u32,
    pub active_team_index: usize,
    pub current_drawer: Option<SessionId>,
    /// Masked word, e.g. `_ _ _`
    pub word_hint: String,
    pub time_remaining: u32,
    pub guesses: Vec<GuessEntry>,
    pub chat_messages: Vec<ChatEntry>,
    /// −1 until game over in teams mode
    pub winning_team_index: i32,
    /// FFA per-player scoreboard
    pub player_scores: HashMap<SessionId, u32>,
    /// FFA: tied candidates during sudden death, single winner at game over
    pub winner_session_ids: Vec<SessionId>,
    pub is_sudden_death: bool,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::ModeSelect,
            players: HashMap::new(),
            teams: Vec::new(),
            settings: GameSettings::default(),
            current_round: 0,
            active_team_index: 0,
            current_drawer: None,
            word_hint: String::new(),
            time_remaining: 0,
            guesses: Vec::new(),
            chat_messages: Vec::new(),
            winning_team_index: -1,
            player_scores: HashMap::new(),
            winner_session_ids: Vec::new(),
            is_sudden_death: false,
        }
    }

    pub fn player(&self, session_id: &str) -> Option<&Player> {
        self.players.get(session_id)
    }

    pub fn player_mut(&mut self, session_id: &str) -> Option<&mut Player> {
        self.players.get_mut(session_id)
    }

    pub fn is_host(&self, session_id: &str) -> bool {
        self.player(session_id).is_some_and(|p| p.is_host)
    }

    pub fn is_current_drawer(&self, session_id: &str) -> bool {
        self.current_drawer.as_deref() == Some(session_id)
    }

    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|p| p.is_connected).count()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
