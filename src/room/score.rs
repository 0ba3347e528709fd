//! Point awards and win-condition evaluation for both game modes.

use crate::types::*;

impl GameState {
    pub fn award_point(&mut self, team_index: usize) {
        if let Some(team) = self.teams.get_mut(team_index) {
            team.score += 1;
        }
    }

    pub fn award_player_point(&mut self, session_id: &str) {
        *self
            .player_scores
            .entry(session_id.to_string())
            .or_insert(0) += 1;
    }

    /// Teams mode winner, or −1 while the game is still open.
    ///
    /// Points mode: the lowest-indexed team at or above the target wins.
    /// Rounds mode: once the round budget is spent, the team with the
    /// strictly highest score wins; ties go to the lowest index because the
    /// scan only replaces on strictly-greater.
    pub fn check_win_condition(&self) -> i32 {
        match self.settings.win_mode {
            WinMode::Points => self
                .teams
                .iter()
                .position(|t| t.score >= self.settings.target_score)
                .map(|i| i as i32)
                .unwrap_or(-1),
            WinMode::Rounds => {
                if self.current_round < self.settings.total_rounds {
                    return -1;
                }
                let mut winner = 0usize;
                for (i, team) in self.teams.iter().enumerate() {
                    if team.score > self.teams[winner].score {
                        winner = i;
                    }
                }
                winner as i32
            }
        }
    }

    /// FFA winners at round end: empty while the game is open, one entry for
    /// an outright winner, two or more for a tie that goes to sudden death.
    /// The returned ids follow pool order so the result is deterministic.
    pub fn check_ffa_win_condition(&self) -> Vec<SessionId> {
        let max_score = self.player_scores.values().copied().max().unwrap_or(0);
        let reached = match self.settings.win_mode {
            WinMode::Points => max_score >= self.settings.target_score,
            WinMode::Rounds => self.current_round >= self.settings.total_rounds,
        };
        if !reached || max_score == 0 {
            return Vec::new();
        }
        let Some(pool) = self.teams.first() else {
            return Vec::new();
        };
        pool.drawer_queue
            .iter()
            .filter(|id| self.player_scores.get(*id).copied() == Some(max_score))
            .cloned()
            .collect()
    }

    pub fn reset_team_scores(&mut self) {
        for team in &mut self.teams {
            team.score = 0;
        }
    }

    pub fn reset_player_scores(&mut self) {
        self.player_scores.clear();
    }
}
