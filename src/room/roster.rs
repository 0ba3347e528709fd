//! Roster operations: team membership, drawer rotation, and per-round role
//! assignment for both game modes.

use crate::types::*;

impl GameState {
    /// Replace all teams with `count` fresh presets. Scores and queues start
    /// empty; existing players keep their (now dangling) team indices until
    /// they rejoin a team, so callers reset those separately when needed.
    pub fn init_teams(&mut self, count: usize) {
        self.teams = TEAM_PRESETS
            .iter()
            .take(count)
            .map(|(name, color)| Team::new(name, color))
            .collect();
    }

    pub fn join_team(&mut self, session_id: &str, team_index: i32) -> Result<(), String> {
        if team_index < 0 || team_index as usize >= self.teams.len() {
            return Err(format!("No team at index {}", team_index));
        }
        self.remove_from_queues(session_id);
        if let Some(player) = self.player_mut(session_id) {
            player.team_index = team_index;
        } else {
            return Err("Unknown player".to_string());
        }
        self.teams[team_index as usize]
            .drawer_queue
            .push_back(session_id.to_string());
        Ok(())
    }

    pub fn set_spectator(&mut self, session_id: &str) {
        self.remove_from_queues(session_id);
        if let Some(player) = self.player_mut(session_id) {
            player.team_index = -1;
            player.role = Role::Spectator;
        }
    }

    pub fn remove_from_queues(&mut self, session_id: &str) {
        for team in &mut self.teams {
            team.drawer_queue.retain(|id| id != session_id);
        }
    }

    /// Round-robin: pop the queue front, push it to the tail, return it.
    /// Members inside their reconnection grace window keep their queue slot
    /// but are skipped over, so a round never starts with an offline drawer.
    pub fn next_drawer(&mut self, team_index: usize) -> Option<SessionId> {
        let len = self.teams.get(team_index)?.drawer_queue.len();
        for _ in 0..len {
            let queue = &mut self.teams.get_mut(team_index)?.drawer_queue;
            let session_id = queue.pop_front()?;
            queue.push_back(session_id.clone());
            if self.player(&session_id).is_some_and(|p| p.is_connected) {
                return Some(session_id);
            }
        }
        None
    }

    /// True when the team has at least one member who could draw right now.
    pub fn has_connected_drawer(&self, team_index: usize) -> bool {
        self.teams
            .get(team_index)
            .map(|team| {
                team.drawer_queue
                    .iter()
                    .any(|id| self.player(id).is_some_and(|p| p.is_connected))
            })
            .unwrap_or(false)
    }

    /// Teams mode role assignment for one round.
    pub fn assign_roles(&mut self, drawer: &str, active_team_index: usize) {
        for player in self.players.values_mut() {
            player.role = if player.session_id == drawer {
                Role::Drawer
            } else if player.team_index == active_team_index as i32 {
                Role::Guesser
            } else if player.team_index >= 0 {
                Role::Opponent
            } else {
                Role::Spectator
            };
        }
    }

    /// FFA keeps a single pool at teams[0]; every connected player joins it.
    /// Pool order follows join order so the rotation is stable.
    pub fn init_ffa(&mut self) {
        self.teams.clear();
        self.teams.push(Team::new("Free for All", "#607d8b"));

        let mut connected: Vec<&mut Player> = self
            .players
            .values_mut()
            .filter(|p| p.is_connected)
            .collect();
        connected.sort_by_key(|p| p.join_order);
        for player in connected {
            player.team_index = 0;
            self.teams[0]
                .drawer_queue
                .push_back(player.session_id.clone());
        }
    }

    pub fn assign_ffa_roles(&mut self, drawer: &str) {
        for player in self.players.values_mut() {
            player.role = if player.session_id == drawer {
                Role::Drawer
            } else if player.team_index == 0 {
                Role::Guesser
            } else {
                Role::Spectator
            };
        }
    }

    pub fn next_ffa_drawer(&mut self) -> Option<SessionId> {
        self.next_drawer(0)
    }

    /// Sudden-death drawer: first connected pool member who is not one of
    /// the tied players; falls back to the first tied player.
    pub fn sudden_death_drawer(&self, tied: &[SessionId]) -> Option<SessionId> {
        let pool = self.teams.first()?;
        pool.drawer_queue
            .iter()
            .find(|id| {
                !tied.contains(id)
                    && self.player(id).is_some_and(|p| p.is_connected)
            })
            .cloned()
            .or_else(|| tied.first().cloned())
    }

    pub fn can_start_game(&self) -> Result<(), String> {
        match self.settings.game_mode {
            GameMode::Teams => {
                let populated = self
                    .teams
                    .iter()
                    .filter(|t| !t.drawer_queue.is_empty())
                    .count();
                if populated >= 2 {
                    Ok(())
                } else {
                    Err("Need players on at least two teams to start".to_string())
                }
            }
            GameMode::Ffa => {
                if self.connected_count() >= 2 {
                    Ok(())
                } else {
                    Err("Need at least two players to start".to_string())
                }
            }
        }
    }

    pub fn set_connected(&mut self, session_id: &str, connected: bool) {
        if let Some(player) = self.player_mut(session_id) {
            player.is_connected = connected;
        }
    }

    /// Everyone back to spectator; round start hands out fresh roles.
    pub fn clear_roles(&mut self) {
        for player in self.players.values_mut() {
            player.role = Role::Spectator;
        }
    }

    /// While any client is connected exactly one player must be host; called
    /// after joins and removals to repair the flag.
    pub fn ensure_host(&mut self) {
        if self.players.values().any(|p| p.is_host) {
            return;
        }
        let promoted = self
            .players
            .values()
            .filter(|p| p.is_connected)
            .min_by_key(|p| p.join_order)
            .map(|p| p.session_id.clone());
        if let Some(session_id) = promoted {
            if let Some(player) = self.player_mut(&session_id) {
                player.is_host = true;
                tracing::info!("Promoted {} to host", player.nickname);
            }
        }
    }
}
