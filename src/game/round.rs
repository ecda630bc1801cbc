//! Round and game state machine, score bookkeeping

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::ws::protocol::ScoreEntry;

use super::player::PlayerState;

/// Room phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundPhase {
    /// Room created, game not started
    Waiting,
    /// Heads are moving
    RoundInProgress,
    /// Round decided, waiting for the host to start the next one
    RoundOver,
    /// Someone reached the win score
    GameOver,
}

impl RoundPhase {
    pub fn game_started(self) -> bool {
        self != Self::Waiting
    }

    pub fn round_in_progress(self) -> bool {
        self == Self::RoundInProgress
    }
}

/// Decided round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    /// None when nobody survived
    pub winner: Option<Uuid>,
    /// The winner reached the win score
    pub game_over: bool,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug)]
pub struct RoundLifecycle {
    phase: RoundPhase,
    round: u32,
    win_score: u32,
}

impl RoundLifecycle {
    pub fn new(win_score: u32) -> Self {
        Self {
            phase: RoundPhase::Waiting,
            round: 0,
            win_score,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Rounds started in the current game
    pub fn round(&self) -> u32 {
        self.round
    }

    /// `startGame` is honoured before the first round and after a finished game
    pub fn can_start_game(&self) -> bool {
        matches!(self.phase, RoundPhase::Waiting | RoundPhase::GameOver)
    }

    /// `startNewRound` is honoured only between rounds
    pub fn can_start_round(&self) -> bool {
        self.phase == RoundPhase::RoundOver
    }

    /// Enter a fresh game: scores are zeroed and the round counter restarts
    pub fn begin_game(&mut self, players: &mut HashMap<Uuid, PlayerState>) {
        for player in players.values_mut() {
            player.score = 0;
        }
        self.round = 0;
        self.begin_round();
    }

    pub fn begin_round(&mut self) {
        self.round += 1;
        self.phase = RoundPhase::RoundInProgress;
    }

    /// Check the end condition of an in-progress round and settle scores.
    ///
    /// With two or more players the round ends once at most one is alive; a solo
    /// room ends when its only player dies.
    pub fn evaluate(&mut self, players: &mut HashMap<Uuid, PlayerState>) -> Option<RoundResult> {
        if self.phase != RoundPhase::RoundInProgress {
            return None;
        }

        let alive: Vec<Uuid> = players.values().filter(|p| p.alive).map(|p| p.id).collect();
        let ended = if players.len() >= 2 {
            alive.len() <= 1
        } else {
            alive.is_empty()
        };
        if !ended {
            return None;
        }

        let winner = match alive.as_slice() {
            [only] => Some(*only),
            _ => None,
        };

        let mut game_over = false;
        if let Some(player) = winner.and_then(|id| players.get_mut(&id)) {
            player.score += 1;
            game_over = player.score >= self.win_score;
        }

        self.phase = if game_over {
            RoundPhase::GameOver
        } else {
            RoundPhase::RoundOver
        };

        Some(RoundResult {
            winner,
            game_over,
            scores: Self::scores(players),
        })
    }

    /// Score table, best first
    pub fn scores(players: &HashMap<Uuid, PlayerState>) -> Vec<ScoreEntry> {
        let mut scores: Vec<ScoreEntry> = players
            .values()
            .map(|p| ScoreEntry {
                player_id: p.id,
                score: p.score,
            })
            .collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score).then(a.player_id.cmp(&b.player_id)));
        scores
    }
}
