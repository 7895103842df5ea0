//! One agent playing a human or another agent, learning only when a game ends.
//!
//! During the game the agent records `(state, action, bonus)` for each of its moves.
//! At the end the final reward is walked back over that history, newest move first,
//! shrinking by [`HISTORY_DISCOUNT`] per step. Every step bootstraps from the final
//! board rather than from the position that followed it.

use crate::agent::Agent;
use crate::board::{Board, IsGameOver};
use crate::error::{Error, Result};
use crate::players::{Marks, Player};
use crate::reward;
use crate::trainer::{LOSS_REWARD, WIN_REWARD};

pub const HISTORY_DISCOUNT: f32 = 0.9;
pub const DRAW_REWARD: f32 = 0.0;

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub state: String,
    pub action: usize,
    pub bonus: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub agent_wins: usize,
    pub opponent_wins: usize,
    pub draws: usize,
}

/// Reward of `outcome` from the point of view of `mark`.
pub fn outcome_reward(outcome: IsGameOver, mark: Marks) -> f32 {
    match outcome {
        IsGameOver::Win(winner) if winner == mark => WIN_REWARD,
        IsGameOver::Win(_) => LOSS_REWARD,
        IsGameOver::Drawn | IsGameOver::InPlay => DRAW_REWARD,
    }
}

/// Replays `history` newest first. The newest entry is a terminal update; all of them
/// use `final_state` as successor.
pub fn learn_from_history(
    agent: &mut Agent,
    history: &[HistoryEntry],
    final_reward: f32,
    final_state: &str,
) {
    let mut reward = final_reward;
    for (i, entry) in history.iter().rev().enumerate() {
        agent.learn(
            &entry.state,
            entry.action,
            reward + entry.bonus,
            final_state,
            i == 0,
        );
        reward *= HISTORY_DISCOUNT;
    }
}

#[derive(Debug)]
pub struct Session<'a> {
    agent: &'a mut Agent,
    board: Board,
    history: Vec<HistoryEntry>,
    stats: SessionStats,
}

impl<'a> Session<'a> {
    pub fn new(agent: &'a mut Agent) -> Self {
        Session {
            agent,
            board: Board::new(),
            history: Vec::with_capacity(5),
            stats: SessionStats::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn agent(&self) -> &Agent {
        &*self.agent
    }

    pub fn opponent_mark(&self) -> Marks {
        self.agent.mark().other()
    }

    pub fn new_game(&mut self) {
        self.board.reset();
        self.history.clear();
    }

    /// Lets the agent move and records the move for end-of-game learning.
    pub fn agent_move(&mut self) -> Result<usize> {
        let mark = self.agent.mark();
        let state = self.board.get_state();
        let action = self
            .agent
            .choose_action(self.board.current(), &self.board.available_moves())?;
        let bonus = reward::shape(self.board.current(), mark, action, mark.other());
        let placed = self.board.make_move(action, mark);
        debug_assert!(placed, "agent picked occupied cell {action}");
        self.history.push(HistoryEntry {
            state,
            action,
            bonus,
        });
        Ok(action)
    }

    /// Applies the opponent's move. An occupied cell returns false and changes nothing.
    pub fn opponent_move(&mut self, index: usize) -> bool {
        let mark = self.opponent_mark();
        self.board.make_move(index, mark)
    }

    /// If the game is over, learns from the recorded history and updates the tallies.
    pub fn finish(&mut self) -> Option<IsGameOver> {
        let outcome = self.board.check_winner();
        let mark = self.agent.mark();
        match outcome {
            IsGameOver::InPlay => return None,
            IsGameOver::Drawn => self.stats.draws += 1,
            IsGameOver::Win(winner) if winner == mark => self.stats.agent_wins += 1,
            IsGameOver::Win(_) => self.stats.opponent_wins += 1,
        }
        let final_state = self.board.get_state();
        learn_from_history(
            self.agent,
            &self.history,
            outcome_reward(outcome, mark),
            &final_state,
        );
        log::debug!(
            "game over ({outcome:?}) after {} agent moves",
            self.history.len()
        );
        self.history.clear();
        Some(outcome)
    }

    /// Plays one full game against `opponent`, which must hold the other mark.
    pub fn play(&mut self, opponent: &mut dyn Player, agent_first: bool) -> Result<IsGameOver> {
        let expected = self.opponent_mark();
        if opponent.get_mark() != expected {
            return Err(if opponent.get_mark() == self.agent.mark() {
                Error::MarkConflict(expected.other())
            } else {
                Error::InvalidConfiguration {
                    message: format!("opponent {} has no mark", opponent.get_name()),
                }
            });
        }
        self.new_game();
        let mut agent_turn = agent_first;
        loop {
            if agent_turn {
                self.agent_move()?;
            } else {
                let mv = opponent.choose_move(&self.board)?;
                if !self.opponent_move(mv) {
                    log::warn!("{} tried occupied cell {}", opponent.get_name(), mv);
                    continue;
                }
            }
            if let Some(outcome) = self.finish() {
                return Ok(outcome);
            }
            agent_turn = !agent_turn;
        }
    }
}
