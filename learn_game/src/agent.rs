//! Tabular Q-learning agent.
//!
//! Move selection takes an immediate win, else blocks an immediate loss, else falls back
//! to epsilon-greedy over the learned values with random tie-breaking.

use crate::board::{Board, GameState};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::players::{Marks, Player};
use crate::q_table::QTable;
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub(crate) fn build_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    mark: Marks,
    q_table: QTable,
    learning_rate: f32,
    discount_rate: f32,
    exploration_rate: f32,
    rng: StdRng,
}

impl Agent {
    pub fn new(mark: Marks, config: AgentConfig) -> Self {
        Agent {
            name: format!("agent-{}", mark.as_char().to_ascii_lowercase()),
            mark,
            q_table: QTable::new(),
            learning_rate: config.learning_rate,
            discount_rate: config.discount_rate,
            exploration_rate: config.exploration_rate,
            rng: build_rng(None),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = build_rng(Some(seed));
        self
    }

    pub fn with_q_table(mut self, q_table: QTable) -> Self {
        self.q_table = q_table;
        self
    }

    pub fn mark(&self) -> Marks {
        self.mark
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn q_table_mut(&mut self) -> &mut QTable {
        &mut self.q_table
    }

    pub fn exploration_rate(&self) -> f32 {
        self.exploration_rate
    }

    pub fn set_exploration_rate(&mut self, rate: f32) {
        self.exploration_rate = rate;
    }

    /// Multiplies the exploration rate by `decay`, never going below `floor`.
    pub fn decay_exploration(&mut self, decay: f32, floor: f32) {
        self.exploration_rate = (self.exploration_rate * decay).max(floor);
    }

    /// Picks a cell among `legal_moves` for the position `state`.
    pub fn choose_action(&mut self, state: &GameState, legal_moves: &[usize]) -> Result<usize> {
        if legal_moves.is_empty() {
            return Err(Error::NoLegalMoves);
        }
        if let Some(&index) = legal_moves
            .iter()
            .find(|&&mv| state.get(mv) != Some(Marks::None))
        {
            return Err(Error::InvalidMove { index });
        }
        if let Some(mv) = self.tactical_move(state, legal_moves) {
            return Ok(mv);
        }
        if self.rng.gen::<f32>() < self.exploration_rate {
            return legal_moves
                .choose(&mut self.rng)
                .copied()
                .ok_or(Error::NoLegalMoves);
        }
        // an unseen row reads as all zeros; only learning inserts rows
        let best = self
            .q_table
            .get(&state.to_state_key())
            .copied()
            .unwrap_or_default()
            .max_moves(legal_moves);
        best.choose(&mut self.rng).copied().ok_or(Error::NoLegalMoves)
    }

    /// First winning cell, else first cell the opponent would win on.
    fn tactical_move(&self, state: &GameState, legal_moves: &[usize]) -> Option<usize> {
        let opponent = self.mark.other();
        legal_moves
            .iter()
            .copied()
            .find(|&mv| state.completes_line(mv, self.mark))
            .or_else(|| {
                legal_moves
                    .iter()
                    .copied()
                    .find(|&mv| state.completes_line(mv, opponent))
            })
    }

    pub fn learn(
        &mut self,
        old_state: &str,
        action: usize,
        reward: f32,
        new_state: &str,
        is_terminal: bool,
    ) {
        self.q_table.update_q_table(
            old_state,
            new_state,
            action,
            reward,
            is_terminal,
            self.learning_rate,
            self.discount_rate,
        );
    }
}

impl Player for Agent {
    fn get_mark(&self) -> Marks {
        self.mark
    }
    fn get_name(&self) -> &str {
        &self.name
    }
    fn choose_move(&mut self, board: &Board) -> Result<usize> {
        self.choose_action(board.current(), &board.available_moves())
    }
}
