//! Heuristic reward shaping.
//!
//! [`shape`] scores a candidate move by summing independent tactical terms. The
//! constants are fixed tuning values; the sum is not clamped.

use crate::board::{GameState, CENTER, CORNERS, EDGES};
use crate::players::Marks;

pub const IMMEDIATE_WIN: f32 = 1.0;
pub const BLOCK: f32 = 0.5;
pub const FORK: f32 = 0.8;
pub const CENTER_CONTROL: f32 = 0.1;
pub const CORNER_CONTROL: f32 = 0.2;
pub const MISSED_BLOCK: f32 = -0.7;
pub const ENABLED_OPPONENT_FORK: f32 = -0.8;
pub const EARLY_EDGE: f32 = -0.2;

/// Empty cells needed before a move for an edge opening to count as early.
const EARLY_EDGE_MIN_EMPTY: usize = 7;

/// Bonus for `acting` playing `candidate` on `state`, `opponent` being the other side.
///
/// Works on private copies only. An occupied or out-of-range candidate scores 0.
pub fn shape(state: &GameState, acting: Marks, candidate: usize, opponent: Marks) -> f32 {
    if state.get(candidate) != Some(Marks::None) {
        return 0.0;
    }
    let after = state.with_move(candidate, acting);
    let mut bonus = 0.0;

    if state.completes_line(candidate, acting) {
        bonus += IMMEDIATE_WIN;
    }
    if state.completes_line(candidate, opponent) {
        bonus += BLOCK;
    }
    if after.open_twos(acting) >= 2 {
        bonus += FORK;
    }
    if candidate == CENTER {
        bonus += CENTER_CONTROL;
    }
    if CORNERS.contains(&candidate) {
        bonus += CORNER_CONTROL;
    }
    if missed_block(state, candidate, opponent) {
        bonus += MISSED_BLOCK;
    }
    if enables_fork(&after, opponent) {
        bonus += ENABLED_OPPONENT_FORK;
    }
    if EDGES.contains(&candidate) && state.empty_count() >= EARLY_EDGE_MIN_EMPTY {
        bonus += EARLY_EDGE;
    }
    bonus
}

/// Another empty cell still lets the opponent complete a line.
fn missed_block(state: &GameState, candidate: usize, opponent: Marks) -> bool {
    state
        .available_moves()
        .into_iter()
        .filter(|&i| i != candidate)
        .any(|i| state.completes_line(i, opponent))
}

/// Some reply would give the opponent two open lines at once.
fn enables_fork(after: &GameState, opponent: Marks) -> bool {
    after
        .available_moves()
        .into_iter()
        .any(|i| after.with_move(i, opponent).open_twos(opponent) >= 2)
}
