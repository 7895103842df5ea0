use crate::error::{Error, Result};
use crate::players::Marks;
use itertools::Itertools;
use ndarray::prelude::*;
use std::fmt;

/// Rows, columns and diagonals as row-major cell indices.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];
pub const CENTER: usize = 4;
pub const CORNERS: [usize; 4] = [0, 2, 6, 8];
pub const EDGES: [usize; 4] = [1, 3, 5, 7];
pub const NUM_CELLS: usize = 9;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IsGameOver {
    InPlay,
    Drawn,
    Win(Marks),
}

/// Snapshot of the 3x3 grid. Cells are addressed by row-major index 0-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    state: Array2<Marks>,
}

/// The environment both the trainer and interactive sessions drive.
#[derive(Debug, Clone, Default)]
pub struct Board {
    current_state: GameState,
}

fn coords(index: usize) -> [usize; 2] {
    [index / 3, index % 3]
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_state_key())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            state: Array::from_elem((3, 3), Marks::None),
        }
    }

    /// Inverse of [`GameState::to_state_key`].
    pub fn from_state_key(key: &str) -> Result<Self> {
        let invalid = || Error::InvalidStateKey {
            key: key.to_owned(),
        };
        let cells = key
            .chars()
            .map(Marks::from_char)
            .collect::<Option<Vec<Marks>>>()
            .ok_or_else(invalid)?;
        let state = Array::from_shape_vec((3, 3), cells).map_err(|_| invalid())?;
        Ok(GameState { state })
    }

    pub fn to_state_key(&self) -> String {
        self.state.iter().map(|mark| mark.as_char()).collect()
    }

    pub fn get(&self, index: usize) -> Option<Marks> {
        (index < NUM_CELLS).then(|| self.state[coords(index)])
    }

    fn at(&self, index: usize) -> Marks {
        self.state[coords(index)]
    }

    pub(crate) fn set(&mut self, index: usize, mark: Marks) {
        self.state[coords(index)] = mark;
    }

    /// Copy of this state with `mark` written at `index`.
    pub fn with_move(&self, index: usize, mark: Marks) -> Self {
        let mut next = self.clone();
        next.set(index, mark);
        next
    }

    pub fn available_moves(&self) -> Vec<usize> {
        self.state
            .indexed_iter()
            .filter(|(_, &value)| value == Marks::None)
            .map(|((row, col), _)| row * 3 + col)
            .collect()
    }

    pub fn empty_count(&self) -> usize {
        self.state.iter().filter(|&&m| m == Marks::None).count()
    }

    pub fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    /// Mark holding a full line, if any. All eight lines are scanned on every call.
    pub fn winner(&self) -> Option<Marks> {
        let mut winner = None;
        for line in WIN_LINES {
            let first = self.at(line[0]);
            if first != Marks::None && line.iter().all(|&i| self.at(i) == first) {
                winner = winner.or(Some(first));
            }
        }
        winner
    }

    /// Whether placing `mark` on the empty cell `index` would complete a line.
    pub fn completes_line(&self, index: usize, mark: Marks) -> bool {
        if mark == Marks::None || self.get(index) != Some(Marks::None) {
            return false;
        }
        WIN_LINES
            .iter()
            .filter(|line| line.contains(&index))
            .any(|line| {
                line.iter()
                    .filter(|&&i| i != index)
                    .all(|&i| self.at(i) == mark)
            })
    }

    /// Number of lines holding exactly two `mark` cells and one empty cell.
    pub fn open_twos(&self, mark: Marks) -> usize {
        WIN_LINES
            .iter()
            .filter(|line| {
                let own = line.iter().filter(|&&i| self.at(i) == mark).count();
                let empty = line.iter().filter(|&&i| self.at(i) == Marks::None).count();
                own == 2 && empty == 1
            })
            .count()
    }

    /// Three text rows, cells separated by `|`.
    pub fn render(&self) -> String {
        self.to_state_key()
            .chars()
            .tuples::<(_, _, _)>()
            .map(|(a, b, c)| format!("{a}|{b}|{c}"))
            .join("\n")
    }
}

impl Board {
    pub fn new() -> Self {
        Board {
            current_state: GameState::new(),
        }
    }

    pub fn from_state(state: GameState) -> Self {
        Board {
            current_state: state,
        }
    }

    pub fn reset(&mut self) {
        self.current_state.state.fill(Marks::None);
    }

    pub fn current(&self) -> &GameState {
        &self.current_state
    }

    pub fn available_moves(&self) -> Vec<usize> {
        self.current_state.available_moves()
    }

    /// Writes `mark` at `index` if that cell is empty. Returns false and leaves the
    /// board untouched otherwise.
    pub fn make_move(&mut self, index: usize, mark: Marks) -> bool {
        if mark == Marks::None || self.current_state.get(index) != Some(Marks::None) {
            return false;
        }
        self.current_state.set(index, mark);
        true
    }

    pub fn check_winner(&self) -> IsGameOver {
        match self.current_state.winner() {
            Some(mark) => IsGameOver::Win(mark),
            None if self.current_state.is_full() => IsGameOver::Drawn,
            None => IsGameOver::InPlay,
        }
    }

    pub fn get_state(&self) -> String {
        self.current_state.to_state_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from(key: &str) -> Board {
        Board::from_state(GameState::from_state_key(key).unwrap())
    }

    #[test]
    fn every_line_is_detected() {
        for line in WIN_LINES {
            for mark in [Marks::CROSS, Marks::NOUGHT] {
                let mut board = Board::new();
                for &i in &line {
                    assert_eq!(board.check_winner(), IsGameOver::InPlay);
                    assert!(board.make_move(i, mark));
                }
                // opponent stones elsewhere do not change the verdict
                let other = (0..NUM_CELLS).find(|i| !line.contains(i)).unwrap();
                board.make_move(other, mark.other());
                assert_eq!(board.check_winner(), IsGameOver::Win(mark));
            }
        }
    }

    #[test]
    fn full_board_without_line_is_drawn() {
        let board = board_from("XOXXOOOXX");
        assert_eq!(board.check_winner(), IsGameOver::Drawn);
        assert!(board.available_moves().is_empty());
    }

    #[test]
    fn top_row_wins_on_third_placement() {
        let mut board = Board::new();
        assert!(board.make_move(0, Marks::CROSS));
        assert_eq!(board.check_winner(), IsGameOver::InPlay);
        assert!(board.make_move(1, Marks::CROSS));
        assert_eq!(board.check_winner(), IsGameOver::InPlay);
        assert!(board.make_move(2, Marks::CROSS));
        assert_eq!(board.check_winner(), IsGameOver::Win(Marks::CROSS));
    }

    #[test]
    fn occupied_cell_is_rejected() {
        let mut board = Board::new();
        assert!(board.make_move(4, Marks::NOUGHT));
        let before = board.get_state();
        assert!(!board.make_move(4, Marks::CROSS));
        assert!(!board.make_move(9, Marks::CROSS));
        assert!(!board.make_move(0, Marks::None));
        assert_eq!(board.get_state(), before);
        assert_eq!(before, "    O    ");
    }

    #[test]
    fn moves_are_listed_in_ascending_order() {
        let mut board = board_from("X O  O  X");
        assert_eq!(board.available_moves(), vec![1, 3, 4, 6, 7]);
        board.reset();
        assert_eq!(board.available_moves(), (0..9).collect::<Vec<_>>());
        assert_eq!(board.get_state(), " ".repeat(9));
    }

    #[test]
    fn state_key_is_row_major() {
        let mut board = Board::new();
        board.make_move(2, Marks::CROSS);
        board.make_move(6, Marks::NOUGHT);
        assert_eq!(board.get_state(), "  X   O  ");
        assert_eq!(GameState::from_state_key(&board.get_state()).unwrap(), *board.current());
    }

    #[test]
    fn malformed_state_keys_are_rejected() {
        assert!(GameState::from_state_key("XO").is_err());
        assert!(GameState::from_state_key("XO-------").is_err());
        assert!(GameState::from_state_key("XOXOXOXOXO").is_err());
    }

    #[test]
    fn line_queries() {
        let state = GameState::from_state_key("XX  O    ").unwrap();
        assert!(state.completes_line(2, Marks::CROSS));
        assert!(!state.completes_line(2, Marks::NOUGHT));
        assert!(!state.completes_line(0, Marks::CROSS));
        assert_eq!(state.open_twos(Marks::CROSS), 1);
        let fork = state.with_move(3, Marks::CROSS);
        assert_eq!(fork.open_twos(Marks::CROSS), 2);
        assert_eq!(fork.empty_count(), 5);
    }

    #[test]
    fn render_draws_three_rows() {
        let state = GameState::from_state_key("X O  O  X").unwrap();
        assert_eq!(state.render(), "X| |O\n | |O\n | |X");
    }
}
