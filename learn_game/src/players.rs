use crate::board::Board;
use crate::error::{Error, Result};
use std::io::{self, BufRead, StdinLock};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Marks {
    CROSS,
    NOUGHT,
    None,
}

/// Anything that can pick a cell for its mark: the learning agent, a person at the
/// console, or another agent standing in as an opponent.
pub trait Player {
    fn get_mark(&self) -> Marks;
    fn get_name(&self) -> &str;
    fn choose_move(&mut self, board: &Board) -> Result<usize>;
}

impl Marks {
    pub fn other(self) -> Self {
        match self {
            Self::CROSS => Marks::NOUGHT,
            Self::NOUGHT => Marks::CROSS,
            Self::None => Marks::None,
        }
    }
    pub fn as_char(self) -> char {
        match self {
            Self::CROSS => 'X',
            Self::NOUGHT => 'O',
            Self::None => ' ',
        }
    }
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'X' => Some(Self::CROSS),
            'O' => Some(Self::NOUGHT),
            ' ' => Some(Self::None),
            _ => None,
        }
    }
}

/// A person entering cell indices 0-8 (row-major) line by line.
#[derive(Debug)]
pub struct HumanPlayer<R> {
    pub name: String,
    pub mark: Marks,
    input: R,
}

impl HumanPlayer<StdinLock<'static>> {
    pub fn stdin(name: String, mark: Marks) -> Self {
        Self::new(name, mark, io::stdin().lock())
    }
}

impl<R: BufRead> HumanPlayer<R> {
    pub fn new(name: String, mark: Marks, input: R) -> Self {
        HumanPlayer { name, mark, input }
    }

    /// The reader moves are taken from, for front-ends asking other questions.
    pub fn input(&mut self) -> &mut R {
        &mut self.input
    }

    fn read_index(&mut self) -> Result<Option<usize>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::InputClosed);
        }
        Ok(line.trim().parse::<usize>().ok())
    }
}

impl<R: BufRead> Player for HumanPlayer<R> {
    fn get_mark(&self) -> Marks {
        self.mark
    }
    fn get_name(&self) -> &str {
        &self.name
    }
    fn choose_move(&mut self, board: &Board) -> Result<usize> {
        let available = board.available_moves();
        if available.is_empty() {
            return Err(Error::NoLegalMoves);
        }
        println!("{}", board.current().render());
        println!("{}, please, choose your move (0-8):", self.name);
        loop {
            match self.read_index()? {
                Some(mv) if available.contains(&mv) => return Ok(mv),
                Some(mv) => {
                    log::warn!("{} picked unavailable cell {}", self.name, mv);
                    println!("The square {mv} is not available, please, choose another one.");
                }
                None => println!("Unknown symbol, please, try again (a number 0 to 8):"),
            }
        }
    }
}
