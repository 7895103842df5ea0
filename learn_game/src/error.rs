//! Error types for the learning engine

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("no legal moves available")]
    NoLegalMoves,

    #[error("cell {index} is not an empty cell of the board")]
    InvalidMove { index: usize },

    #[error("invalid state key '{key}' (expected 9 cells of 'X', 'O' or ' ')")]
    InvalidStateKey { key: String },

    #[error("both sides of the match play the mark {0:?}")]
    MarkConflict(crate::players::Marks),

    #[error("input stream closed")]
    InputClosed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
