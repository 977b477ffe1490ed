//! Request-level rejections
//!
//! None of these are fatal to the server: each is reported to the connection
//! that made the request and leaves every match untouched.

use shared::BoardError;
use thiserror::Error;

/// Why a move was refused; `Display` is the reason sent to the mover
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("Game not ready")]
    NotReady,

    #[error("Not your turn")]
    OutOfTurn,

    #[error("Invalid position")]
    OutOfBounds,

    #[error("Position already occupied")]
    CellOccupied,

    #[error("Invalid move")]
    NoCapture,

    #[error("Game not found")]
    MatchNotFound,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("Already playing in match {0}")]
    AlreadyInMatch(String),

    #[error("Match is full")]
    MatchFull,

    #[error("Match id must be 1 to 64 characters")]
    InvalidMatchId,

    #[error(transparent)]
    InvalidBoardSize(#[from] BoardError),
}
