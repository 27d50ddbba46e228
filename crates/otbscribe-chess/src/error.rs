//! Errors raised while decoding moves from observations.

use thiserror::Error;

/// Result type for chess-decoding operations.
pub type ChessResult<T> = Result<T, ChessError>;

#[derive(Debug, Error)]
pub enum ChessError {
    #[error("piece map does not produce a board matching the standard starting position: {0}")]
    InvalidStartingPosition(String),

    #[error("no legal moves available from the current position (checkmate or stalemate)")]
    NoLegalMoves,

    #[error("illegal move attempted: {0}")]
    IllegalMove(String),

    #[error("square {0} is outside the 0..8 grid")]
    SquareOutOfRange(usize),
}
