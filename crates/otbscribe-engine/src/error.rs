//! Errors raised while driving the UCI engine subprocess (spec §7; the
//! subset of the taxonomy this crate raises).

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine binary not found (set STOCKFISH_PATH or install stockfish on PATH)")]
    EngineUnavailable,

    #[error("engine did not respond within the configured timeout")]
    EngineTimeout,

    #[error("engine exited unexpectedly")]
    EngineExited,

    #[error("unexpected UCI protocol response: {0}")]
    Protocol(String),

    #[error("engine subprocess I/O error: {0}")]
    Io(#[from] std::io::Error),
}
