//! Top-level CLI error, aggregating every stage's error type via `#[from]`
//! (spec §7's taxonomy, unified at the process boundary).

use thiserror::Error;

/// Result type for the CLI binary's orchestration code.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Model(#[from] otbscribe_models::ModelError),

    #[error(transparent)]
    Vision(#[from] otbscribe_vision::VisionError),

    #[error(transparent)]
    Chess(#[from] otbscribe_chess::ChessError),

    #[error(transparent)]
    Engine(#[from] otbscribe_engine::EngineError),

    #[error(transparent)]
    Store(#[from] otbscribe_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input video {0} has no file extension")]
    MissingExtension(std::path::PathBuf),

    #[error("--mode tag requires --piece-map")]
    MissingPieceMap,

    #[error("piece map file is not valid JSON: {0}")]
    PieceMapJson(#[from] serde_json::Error),
}

impl CliError {
    /// Stable, machine-readable variant name recorded as `run_meta.json`'s
    /// `failure_reason` on a stage-fatal abort (spec §7 "Propagation policy").
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Model(e) => e.type_name(),
            Self::Vision(_) => "VisionError",
            Self::Chess(_) => "ChessError",
            Self::Engine(_) => "EngineError",
            Self::Store(_) => "StoreError",
            Self::Io(_) => "Io",
            Self::MissingExtension(_) => "MissingExtension",
            Self::MissingPieceMap => "MissingPieceMap",
            Self::PieceMapJson(_) => "PieceMapJson",
        }
    }
}
