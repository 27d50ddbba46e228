//! The error taxonomy shared by every stage (spec §7).
//!
//! Stage-specific crates define their own `thiserror` enums for errors that
//! are only meaningful within that stage (e.g. `otbscribe-vision::VisionError`).
//! `ModelError` holds the handful of variants that cross stage boundaries —
//! chiefly the ones recorded verbatim into `run_meta.json`'s failure reason.

use thiserror::Error;

/// Result type for model-level validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Cross-stage error variants, realized as typed values rather than strings
/// (spec §7, §9 "exceptions for control flow").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("video could not be opened or decoded: {0}")]
    InputUnreadable(String),

    #[error("fewer than two stable frames were extracted from the video")]
    TooFewStableFrames,

    #[error("board quadrilateral not found in frame {frame_index}")]
    BoardNotFound { frame_index: usize },

    #[error("marker decoding failed for frame {frame_index}, contour fallback used")]
    MarkerDecodeFailure { frame_index: usize },

    #[error("calibration failed: {0}")]
    CalibrationFailure(String),

    #[error("piece map is invalid: {0}")]
    InvalidPieceMap(String),

    #[error("engine is unavailable: {0}")]
    EngineUnavailable(String),

    #[error("engine query timed out after {0}ms")]
    EngineTimeout(u64),
}

impl ModelError {
    /// A stable, machine-readable name for this variant, used as the
    /// `failure_reason` written into `run_meta.json`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::InputUnreadable(_) => "InputUnreadable",
            Self::TooFewStableFrames => "TooFewStableFrames",
            Self::BoardNotFound { .. } => "BoardNotFound",
            Self::MarkerDecodeFailure { .. } => "MarkerDecodeFailure",
            Self::CalibrationFailure(_) => "CalibrationFailure",
            Self::InvalidPieceMap(_) => "InvalidPieceMap",
            Self::EngineUnavailable(_) => "EngineUnavailable",
            Self::EngineTimeout(_) => "EngineTimeout",
        }
    }
}
