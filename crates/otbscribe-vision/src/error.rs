//! Errors raised while sampling frames, locating the board, or observing
//! squares (spec §7; the subset of the taxonomy this crate raises).

use thiserror::Error;

/// Result type for vision-stage operations.
pub type VisionResult<T> = Result<T, VisionError>;

#[derive(Debug, Error)]
pub enum VisionError {
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

    #[error("observation below confidence thresholds: {0}")]
    LowConfidenceObservation(String),

    #[error("image encode/decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("artifact store error: {0}")]
    Store(#[from] otbscribe_store::StoreError),

    #[cfg(feature = "opencv")]
    #[error("OpenCV operation failed: {0}")]
    OpenCv(#[from] opencv::Error),
}
