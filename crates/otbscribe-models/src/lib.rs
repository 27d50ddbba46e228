//! Shared data models for the over-the-board chess video reconstruction
//! pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Run context and parameters (`run`)
//! - Stable frames and homographies (`frame`)
//! - Per-square observations, photometric and tag (`observation`)
//! - Tag-id-to-piece mappings (`piece_map`)
//! - Move records and games (`game`)
//! - Photometric calibration constants (`calibration`)
//! - The shared error taxonomy (`error`)

pub mod calibration;
pub mod error;
pub mod frame;
pub mod game;
pub mod observation;
pub mod piece_map;
pub mod run;

pub use calibration::Calibration;
pub use error::{ModelError, ModelResult};
pub use frame::{Homography, RectifiedBoard, StableFrame, BOARD_SIZE_PX};
pub use game::{Classification, Game, MoveRecord};
pub use observation::{Observation, PhotometricObs, TagDetection, TagObs};
pub use piece_map::{PieceMap, PieceMapEntry};
pub use run::{Mode, Orientation, RunContext, RunId, RunParams};
