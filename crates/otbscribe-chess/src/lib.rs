//! Legality-constrained and identity-tracking move decoders (spec §4.D).
//!
//! This crate owns the canonical reconstructed board state
//! ([`board::BoardState`], a thin wrapper over [`shakmaty::Chess`]) and the
//! two decoder strategies that advance it from a sequence of observations:
//! [`decode::photometric`] (Hamming-distance scoring over legal moves) and
//! [`decode::tag`] (moved-id-set tracking against a [`otbscribe_models::PieceMap`]).

pub mod board;
pub mod decode;
pub mod error;

pub use board::{occupancy_distance, occupancy_grid, BoardState};
pub use decode::DecodedPly;
pub use error::{ChessError, ChessResult};
