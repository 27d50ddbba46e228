//! Tag-id-to-piece mapping for Tag mode (spec §3 "PieceMap").

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role, Square};

use crate::error::{ModelError, ModelResult};

/// One entry in a `PieceMap`: which piece a tag id represents and where it
/// starts on the board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct PieceMapEntry {
    pub tag_id: u32,
    pub role: RoleDef,
    pub color: ColorDef,
    pub initial_square: SquareDef,
}

/// Serializable mirror of `shakmaty::Role`, since `shakmaty` types don't
/// derive `schemars::JsonSchema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoleDef {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl From<RoleDef> for Role {
    fn from(r: RoleDef) -> Role {
        match r {
            RoleDef::Pawn => Role::Pawn,
            RoleDef::Knight => Role::Knight,
            RoleDef::Bishop => Role::Bishop,
            RoleDef::Rook => Role::Rook,
            RoleDef::Queen => Role::Queen,
            RoleDef::King => Role::King,
        }
    }
}

/// Serializable mirror of `shakmaty::Color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColorDef {
    White,
    Black,
}

impl From<ColorDef> for Color {
    fn from(c: ColorDef) -> Color {
        match c {
            ColorDef::White => Color::White,
            ColorDef::Black => Color::Black,
        }
    }
}

/// Serializable mirror of `shakmaty::Square`, stored as algebraic notation
/// (e.g. `"e4"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SquareDef(pub String);

impl SquareDef {
    /// Parse into a `shakmaty::Square`, failing only if this value was
    /// constructed by hand from malformed input (map-loading validates this
    /// up front).
    pub fn to_square(&self) -> ModelResult<Square> {
        self.0
            .parse::<Square>()
            .map_err(|_| ModelError::InvalidPieceMap(format!("bad square '{}'", self.0)))
    }
}

impl From<Square> for SquareDef {
    fn from(sq: Square) -> Self {
        Self(sq.to_string())
    }
}

/// Bijection from tag id to `(piece kind, color, initial square)`, fixed per
/// run. Required invariant: 32 entries, distinct ids, distinct initial
/// squares forming a valid starting position (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PieceMap {
    entries: Vec<PieceMapEntry>,
}

impl PieceMap {
    /// Validate and construct a `PieceMap` from its entries.
    pub fn new(entries: Vec<PieceMapEntry>) -> ModelResult<Self> {
        if entries.len() != 32 {
            return Err(ModelError::InvalidPieceMap(format!(
                "expected 32 entries, got {}",
                entries.len()
            )));
        }

        let mut ids = HashSet::new();
        let mut squares = HashSet::new();
        for entry in &entries {
            if !ids.insert(entry.tag_id) {
                return Err(ModelError::InvalidPieceMap(format!(
                    "duplicate tag id {}",
                    entry.tag_id
                )));
            }
            let sq = entry.initial_square.to_square()?;
            if !squares.insert(sq) {
                return Err(ModelError::InvalidPieceMap(format!(
                    "duplicate initial square {}",
                    entry.initial_square.0
                )));
            }
        }

        let map = Self { entries };
        map.validate_starting_position()?;
        Ok(map)
    }

    fn validate_starting_position(&self) -> ModelResult<()> {
        use shakmaty::Position;

        let expected = shakmaty::Chess::default();
        let expected = expected.board();

        for entry in &self.entries {
            let sq = entry.initial_square.to_square()?;
            let role: Role = entry.role.into();
            let color: Color = entry.color.into();
            let expected_piece = expected.piece_at(sq).ok_or_else(|| {
                ModelError::InvalidPieceMap(format!(
                    "square {} is empty in the standard starting position",
                    entry.initial_square.0
                ))
            })?;
            if expected_piece.role != role || expected_piece.color != color {
                return Err(ModelError::InvalidPieceMap(format!(
                    "square {} holds {:?} {:?} in the starting position, not {:?} {:?}",
                    entry.initial_square.0,
                    expected_piece.color,
                    expected_piece.role,
                    color,
                    role
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> &[PieceMapEntry] {
        &self.entries
    }

    #[must_use]
    pub fn role_and_color(&self, tag_id: u32) -> Option<(Role, Color)> {
        self.entries
            .iter()
            .find(|e| e.tag_id == tag_id)
            .map(|e| (e.role.into(), e.color.into()))
    }

    #[must_use]
    pub fn initial_square(&self, tag_id: u32) -> Option<Square> {
        self.entries
            .iter()
            .find(|e| e.tag_id == tag_id)
            .and_then(|e| e.initial_square.to_square().ok())
    }
}
