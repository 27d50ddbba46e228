//! Per-square observations: photometric occupancy/color or tag identity
//! (spec §3 "Observation", §4.C).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Classification of a single square under photometric observation
/// (spec §4.C.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SquareColor {
    Empty,
    Light,
    Dark,
}

/// One photometric observation of a rectified board: an 8×8 grid of
/// empty/light/dark classifications plus per-cell confidence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PhotometricObs {
    pub frame_index: usize,
    pub cells: [[SquareColor; 8]; 8],
    pub confidence: [[f64; 8]; 8],
}

impl SquareColor {
    /// The photometric label a piece of `color` is expected to carry.
    ///
    /// Phase B calibration samples ranks 1-2 as the "dark" population and
    /// ranks 7-8 as the "light" population (spec §4.C.1); since the
    /// starting position has White on ranks 1-2, a White piece is labeled
    /// `Dark` and a Black piece `Light`. This is a fixed photometric
    /// convention, not a claim about true piece color, and both the
    /// observer and the decoder must agree on it.
    #[must_use]
    pub fn from_piece_color(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => SquareColor::Dark,
            shakmaty::Color::Black => SquareColor::Light,
        }
    }
}

impl PhotometricObs {
    /// Number of cells classified as `Empty`, used to validate calibration
    /// frames (spec §8: "on calibration frame, the number of empty cells
    /// detected is ≥ 32 − ε").
    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| **c == SquareColor::Empty)
            .count()
    }
}

/// A single fiducial tag detection on a rectified board (spec §4.C.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct TagDetection {
    pub id: u32,
    pub row: usize,
    pub col: usize,
    pub center: (f64, f64),
    pub area: f64,
    pub decode_margin: f64,
    pub border_penalty: f64,
    pub score: f64,
}

/// A conflict-resolution log entry: either two ids competing for one cell,
/// or one id detected in two cells (spec §4.C.2 step 4).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum TagConflict {
    /// Two detections landed in the same cell; `discarded_id` lost.
    Cell {
        row: usize,
        col: usize,
        kept_id: u32,
        discarded_id: u32,
        kept_score: f64,
        discarded_score: f64,
    },
    /// One id was detected in two cells; `discarded_cell` lost.
    Id {
        marker_id: u32,
        kept_cell: (usize, usize),
        discarded_cell: (usize, usize),
        kept_score: f64,
        discarded_score: f64,
    },
}

/// One tag-based observation of a rectified board: an 8×8 id grid (0 = no
/// piece) plus the raw detections and resolved conflicts (spec §4.C.2).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TagObs {
    pub frame_index: usize,
    pub ids: [[u32; 8]; 8],
    pub detections: Vec<TagDetection>,
    pub conflicts: Vec<TagConflict>,
    pub warnings: Vec<String>,
}

impl TagObs {
    /// Number of distinct non-zero ids present in the grid.
    #[must_use]
    pub fn unique_id_count(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        for row in &self.ids {
            for &id in row {
                if id != 0 {
                    seen.insert(id);
                }
            }
        }
        seen.len()
    }

    /// `(row, col)` of the given id, if present.
    #[must_use]
    pub fn position_of(&self, id: u32) -> Option<(usize, usize)> {
        for (row, cells) in self.ids.iter().enumerate() {
            for (col, &cell_id) in cells.iter().enumerate() {
                if cell_id == id {
                    return Some((row, col));
                }
            }
        }
        None
    }
}

/// One observation of a rectified board, tagged by which observer produced
/// it (spec §3 "Observation").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    Photometric(PhotometricObs),
    Tag(TagObs),
}

impl Observation {
    #[must_use]
    pub fn frame_index(&self) -> usize {
        match self {
            Self::Photometric(o) => o.frame_index,
            Self::Tag(o) => o.frame_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_count_ignores_zero() {
        let mut ids = [[0u32; 8]; 8];
        ids[0][0] = 5;
        ids[7][7] = 5; // duplicate id, shouldn't happen post-conflict-resolution
        ids[3][3] = 9;
        let obs = TagObs {
            frame_index: 0,
            ids,
            detections: vec![],
            conflicts: vec![],
            warnings: vec![],
        };
        assert_eq!(obs.unique_id_count(), 2);
    }

    #[test]
    fn white_pieces_label_dark() {
        assert_eq!(
            SquareColor::from_piece_color(shakmaty::Color::White),
            SquareColor::Dark
        );
        assert_eq!(
            SquareColor::from_piece_color(shakmaty::Color::Black),
            SquareColor::Light
        );
    }
}
