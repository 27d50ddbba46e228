//! Canonical board state: a thin wrapper over `shakmaty::Chess` used by both
//! decoders to enumerate legal moves and derive expected occupancy grids
//! (spec §4.D).

use otbscribe_models::frame::cell_to_square;
use otbscribe_models::observation::SquareColor;
use otbscribe_models::Orientation;
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, MoveList, Position};

use crate::error::{ChessError, ChessResult};

/// The canonical reconstructed position, advanced one ply at a time as moves
/// are decoded. Always a legal `shakmaty::Chess` position.
#[derive(Debug, Clone)]
pub struct BoardState {
    position: Chess,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardState {
    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Chess::default(),
        }
    }

    /// Wrap an already-constructed legal position (used by Tag mode's
    /// decoder to start from a `PieceMap`'s initial layout).
    #[must_use]
    pub fn from_position(position: Chess) -> Self {
        Self { position }
    }

    #[must_use]
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// Every legal move from the current position.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        self.position.legal_moves()
    }

    /// Whether `m` is legal from the current position.
    #[must_use]
    pub fn is_legal(&self, m: &Move) -> bool {
        self.legal_moves().iter().any(|legal| legal == m)
    }

    /// The occupancy grid that would result from playing `m` without
    /// mutating `self` (spec §4.D.1 step 2, "expected occupancy").
    #[must_use]
    pub fn expected_occupancy(&self, m: &Move, orientation: Orientation) -> [[SquareColor; 8]; 8] {
        let mut scratch = self.position.clone();
        scratch.play_unchecked(m);
        occupancy_grid(&scratch, orientation)
    }

    /// Play `m`, advancing the canonical board. Returns the move's SAN and
    /// UCI text as rendered *before* the push (SAN depends on the position
    /// the move is played from).
    pub fn push(&mut self, m: &Move) -> ChessResult<(String, String)> {
        if !self.is_legal(m) {
            return Err(ChessError::IllegalMove(format!("{m:?}")));
        }
        let san = San::from_move(&self.position, m).to_string();
        let uci = m.clone().to_uci(CastlingMode::Standard).to_string();
        self.position.play_unchecked(m);
        Ok((san, uci))
    }

    /// FEN of the current position, including the en passant square when
    /// legally relevant (spec §6 `moves.json`'s `fen` field).
    #[must_use]
    pub fn fen(&self) -> String {
        fen_of(&self.position)
    }

    /// True once no legal moves remain (checkmate or stalemate; spec §6
    /// `game.pgn`'s terminal `Result` tags).
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.legal_moves().is_empty()
    }

    /// The PGN `Result` tag this position implies, or `Ongoing` if play
    /// could continue (spec §6 `game.pgn`: "mate: 1-0/0-1;
    /// stalemate/insufficient/75-move: 1/2-1/2").
    #[must_use]
    pub fn terminal_result(&self) -> otbscribe_models::game::GameResult {
        use otbscribe_models::game::GameResult;
        use shakmaty::Color;

        if self.legal_moves().is_empty() {
            if self.position.is_check() {
                return match self.position.turn() {
                    Color::White => GameResult::BlackWins,
                    Color::Black => GameResult::WhiteWins,
                };
            }
            return GameResult::Draw;
        }
        if self.position.is_insufficient_material() || self.position.halfmoves() >= 150 {
            return GameResult::Draw;
        }
        GameResult::Ongoing
    }
}

/// FEN text for an arbitrary legal position.
#[must_use]
pub fn fen_of(position: &Chess) -> String {
    Fen(position.clone().into_setup(EnPassantMode::Legal)).to_string()
}

/// Project `position` onto an 8×8 photometric occupancy grid under `orientation`
/// (spec §4.C.1, §4.D.1): each piece is labeled by [`SquareColor::from_piece_color`].
#[must_use]
pub fn occupancy_grid(position: &Chess, orientation: Orientation) -> [[SquareColor; 8]; 8] {
    let mut grid = [[SquareColor::Empty; 8]; 8];
    for (row, row_cells) in grid.iter_mut().enumerate() {
        for (col, cell) in row_cells.iter_mut().enumerate() {
            let square = cell_to_square(row, col, orientation);
            *cell = match position.board().piece_at(square) {
                None => SquareColor::Empty,
                Some(piece) => SquareColor::from_piece_color(piece.color),
            };
        }
    }
    grid
}

/// Hamming distance between two occupancy grids (spec §4.D.1 step 3): the
/// count of cells whose classification differs.
#[must_use]
pub fn occupancy_distance(a: &[[SquareColor; 8]; 8], b: &[[SquareColor; 8]; 8]) -> f64 {
    let mut diff = 0usize;
    for row in 0..8 {
        for col in 0..8 {
            if a[row][col] != b[row][col] {
                diff += 1;
            }
        }
    }
    diff as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_has_twenty_legal_moves() {
        let board = BoardState::new();
        assert_eq!(board.legal_moves().len(), 20);
    }

    #[test]
    fn push_e4_advances_and_renders_san() {
        let mut board = BoardState::new();
        let m = board
            .legal_moves()
            .iter()
            .find(|m| m.to().file() == shakmaty::File::E && m.to().rank() == shakmaty::Rank::Fourth)
            .cloned()
            .expect("e4 is legal from the start");
        let (san, uci) = board.push(&m).unwrap();
        assert_eq!(san, "e4");
        assert_eq!(uci, "e2e4");
        assert!(board.fen().starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR"));
    }

    #[test]
    fn occupancy_distance_zero_for_identical_grids() {
        let board = BoardState::new();
        let grid = occupancy_grid(board.position(), Orientation::WhiteBottom);
        assert_eq!(occupancy_distance(&grid, &grid), 0.0);
    }

    #[test]
    fn starting_grid_has_no_empty_middle_ranks_mislabeled() {
        let board = BoardState::new();
        let grid = occupancy_grid(board.position(), Orientation::WhiteBottom);
        // Rows 2..=5 (ranks 3-6) are empty at the start.
        for row in 2..=5 {
            for col in 0..8 {
                assert_eq!(grid[row][col], SquareColor::Empty);
            }
        }
        // Row 7 (rank 1, White's back rank) is bottom under WhiteBottom and
        // labeled Dark per the Phase B calibration convention.
        for col in 0..8 {
            assert_eq!(grid[7][col], SquareColor::Dark);
        }
        for col in 0..8 {
            assert_eq!(grid[0][col], SquareColor::Light);
        }
    }
}
