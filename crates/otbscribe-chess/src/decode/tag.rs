//! Identity-tracking decoder: ported from the reference pipeline's
//! `tag_decode.py::infer_moves_from_id_grids` (spec §4.D.2).
//!
//! Unlike the original, a capture is not a dead end: since the mover's
//! `(from, to)` pair alone determines a unique legal move regardless of
//! whether it is an ordinary capture or an en passant capture (shakmaty's
//! move representation distinguishes them internally from the same
//! `(from, to)` pair), both collapse to one code path here, validated
//! against the canonical board's legal set just like every other case.

use std::collections::HashMap;

use otbscribe_models::frame::cell_to_square;
use otbscribe_models::observation::TagObs;
use otbscribe_models::{Orientation, PieceMap};
use shakmaty::{Move, Rank, Role, Square};

use crate::board::BoardState;
use crate::decode::DecodedPly;

/// Result of decoding a Tag-mode sequence: the canonical board at the end,
/// the decoded plies, and any warnings raised along the way (spec §4.D.2
/// step 1, "mismatches become warnings").
pub struct TagDecodeResult {
    pub board: BoardState,
    pub plies: Vec<DecodedPly>,
    pub warnings: Vec<String>,
}

/// Decode an ordered sequence of `TagObs` grids into plies, given the
/// tag-to-piece `piece_map`. `piece_map` has already been validated to
/// represent the standard starting position, so the canonical board starts
/// from `BoardState::new()`.
#[must_use]
pub fn decode(observations: &[TagObs], piece_map: &PieceMap, orientation: Orientation) -> TagDecodeResult {
    let mut board = BoardState::new();
    let mut plies = Vec::new();
    let mut warnings = Vec::new();

    if observations.is_empty() {
        return TagDecodeResult {
            board,
            plies,
            warnings,
        };
    }

    let mut prev_positions = grid_to_positions(&observations[0], orientation);
    check_matches_map(&prev_positions, piece_map, orientation, &mut warnings);

    for (step, obs) in observations.iter().enumerate().skip(1) {
        let ply = step - 1;
        let curr_positions = grid_to_positions(obs, orientation);

        let mut moved_ids: Vec<u32> = prev_positions
            .keys()
            .chain(curr_positions.keys())
            .copied()
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .filter(|id| prev_positions.get(id) != curr_positions.get(id))
            .collect();
        moved_ids.sort_unstable();

        let chosen = castling_move(&moved_ids, &prev_positions, &curr_positions, piece_map, &board)
            .or_else(|| single_mover_move(&moved_ids, &prev_positions, &curr_positions, piece_map, &board));

        match chosen {
            Some(m) if board.is_legal(&m) => {
                let mut b = board.clone();
                let (san, uci) = b.push(&m).expect("checked legal above");
                let fen_after = b.fen();
                board = b;
                plies.push(DecodedPly {
                    ply,
                    san,
                    uci,
                    fen_after,
                    uncertain: false,
                    candidates: vec![],
                });
            }
            _ => {
                plies.push(DecodedPly::uncertain_placeholder(ply, board.fen()));
            }
        }

        prev_positions = curr_positions;
    }

    TagDecodeResult {
        board,
        plies,
        warnings,
    }
}

fn grid_to_positions(obs: &TagObs, orientation: Orientation) -> HashMap<u32, Square> {
    let mut positions = HashMap::new();
    for (row, cells) in obs.ids.iter().enumerate() {
        for (col, &id) in cells.iter().enumerate() {
            if id == 0 {
                continue;
            }
            positions.insert(id, cell_to_square(row, col, orientation));
        }
    }
    positions
}

fn check_matches_map(
    positions: &HashMap<u32, Square>,
    piece_map: &PieceMap,
    _orientation: Orientation,
    warnings: &mut Vec<String>,
) {
    for entry in piece_map.entries() {
        let expected = entry.initial_square.to_square().ok();
        match (expected, positions.get(&entry.tag_id)) {
            (Some(expected_sq), Some(observed_sq)) if expected_sq == *observed_sq => {}
            (Some(expected_sq), observed) => {
                warnings.push(format!(
                    "tag {} expected at {} but observed at {:?}",
                    entry.tag_id, expected_sq, observed
                ));
            }
            (None, _) => {}
        }
    }
}

/// |M| = 2, both ids kept, king+rook of the same color landing on the
/// canonical castling squares (spec §4.D.2 case 3).
fn castling_move(
    moved_ids: &[u32],
    prev: &HashMap<u32, Square>,
    curr: &HashMap<u32, Square>,
    piece_map: &PieceMap,
    board: &BoardState,
) -> Option<Move> {
    if moved_ids.len() != 2 {
        return None;
    }
    let mut king_id = None;
    let mut rook_id = None;
    for &id in moved_ids {
        match piece_map.role_and_color(id) {
            Some((Role::King, _)) => king_id = Some(id),
            Some((Role::Rook, _)) => rook_id = Some(id),
            _ => {}
        }
    }
    let king_id = king_id?;
    let rook_id = rook_id?;

    let king_from = *prev.get(&king_id)?;
    let king_to = *curr.get(&king_id)?;
    let rook_from = *prev.get(&rook_id)?;
    let rook_to = *curr.get(&rook_id)?;

    let canonical = [
        (Square::E1, Square::G1, Square::H1, Square::F1),
        (Square::E1, Square::C1, Square::A1, Square::D1),
        (Square::E8, Square::G8, Square::H8, Square::F8),
        (Square::E8, Square::C8, Square::A8, Square::D8),
    ];
    canonical
        .into_iter()
        .find(|&(kf, kt, rf, rt)| king_from == kf && king_to == kt && rook_from == rf && rook_to == rt)
        .and_then(|(kf, _kt, rf, _rt)| find_castle_move(board, kf, rf))
}

/// A castling move is `Move::Castle { king, rook }` in shakmaty, whose
/// `from()`/`to()` report the king's and the *rook's* origin squares
/// respectively (H1/A1/H8/A8), not the king's destination — unlike every
/// other move kind. Rendering to UCI (`e1g1`) is where the king's
/// destination actually appears, via `CastlingMode::Standard`.
fn find_castle_move(board: &BoardState, king_from: Square, rook_from: Square) -> Option<Move> {
    board
        .legal_moves()
        .iter()
        .find(|m| m.from() == Some(king_from) && m.to() == rook_from && m.is_castle())
        .cloned()
}

/// |M| = 1 (a piece moved), or |M| = 2 with one id vanishing (a capture —
/// ordinary or en passant, both resolved the same way; spec §4.D.2 cases
/// 1, 2, and 4).
fn single_mover_move(
    moved_ids: &[u32],
    prev: &HashMap<u32, Square>,
    curr: &HashMap<u32, Square>,
    piece_map: &PieceMap,
    board: &BoardState,
) -> Option<Move> {
    let mover_id = match moved_ids {
        [single] => Some(*single),
        [a, b] => {
            let a_vanished = !curr.contains_key(a);
            let b_vanished = !curr.contains_key(b);
            match (a_vanished, b_vanished) {
                (true, false) => Some(*b),
                (false, true) => Some(*a),
                _ => None,
            }
        }
        _ => None,
    }?;

    let from = *prev.get(&mover_id)?;
    let to = *curr.get(&mover_id)?;
    let (role, _color) = piece_map.role_and_color(mover_id)?;

    let promotion = if role == Role::Pawn && (to.rank() == Rank::First || to.rank() == Rank::Eighth) {
        Some(Role::Queen)
    } else {
        None
    };

    find_legal_move(board, from, to, promotion)
}

fn find_legal_move(board: &BoardState, from: Square, to: Square, promotion: Option<Role>) -> Option<Move> {
    board
        .legal_moves()
        .iter()
        .find(|m| m.from() == Some(from) && m.to() == to && m.promotion() == promotion)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use otbscribe_models::observation::TagObs;
    use otbscribe_models::piece_map::{ColorDef, PieceMapEntry, RoleDef, SquareDef};

    fn standard_piece_map() -> PieceMap {
        let mut entries = Vec::new();
        let back_rank = [
            RoleDef::Rook,
            RoleDef::Knight,
            RoleDef::Bishop,
            RoleDef::Queen,
            RoleDef::King,
            RoleDef::Bishop,
            RoleDef::Knight,
            RoleDef::Rook,
        ];
        let mut id = 1;
        for (file, role) in back_rank.iter().enumerate() {
            entries.push(PieceMapEntry {
                tag_id: id,
                role: *role,
                color: ColorDef::White,
                initial_square: SquareDef(format!("{}1", (b'a' + file as u8) as char)),
            });
            id += 1;
        }
        for file in 0..8 {
            entries.push(PieceMapEntry {
                tag_id: id,
                role: RoleDef::Pawn,
                color: ColorDef::White,
                initial_square: SquareDef(format!("{}2", (b'a' + file as u8) as char)),
            });
            id += 1;
        }
        for (file, role) in back_rank.iter().enumerate() {
            entries.push(PieceMapEntry {
                tag_id: id,
                role: *role,
                color: ColorDef::Black,
                initial_square: SquareDef(format!("{}8", (b'a' + file as u8) as char)),
            });
            id += 1;
        }
        for file in 0..8 {
            entries.push(PieceMapEntry {
                tag_id: id,
                role: RoleDef::Pawn,
                color: ColorDef::Black,
                initial_square: SquareDef(format!("{}7", (b'a' + file as u8) as char)),
            });
            id += 1;
        }
        PieceMap::new(entries).unwrap()
    }

    fn grid_from_map(map: &PieceMap, orientation: Orientation) -> [[u32; 8]; 8] {
        let mut ids = [[0u32; 8]; 8];
        for entry in map.entries() {
            let sq = entry.initial_square.to_square().unwrap();
            let (row, col) = otbscribe_models::frame::square_to_cell(sq, orientation);
            ids[row][col] = entry.tag_id;
        }
        ids
    }

    fn obs(frame_index: usize, ids: [[u32; 8]; 8]) -> TagObs {
        TagObs {
            frame_index,
            ids,
            detections: vec![],
            conflicts: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn single_pawn_push_decodes() {
        let map = standard_piece_map();
        let orientation = Orientation::WhiteBottom;
        let mut ids = grid_from_map(&map, orientation);
        // e2 pawn (tag id 13, first pawn id after the 8 back-rank pieces) to e4.
        let e2 = "e2".parse::<Square>().unwrap();
        let e4 = "e4".parse::<Square>().unwrap();
        let (r0, c0) = otbscribe_models::frame::square_to_cell(e2, orientation);
        let (r1, c1) = otbscribe_models::frame::square_to_cell(e4, orientation);
        let pawn_id = ids[r0][c0];
        ids[r0][c0] = 0;
        ids[r1][c1] = pawn_id;

        let result = decode(&[obs(0, grid_from_map(&map, orientation)), obs(1, ids)], &map, orientation);
        assert_eq!(result.plies.len(), 1);
        assert_eq!(result.plies[0].san, "e4");
        assert!(!result.plies[0].uncertain);
    }

    #[test]
    fn castling_move_matches_king_and_rook_on_canonical_squares() {
        // A minimal position where O-O is immediately legal, so the helper
        // can be exercised without replaying an opening sequence through
        // the full decoder (which always starts from the standard position).
        let fen = "4k3/8/8/8/8/8/8/4K2R w K - 0 1";
        let setup = shakmaty::fen::Fen::from_ascii(fen.as_bytes())
            .unwrap()
            .into_position(shakmaty::CastlingMode::Standard)
            .unwrap();
        let board = BoardState::from_position(setup);

        let map = standard_piece_map();
        let king_id = 5; // e1 king, per standard_piece_map's back-rank ordering
        let rook_id = 8; // h1 rook

        let mut prev = HashMap::new();
        prev.insert(king_id, Square::E1);
        prev.insert(rook_id, Square::H1);
        let mut curr = HashMap::new();
        curr.insert(king_id, Square::G1);
        curr.insert(rook_id, Square::F1);

        let m = castling_move(&[king_id, rook_id], &prev, &curr, &map, &board)
            .expect("O-O should be found");
        assert!(board.is_legal(&m));
        assert_eq!(m.to_uci(shakmaty::CastlingMode::Standard).to_string(), "e1g1");
    }

    #[test]
    fn black_queenside_castle_matches_by_rook_origin_not_king_destination() {
        let fen = "r3k3/8/8/8/8/8/8/4K3 b q - 0 1";
        let setup = shakmaty::fen::Fen::from_ascii(fen.as_bytes())
            .unwrap()
            .into_position(shakmaty::CastlingMode::Standard)
            .unwrap();
        let board = BoardState::from_position(setup);

        let map = standard_piece_map();
        let king_id = 21; // e8 king, per standard_piece_map's back-rank ordering
        let rook_id = 17; // a8 rook

        let mut prev = HashMap::new();
        prev.insert(king_id, Square::E8);
        prev.insert(rook_id, Square::A8);
        let mut curr = HashMap::new();
        curr.insert(king_id, Square::C8);
        curr.insert(rook_id, Square::D8);

        let m = castling_move(&[king_id, rook_id], &prev, &curr, &map, &board)
            .expect("O-O-O should be found");
        assert!(board.is_legal(&m));
        assert_eq!(m.to_uci(shakmaty::CastlingMode::Standard).to_string(), "e8c8");
    }
}
