//! Multi-ply decode scenarios exercising `BoardState`, `occupancy_grid`, and
//! `decode::photometric::decode` together, the way a full run's Stage C/D
//! handoff actually chains them.

use otbscribe_chess::board::{occupancy_grid, BoardState};
use otbscribe_chess::decode::photometric::decode;
use otbscribe_models::game::GameResult;
use otbscribe_models::observation::PhotometricObs;
use otbscribe_models::Orientation;
use shakmaty::san::San;
use shakmaty::{Chess, Move};

const ORIENTATION: Orientation = Orientation::WhiteBottom;

/// Find the legal move from `position` whose SAN rendering is `target`.
fn legal_move_by_san(position: &Chess, target: &str) -> Move {
    use shakmaty::Position;
    position
        .legal_moves()
        .iter()
        .find(|m| San::from_move(position, m).to_string() == target)
        .cloned()
        .unwrap_or_else(|| panic!("{target} is not legal from this position"))
}

/// Play an entire SAN sequence from the start, capturing one
/// `PhotometricObs` per position (including the starting position itself, so
/// frame 0 is the calibration frame per `decode`'s contract).
fn frames_for_sequence(sans: &[&str]) -> (BoardState, Vec<PhotometricObs>) {
    let mut board = BoardState::new();
    let mut frames = vec![PhotometricObs {
        frame_index: 0,
        cells: occupancy_grid(board.position(), ORIENTATION),
        confidence: [[1.0; 8]; 8],
    }];

    for (i, san) in sans.iter().enumerate() {
        let mv = legal_move_by_san(board.position(), san);
        board.push(&mv).expect("move drawn from legal_moves");
        frames.push(PhotometricObs {
            frame_index: i + 1,
            cells: occupancy_grid(board.position(), ORIENTATION),
            confidence: [[1.0; 8]; 8],
        });
    }
    (board, frames)
}

#[test]
fn three_ply_opening_decodes_in_order() {
    let (_, frames) = frames_for_sequence(&["e4", "e5", "Nf3"]);
    let (_, plies) = decode(&frames, ORIENTATION);

    assert_eq!(plies.len(), 3);
    assert_eq!(plies[0].san, "e4");
    assert_eq!(plies[0].uci, "e2e4");
    assert_eq!(plies[1].san, "e5");
    assert_eq!(plies[2].san, "Nf3");
    for p in &plies {
        assert!(!p.uncertain);
    }
}

#[test]
fn scholars_mate_ends_in_checkmate_with_white_winning() {
    let sans = ["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"];
    let (board, frames) = frames_for_sequence(&sans);
    let (final_board, plies) = decode(&frames, ORIENTATION);

    assert_eq!(plies.len(), sans.len());
    assert_eq!(plies.last().unwrap().san, "Qxf7#");
    assert!(board.is_game_over());
    assert!(final_board.is_game_over());
    assert_eq!(final_board.terminal_result(), GameResult::WhiteWins);
}

#[test]
fn fewer_than_two_frames_yields_no_moves() {
    let board = BoardState::new();
    let only_frame = PhotometricObs {
        frame_index: 0,
        cells: occupancy_grid(board.position(), ORIENTATION),
        confidence: [[1.0; 8]; 8],
    };
    let (_, plies) = decode(&[only_frame], ORIENTATION);
    assert!(plies.is_empty());
}
