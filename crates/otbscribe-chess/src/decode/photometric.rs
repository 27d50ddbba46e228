//! Legality-constrained decoder: ported from the reference pipeline's
//! `decode.py::_find_best_move` Hamming-distance scoring over every legal
//! move (spec §4.D.1).

use otbscribe_models::game::Candidate;
use otbscribe_models::observation::PhotometricObs;
use otbscribe_models::Orientation;
use shakmaty::san::San;

use crate::board::{occupancy_distance, BoardState};
use crate::decode::DecodedPly;

/// Margin (in grid-cell equivalents) below which the top two candidates are
/// considered indistinguishable (spec §4.D.1 step 4).
const UNCERTAINTY_MARGIN: f64 = 0.1;

/// Decode a full ordered sequence of photometric observations into plies,
/// starting from the standard opening position. The first observation is
/// treated as the calibration/starting frame and is not itself decoded into
/// a move (spec §8 scenario 1: a single stable frame yields zero moves).
#[must_use]
pub fn decode(observations: &[PhotometricObs], orientation: Orientation) -> (BoardState, Vec<DecodedPly>) {
    let mut board = BoardState::new();
    let mut plies = Vec::new();

    for (step, obs) in observations.iter().enumerate().skip(1) {
        let ply = step - 1;
        let legal = board.legal_moves();
        if legal.is_empty() {
            break;
        }

        let mut scored: Vec<(shakmaty::Move, f64)> = legal
            .iter()
            .map(|m| {
                let expected = board.expected_occupancy(m, orientation);
                let score = occupancy_distance(&expected, &obs.cells);
                (m.clone(), score)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let (best_move, best_score) = scored[0].clone();
        let uncertain = scored.len() > 1 && (scored[1].1 - best_score) < UNCERTAINTY_MARGIN;

        let candidates: Vec<Candidate> = scored
            .iter()
            .take(3)
            .map(|(m, score)| Candidate {
                san: San::from_move(board.position(), m).to_string(),
                score: *score,
            })
            .collect();

        let (san, uci) = board
            .push(&best_move)
            .expect("best_move was drawn from board.legal_moves()");
        let fen_after = board.fen();

        plies.push(DecodedPly {
            ply,
            san,
            uci,
            fen_after,
            uncertain,
            candidates,
        });
    }

    (board, plies)
}
