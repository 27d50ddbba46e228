//! Per-ply engine annotation: evaluation, classification, and key-ply
//! selection (spec §4.E).
//!
//! A two-query pattern (evaluate the position before the move, then after
//! it) feeding key-ply selection (last book move, max |Δeval|, every
//! mistake/blunder, deduplicated and sorted).

use otbscribe_models::game::{Classification, Eval, MoveRecord};
use tracing::{instrument, warn};

use crate::client::{UciClient, UciInfo};
use crate::error::EngineResult;

/// Centipawn-loss thresholds for each classification (spec §4.E step 4).
const GOOD_MAX: i32 = 50;
const INACCURACY_MAX: i32 = 100;
const MISTAKE_MAX: i32 = 200;

/// Classify a move by centipawn loss (spec §4.E step 4): `best` at `<= 0`,
/// then `good`/`inaccuracy`/`mistake` at widening thresholds, else `blunder`.
#[must_use]
pub fn classify(cp_loss: i32) -> Classification {
    if cp_loss <= 0 {
        Classification::Best
    } else if cp_loss <= GOOD_MAX {
        Classification::Good
    } else if cp_loss <= INACCURACY_MAX {
        Classification::Inaccuracy
    } else if cp_loss <= MISTAKE_MAX {
        Classification::Mistake
    } else {
        Classification::Blunder
    }
}

/// A small static set of common opening FEN piece-placement prefixes, used
/// for the optional `book` classification (spec §4.E step 4: "book: if
/// fen-prefix matches a static opening set (optional)"). Matched against the
/// piece-placement field only (FEN's first space-delimited field), since an
/// opening is reached at the same placement regardless of clock fields.
const BOOK_PLACEMENTS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR",
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR",
    "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR",
    "rnbqkbnr/ppp1pppp/8/3p4/3P4/8/PPP1PPPP/RNBQKBNR",
    "rnbqkbnr/pppppppp/8/8/2P5/8/PP1PPPPP/RNBQKBNR",
    "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R",
    "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R",
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R",
];

/// Whether `fen`'s piece-placement field matches a known opening (spec
/// §4.E step 4, "book").
#[must_use]
pub fn is_book_position(fen: &str) -> bool {
    let placement = fen.split(' ').next().unwrap_or("");
    BOOK_PLACEMENTS.contains(&placement)
}

/// Convert a UCI score to a single centipawn-equivalent figure, substituting
/// a large constant for mate distances (ported from
/// `stockfish_module.py`'s `score.white().score(mate_score=100000)`).
fn cp_with_mate(info: &UciInfo) -> Option<i32> {
    if let Some(mate) = info.score_mate {
        Some(if mate >= 0 { 100_000 } else { -100_000 })
    } else {
        info.score_cp
    }
}

/// `cp_loss = eval_before_from_mover − eval_after_from_mover` (spec §4.E
/// step 3). Both `before` and `after` are raw UCI scores, each already from
/// the perspective of whichever side is to move in the position queried; at
/// `fen_before` that's the mover, and at `fen_after` it's the opponent, so
/// the mover's post-move evaluation is `-after`. Summing rather than
/// subtracting `-after` is algebraically the same thing, just avoiding an
/// intermediate negation.
fn cp_loss_of(before: &UciInfo, after: &UciInfo) -> Option<i32> {
    let before_cp = cp_with_mate(before)?;
    let after_cp = cp_with_mate(after)?;
    Some(before_cp + after_cp)
}

/// The evaluation recorded on a `MoveRecord`: the position immediately
/// after this ply, from the mover's perspective (spec §3 "MoveRecord",
/// `Eval` doc comment).
fn eval_after_from_mover(after: &UciInfo) -> Eval {
    if let Some(mate) = after.score_mate {
        Eval::Mate(-mate)
    } else if let Some(cp) = after.score_cp {
        Eval::Centipawns(-cp)
    } else {
        Eval::Unknown
    }
}

/// A decoded ply plus the FEN the board was in immediately before it was
/// played, as the two-query annotation algorithm needs both (spec §4.E
/// step 2).
#[derive(Debug, Clone)]
pub struct PlyToAnnotate {
    pub ply: usize,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
}

/// Drives one [`UciClient`] across a full game's plies, producing
/// classified [`MoveRecord`]s (spec §4.E).
pub struct Annotator<'a> {
    client: &'a mut UciClient,
    depth: u32,
    pv_length: usize,
}

impl<'a> Annotator<'a> {
    #[must_use]
    pub fn new(client: &'a mut UciClient, depth: u32, pv_length: usize) -> Self {
        Self {
            client,
            depth,
            pv_length,
        }
    }

    /// Annotate every ply in order. A ply whose engine queries time out or
    /// whose engine becomes unavailable mid-run gets `eval: Unknown`,
    /// `classification: Unknown`, and no `cp_loss`, rather than aborting the
    /// run (spec §4.E "Failure": the annotator is optional).
    #[instrument(skip(self, plies))]
    pub async fn annotate(&mut self, plies: &[PlyToAnnotate]) -> Vec<MoveRecord> {
        let mut records = Vec::with_capacity(plies.len());
        for ply in plies {
            records.push(self.annotate_one(ply).await);
        }
        records
    }

    async fn annotate_one(&mut self, ply: &PlyToAnnotate) -> MoveRecord {
        let before_res = self.query(&ply.fen_before).await;
        let after_res = self.query(&ply.fen_after).await;

        let pv: Vec<String> = after_res
            .as_ref()
            .map(|info| info.pv.iter().take(self.pv_length).cloned().collect())
            .unwrap_or_default();

        let (eval, cp_loss, classification) = match (&before_res, &after_res) {
            (Ok(before), Ok(after)) => {
                let eval = eval_after_from_mover(after);
                let loss = cp_loss_of(before, after);
                let classification = if is_book_position(&ply.fen_after) {
                    Classification::Book
                } else {
                    loss.map_or(Classification::Unknown, classify)
                };
                (eval, loss, classification)
            }
            _ => {
                warn!(ply = ply.ply, "engine annotation unavailable for this ply");
                (Eval::Unknown, None, Classification::Unknown)
            }
        };

        MoveRecord {
            ply: ply.ply,
            san: ply.san.clone(),
            uci: ply.uci.clone(),
            fen_after: ply.fen_after.clone(),
            eval,
            pv,
            classification,
            cp_loss,
            uncertain: false,
            candidates: Vec::new(),
        }
    }

    async fn query(&mut self, fen: &str) -> EngineResult<UciInfo> {
        self.client.analyze(fen, self.depth).await
    }
}

fn eval_cp_equivalent(eval: &Eval) -> Option<i32> {
    match eval {
        Eval::Centipawns(cp) => Some(*cp),
        Eval::Mate(m) => Some(if *m >= 0 { 100_000 } else { -100_000 }),
        Eval::Unknown => None,
    }
}

/// `MoveRecord.eval` is stored from the mover's perspective, flipping sign
/// every ply. Swings only make sense differenced within one consistent
/// frame, so re-express each ply's centipawn figure from White's point of
/// view before comparing it to its neighbor (ported from `analyze.py`'s
/// `_extract_eval`, which does the same `if turn == chess.BLACK: cp = -cp`
/// before `keymoves.py` differences them).
fn white_pov_cp(ply: usize, eval: &Eval) -> Option<i32> {
    let cp = eval_cp_equivalent(eval)?;
    // Ply 0 is White's first move, so White is the mover on even plies.
    Some(if ply % 2 == 0 { cp } else { -cp })
}

/// Select key plies for emphasis (spec §4.E step 5): the last book move,
/// the single largest evaluation swing (if it exceeds 100cp), every
/// mistake/blunder — deduplicated and sorted (ported from
/// `keymoves.py::find_key_moves`).
#[must_use]
pub fn select_key_plies(moves: &[MoveRecord]) -> Vec<usize> {
    let mut keys = Vec::new();

    if let Some(last_book) = moves
        .iter()
        .filter(|m| m.classification == Classification::Book)
        .map(|m| m.ply)
        .max()
    {
        keys.push(last_book);
    }

    let mut max_swing = 0i32;
    let mut max_swing_ply = None;
    let mut prev_cp: Option<i32> = None;
    for m in moves {
        if let Some(cp) = white_pov_cp(m.ply, &m.eval) {
            if let Some(prev) = prev_cp {
                let swing = (cp - prev).abs();
                if swing > max_swing {
                    max_swing = swing;
                    max_swing_ply = Some(m.ply);
                }
            }
            prev_cp = Some(cp);
        }
    }
    if max_swing > 100 {
        if let Some(ply) = max_swing_ply {
            keys.push(ply);
        }
    }

    for m in moves {
        if matches!(m.classification, Classification::Blunder | Classification::Mistake) {
            keys.push(m.ply);
        }
    }

    keys.sort_unstable();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use otbscribe_models::game::Candidate;

    fn record(ply: usize, eval_cp: i32, classification: Classification) -> MoveRecord {
        MoveRecord {
            ply,
            san: String::new(),
            uci: String::new(),
            fen_after: String::new(),
            eval: Eval::Centipawns(eval_cp),
            pv: vec![],
            classification,
            cp_loss: None,
            uncertain: false,
            candidates: Vec::<Candidate>::new(),
        }
    }

    #[test]
    fn classify_thresholds() {
        assert_eq!(classify(0), Classification::Best);
        assert_eq!(classify(-10), Classification::Best);
        assert_eq!(classify(50), Classification::Good);
        assert_eq!(classify(100), Classification::Inaccuracy);
        assert_eq!(classify(200), Classification::Mistake);
        assert_eq!(classify(201), Classification::Blunder);
    }

    #[test]
    fn book_position_recognized() {
        assert!(is_book_position(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        ));
        assert!(!is_book_position(
            "rnbqkbnr/pppp1ppp/4p3/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
        ));
    }

    #[test]
    fn cp_loss_sums_before_and_after_scores() {
        let before = UciInfo {
            score_cp: Some(30),
            score_mate: None,
            pv: vec![],
        };
        let after = UciInfo {
            score_cp: Some(-25),
            score_mate: None,
            pv: vec![],
        };
        // mover played nearly the best move: small loss.
        assert_eq!(cp_loss_of(&before, &after), Some(5));
    }

    #[test]
    fn key_plies_include_blunders_and_mistakes() {
        let moves = vec![
            record(0, 20, Classification::Best),
            record(1, -250, Classification::Blunder),
            record(2, -240, Classification::Mistake),
        ];
        let keys = select_key_plies(&moves);
        assert!(keys.contains(&1));
        assert!(keys.contains(&2));
    }

    #[test]
    fn steady_mover_perspective_advantage_is_not_a_swing() {
        // +60cp for White at ply 0 is recorded as -60 at ply 1 (Black to
        // move, mover's perspective), +60 at ply 2, etc. In White's frame
        // the advantage never moves, so no swing should be flagged.
        let moves = vec![
            record(0, 60, Classification::Best),
            record(1, -60, Classification::Best),
            record(2, 60, Classification::Best),
            record(3, -60, Classification::Best),
        ];
        let keys = select_key_plies(&moves);
        assert!(keys.is_empty());
    }

    #[test]
    fn genuine_swing_across_a_mover_perspective_flip_is_detected() {
        // White is +20 after ply 0; Black's reply at ply 1 is recorded from
        // Black's perspective as -170, i.e. White's advantage actually grew
        // from +20 to +170 (a genuine 150cp swing in White's frame, not the
        // 190cp a naive raw difference would produce).
        let moves = vec![record(0, 20, Classification::Best), record(1, -170, Classification::Best)];
        let keys = select_key_plies(&moves);
        assert_eq!(keys, vec![1]);
    }

    #[test]
    fn key_plies_dedup_and_sort() {
        let moves = vec![
            record(0, 500, Classification::Blunder),
            // -450 from Black's mover perspective is +450 in White's frame,
            // a 50cp move rather than a swing, so this shouldn't add a
            // second key ply on top of the blunder at ply 0.
            record(1, -450, Classification::Best),
        ];
        let keys = select_key_plies(&moves);
        assert_eq!(keys, vec![0]);
    }

    #[test]
    fn last_book_move_is_selected() {
        let moves = vec![
            record(0, 20, Classification::Book),
            record(1, 25, Classification::Book),
            record(2, 22, Classification::Best),
        ];
        let keys = select_key_plies(&moves);
        assert_eq!(keys.first(), Some(&1));
    }
}
