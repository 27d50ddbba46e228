//! Move decoders (spec §4.D): photometric (legality-constrained) and tag
//! (identity-tracking). Both produce [`DecodedPly`]s; the engine annotator
//! fills in evaluation and classification afterward.

pub mod photometric;
pub mod tag;

use otbscribe_models::game::Candidate;

/// One decoded ply, before engine annotation.
#[derive(Debug, Clone)]
pub struct DecodedPly {
    pub ply: usize,
    pub san: String,
    pub uci: String,
    pub fen_after: String,
    /// True when the decoder could not resolve a unique best move (spec
    /// §4.D common guarantees); `san` is `"??"` in that case.
    pub uncertain: bool,
    pub candidates: Vec<Candidate>,
}

impl DecodedPly {
    fn uncertain_placeholder(ply: usize, fen_unchanged: String) -> Self {
        Self {
            ply,
            san: "??".to_string(),
            uci: String::new(),
            fen_after: fen_unchanged,
            uncertain: true,
            candidates: vec![],
        }
    }
}
