//! Move records and the reconstructed game (spec §3 "MoveRecord", "Game").

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Engine evaluation, from the mover's perspective (spec §3). Exactly one
/// of centipawns or a mate distance is present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Eval {
    Centipawns(i32),
    Mate(i32),
    /// The engine was unavailable or the query timed out for this ply
    /// (spec §4.E "Failure").
    Unknown,
}

/// Per-ply move classification by centipawn loss (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Best,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
    Book,
    /// Annotation was unavailable for this ply.
    Unknown,
}

/// One candidate move considered by the decoder, with its match score
/// (lower is better; spec §4.D).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    pub san: String,
    pub score: f64,
}

/// One decoded, legal ply with its engine annotation (spec §3 "MoveRecord").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MoveRecord {
    pub ply: usize,
    pub san: String,
    pub uci: String,
    pub fen_after: String,
    pub eval: Eval,
    pub pv: Vec<String>,
    pub classification: Classification,
    pub cp_loss: Option<i32>,
    /// True when the decoder's top-1/top-2 margin was below the
    /// uncertainty threshold (spec §4.D.1 step 4).
    pub uncertain: bool,
    pub candidates: Vec<Candidate>,
}

/// PGN headers (spec §6 "game.pgn").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GameHeaders {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
}

impl Default for GameHeaders {
    fn default() -> Self {
        Self {
            event: "Over-the-board reconstruction".to_string(),
            site: "?".to_string(),
            date: "????.??.??".to_string(),
            round: "1".to_string(),
            white: "White".to_string(),
            black: "Black".to_string(),
        }
    }
}

/// The final outcome of a reconstructed game, as it belongs in the PGN
/// `Result` header (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameResult {
    #[must_use]
    pub fn pgn_tag(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Ongoing => "*",
        }
    }
}

/// An ordered sequence of `MoveRecord`s plus PGN headers and key-ply indices
/// (spec §3 "Game"). Invariant: the SAN sequence is legal from the starting
/// position.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Game {
    pub headers: GameHeaders,
    pub moves: Vec<MoveRecord>,
    pub result: GameResult,
    pub key_plies: Vec<usize>,
    /// Ply indices the decoder could not resolve uniquely (spec §4.D
    /// "uncertain"); these are rendered as `{??}` comments rather than
    /// dropped.
    pub uncertain_plies: Vec<usize>,
}

impl Game {
    /// Render as standard PGN (spec §6 "game.pgn"): seven-tag roster header
    /// block, then movetext with `{??}` comments for uncertain plies.
    #[must_use]
    pub fn to_pgn(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("[Event \"{}\"]\n", self.headers.event));
        out.push_str(&format!("[Site \"{}\"]\n", self.headers.site));
        out.push_str(&format!("[Date \"{}\"]\n", self.headers.date));
        out.push_str(&format!("[Round \"{}\"]\n", self.headers.round));
        out.push_str(&format!("[White \"{}\"]\n", self.headers.white));
        out.push_str(&format!("[Black \"{}\"]\n", self.headers.black));
        out.push_str(&format!("[Result \"{}\"]\n\n", self.result.pgn_tag()));

        let mut line = String::new();
        for (i, mv) in self.moves.iter().enumerate() {
            if i % 2 == 0 {
                line.push_str(&format!("{}. ", i / 2 + 1));
            }
            if mv.san == "??" {
                line.push_str("{??} ");
            } else {
                line.push_str(&mv.san);
                line.push(' ');
            }
        }
        line.push_str(self.result.pgn_tag());
        out.push_str(line.trim_start());
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_record(ply: usize, san: &str) -> MoveRecord {
        MoveRecord {
            ply,
            san: san.to_string(),
            uci: String::new(),
            fen_after: String::new(),
            eval: Eval::Unknown,
            pv: vec![],
            classification: Classification::Unknown,
            cp_loss: None,
            uncertain: false,
            candidates: vec![],
        }
    }

    #[test]
    fn empty_game_pgn_has_star_result() {
        let game = Game {
            headers: GameHeaders::default(),
            moves: vec![],
            result: GameResult::Ongoing,
            key_plies: vec![],
            uncertain_plies: vec![],
        };
        let pgn = game.to_pgn();
        assert!(pgn.contains("[Result \"*\"]"));
        assert!(pgn.trim_end().ends_with('*'));
    }

    #[test]
    fn pgn_numbers_moves_in_pairs() {
        let game = Game {
            headers: GameHeaders::default(),
            moves: vec![move_record(0, "e4"), move_record(1, "e5"), move_record(2, "Nf3")],
            result: GameResult::Ongoing,
            key_plies: vec![],
            uncertain_plies: vec![],
        };
        let pgn = game.to_pgn();
        assert!(pgn.contains("1. e4 e5 2. Nf3"));
    }

    #[test]
    fn uncertain_moves_render_as_comment() {
        let game = Game {
            headers: GameHeaders::default(),
            moves: vec![move_record(0, "??")],
            result: GameResult::Ongoing,
            key_plies: vec![],
            uncertain_plies: vec![0],
        };
        assert!(game.to_pgn().contains("{??}"));
    }
}
