//! Typed artifact formats written and read from a run directory (spec §6).

use std::path::PathBuf;

use otbscribe_models::game::Eval;
use otbscribe_models::{Classification, Mode, PieceMap, RunId, RunParams};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `run_meta.json`: `{run_id, input_file, mode, timestamp, params}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunMeta {
    pub run_id: RunId,
    pub input_file: PathBuf,
    pub mode: Mode,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub params: RunParams,
    /// Set only when the run aborted with a stage-fatal error (spec §4
    /// "Propagation policy"); holds `ModelError::type_name()` or an
    /// equivalent stage-local type name.
    pub failure_reason: Option<String>,
}

/// One frame entry inside `board_ids.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BoardIdsFrame {
    pub index: usize,
    pub frame: PathBuf,
    pub board_ids: [[u32; 8]; 8],
    pub overlay: PathBuf,
    pub tags: Vec<otbscribe_models::TagDetection>,
}

/// `board_ids.json`: `{piece_map, frames:[...]}` (Tag mode only).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BoardIdsFile {
    pub piece_map: PieceMap,
    pub frames: Vec<BoardIdsFrame>,
}

/// `board_ids_override.json`: a human-supplied correction replacing frames
/// from `from_index` onward, after which the decoder reruns (spec §6
/// "Override semantics").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BoardIdsOverrideFile {
    pub from_index: usize,
    pub frames: Vec<BoardIdsFrame>,
}

/// One entry in `moves.json`: `{san, uci, fen}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MovesJsonEntry {
    pub san: String,
    pub uci: String,
    pub fen: String,
}

/// `analysis.json`'s `metadata` object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisMetadata {
    pub depth: u32,
    pub pv_length: usize,
    pub uncertain_moves: Vec<usize>,
}

/// `analysis.json`: `{moves:[MoveRecord], keyMoves:[int], metadata:{...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisJson {
    pub moves: Vec<otbscribe_models::MoveRecord>,
    #[serde(rename = "keyMoves")]
    pub key_moves: Vec<usize>,
    pub metadata: AnalysisMetadata,
}

/// One row of `debug/motion.csv`: `time,motion,is_stable`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct MotionCsvRow {
    pub time: f64,
    pub motion: f64,
    pub is_stable: bool,
}

/// One row of `debug/tag_metrics.csv`, emitted per detected marker per frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct TagMetricsCsvRow {
    pub frame_index: usize,
    pub tag_id: u32,
    pub row: usize,
    pub col: usize,
    pub area: f64,
    pub decode_margin: f64,
    pub border_penalty: f64,
    pub score: f64,
}

/// One uncertain-ply entry in `debug/uncertain_moves.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UncertainMoveEntry {
    pub ply: usize,
    pub best_score: f64,
    pub runner_up_score: f64,
    pub candidates: Vec<otbscribe_models::game::Candidate>,
}

/// One step of `debug/step_confidence.json`, recording the decoder's margin
/// at each ply regardless of whether it crossed the uncertainty threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct StepConfidenceEntry {
    pub ply: usize,
    pub margin: f64,
}

/// Supplemental per-frame board-state snapshot (not in spec §6's table): a
/// flattened per-frame dump useful for reviewing a run's raw occupancy
/// history without re-decoding it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BoardStateSnapshot {
    pub frame_index: usize,
    pub fen_piece_placement: String,
}

/// `debug/board_states.json`: one snapshot per rectified frame, in order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BoardStatesSnapshot {
    pub snapshots: Vec<BoardStateSnapshot>,
}

/// Evaluation and classification carried alongside a move, reused by both
/// `moves.json`'s richer sibling `analysis.json` and debug artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnnotatedPly {
    pub eval: Eval,
    pub classification: Classification,
}

/// One Stage B outcome worth surfacing in the diagnostic page: whether a
/// stable frame's board was located, and by which path (spec §4.B, §7).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameDiagnostic {
    pub frame_index: usize,
    pub corners_detected: bool,
    pub note: String,
}

/// Accumulated across a run and rendered to `diagnostic.html` (spec §7
/// "a diagnostic HTML is emitted summarizing corners-detected, unique-ids,
/// warnings, failing frames, and uncertain moves").
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DiagnosticReport {
    pub frames: Vec<FrameDiagnostic>,
    /// Per tag-observation unique-id counts, in frame order (Tag mode only).
    pub unique_id_counts: Vec<usize>,
    pub warnings: Vec<String>,
    pub uncertain_plies: Vec<usize>,
}

impl DiagnosticReport {
    /// Render as a minimal, dependency-free HTML page (no templating engine:
    /// spec §1 treats "report HTML templating" as an external collaborator,
    /// so this is a plain summary, not the replay viewer).
    #[must_use]
    pub fn to_html(&self) -> String {
        let failing: Vec<&FrameDiagnostic> = self.frames.iter().filter(|f| !f.corners_detected).collect();
        let mut out = String::new();
        out.push_str("<!doctype html>\n<html><head><meta charset=\"utf-8\">");
        out.push_str("<title>otbscribe run diagnostics</title></head><body>\n");
        out.push_str("<h1>Run diagnostics</h1>\n");

        out.push_str(&format!("<h2>Frames ({})</h2>\n<ul>\n", self.frames.len()));
        for f in &self.frames {
            let status = if f.corners_detected { "ok" } else { "FAILED" };
            out.push_str(&format!(
                "<li>frame {}: {} &mdash; {}</li>\n",
                f.frame_index,
                status,
                html_escape(&f.note)
            ));
        }
        out.push_str("</ul>\n");

        out.push_str(&format!("<h2>Failing frames ({})</h2>\n<ul>\n", failing.len()));
        for f in &failing {
            out.push_str(&format!("<li>frame {}: {}</li>\n", f.frame_index, html_escape(&f.note)));
        }
        out.push_str("</ul>\n");

        if !self.unique_id_counts.is_empty() {
            out.push_str("<h2>Unique ids per frame</h2>\n<ul>\n");
            for (i, count) in self.unique_id_counts.iter().enumerate() {
                out.push_str(&format!("<li>frame {i}: {count} unique ids</li>\n"));
            }
            out.push_str("</ul>\n");
        }

        out.push_str(&format!("<h2>Warnings ({})</h2>\n<ul>\n", self.warnings.len()));
        for w in &self.warnings {
            out.push_str(&format!("<li>{}</li>\n", html_escape(w)));
        }
        out.push_str("</ul>\n");

        out.push_str(&format!(
            "<h2>Uncertain moves ({})</h2>\n<ul>\n",
            self.uncertain_plies.len()
        ));
        for ply in &self.uncertain_plies {
            out.push_str(&format!("<li>ply {ply}</li>\n"));
        }
        out.push_str("</ul>\n");

        out.push_str("</body></html>\n");
        out
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod diagnostic_tests {
    use super::*;

    #[test]
    fn renders_failing_frame_count() {
        let report = DiagnosticReport {
            frames: vec![
                FrameDiagnostic { frame_index: 0, corners_detected: true, note: "markers".to_string() },
                FrameDiagnostic { frame_index: 1, corners_detected: false, note: "no markers".to_string() },
            ],
            unique_id_counts: vec![],
            warnings: vec!["LOW_TAGS".to_string()],
            uncertain_plies: vec![3],
        };
        let html = report.to_html();
        assert!(html.contains("Failing frames (1)"));
        assert!(html.contains("LOW_TAGS"));
        assert!(html.contains("ply 3"));
    }

    #[test]
    fn escapes_html_special_characters_in_notes() {
        let report = DiagnosticReport {
            frames: vec![FrameDiagnostic {
                frame_index: 0,
                corners_detected: false,
                note: "<script>alert(1)</script>".to_string(),
            }],
            unique_id_counts: vec![],
            warnings: vec![],
            uncertain_plies: vec![],
        };
        assert!(!report.to_html().contains("<script>"));
    }
}
