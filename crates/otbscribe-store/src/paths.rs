//! Typed accessors for the run directory layout (spec §6).
//!
//! ```text
//! <run_root>/
//!   input.<ext>
//!   run_meta.json
//!   board_ids.json
//!   board_ids_override.json        (optional, user-supplied)
//!   game.pgn
//!   moves.json
//!   analysis.json
//!   debug/
//!     stable_frames/*.png
//!     motion.csv
//!     warped_boards/*.png
//!     grid_overlay.png
//!     calibration_phase_a.json
//!     calibration_phase_b.json
//!     occupancy_map_*.png
//!     tag_overlays/*.png
//!     tag_metrics.csv
//!     step_confidence.json
//!     uncertain_moves.json
//! ```

use std::path::{Path, PathBuf};

/// Resolves every artifact path under one run's root directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    root: PathBuf,
}

impl RunPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn debug_dir(&self) -> PathBuf {
        self.root.join("debug")
    }

    #[must_use]
    pub fn input(&self, extension: &str) -> PathBuf {
        self.root.join(format!("input.{extension}"))
    }

    #[must_use]
    pub fn run_meta(&self) -> PathBuf {
        self.root.join("run_meta.json")
    }

    #[must_use]
    pub fn board_ids(&self) -> PathBuf {
        self.root.join("board_ids.json")
    }

    #[must_use]
    pub fn board_ids_override(&self) -> PathBuf {
        self.root.join("board_ids_override.json")
    }

    #[must_use]
    pub fn game_pgn(&self) -> PathBuf {
        self.root.join("game.pgn")
    }

    #[must_use]
    pub fn moves_json(&self) -> PathBuf {
        self.root.join("moves.json")
    }

    #[must_use]
    pub fn analysis_json(&self) -> PathBuf {
        self.root.join("analysis.json")
    }

    #[must_use]
    pub fn stable_frame_png(&self, index: usize) -> PathBuf {
        self.debug_dir()
            .join("stable_frames")
            .join(format!("{index:05}.png"))
    }

    #[must_use]
    pub fn motion_csv(&self) -> PathBuf {
        self.debug_dir().join("motion.csv")
    }

    #[must_use]
    pub fn warped_board_png(&self, frame_index: usize) -> PathBuf {
        self.debug_dir()
            .join("warped_boards")
            .join(format!("{frame_index:05}.png"))
    }

    #[must_use]
    pub fn grid_overlay_png(&self) -> PathBuf {
        self.debug_dir().join("grid_overlay.png")
    }

    #[must_use]
    pub fn calibration_phase_a_json(&self) -> PathBuf {
        self.debug_dir().join("calibration_phase_a.json")
    }

    #[must_use]
    pub fn calibration_phase_b_json(&self) -> PathBuf {
        self.debug_dir().join("calibration_phase_b.json")
    }

    #[must_use]
    pub fn occupancy_map_png(&self, frame_index: usize) -> PathBuf {
        self.debug_dir()
            .join(format!("occupancy_map_{frame_index:05}.png"))
    }

    #[must_use]
    pub fn tag_overlay_png(&self, frame_index: usize) -> PathBuf {
        self.debug_dir()
            .join("tag_overlays")
            .join(format!("{frame_index:05}.png"))
    }

    #[must_use]
    pub fn tag_metrics_csv(&self) -> PathBuf {
        self.debug_dir().join("tag_metrics.csv")
    }

    #[must_use]
    pub fn step_confidence_json(&self) -> PathBuf {
        self.debug_dir().join("step_confidence.json")
    }

    #[must_use]
    pub fn uncertain_moves_json(&self) -> PathBuf {
        self.debug_dir().join("uncertain_moves.json")
    }

    /// Supplemental artifact (not in spec §6's table, added for
    /// post-hoc review tooling): a flattened per-frame board-state snapshot.
    #[must_use]
    pub fn board_states_json(&self) -> PathBuf {
        self.debug_dir().join("board_states.json")
    }

    /// The human-facing run summary (spec §7 "User-visible behavior"):
    /// corners-detected, unique-ids, warnings, failing frames, uncertain
    /// moves, in one reviewable page.
    #[must_use]
    pub fn diagnostic_html(&self) -> PathBuf {
        self.root.join("diagnostic.html")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_nest_under_root() {
        let paths = RunPaths::new("/tmp/game_123");
        assert_eq!(paths.run_meta(), PathBuf::from("/tmp/game_123/run_meta.json"));
        assert_eq!(
            paths.motion_csv(),
            PathBuf::from("/tmp/game_123/debug/motion.csv")
        );
        assert_eq!(
            paths.stable_frame_png(7),
            PathBuf::from("/tmp/game_123/debug/stable_frames/00007.png")
        );
    }
}
