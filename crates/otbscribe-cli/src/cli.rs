//! Command-line surface (spec §6): `analyze` and `watch`.
//!
//! A top-level `Cli` (`#[derive(Parser)]`) wrapping a `Cmd` subcommand enum,
//! with long flag names and sensible defaults matching `RunParams::default()`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use otbscribe_models::run::{MarkerPolicy, Mode, Orientation};

#[derive(Parser, Debug)]
#[command(
    name = "otbscribe",
    about = "Reconstruct a PGN from a video of an over-the-board chess game",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run the full pipeline once over a single video.
    Analyze {
        #[command(flatten)]
        opts: PipelineOpts,

        /// Source video file.
        #[arg(long)]
        input: PathBuf,

        /// Run directory to write artifacts into (created if missing).
        #[arg(long)]
        outdir: PathBuf,
    },

    /// Watch an inbox directory and run the pipeline on every new video.
    Watch {
        #[command(flatten)]
        opts: PipelineOpts,

        /// Directory polled for new video files.
        #[arg(long)]
        inbox: PathBuf,

        /// Root directory under which `game_<ts>/` run directories are created.
        #[arg(long)]
        outroot: PathBuf,

        /// Polling interval, in seconds.
        #[arg(long, default_value_t = 5)]
        poll_interval_secs: u64,
    },
}

/// Flags shared between `analyze` and `watch` (spec §6: "[flags as above]").
#[derive(clap::Args, Debug, Clone)]
pub struct PipelineOpts {
    /// Whether fiducial markers are required for board localization
    /// (`0` allows a contour-detection fallback).
    #[arg(long, default_value_t = 1)]
    pub use_markers: u8,

    /// Engine search depth.
    #[arg(long, default_value_t = 16)]
    pub depth: u32,

    /// Principal-variation length recorded per ply.
    #[arg(long, default_value_t = 6)]
    pub pv: usize,

    /// Target frame sampling rate, in frames per second.
    #[arg(long, default_value_t = 2.0)]
    pub fps: f64,

    /// Motion energy threshold below which a frame counts as stable.
    #[arg(long, default_value_t = 0.02)]
    pub motion_threshold: f64,

    /// Minimum duration, in seconds, a low-motion run must span.
    #[arg(long, default_value_t = 1.5)]
    pub stable_duration: f64,

    /// Square observation strategy.
    #[arg(long, value_enum, default_value_t = ModeOpt::Photometric)]
    pub mode: ModeOpt,

    /// Board orientation as seen by the camera (never inferred, spec §9
    /// Open Questions).
    #[arg(long, value_enum, default_value_t = OrientationOpt::WhiteBottom)]
    pub orientation: OrientationOpt,

    /// Path to a `PieceMap` JSON file; required when `--mode tag`.
    #[arg(long)]
    pub piece_map: Option<PathBuf>,

    /// Rectified board side length in pixels.
    #[arg(long, default_value_t = 800)]
    pub board_size_px: u32,

    /// Per-engine-query timeout, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub engine_timeout_ms: u64,

    /// Explicit path to the UCI engine binary (overrides `STOCKFISH_PATH`
    /// and `which stockfish`).
    #[arg(long)]
    pub engine_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum ModeOpt {
    Photometric,
    Tag,
}

impl From<ModeOpt> for Mode {
    fn from(m: ModeOpt) -> Mode {
        match m {
            ModeOpt::Photometric => Mode::Photometric,
            ModeOpt::Tag => Mode::Tag,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum OrientationOpt {
    WhiteBottom,
    BlackBottom,
}

impl From<OrientationOpt> for Orientation {
    fn from(o: OrientationOpt) -> Orientation {
        match o {
            OrientationOpt::WhiteBottom => Orientation::WhiteBottom,
            OrientationOpt::BlackBottom => Orientation::BlackBottom,
        }
    }
}

impl PipelineOpts {
    /// Marker policy implied by `--use-markers`: `1` requires fiducial
    /// markers and disables the contour fallback; `0` allows the locator to
    /// fall back to contour detection when markers aren't found.
    #[must_use]
    pub fn marker_policy(&self) -> MarkerPolicy {
        if self.use_markers != 0 {
            MarkerPolicy::MarkersRequired
        } else {
            MarkerPolicy::MarkersOptional
        }
    }
}
