//! Run context and parameters (spec §3 "Run context").

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a fresh run id of the form `game_<unix_timestamp>`, matching
    /// the `<outroot>/game_<ts>/` layout the `watch` command creates (spec §6).
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self(format!("game_{}", timestamp.timestamp()))
    }

    /// Create from an existing string (used when resuming a run from disk).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Square observation strategy (spec §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Two-phase empty/light/dark photometric classification.
    Photometric,
    /// Fiducial piece-tag identity decoding.
    Tag,
}

/// Board orientation as observed by the camera (spec §9 Open Questions:
/// never inferred, always an explicit run-level input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// White's first rank (ranks 1-2) is at the bottom of the rectified image.
    WhiteBottom,
    /// Black's first rank is at the bottom of the rectified image.
    BlackBottom,
}

/// Whether the board locator may fall back to contour detection when
/// fiducial markers aren't found (spec §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// Markers are required; contour fallback is disabled.
    MarkersRequired,
    /// Fall back to largest-quadrilateral contour detection if markers fail.
    MarkersOptional,
}

/// Tunable parameters for one run, collected once at ingest and never
/// mutated afterward (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunParams {
    /// Target frame sampling rate, in frames per second.
    pub sampling_fps: f64,
    /// Motion energy threshold below which a frame counts as part of a
    /// stable run (§4.A `τ_m`).
    pub motion_threshold: f64,
    /// Minimum duration, in seconds, a motion-stable run must span before a
    /// `StableFrame` is emitted (§4.A `δ_s`).
    pub stable_duration_secs: f64,
    /// Square observation strategy.
    pub mode: Mode,
    /// Board orientation, as a required explicit input (never inferred).
    pub orientation: Orientation,
    /// Marker detection policy for the board locator.
    pub marker_policy: MarkerPolicy,
    /// Rectified board side length in pixels (`S` in spec §3, default 800).
    pub board_size_px: u32,
    /// Engine search depth for annotation.
    pub engine_depth: u32,
    /// Maximum principal-variation length to record per ply.
    pub pv_length: usize,
    /// Per-query engine timeout.
    #[serde(with = "duration_millis")]
    pub engine_timeout: std::time::Duration,
    /// Allowed tag ids for Tag mode (default 1..=32).
    pub tag_id_range: (u32, u32),
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            sampling_fps: 2.0,
            motion_threshold: 0.02,
            stable_duration_secs: 1.5,
            mode: Mode::Photometric,
            orientation: Orientation::WhiteBottom,
            marker_policy: MarkerPolicy::MarkersOptional,
            board_size_px: 800,
            engine_depth: 16,
            pv_length: 6,
            engine_timeout: std::time::Duration::from_secs(5),
            tag_id_range: (1, 32),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Immutable run identity, root directory, and parameters. Created once at
/// ingest (spec §3 "Run context").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunContext {
    pub run_id: RunId,
    pub root: PathBuf,
    pub input_file: PathBuf,
    pub created_at: DateTime<Utc>,
    pub params: RunParams,
}

impl RunContext {
    #[must_use]
    pub fn new(
        run_id: RunId,
        root: impl Into<PathBuf>,
        input_file: impl Into<PathBuf>,
        params: RunParams,
    ) -> Self {
        Self {
            run_id,
            root: root.into(),
            input_file: input_file.into(),
            created_at: Utc::now(),
            params,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
