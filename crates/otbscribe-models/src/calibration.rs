//! Photometric calibration constants, computed once on the first stable
//! frame and reused for every subsequent frame in the run (spec §3
//! "Calibration", §4.C.1).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A CIE Lab color triple, stored as plain floats (no colorimetry crate in
/// the dependency stack, so this is just a labeled 3-tuple).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    #[must_use]
    pub fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Mean absolute per-channel difference, used for `color_diff` in
    /// Phase A (spec §4.C.1).
    #[must_use]
    pub fn mean_abs_diff(&self, other: &Lab) -> f64 {
        ((self.l - other.l).abs() + (self.a - other.a).abs() + (self.b - other.b).abs()) / 3.0
    }
}

/// Calibration constants computed exactly once per run, on the first stable
/// frame, and immutable afterward (spec §3, §4.C.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct Calibration {
    /// Mean Lab template for empty light-colored board squares.
    pub template_light_sq: Lab,
    /// Mean Lab template for empty dark-colored board squares.
    pub template_dark_sq: Lab,
    /// Phase A color-difference threshold (`μ(color_diff) + 4σ`).
    pub t1_color_diff: f64,
    /// Phase A edge-ratio threshold (`μ(edge_score) + 4σ`).
    pub t2_edge_score: f64,
    /// Phase B L-channel threshold distinguishing light vs. dark pieces.
    pub t_ld: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_diff_is_symmetric() {
        let a = Lab::new(50.0, 10.0, -5.0);
        let b = Lab::new(40.0, 5.0, 0.0);
        assert_eq!(a.mean_abs_diff(&b), b.mean_abs_diff(&a));
    }

    #[test]
    fn identical_lab_has_zero_diff() {
        let a = Lab::new(50.0, 10.0, -5.0);
        assert_eq!(a.mean_abs_diff(&a), 0.0);
    }
}
