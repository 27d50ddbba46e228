//! Two-phase photometric square observer (spec §4.C.1).
//!
//! A calibrate-then-classify flow: Phase A distinguishes empty from occupied
//! squares by Lab-space color distance plus a Canny edge ratio; Phase B
//! distinguishes "light"/"dark" piece labels (the photometric convention in
//! [`otbscribe_models::observation::SquareColor`]) by the L channel.
//! Calibration and classification are pure functions over already-extracted
//! per-cell measurements, so they're tested without OpenCV; only patch
//! extraction from a real rectified image needs it.

use otbscribe_models::calibration::Lab;
use otbscribe_models::observation::SquareColor;
use otbscribe_models::Calibration;

use crate::error::{VisionError, VisionResult};

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn mean_lab(samples: &[Lab]) -> Lab {
    let l = mean(&samples.iter().map(|s| s.l).collect::<Vec<_>>());
    let a = mean(&samples.iter().map(|s| s.a).collect::<Vec<_>>());
    let b = mean(&samples.iter().map(|s| s.b).collect::<Vec<_>>());
    Lab::new(l, a, b)
}

/// Raw per-square calibration samples collected from the middle four ranks
/// (ranks 3-6), grouped by the *board's* checker color, and from the back
/// ranks (1-2, 7-8) grouped by the mover's photometric label (spec
/// §4.C.1 Phase A/B).
#[derive(Debug, Default, Clone)]
pub struct CalibrationSamples {
    pub light_square_patches: Vec<Lab>,
    pub dark_square_patches: Vec<Lab>,
    pub light_square_edge_scores: Vec<f64>,
    pub dark_square_edge_scores: Vec<f64>,
    /// L-channel values sampled from ranks 1-2 (White pieces, Phase B's
    /// "dark-piece sample").
    pub dark_piece_l: Vec<f64>,
    /// L-channel values sampled from ranks 7-8 (Black pieces, Phase B's
    /// "light-piece sample").
    pub light_piece_l: Vec<f64>,
}

/// Compute `Calibration` constants from one frame's samples (spec §4.C.1,
/// computed exactly once per run on the first stable frame).
pub fn calibrate(samples: &CalibrationSamples) -> VisionResult<Calibration> {
    if samples.light_square_patches.is_empty() || samples.dark_square_patches.is_empty() {
        return Err(VisionError::CalibrationFailure(
            "Phase A requires at least one light and one dark calibration square".to_string(),
        ));
    }
    if samples.dark_piece_l.is_empty() || samples.light_piece_l.is_empty() {
        return Err(VisionError::CalibrationFailure(
            "Phase B requires at least one light-piece and one dark-piece sample".to_string(),
        ));
    }

    let template_light_sq = mean_lab(&samples.light_square_patches);
    let template_dark_sq = mean_lab(&samples.dark_square_patches);

    let mut diffs: Vec<f64> = samples
        .light_square_patches
        .iter()
        .map(|p| p.mean_abs_diff(&template_light_sq))
        .collect();
    diffs.extend(
        samples
            .dark_square_patches
            .iter()
            .map(|p| p.mean_abs_diff(&template_dark_sq)),
    );
    let diff_mean = mean(&diffs);
    let t1_color_diff = diff_mean + 4.0 * std_dev(&diffs, diff_mean);

    let mut edges = samples.light_square_edge_scores.clone();
    edges.extend(samples.dark_square_edge_scores.iter().copied());
    let edge_mean = mean(&edges);
    let t2_edge_score = edge_mean + 4.0 * std_dev(&edges, edge_mean);

    let t_ld = (mean(&samples.light_piece_l) + mean(&samples.dark_piece_l)) / 2.0;

    Ok(Calibration {
        template_light_sq,
        template_dark_sq,
        t1_color_diff,
        t2_edge_score,
        t_ld,
    })
}

/// Phase A: is this square occupied? `patch` and `edge_score` are measured
/// against the template matching the square's own checker color
/// (`square_is_light_checker`), per spec §4.C.1.
#[must_use]
pub fn is_piece(patch: Lab, edge_score: f64, square_is_light_checker: bool, calib: &Calibration) -> bool {
    let template = if square_is_light_checker {
        calib.template_light_sq
    } else {
        calib.template_dark_sq
    };
    let color_diff = patch.mean_abs_diff(&template);
    color_diff > calib.t1_color_diff || edge_score > calib.t2_edge_score
}

/// Phase B: classify an occupied square's piece-color label and confidence
/// from its L channel (spec §4.C.1).
#[must_use]
pub fn classify_piece_color(l_channel: f64, calib: &Calibration) -> (SquareColor, f64) {
    let label = if l_channel >= calib.t_ld {
        SquareColor::Light
    } else {
        SquareColor::Dark
    };
    let confidence = 0.5 + 0.5 * (l_channel - calib.t_ld).abs().min(50.0) / 50.0;
    (label, confidence)
}

/// Classify one cell end to end: Phase A (empty vs. occupied) then, if
/// occupied, Phase B (light vs. dark piece label).
#[must_use]
pub fn classify_cell(
    patch: Lab,
    edge_score: f64,
    square_is_light_checker: bool,
    calib: &Calibration,
) -> (SquareColor, f64) {
    if !is_piece(patch, edge_score, square_is_light_checker, calib) {
        return (SquareColor::Empty, 1.0);
    }
    classify_piece_color(patch.l, calib)
}

/// Whether `(row, col)` is a light-colored checker square under the
/// standard a1-is-dark convention (spec §4.C.1: "the checker color, not the
/// piece color").
#[must_use]
pub fn is_light_checker_square(row: usize, col: usize) -> bool {
    (row + col) % 2 == 0
}

/// Extracts calibration samples and per-frame observations from rectified
/// board images.
#[derive(Debug, Default)]
pub struct PhotometricObserver;

#[cfg(feature = "opencv")]
impl PhotometricObserver {
    /// Extract the central 40%x40% patch of each cell as a mean Lab value
    /// plus a Canny edge-pixel ratio (spec §4.C.1 "central patch").
    pub fn extract_cells(&self, rectified_path: &std::path::Path) -> VisionResult<[[(Lab, f64); 8]; 8]> {
        use opencv::core::Rect;
        use opencv::prelude::*;
        use opencv::{imgcodecs, imgproc};

        let path = rectified_path
            .to_str()
            .ok_or_else(|| VisionError::InputUnreadable("rectified path is not valid UTF-8".to_string()))?;
        let image = imgcodecs::imread(path, imgcodecs::IMREAD_COLOR)?;
        if image.empty() {
            return Err(VisionError::CalibrationFailure(format!(
                "rectified board at {} could not be read",
                rectified_path.display()
            )));
        }

        let mut lab = Mat::default();
        imgproc::cvt_color(
            &image,
            &mut lab,
            imgproc::COLOR_BGR2Lab,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;
        let mut edges = Mat::default();
        imgproc::canny(&image, &mut edges, 50.0, 150.0, 3, false)?;

        let side = image.cols();
        let cell = side as f64 / 8.0;
        let patch_frac = 0.4;

        let default_cell = (Lab::new(0.0, 0.0, 0.0), 0.0);
        let mut out = [[default_cell; 8]; 8];
        for row in 0..8 {
            for col in 0..8 {
                let cx = (col as f64 + 0.5) * cell;
                let cy = (row as f64 + 0.5) * cell;
                let half = cell * patch_frac / 2.0;
                let rect = Rect::new(
                    (cx - half).max(0.0) as i32,
                    (cy - half).max(0.0) as i32,
                    (half * 2.0).min(side as f64) as i32,
                    (half * 2.0).min(side as f64) as i32,
                );
                let lab_roi = Mat::roi(&lab, rect)?;
                let mean_scalar = opencv::core::mean(&lab_roi, &opencv::core::no_array())?;
                let lab_mean = Lab::new(mean_scalar[0], mean_scalar[1], mean_scalar[2]);

                let edge_roi = Mat::roi(&edges, rect)?;
                let nonzero = opencv::core::count_non_zero(&edge_roi)?;
                let total = (rect.width * rect.height).max(1);
                let edge_ratio = f64::from(nonzero) / f64::from(total);

                out[row][col] = (lab_mean, edge_ratio);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calib_fixture() -> Calibration {
        Calibration {
            template_light_sq: Lab::new(80.0, 0.0, 0.0),
            template_dark_sq: Lab::new(30.0, 0.0, 0.0),
            t1_color_diff: 5.0,
            t2_edge_score: 0.1,
            t_ld: 50.0,
        }
    }

    #[test]
    fn empty_square_matches_template_closely() {
        let calib = calib_fixture();
        let patch = Lab::new(80.5, 0.1, -0.1);
        assert!(!is_piece(patch, 0.01, true, &calib));
    }

    #[test]
    fn strong_color_diff_flags_piece() {
        let calib = calib_fixture();
        let patch = Lab::new(10.0, 20.0, 20.0);
        assert!(is_piece(patch, 0.0, true, &calib));
    }

    #[test]
    fn high_edge_score_flags_piece_even_with_matching_color() {
        let calib = calib_fixture();
        let patch = Lab::new(80.0, 0.0, 0.0);
        assert!(is_piece(patch, 0.5, true, &calib));
    }

    #[test]
    fn piece_color_classification_respects_threshold() {
        let calib = calib_fixture();
        let (label_high, conf_high) = classify_piece_color(90.0, &calib);
        assert_eq!(label_high, SquareColor::Light);
        let (label_low, conf_low) = classify_piece_color(10.0, &calib);
        assert_eq!(label_low, SquareColor::Dark);
        assert!(conf_high > 0.5 && conf_low > 0.5);
    }

    #[test]
    fn checker_color_alternates() {
        assert!(is_light_checker_square(0, 0));
        assert!(!is_light_checker_square(0, 1));
        assert!(!is_light_checker_square(1, 0));
        assert!(is_light_checker_square(1, 1));
    }

    #[test]
    fn calibration_rejects_missing_phase_b_samples() {
        let samples = CalibrationSamples {
            light_square_patches: vec![Lab::new(80.0, 0.0, 0.0)],
            dark_square_patches: vec![Lab::new(30.0, 0.0, 0.0)],
            light_square_edge_scores: vec![0.01],
            dark_square_edge_scores: vec![0.01],
            dark_piece_l: vec![],
            light_piece_l: vec![],
        };
        assert!(calibrate(&samples).is_err());
    }

    #[test]
    fn calibration_succeeds_with_all_samples() {
        let samples = CalibrationSamples {
            light_square_patches: vec![Lab::new(80.0, 0.0, 0.0), Lab::new(81.0, 0.0, 0.0)],
            dark_square_patches: vec![Lab::new(30.0, 0.0, 0.0), Lab::new(29.0, 0.0, 0.0)],
            light_square_edge_scores: vec![0.01, 0.02],
            dark_square_edge_scores: vec![0.01, 0.02],
            dark_piece_l: vec![20.0, 22.0],
            light_piece_l: vec![85.0, 87.0],
        };
        let calib = calibrate(&samples).unwrap();
        assert!(calib.t_ld > 20.0 && calib.t_ld < 87.0);
    }
}
