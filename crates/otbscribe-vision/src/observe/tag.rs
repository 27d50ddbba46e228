//! Fiducial tag square observer (spec §4.C.2).
//!
//! Multi-preprocessing candidate selection feeding a two-pass conflict
//! resolution. Detection scoring and conflict resolution are pure functions
//! over already-detected candidates, so they're tested without OpenCV; only
//! the `opencv`-gated `TagObserver::observe` entry point runs `ArucoDetector`
//! against a real rectified image.

use std::collections::HashMap;

use otbscribe_models::observation::{TagConflict, TagDetection, TagObs};

use crate::error::VisionResult;

/// `area * (1 - border_penalty) * decode_margin` (spec §4.C.2 step 3).
#[must_use]
pub fn detection_score(area: f64, border_penalty: f64, decode_margin: f64) -> f64 {
    area * (1.0 - border_penalty) * decode_margin
}

/// A single raw candidate before conflict resolution: one marker detected at
/// one grid cell, in one preprocessing pass.
#[derive(Debug, Clone, Copy)]
pub struct RawDetection {
    pub id: u32,
    pub row: usize,
    pub col: usize,
    pub center: (f64, f64),
    pub area: f64,
    pub decode_margin: f64,
    pub border_penalty: f64,
}

impl RawDetection {
    #[must_use]
    pub fn score(&self) -> f64 {
        detection_score(self.area, self.border_penalty, self.decode_margin)
    }

    fn into_detection(self) -> TagDetection {
        TagDetection {
            id: self.id,
            row: self.row,
            col: self.col,
            center: self.center,
            area: self.area,
            decode_margin: self.decode_margin,
            border_penalty: self.border_penalty,
            score: self.score(),
        }
    }
}

/// Resolve raw candidate detections into a final observation (spec §4.C.2
/// step 4): first collapse same-cell collisions by keeping the
/// highest-scoring candidate, then collapse same-id collisions the same way.
#[must_use]
pub fn resolve_conflicts(frame_index: usize, candidates: Vec<RawDetection>) -> TagObs {
    let mut by_cell: HashMap<(usize, usize), RawDetection> = HashMap::new();
    let mut conflicts = Vec::new();
    let mut warnings = Vec::new();

    for cand in candidates {
        match by_cell.get(&(cand.row, cand.col)) {
            Some(existing) if existing.score() >= cand.score() => {
                conflicts.push(TagConflict::Cell {
                    row: cand.row,
                    col: cand.col,
                    kept_id: existing.id,
                    discarded_id: cand.id,
                    kept_score: existing.score(),
                    discarded_score: cand.score(),
                });
                warnings.push(format!(
                    "duplicate detection at ({}, {}): kept id {}, discarded id {}",
                    cand.row, cand.col, existing.id, cand.id
                ));
            }
            Some(existing) => {
                let discarded = *existing;
                conflicts.push(TagConflict::Cell {
                    row: cand.row,
                    col: cand.col,
                    kept_id: cand.id,
                    discarded_id: discarded.id,
                    kept_score: cand.score(),
                    discarded_score: discarded.score(),
                });
                warnings.push(format!(
                    "duplicate detection at ({}, {}): kept id {}, discarded id {}",
                    cand.row, cand.col, cand.id, discarded.id
                ));
                by_cell.insert((cand.row, cand.col), cand);
            }
            None => {
                by_cell.insert((cand.row, cand.col), cand);
            }
        }
    }

    // Second pass: same id claimed in more than one surviving cell.
    let mut by_id: HashMap<u32, (usize, usize)> = HashMap::new();
    let mut survivors: Vec<RawDetection> = by_cell.into_values().collect();
    survivors.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(std::cmp::Ordering::Equal));

    let mut final_cells: HashMap<(usize, usize), RawDetection> = HashMap::new();
    for cand in survivors {
        if let Some(&existing_cell) = by_id.get(&cand.id) {
            // cand scored lower than whatever already claimed this id, since
            // survivors is sorted descending by score.
            conflicts.push(TagConflict::Id {
                marker_id: cand.id,
                kept_cell: existing_cell,
                discarded_cell: (cand.row, cand.col),
                kept_score: final_cells[&existing_cell].score(),
                discarded_score: cand.score(),
            });
            warnings.push(format!(
                "duplicate id {} resolved: kept at {:?}, discarded at ({}, {})",
                cand.id, existing_cell, cand.row, cand.col
            ));
            continue;
        }
        by_id.insert(cand.id, (cand.row, cand.col));
        final_cells.insert((cand.row, cand.col), cand);
    }

    let mut ids = [[0u32; 8]; 8];
    let mut detections = Vec::with_capacity(final_cells.len());
    for ((row, col), cand) in &final_cells {
        ids[*row][*col] = cand.id;
        detections.push(cand.into_detection());
    }
    detections.sort_by_key(|d| (d.row, d.col));

    TagObs {
        frame_index,
        ids,
        detections,
        conflicts,
        warnings,
    }
}

/// Detects fiducial piece tags on rectified board images.
#[derive(Debug, Default)]
pub struct TagObserver;

#[cfg(feature = "opencv")]
impl TagObserver {
    /// Detect tags on `rectified_path`, mapping marker centers to grid cells
    /// by nearest cell center, scoring each candidate, and resolving
    /// conflicts (spec §4.C.2).
    pub fn observe(&self, frame_index: usize, rectified_path: &std::path::Path) -> VisionResult<TagObs> {
        use opencv::objdetect::{ArucoDetector, DetectorParameters, PredefinedDictionaryType, RefineParameters};
        use opencv::prelude::*;
        use opencv::types::{VectorOfMat, VectorOfVectorOfPoint2f, VectorOfi32};
        use opencv::{imgcodecs, objdetect};

        let path = rectified_path.to_str().ok_or_else(|| {
            crate::error::VisionError::InputUnreadable("rectified path is not valid UTF-8".to_string())
        })?;
        let image = imgcodecs::imread(path, imgcodecs::IMREAD_COLOR)?;
        if image.empty() {
            return Ok(resolve_conflicts(frame_index, Vec::new()));
        }
        let side = image.cols();
        let cell_size = f64::from(side) / 8.0;

        let dictionary = objdetect::get_predefined_dictionary(PredefinedDictionaryType::DICT_4X4_50)?;
        let params = DetectorParameters::default()?;
        let refine = RefineParameters {
            error_correction_rate: 3.0,
            check_all_orders: true,
            min_rep_distance: 0.5,
        };
        let detector = ArucoDetector::new(&dictionary, &params, refine)?;

        let mut corners = VectorOfVectorOfPoint2f::new();
        let mut ids = VectorOfi32::new();
        let mut rejected = VectorOfMat::new();
        detector.detect_markers(&image, &mut corners, &mut ids, &mut rejected)?;

        let mut candidates = Vec::new();
        for (i, marker_corners) in corners.iter().enumerate() {
            let Ok(id) = ids.get(i) else { continue };
            if id < 0 {
                continue;
            }
            let pts: Vec<(f64, f64)> = marker_corners.iter().map(|p| (f64::from(p.x), f64::from(p.y))).collect();
            let cx = pts.iter().map(|p| p.0).sum::<f64>() / pts.len() as f64;
            let cy = pts.iter().map(|p| p.1).sum::<f64>() / pts.len() as f64;
            let area = shoelace_area(&pts);

            let col = ((cx / cell_size).floor() as isize).clamp(0, 7) as usize;
            let row = ((cy / cell_size).floor() as isize).clamp(0, 7) as usize;

            let margin_to_edge = [cx, cy, f64::from(side) - cx, f64::from(side) - cy]
                .into_iter()
                .fold(f64::INFINITY, f64::min);
            let border_penalty = (1.0 - margin_to_edge / (cell_size / 2.0)).clamp(0.0, 1.0);

            candidates.push(RawDetection {
                id: id as u32,
                row,
                col,
                center: (cx, cy),
                area,
                decode_margin: 1.0,
                border_penalty,
            });
        }

        Ok(resolve_conflicts(frame_index, candidates))
    }
}

#[cfg(feature = "opencv")]
fn shoelace_area(pts: &[(f64, f64)]) -> f64 {
    if pts.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..pts.len() {
        let (x1, y1) = pts[i];
        let (x2, y2) = pts[(i + 1) % pts.len()];
        sum += x1 * y2 - x2 * y1;
    }
    (sum / 2.0).abs()
}
