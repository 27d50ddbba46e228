//! Board Locator (spec §4.B): detect the board quadrilateral via fiducial
//! markers (or a contour fallback) and compute the homography that rectifies
//! it to a square of side `S`.
//!
//! Marker ids 0..3 are assigned to TL/TR/BR/BL by index, then a perspective
//! transform rectifies the quad to a square. The homography itself is solved
//! with plain Gaussian elimination rather than
//! `opencv::calib3d::get_perspective_transform`, so the projective-math core
//! is `opencv`-free and directly testable; only marker/contour detection and
//! the actual image warp are gated behind the `opencv` feature.

use otbscribe_models::frame::Homography;

use crate::error::{VisionError, VisionResult};

/// Fiducial marker ids assigned to the board's four corners, in
/// top-left/top-right/bottom-right/bottom-left order (spec §4.B step 1).
pub const CORNER_MARKER_IDS: [i32; 4] = [0, 1, 2, 3];

/// Solve an 8x8 linear system `a * x = b` by Gaussian elimination with
/// partial pivoting. Returns `None` if `a` is singular (the four source
/// points are degenerate, e.g. collinear).
fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let mut pivot_row = col;
        let mut pivot_val = a[col][col].abs();
        for row in (col + 1)..8 {
            if a[row][col].abs() > pivot_val {
                pivot_row = row;
                pivot_val = a[row][col].abs();
            }
        }
        if pivot_val < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for k in col..8 {
            a[col][k] /= pivot;
        }
        b[col] /= pivot;

        for row in 0..8 {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..8 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    Some(b)
}

/// Compute the homography mapping `src` (TL, TR, BR, BL, in source image
/// coordinates) to a square of side `size` at `{(0,0),(size,0),(size,size),
/// (0,size)}` (spec §3 "Homography" invariant).
#[must_use]
pub fn compute_homography(src: [(f64, f64); 4], size: f64) -> Option<Homography> {
    let dst = [(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)];

    let mut a = [[0.0f64; 8]; 8];
    let mut b = [0.0f64; 8];
    for (i, (&(x, y), &(u, v))) in src.iter().zip(dst.iter()).enumerate() {
        let row0 = 2 * i;
        let row1 = 2 * i + 1;
        a[row0] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y];
        b[row0] = u;
        a[row1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y];
        b[row1] = v;
    }

    let h = solve_linear_system(a, b)?;
    Some(Homography([
        [h[0], h[1], h[2]],
        [h[3], h[4], h[5]],
        [h[6], h[7], 1.0],
    ]))
}

/// Order four unordered quadrilateral vertices as TL, TR, BR, BL using the
/// `(x+y)`/`(x-y)` extrema rule (spec §4.B step 2, contour fallback
/// ordering): TL has the smallest `x+y`, BR the largest; of the remaining
/// two, TR has the larger `x-y` and BL the smaller.
#[must_use]
pub fn order_quad_points(points: [(f64, f64); 4]) -> [(f64, f64); 4] {
    let mut pts = points;
    pts.sort_by(|a, b| (a.0 + a.1).partial_cmp(&(b.0 + b.1)).unwrap());
    let tl = pts[0];
    let br = pts[3];
    let mut remaining = [pts[1], pts[2]];
    remaining.sort_by(|a, b| (a.0 - a.1).partial_cmp(&(b.0 - b.1)).unwrap());
    let bl = remaining[0];
    let tr = remaining[1];
    [tl, tr, br, bl]
}

/// Marker detection policy (spec §4.B): whether the contour fallback is
/// available when fiducials aren't found.
pub use otbscribe_models::run::MarkerPolicy;

/// Result of locating the board in one frame: the homography and the path
/// to the persisted rectified image.
#[derive(Debug, Clone)]
pub struct LocatedBoard {
    pub homography: Homography,
    pub rectified_image_path: std::path::PathBuf,
}

/// Detects the board quadrilateral in a frame and rectifies it.
#[derive(Debug, Default)]
pub struct BoardLocator;

#[cfg(feature = "opencv")]
impl BoardLocator {
    /// Locate and rectify the board in `frame_path`, trying the marker path
    /// first and falling back to contour detection when `policy` allows it
    /// (spec §4.B). Returns `Ok(None)` when neither path finds a
    /// quadrilateral and `policy` is `MarkersOptional`; returns
    /// `Err(BoardNotFound)` when `policy` is `MarkersRequired` and markers
    /// fail.
    pub fn locate(
        &self,
        frame_path: &std::path::Path,
        frame_index: usize,
        policy: MarkerPolicy,
        board_size_px: u32,
        store: &otbscribe_store::RunStore,
    ) -> VisionResult<Option<LocatedBoard>> {
        use opencv::core::{Point2f, Size};
        use opencv::objdetect::{ArucoDetector, DetectorParameters, PredefinedDictionaryType, RefineParameters};
        use opencv::prelude::*;
        use opencv::types::{VectorOfMat, VectorOfVectorOfPoint2f, VectorOfi32};
        use opencv::{imgcodecs, imgproc, objdetect};

        let src_path = frame_path
            .to_str()
            .ok_or_else(|| VisionError::InputUnreadable("frame path is not valid UTF-8".to_string()))?;
        let image = imgcodecs::imread(src_path, imgcodecs::IMREAD_COLOR)?;
        if image.empty() {
            return Err(VisionError::BoardNotFound { frame_index });
        }

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

        let src_points = find_corner_markers(&corners, &ids);

        let src = match src_points {
            Some(points) => points,
            None => {
                if matches!(policy, MarkerPolicy::MarkersRequired) {
                    return Err(VisionError::BoardNotFound { frame_index });
                }
                match self.detect_contour_quad(&image)? {
                    Some(points) => points,
                    None => return Ok(None),
                }
            }
        };

        let size = board_size_px as f64;
        let homography = compute_homography(src, size)
            .ok_or_else(|| VisionError::BoardNotFound { frame_index })?;

        let h_mat = homography_to_mat(&homography)?;
        let mut warped = Mat::default();
        imgproc::warp_perspective(
            &image,
            &mut warped,
            &h_mat,
            Size::new(board_size_px as i32, board_size_px as i32),
            imgproc::INTER_LINEAR,
            opencv::core::BORDER_CONSTANT,
            opencv::core::Scalar::default(),
        )?;

        let out_path = store.paths().warped_board_png(frame_index);
        imgcodecs::imwrite(out_path.to_str().unwrap_or_default(), &warped, &opencv::core::Vector::new())?;
        let _ = Point2f::default(); // keep import used across feature-gated branches

        Ok(Some(LocatedBoard {
            homography,
            rectified_image_path: out_path,
        }))
    }

    /// Contour fallback (spec §4.B step 2): Canny → external contours →
    /// largest 4-vertex polygon approximation.
    #[cfg(feature = "opencv")]
    fn detect_contour_quad(&self, image: &opencv::core::Mat) -> VisionResult<Option<[(f64, f64); 4]>> {
        use opencv::core::{Point, Vector};
        use opencv::prelude::*;
        use opencv::{imgproc, types::VectorOfVectorOfPoint};

        let mut gray = Mat::default();
        imgproc::cvt_color(
            image,
            &mut gray,
            imgproc::COLOR_BGR2GRAY,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;
        let mut edges = Mat::default();
        imgproc::canny(&gray, &mut edges, 50.0, 150.0, 3, false)?;

        let mut contours = VectorOfVectorOfPoint::new();
        imgproc::find_contours(
            &edges,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;

        let mut best: Option<[(f64, f64); 4]> = None;
        let mut best_area = 0.0;
        for contour in &contours {
            let area = imgproc::contour_area(&contour, false)?;
            if area <= best_area {
                continue;
            }
            let perimeter = imgproc::arc_length(&contour, true)?;
            let mut approx = Vector::<Point>::new();
            imgproc::approx_poly_dp(&contour, &mut approx, 0.02 * perimeter, true)?;
            if approx.len() == 4 {
                let pts: Vec<(f64, f64)> = approx.iter().map(|p| (f64::from(p.x), f64::from(p.y))).collect();
                let quad = [pts[0], pts[1], pts[2], pts[3]];
                best = Some(order_quad_points(quad));
                best_area = area;
            }
        }
        Ok(best)
    }
}

#[cfg(feature = "opencv")]
fn find_corner_markers(
    corners: &opencv::types::VectorOfVectorOfPoint2f,
    ids: &opencv::types::VectorOfi32,
) -> Option<[(f64, f64); 4]> {
    use std::collections::HashMap;

    let mut by_id: HashMap<i32, (f64, f64)> = HashMap::new();
    for (i, marker_corners) in corners.iter().enumerate() {
        let id = ids.get(i).ok()?;
        let mut cx = 0.0;
        let mut cy = 0.0;
        let n = marker_corners.len() as f64;
        for p in &marker_corners {
            cx += f64::from(p.x);
            cy += f64::from(p.y);
        }
        by_id.insert(id, (cx / n, cy / n));
    }

    let mut points = [(0.0, 0.0); 4];
    for (slot, marker_id) in CORNER_MARKER_IDS.iter().enumerate() {
        points[slot] = *by_id.get(marker_id)?;
    }
    Some(points)
}

#[cfg(feature = "opencv")]
fn homography_to_mat(h: &Homography) -> VisionResult<opencv::core::Mat> {
    use opencv::core::{Mat, CV_64F};
    use opencv::prelude::*;

    let mut mat = unsafe { Mat::new_rows_cols(3, 3, CV_64F)? };
    for row in 0..3 {
        for col in 0..3 {
            *mat.at_2d_mut::<f64>(row, col)? = h.0[row as usize][col as usize];
        }
    }
    Ok(mat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homography_maps_source_quad_to_unit_square() {
        let src = [(10.0, 10.0), (110.0, 20.0), (100.0, 120.0), (5.0, 100.0)];
        let h = compute_homography(src, 100.0).expect("non-degenerate quad");
        let dst = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)];
        for (&(x, y), &(u, v)) in src.iter().zip(dst.iter()) {
            let (rx, ry) = h.apply(x, y);
            assert!((rx - u).abs() < 1e-6, "rx={rx} u={u}");
            assert!((ry - v).abs() < 1e-6, "ry={ry} v={v}");
        }
    }

    #[test]
    fn collinear_points_yield_no_homography() {
        let src = [(0.0, 0.0), (10.0, 10.0), (20.0, 20.0), (30.0, 30.0)];
        assert!(compute_homography(src, 100.0).is_none());
    }

    #[test]
    fn orders_quad_as_tl_tr_br_bl() {
        let unordered = [(100.0, 100.0), (0.0, 0.0), (100.0, 0.0), (0.0, 100.0)];
        let ordered = order_quad_points(unordered);
        assert_eq!(ordered, [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
    }
}
