//! Frame sampling, board localization, and square observation (spec §4.A-C).
//!
//! Pure, frame-decode-agnostic logic (motion-run selection, homography
//! solving, quad ordering, detection scoring, conflict resolution,
//! calibration/classification) lives alongside the `opencv`-gated code that
//! drives real video decode and image processing, so the former is unit
//! tested without an OpenCV build.

pub mod error;
pub mod locate;
pub mod observe;
pub mod sampler;

pub use error::{VisionError, VisionResult};
pub use locate::{compute_homography, order_quad_points, BoardLocator, LocatedBoard, MarkerPolicy};
pub use observe::{CalibrationSamples, PhotometricObserver, RawDetection, TagObserver};
pub use sampler::{motion_energy, required_run_len, select_stable_indices, FrameSampler};
