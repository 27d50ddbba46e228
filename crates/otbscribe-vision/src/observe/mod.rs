//! Square observers: photometric occupancy/color and fiducial tag identity
//! (spec §4.C).

pub mod photometric;
pub mod tag;

pub use photometric::{CalibrationSamples, PhotometricObserver};
pub use tag::{RawDetection, TagObserver};
