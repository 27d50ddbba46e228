//! Frame Sampler (spec §4.A): decode a video, compute a motion trace, and
//! select stable frames as the median of each maximal low-motion run.
//!
//! Resize-then-diff motion estimation, generalized from "find the center of
//! motion" to "find runs where motion stays below a threshold". The
//! run-selection logic is pure and frame-decode-agnostic, so it's tested
//! directly; only the `opencv`-gated `sample` entry point touches real video
//! decode.

use otbscribe_models::frame::StableFrame;
use otbscribe_models::run::RunParams;
use tracing::{debug, info, instrument};

use crate::error::{VisionError, VisionResult};

/// Number of consecutive stable-flagged samples required before a run is
/// long enough to emit a `StableFrame` (spec §4.A step 3: `ceil(target_fps *
/// stable_duration_secs)`).
#[must_use]
pub fn required_run_len(target_fps: f64, stable_duration_secs: f64) -> usize {
    (target_fps * stable_duration_secs).ceil().max(1.0) as usize
}

/// Mean absolute per-pixel grayscale difference between two equal-length
/// buffers, normalized to `[0,1]` (spec §4.A step 2:
/// `mean(|frame_t - frame_{t-1}|) / 255`).
///
/// # Panics
/// Panics if `prev` and `curr` differ in length — both come from the same
/// fixed-size downscaled grayscale buffer within one run.
#[must_use]
pub fn motion_energy(prev: &[u8], curr: &[u8]) -> f64 {
    assert_eq!(prev.len(), curr.len(), "motion buffers must be equal length");
    if prev.is_empty() {
        return 0.0;
    }
    let sum: u64 = prev
        .iter()
        .zip(curr)
        .map(|(&a, &b)| i32::from(a).abs_diff(i32::from(b)) as u64)
        .sum();
    sum as f64 / (prev.len() as f64 * 255.0)
}

/// Given a motion trace already classified into stable/unstable samples,
/// select the index of the middle sample of every maximal stable run whose
/// length meets `required_run_len`, enforcing a minimum gap of
/// `stable_duration_secs` between selections (spec §4.A steps 3-4).
///
/// Falls back to index `0` if the trace is non-empty but no run qualifies
/// (spec §4.A step 5, "degenerate result").
#[must_use]
pub fn select_stable_indices(
    samples: &[otbscribe_models::frame::MotionSample],
    target_fps: f64,
    stable_duration_secs: f64,
) -> Vec<usize> {
    let run_len = required_run_len(target_fps, stable_duration_secs);
    let mut selected = Vec::new();
    let mut last_capture_time: Option<f64> = None;

    let mut i = 0;
    while i < samples.len() {
        if !samples[i].is_stable {
            i += 1;
            continue;
        }
        let start = i;
        while i < samples.len() && samples[i].is_stable {
            i += 1;
        }
        let run_length = i - start;
        if run_length >= run_len {
            let mid = start + run_length / 2;
            let t = samples[mid].time_seconds;
            let gap_ok = match last_capture_time {
                None => true,
                Some(lt) => t - lt >= stable_duration_secs,
            };
            if gap_ok {
                selected.push(mid);
                last_capture_time = Some(t);
            }
        }
    }

    if selected.is_empty() && !samples.is_empty() {
        selected.push(0);
    }
    selected
}

/// Decodes video and emits stable frames plus the motion trace.
#[derive(Debug, Default)]
pub struct FrameSampler;

#[cfg(feature = "opencv")]
impl FrameSampler {
    /// Decode `video_path`, downsample to `params.sampling_fps`, compute the
    /// motion trace, pick stable frames, and persist each selected frame's
    /// image under `store`'s `debug/stable_frames/` directory (spec §4.A, §4.F).
    #[instrument(skip(self, store), fields(video = %video_path.display()))]
    pub fn sample(
        &self,
        video_path: &std::path::Path,
        params: &RunParams,
        store: &otbscribe_store::RunStore,
    ) -> VisionResult<(Vec<StableFrame>, Vec<otbscribe_models::frame::MotionSample>)> {
        use opencv::core::Size;
        use opencv::prelude::*;
        use opencv::videoio::{VideoCapture, CAP_ANY};
        use opencv::{imgcodecs, imgproc, videoio};

        let mut cap = VideoCapture::from_file(
            video_path.to_str().ok_or_else(|| {
                VisionError::InputUnreadable("video path is not valid UTF-8".to_string())
            })?,
            CAP_ANY,
        )?;
        if !videoio::VideoCapture::is_opened(&cap)? {
            return Err(VisionError::InputUnreadable(format!(
                "could not open {}",
                video_path.display()
            )));
        }

        let source_fps = cap.get(videoio::CAP_PROP_FPS)?.max(1.0);
        let skip = (source_fps / params.sampling_fps).round().max(1.0) as u32;

        let proc_size = Size::new(160, 90);
        let mut prev_gray: Option<Vec<u8>> = None;
        let mut frame_idx: u32 = 0;
        let mut sampled_idx: usize = 0;
        let mut trace = Vec::new();

        let mut frame = Mat::default();
        loop {
            if !cap.read(&mut frame)? {
                break;
            }
            if frame_idx % skip != 0 {
                frame_idx += 1;
                continue;
            }
            let timestamp = f64::from(frame_idx) / source_fps;

            let mut small = Mat::default();
            imgproc::resize(&frame, &mut small, proc_size, 0.0, 0.0, imgproc::INTER_AREA)?;
            let mut gray = Mat::default();
            imgproc::cvt_color(
                &small,
                &mut gray,
                imgproc::COLOR_BGR2GRAY,
                0,
                opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
            )?;
            let bytes: Vec<u8> = gray.data_bytes()?.to_vec();

            let motion = match &prev_gray {
                Some(prev) => motion_energy(prev, &bytes),
                None => 0.0,
            };
            let is_stable = motion < params.motion_threshold;
            trace.push(otbscribe_models::frame::MotionSample {
                time_seconds: timestamp,
                motion_energy: motion,
                is_stable,
            });
            store.append_csv_row(
                &store.paths().motion_csv(),
                &otbscribe_store::MotionCsvRow {
                    time: timestamp,
                    motion,
                    is_stable,
                },
            )?;

            prev_gray = Some(bytes);
            frame_idx += 1;
            sampled_idx += 1;
            let _ = sampled_idx;
        }

        let chosen = select_stable_indices(&trace, params.sampling_fps, params.stable_duration_secs);
        info!(count = chosen.len(), "selected stable frames");

        // Second pass: re-read the chosen sampled frames to persist images
        // (cheap re-open since stable frames are sparse relative to the trace).
        let mut cap2 = VideoCapture::from_file(video_path.to_str().unwrap_or_default(), CAP_ANY)?;
        let mut stable_frames = Vec::with_capacity(chosen.len());
        let mut sample_ordinal: u32 = 0;
        let mut frame2 = Mat::default();
        let mut frame_idx2: u32 = 0;
        let mut next_chosen = chosen.iter().copied().peekable();
        while next_chosen.peek().is_some() {
            if !cap2.read(&mut frame2)? {
                break;
            }
            if frame_idx2 % skip != 0 {
                frame_idx2 += 1;
                continue;
            }
            if next_chosen.peek() == Some(&(sample_ordinal as usize)) {
                let index = stable_frames.len();
                let path = store.paths().stable_frame_png(index);
                imgcodecs::imwrite(
                    path.to_str().unwrap_or_default(),
                    &frame2,
                    &opencv::core::Vector::new(),
                )?;
                let timestamp = f64::from(frame_idx2) / source_fps;
                debug!(index, timestamp, "persisted stable frame");
                stable_frames.push(StableFrame {
                    index,
                    timestamp_seconds: timestamp,
                    image_path: path,
                });
                next_chosen.next();
            }
            sample_ordinal += 1;
            frame_idx2 += 1;
        }

        Ok((stable_frames, trace))
    }
}
