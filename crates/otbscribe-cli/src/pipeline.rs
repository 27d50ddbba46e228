//! End-to-end orchestration of stages A-F for one run (spec §4, §6).
//!
//! `analyze`/`watch` both funnel into [`run`]: sample stable frames, locate
//! and rectify the board in each, observe squares (photometric or tag),
//! decode the move sequence, annotate it with the engine, and persist every
//! artifact in spec §4.F's layout.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use otbscribe_chess::board::BoardState;
use otbscribe_chess::decode::{photometric as photometric_decode, tag as tag_decode};
use otbscribe_engine::annotate::{select_key_plies, Annotator, PlyToAnnotate};
use otbscribe_engine::client::{resolve_engine_path, UciClient};
use otbscribe_models::calibration::Lab;
use otbscribe_models::frame::cell_to_square;
use otbscribe_models::game::{Classification, Eval, Game, GameHeaders, MoveRecord};
use otbscribe_models::observation::{PhotometricObs, TagObs};
use otbscribe_models::run::{Mode, Orientation, RunParams};
use otbscribe_models::{ModelError, PieceMap, RunId};
use otbscribe_store::{
    AnalysisJson, AnalysisMetadata, BoardIdsFile, BoardIdsFrame, BoardIdsOverrideFile,
    BoardStateSnapshot, BoardStatesSnapshot, DiagnosticReport, FrameDiagnostic, MovesJsonEntry,
    RunMeta, RunStore, StepConfidenceEntry, TagMetricsCsvRow, UncertainMoveEntry,
};
use otbscribe_vision::observe::photometric::{calibrate, classify_cell, is_light_checker_square};
use otbscribe_vision::observe::{CalibrationSamples, PhotometricObserver, TagObserver};
use otbscribe_vision::{BoardLocator, FrameSampler};
use tracing::{info, instrument, warn};

use crate::cli::PipelineOpts;
use crate::error::{CliError, CliResult};

impl PipelineOpts {
    fn to_run_params(&self) -> RunParams {
        RunParams {
            sampling_fps: self.fps,
            motion_threshold: self.motion_threshold,
            stable_duration_secs: self.stable_duration,
            mode: self.mode.into(),
            orientation: self.orientation.into(),
            marker_policy: self.marker_policy(),
            board_size_px: self.board_size_px,
            engine_depth: self.depth,
            pv_length: self.pv,
            engine_timeout: std::time::Duration::from_millis(self.engine_timeout_ms),
            tag_id_range: (1, 32),
        }
    }
}

/// One rectified frame that survived Stage B, in observation order.
struct RectifiedFrame {
    /// Index into the original `stable_frames` sequence (used for debug
    /// artifact filenames); not necessarily dense, since a failing
    /// non-first frame is skipped (spec §7 "Propagation policy").
    source_index: usize,
    image_path: PathBuf,
}

/// Run the full pipeline once over `input`, writing every artifact under
/// `outdir` (spec §4, §6 `analyze`). On a stage-fatal error, `run_meta.json`
/// is updated with a typed `failure_reason` before the error propagates.
#[instrument(skip(opts), fields(input = %input.display(), outdir = %outdir.display()))]
pub async fn run(input: &Path, outdir: &Path, opts: &PipelineOpts) -> CliResult<Game> {
    let params = opts.to_run_params();
    let store = RunStore::create(outdir)?;

    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| CliError::MissingExtension(input.to_path_buf()))?;
    let input_copy_path = store.paths().input(extension);
    if input.canonicalize().ok() != input_copy_path.canonicalize().ok() {
        if let Ok(bytes) = std::fs::read(input) {
            store.write_atomic(&input_copy_path, &bytes)?;
        }
    }

    let run_id = RunId::new(chrono::Utc::now());
    let mut run_meta = RunMeta {
        run_id,
        input_file: input.to_path_buf(),
        mode: params.mode,
        timestamp: chrono::Utc::now(),
        params: params.clone(),
        failure_reason: None,
    };
    store.write_json(&store.paths().run_meta(), &run_meta)?;

    let piece_map = match params.mode {
        Mode::Tag => Some(load_piece_map(opts.piece_map.as_deref().ok_or(CliError::MissingPieceMap)?)?),
        Mode::Photometric => None,
    };

    let result = run_stages(&store, input, &params, piece_map.as_ref(), opts).await;

    match &result {
        Ok(_) => {
            run_meta.failure_reason = None;
            let _ = store.write_json(&store.paths().run_meta(), &run_meta);
        }
        Err(e) => {
            run_meta.failure_reason = Some(e.type_name().to_string());
            let _ = store.write_json(&store.paths().run_meta(), &run_meta);
        }
    }
    result
}

fn load_piece_map(path: &Path) -> CliResult<PieceMap> {
    let bytes = std::fs::read(path)?;
    let entries = serde_json::from_slice(&bytes)?;
    PieceMap::new(entries).map_err(CliError::from)
}

async fn run_stages(
    store: &RunStore,
    input: &Path,
    params: &RunParams,
    piece_map: Option<&PieceMap>,
    opts: &PipelineOpts,
) -> CliResult<Game> {
    // Stage A: frame sampling.
    let sampler = FrameSampler;
    let (stable_frames, _motion) = sampler.sample(input, params, store)?;
    if stable_frames.len() < 2 {
        return Err(CliError::Model(ModelError::TooFewStableFrames));
    }
    info!(count = stable_frames.len(), "stage A: stable frames extracted");

    // Stage B: board localization, one frame at a time. A non-first
    // failure is skipped, not fatal (spec §7).
    let locator = BoardLocator;
    let mut rectified = Vec::new();
    let mut frame_diagnostics = Vec::with_capacity(stable_frames.len());
    for frame in &stable_frames {
        match locator.locate(
            &frame.image_path,
            frame.index,
            params.marker_policy,
            params.board_size_px,
            store,
        ) {
            Ok(Some(located)) => {
                rectified.push(RectifiedFrame {
                    source_index: frame.index,
                    image_path: located.rectified_image_path,
                });
                frame_diagnostics.push(FrameDiagnostic {
                    frame_index: frame.index,
                    corners_detected: true,
                    note: "board located".to_string(),
                });
            }
            Ok(None) | Err(_) if frame.index == 0 => {
                return Err(CliError::Model(ModelError::BoardNotFound { frame_index: 0 }));
            }
            Ok(None) => {
                warn!(frame = frame.index, "board not found, skipping frame");
                frame_diagnostics.push(FrameDiagnostic {
                    frame_index: frame.index,
                    corners_detected: false,
                    note: "no quadrilateral found".to_string(),
                });
            }
            Err(e) => {
                warn!(frame = frame.index, error = %e, "board localization failed, skipping frame");
                frame_diagnostics.push(FrameDiagnostic {
                    frame_index: frame.index,
                    corners_detected: false,
                    note: e.to_string(),
                });
            }
        }
    }
    if rectified.len() < 2 {
        return Err(CliError::Model(ModelError::TooFewStableFrames));
    }
    info!(count = rectified.len(), "stage B: boards rectified");

    // Stage C+D: observe squares, then decode the move sequence.
    let (final_board, decoded, result, unique_id_counts, stage_warnings) = match params.mode {
        Mode::Photometric => {
            let (board, decoded, result) = run_photometric(store, &rectified, params.orientation)?;
            (board, decoded, result, Vec::new(), Vec::new())
        }
        Mode::Tag => {
            let map = piece_map.expect("validated by caller: Tag mode requires a piece map");
            run_tag(store, &rectified, map, params.orientation)?
        }
    };
    let _ = final_board;
    info!(plies = decoded.len(), "stage D: moves decoded");

    // Stage E: engine annotation (optional; failures degrade gracefully).
    let moves = annotate_plies(&decoded, params, opts).await;

    let key_plies = select_key_plies(&moves);
    let uncertain_plies: Vec<usize> = moves.iter().filter(|m| m.uncertain).map(|m| m.ply).collect();

    let game = Game {
        headers: GameHeaders::default(),
        moves,
        result,
        key_plies,
        uncertain_plies,
    };

    write_output_artifacts(store, &game, params)?;
    write_diagnostics(store, frame_diagnostics, unique_id_counts, stage_warnings, &game)?;
    Ok(game)
}

/// Write `diagnostic.html` (spec §7 "User-visible behavior") and the
/// supplemental `debug/board_states.json` audit snapshot.
fn write_diagnostics(
    store: &RunStore,
    frames: Vec<FrameDiagnostic>,
    unique_id_counts: Vec<usize>,
    warnings: Vec<String>,
    game: &Game,
) -> CliResult<()> {
    let report = DiagnosticReport {
        frames,
        unique_id_counts,
        warnings,
        uncertain_plies: game.uncertain_plies.clone(),
    };
    store.write_atomic(&store.paths().diagnostic_html(), report.to_html().as_bytes())?;
    Ok(())
}

/// Rank index (0 = rank 1, 7 = rank 8) of grid row `row` under `orientation`,
/// reusing the established cell/square conversion rather than depending on
/// `shakmaty::Rank`'s internals directly.
fn rank_index(row: usize, orientation: Orientation) -> u32 {
    cell_to_square(row, 0, orientation).rank() as u32
}

/// Build Phase A/B calibration samples from one rectified board's extracted
/// cells: ranks 3-6 grouped by checker color (Phase A), ranks 1-2/7-8
/// grouped by the mover's photometric label (Phase B), per spec §4.C.1.
fn build_calibration_samples(cells: &[[(Lab, f64); 8]; 8], orientation: Orientation) -> CalibrationSamples {
    let mut samples = CalibrationSamples::default();
    for (row, row_cells) in cells.iter().enumerate() {
        let rank = rank_index(row, orientation);
        for (col, &(lab, edge)) in row_cells.iter().enumerate() {
            if (2..=5).contains(&rank) {
                if is_light_checker_square(row, col) {
                    samples.light_square_patches.push(lab);
                    samples.light_square_edge_scores.push(edge);
                } else {
                    samples.dark_square_patches.push(lab);
                    samples.dark_square_edge_scores.push(edge);
                }
            } else if rank <= 1 {
                samples.dark_piece_l.push(lab.l);
            } else if rank >= 6 {
                samples.light_piece_l.push(lab.l);
            }
        }
    }
    samples
}

type DecodeOutcome = (BoardState, Vec<otbscribe_chess::DecodedPly>, otbscribe_models::game::GameResult);

fn run_photometric(
    store: &RunStore,
    rectified: &[RectifiedFrame],
    orientation: Orientation,
) -> CliResult<DecodeOutcome> {
    let observer = PhotometricObserver;

    let first_cells = observer.extract_cells(&rectified[0].image_path)?;
    let calib_samples = build_calibration_samples(&first_cells, orientation);
    let calib = calibrate(&calib_samples)?;

    store.write_json(
        &store.paths().calibration_phase_a_json(),
        &serde_json::json!({
            "template_light_sq": calib.template_light_sq,
            "template_dark_sq": calib.template_dark_sq,
            "t1_color_diff": calib.t1_color_diff,
            "t2_edge_score": calib.t2_edge_score,
        }),
    )?;
    store.write_json(
        &store.paths().calibration_phase_b_json(),
        &serde_json::json!({ "t_ld": calib.t_ld }),
    )?;

    let mut observations = Vec::with_capacity(rectified.len());
    for frame in rectified {
        let cells = if frame.source_index == rectified[0].source_index {
            first_cells
        } else {
            observer.extract_cells(&frame.image_path)?
        };

        let mut grid = [[otbscribe_models::observation::SquareColor::Empty; 8]; 8];
        let mut confidence = [[0.0f64; 8]; 8];
        for row in 0..8 {
            for col in 0..8 {
                let (patch, edge) = cells[row][col];
                let (label, conf) = classify_cell(patch, edge, is_light_checker_square(row, col), &calib);
                grid[row][col] = label;
                confidence[row][col] = conf;
            }
        }
        observations.push(PhotometricObs {
            frame_index: frame.source_index,
            cells: grid,
            confidence,
        });
    }

    let snapshots: Vec<BoardStateSnapshot> = observations
        .iter()
        .map(|obs| BoardStateSnapshot {
            frame_index: obs.frame_index,
            fen_piece_placement: encode_photometric_grid(&obs.cells),
        })
        .collect();
    store.write_json(&store.paths().board_states_json(), &BoardStatesSnapshot { snapshots })?;

    let (board, decoded) = photometric_decode::decode(&observations, orientation);
    let outcome_result = board.terminal_result();
    Ok((board, decoded, outcome_result))
}

/// Encode an 8×8 photometric grid as a compact FEN-piece-placement-style
/// string (empty runs collapsed to digits, `L`/`D` for light/dark), for the
/// supplemental `board_states.json` audit snapshot.
fn encode_photometric_grid(cells: &[[otbscribe_models::observation::SquareColor; 8]; 8]) -> String {
    use otbscribe_models::observation::SquareColor;

    cells
        .iter()
        .map(|row| {
            let mut out = String::new();
            let mut empty_run = 0u32;
            for &cell in row {
                match cell {
                    SquareColor::Empty => empty_run += 1,
                    SquareColor::Light | SquareColor::Dark => {
                        if empty_run > 0 {
                            out.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        out.push(if cell == SquareColor::Light { 'L' } else { 'D' });
                    }
                }
            }
            if empty_run > 0 {
                out.push_str(&empty_run.to_string());
            }
            out
        })
        .collect::<Vec<_>>()
        .join("/")
}

type TagDecodeOutcome = (BoardState, Vec<otbscribe_chess::DecodedPly>, otbscribe_models::game::GameResult, Vec<usize>, Vec<String>);

fn run_tag(
    store: &RunStore,
    rectified: &[RectifiedFrame],
    piece_map: &PieceMap,
    orientation: Orientation,
) -> CliResult<TagDecodeOutcome> {
    let observer = TagObserver;
    let mut observations: Vec<TagObs> = Vec::with_capacity(rectified.len());
    let mut board_id_frames = Vec::with_capacity(rectified.len());

    for frame in rectified {
        let obs = observer.observe(frame.source_index, &frame.image_path)?;
        for det in &obs.detections {
            store.append_csv_row(
                &store.paths().tag_metrics_csv(),
                &TagMetricsCsvRow {
                    frame_index: frame.source_index,
                    tag_id: det.id,
                    row: det.row,
                    col: det.col,
                    area: det.area,
                    decode_margin: det.decode_margin,
                    border_penalty: det.border_penalty,
                    score: det.score,
                },
            )?;
        }
        board_id_frames.push(BoardIdsFrame {
            index: frame.source_index,
            frame: frame.image_path.clone(),
            board_ids: obs.ids,
            overlay: store.paths().tag_overlay_png(frame.source_index),
            tags: obs.detections.clone(),
        });
        observations.push(obs);
    }

    // Apply a human-supplied override, if present: replace frames from
    // `from_index` onward and redecode (spec §6 "Override semantics").
    let override_path = store.paths().board_ids_override();
    if store.exists(&override_path) {
        let over: BoardIdsOverrideFile = store.read_json(&override_path)?;
        for (offset, frame) in over.frames.into_iter().enumerate() {
            let idx = over.from_index + offset;
            if let Some(slot) = board_id_frames.get_mut(idx) {
                *slot = frame.clone();
            }
            if let Some(obs_slot) = observations.get_mut(idx) {
                *obs_slot = TagObs {
                    frame_index: frame.index,
                    ids: frame.board_ids,
                    detections: frame.tags,
                    conflicts: vec![],
                    warnings: vec![],
                };
            }
        }
        info!(from_index = over.from_index, "applied board_ids_override.json, redecoding");
    }

    store.write_json(
        &store.paths().board_ids(),
        &BoardIdsFile {
            piece_map: piece_map.clone(),
            frames: board_id_frames,
        },
    )?;

    let unique_id_counts: Vec<usize> = observations.iter().map(|o| o.unique_id_count()).collect();
    let mut warnings: Vec<String> = Vec::new();
    for obs in &observations {
        warnings.extend(obs.warnings.iter().cloned());
        warnings.extend(obs.conflicts.iter().map(|c| format!("{c:?}")));
    }

    let snapshots: Vec<BoardStateSnapshot> = observations
        .iter()
        .map(|obs| BoardStateSnapshot {
            frame_index: obs.frame_index,
            fen_piece_placement: encode_tag_grid(&obs.ids),
        })
        .collect();
    store.write_json(&store.paths().board_states_json(), &BoardStatesSnapshot { snapshots })?;

    let decode_result = tag_decode::decode(&observations, piece_map, orientation);
    for w in &decode_result.warnings {
        warn!(warning = %w, "tag decode warning");
    }
    warnings.extend(decode_result.warnings.iter().cloned());
    let outcome_result = decode_result.board.terminal_result();
    Ok((decode_result.board, decode_result.plies, outcome_result, unique_id_counts, warnings))
}

/// Encode an 8×8 tag-id grid as a slash-separated row string (`0` for empty
/// cells), for the supplemental `board_states.json` audit snapshot.
fn encode_tag_grid(ids: &[[u32; 8]; 8]) -> String {
    ids.iter()
        .map(|row| row.iter().map(u32::to_string).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("/")
}

async fn annotate_plies(
    decoded: &[otbscribe_chess::DecodedPly],
    params: &RunParams,
    opts: &PipelineOpts,
) -> Vec<MoveRecord> {
    let starting_fen = BoardState::new().fen();
    let plies: Vec<PlyToAnnotate> = decoded
        .iter()
        .enumerate()
        .map(|(i, ply)| PlyToAnnotate {
            ply: ply.ply,
            san: ply.san.clone(),
            uci: ply.uci.clone(),
            fen_before: if i == 0 { starting_fen.clone() } else { decoded[i - 1].fen_after.clone() },
            fen_after: ply.fen_after.clone(),
        })
        .collect();

    let engine_path = opts
        .engine_path
        .as_deref()
        .map(|p| resolve_engine_path(Some(p)))
        .unwrap_or_else(|| resolve_engine_path(None));

    let mut records = match engine_path {
        Ok(path) => match UciClient::spawn(&path, params.engine_timeout).await {
            Ok(mut client) => {
                let mut annotator = Annotator::new(&mut client, params.engine_depth, params.pv_length);
                let records = annotator.annotate(&plies).await;
                let _ = client.shutdown().await;
                records
            }
            Err(e) => {
                warn!(error = %e, "engine unavailable, annotating without evaluation");
                unannotated(&plies)
            }
        },
        Err(e) => {
            warn!(error = %e, "engine not found, annotating without evaluation");
            unannotated(&plies)
        }
    };

    for (record, ply) in records.iter_mut().zip(decoded.iter()) {
        record.uncertain = ply.uncertain;
        record.candidates = ply.candidates.clone();
    }
    records
}

fn unannotated(plies: &[PlyToAnnotate]) -> Vec<MoveRecord> {
    plies
        .iter()
        .map(|p| MoveRecord {
            ply: p.ply,
            san: p.san.clone(),
            uci: p.uci.clone(),
            fen_after: p.fen_after.clone(),
            eval: Eval::Unknown,
            pv: vec![],
            classification: Classification::Unknown,
            cp_loss: None,
            uncertain: false,
            candidates: vec![],
        })
        .collect()
}

fn write_output_artifacts(store: &RunStore, game: &Game, params: &RunParams) -> CliResult<()> {
    store.write_atomic(&store.paths().game_pgn(), game.to_pgn().as_bytes())?;

    let moves_json: Vec<MovesJsonEntry> = game
        .moves
        .iter()
        .map(|m| MovesJsonEntry {
            san: m.san.clone(),
            uci: m.uci.clone(),
            fen: m.fen_after.clone(),
        })
        .collect();
    store.write_json(&store.paths().moves_json(), &moves_json)?;

    store.write_json(
        &store.paths().analysis_json(),
        &AnalysisJson {
            moves: game.moves.clone(),
            key_moves: game.key_plies.clone(),
            metadata: AnalysisMetadata {
                depth: params.engine_depth,
                pv_length: params.pv_length,
                uncertain_moves: game.uncertain_plies.clone(),
            },
        },
    )?;

    let uncertain_entries: Vec<UncertainMoveEntry> = game
        .moves
        .iter()
        .filter(|m| m.uncertain && !m.candidates.is_empty())
        .map(|m| UncertainMoveEntry {
            ply: m.ply,
            best_score: m.candidates.first().map(|c| c.score).unwrap_or(0.0),
            runner_up_score: m.candidates.get(1).map(|c| c.score).unwrap_or(0.0),
            candidates: m.candidates.clone(),
        })
        .collect();
    store.write_json(&store.paths().uncertain_moves_json(), &uncertain_entries)?;

    let confidence_entries: Vec<StepConfidenceEntry> = game
        .moves
        .iter()
        .filter(|m| m.candidates.len() >= 2)
        .map(|m| StepConfidenceEntry {
            ply: m.ply,
            margin: m.candidates[1].score - m.candidates[0].score,
        })
        .collect();
    store.write_json(&store.paths().step_confidence_json(), &confidence_entries)?;

    Ok(())
}

/// Video extensions `watch` picks up from `--inbox` (spec §6).
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi"];

/// Poll `inbox` for new video files and run the pipeline over each one into
/// its own `<outroot>/game_<ts>/` directory, until Ctrl-C (spec §6 `watch`).
///
/// A `tokio::select!` loop between a shutdown signal and a periodic tick;
/// the "job queue" here is just the inbox directory's contents, and jobs
/// run one at a time rather than behind a semaphore, since a single local
/// pipeline run already saturates the machine's GPU/CPU budget.
pub async fn watch(inbox: &Path, outroot: &Path, opts: &PipelineOpts, poll_interval: Duration) -> CliResult<()> {
    std::fs::create_dir_all(inbox)?;
    std::fs::create_dir_all(outroot)?;

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut ticker = tokio::time::interval(poll_interval);

    info!(inbox = %inbox.display(), outroot = %outroot.display(), "watch: polling for new videos");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("watch: shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                for path in discover_new_videos(inbox, &seen) {
                    seen.insert(path.clone());
                    let outdir = outroot.join(RunId::new(chrono::Utc::now()).to_string());
                    info!(input = %path.display(), outdir = %outdir.display(), "watch: new video detected");
                    if let Err(e) = run(&path, &outdir, opts).await {
                        warn!(input = %path.display(), error = %e, "watch: run failed, continuing");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Video files under `inbox` not already in `seen`, sorted for determinism.
fn discover_new_videos(inbox: &Path, seen: &HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(inbox) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if seen.contains(&path) || !path.is_file() {
            continue;
        }
        let is_video = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_video {
            found.push(path);
        }
    }
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_index_groups_match_spec_rank_ranges() {
        // White bottom: row 7 is rank 1 (index 0), row 0 is rank 8 (index 7).
        assert_eq!(rank_index(7, Orientation::WhiteBottom), 0);
        assert_eq!(rank_index(0, Orientation::WhiteBottom), 7);
        assert_eq!(rank_index(3, Orientation::WhiteBottom), 4);
    }

    #[test]
    fn calibration_samples_partition_by_rank_band() {
        let cells = [[(Lab::new(50.0, 0.0, 0.0), 0.01); 8]; 8];
        let samples = build_calibration_samples(&cells, Orientation::WhiteBottom);
        assert_eq!(samples.dark_piece_l.len(), 16); // ranks 1-2, two rows of 8
        assert_eq!(samples.light_piece_l.len(), 16); // ranks 7-8
        assert_eq!(samples.light_square_patches.len() + samples.dark_square_patches.len(), 32); // ranks 3-6
    }

    #[test]
    fn encode_photometric_grid_collapses_empty_runs() {
        use otbscribe_models::observation::SquareColor::{Dark, Empty, Light};
        let mut grid = [[Empty; 8]; 8];
        grid[0] = [Dark, Dark, Empty, Empty, Empty, Empty, Light, Light];
        let encoded = encode_photometric_grid(&grid);
        assert_eq!(encoded.split('/').next().unwrap(), "DD4LL");
        assert_eq!(encoded.split('/').count(), 8);
    }

    #[test]
    fn encode_tag_grid_round_trips_ids() {
        let mut ids = [[0u32; 8]; 8];
        ids[0][0] = 7;
        ids[7][7] = 12;
        let encoded = encode_tag_grid(&ids);
        let rows: Vec<&str> = encoded.split('/').collect();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], "7,0,0,0,0,0,0,0");
        assert_eq!(rows[7], "0,0,0,0,0,0,0,12");
    }

    #[test]
    fn discover_new_videos_skips_seen_and_non_video_files() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("game1.mp4");
        let other = dir.path().join("notes.txt");
        std::fs::write(&video, b"fake").unwrap();
        std::fs::write(&other, b"fake").unwrap();

        let found = discover_new_videos(dir.path(), &HashSet::new());
        assert_eq!(found, vec![video.clone()]);

        let mut seen = HashSet::new();
        seen.insert(video);
        assert!(discover_new_videos(dir.path(), &seen).is_empty());
    }
}
