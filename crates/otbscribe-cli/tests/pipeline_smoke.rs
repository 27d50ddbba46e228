//! End-to-end pipeline smoke test. Requires a real OTB recording and a
//! `stockfish` binary on `PATH` (or `STOCKFISH_PATH`), so it's gated like the
//! rest of this project's infra-dependent tests.

use otbscribe_cli::cli::{ModeOpt, OrientationOpt, PipelineOpts};
use otbscribe_cli::pipeline;

#[tokio::test]
#[ignore = "requires OTBSCRIBE_TEST_VIDEO pointing at a real recording, plus OpenCV and stockfish"]
async fn analyze_a_real_recording_produces_a_nonempty_pgn() {
    let input = std::env::var("OTBSCRIBE_TEST_VIDEO").expect("OTBSCRIBE_TEST_VIDEO not set");
    let dir = tempfile::tempdir().unwrap();

    let opts = PipelineOpts {
        use_markers: 1,
        depth: 8,
        pv: 3,
        fps: 2.0,
        motion_threshold: 0.02,
        stable_duration: 1.5,
        mode: ModeOpt::Photometric,
        orientation: OrientationOpt::WhiteBottom,
        piece_map: None,
        board_size_px: 800,
        engine_timeout_ms: 5000,
        engine_path: None,
    };

    let game = pipeline::run(std::path::Path::new(&input), dir.path(), &opts)
        .await
        .expect("pipeline run failed");

    assert!(!game.moves.is_empty());
    assert!(dir.path().join("game.pgn").exists());
    assert!(dir.path().join("moves.json").exists());
    assert!(dir.path().join("run_meta.json").exists());
}
