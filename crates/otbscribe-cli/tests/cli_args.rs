//! Argument parsing for the `analyze`/`watch` subcommands (spec §6).

use clap::Parser;

use otbscribe_cli::cli::{Cli, Cmd, ModeOpt, OrientationOpt};
use otbscribe_models::run::MarkerPolicy;

#[test]
fn analyze_parses_tag_mode_with_explicit_orientation_and_piece_map() {
    let cli = Cli::parse_from([
        "otbscribe",
        "analyze",
        "--input",
        "game.mp4",
        "--outdir",
        "runs/game_1",
        "--mode",
        "tag",
        "--orientation",
        "black-bottom",
        "--piece-map",
        "map.json",
        "--use-markers",
        "0",
    ]);

    match cli.cmd {
        Cmd::Analyze { opts, input, outdir } => {
            assert_eq!(input, std::path::PathBuf::from("game.mp4"));
            assert_eq!(outdir, std::path::PathBuf::from("runs/game_1"));
            assert_eq!(opts.mode, ModeOpt::Tag);
            assert_eq!(opts.orientation, OrientationOpt::BlackBottom);
            assert_eq!(opts.piece_map, Some(std::path::PathBuf::from("map.json")));
            assert_eq!(opts.marker_policy(), MarkerPolicy::MarkersOptional);
        }
        Cmd::Watch { .. } => panic!("expected Analyze"),
    }
}

#[test]
fn analyze_defaults_to_photometric_white_bottom_and_required_markers() {
    let cli = Cli::parse_from(["otbscribe", "analyze", "--input", "game.mp4", "--outdir", "out"]);

    match cli.cmd {
        Cmd::Analyze { opts, .. } => {
            assert_eq!(opts.mode, ModeOpt::Photometric);
            assert_eq!(opts.orientation, OrientationOpt::WhiteBottom);
            assert_eq!(opts.marker_policy(), MarkerPolicy::MarkersRequired);
            assert_eq!(opts.depth, 16);
            assert_eq!(opts.pv, 6);
            assert!(opts.piece_map.is_none());
        }
        Cmd::Watch { .. } => panic!("expected Analyze"),
    }
}

#[test]
fn watch_parses_inbox_outroot_and_poll_interval() {
    let cli = Cli::parse_from([
        "otbscribe",
        "watch",
        "--inbox",
        "inbox",
        "--outroot",
        "runs",
        "--poll-interval-secs",
        "10",
    ]);

    match cli.cmd {
        Cmd::Watch {
            inbox,
            outroot,
            poll_interval_secs,
            ..
        } => {
            assert_eq!(inbox, std::path::PathBuf::from("inbox"));
            assert_eq!(outroot, std::path::PathBuf::from("runs"));
            assert_eq!(poll_interval_secs, 10);
        }
        Cmd::Analyze { .. } => panic!("expected Watch"),
    }
}

#[test]
fn analyze_requires_input_and_outdir() {
    let result = Cli::try_parse_from(["otbscribe", "analyze"]);
    assert!(result.is_err());
}
