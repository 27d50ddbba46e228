//! Round trips of a run directory's JSON/CSV artifacts through `RunStore`,
//! the way `otbscribe-cli`'s pipeline writes and later reopens them.

use otbscribe_models::piece_map::{ColorDef, PieceMapEntry, RoleDef, SquareDef};
use otbscribe_models::{Mode, PieceMap, RunId, RunParams};
use otbscribe_store::{
    BoardIdsFile, BoardIdsFrame, BoardIdsOverrideFile, MotionCsvRow, RunMeta, RunStore,
};

fn standard_piece_map() -> PieceMap {
    let mut entries = Vec::new();
    let back_rank = [
        RoleDef::Rook,
        RoleDef::Knight,
        RoleDef::Bishop,
        RoleDef::Queen,
        RoleDef::King,
        RoleDef::Bishop,
        RoleDef::Knight,
        RoleDef::Rook,
    ];
    let mut id = 1;
    for (color, back_row, pawn_row) in [(ColorDef::White, '1', '2'), (ColorDef::Black, '8', '7')] {
        for (file, role) in back_rank.iter().enumerate() {
            entries.push(PieceMapEntry {
                tag_id: id,
                role: *role,
                color,
                initial_square: SquareDef(format!("{}{back_row}", (b'a' + file as u8) as char)),
            });
            id += 1;
        }
        for file in 0..8 {
            entries.push(PieceMapEntry {
                tag_id: id,
                role: RoleDef::Pawn,
                color,
                initial_square: SquareDef(format!("{}{pawn_row}", (b'a' + file as u8) as char)),
            });
            id += 1;
        }
    }
    PieceMap::new(entries).unwrap()
}

#[test]
fn run_meta_roundtrips_with_failure_reason_set() {
    let dir = tempfile::tempdir().unwrap();
    let store = RunStore::create(dir.path()).unwrap();

    let meta = RunMeta {
        run_id: RunId::new(chrono::Utc::now()),
        input_file: "game.mp4".into(),
        mode: Mode::Photometric,
        timestamp: chrono::Utc::now(),
        params: RunParams::default(),
        failure_reason: Some("TooFewStableFrames".to_string()),
    };
    store.write_json(&store.paths().run_meta(), &meta).unwrap();

    let back: RunMeta = store.read_json(&store.paths().run_meta()).unwrap();
    assert_eq!(back.run_id, meta.run_id);
    assert_eq!(back.failure_reason.as_deref(), Some("TooFewStableFrames"));
}

#[test]
fn board_ids_file_roundtrips_with_piece_map() {
    let dir = tempfile::tempdir().unwrap();
    let store = RunStore::create(dir.path()).unwrap();
    let map = standard_piece_map();

    let file = BoardIdsFile {
        piece_map: map.clone(),
        frames: vec![BoardIdsFrame {
            index: 0,
            frame: dir.path().join("debug/stable_frames/00000.png"),
            board_ids: [[0u32; 8]; 8],
            overlay: dir.path().join("debug/tag_overlays/00000.png"),
            tags: vec![],
        }],
    };
    store.write_json(&store.paths().board_ids(), &file).unwrap();

    let back: BoardIdsFile = store.read_json(&store.paths().board_ids()).unwrap();
    assert_eq!(back.frames.len(), 1);
    assert_eq!(back.piece_map.entries().len(), map.entries().len());
}

#[test]
fn override_file_is_detected_only_once_written() {
    let dir = tempfile::tempdir().unwrap();
    let store = RunStore::create(dir.path()).unwrap();
    let override_path = store.paths().board_ids_override();

    assert!(!store.exists(&override_path));

    let over = BoardIdsOverrideFile {
        from_index: 3,
        frames: vec![BoardIdsFrame {
            index: 3,
            frame: dir.path().join("debug/stable_frames/00003.png"),
            board_ids: [[0u32; 8]; 8],
            overlay: dir.path().join("debug/tag_overlays/00003.png"),
            tags: vec![],
        }],
    };
    store.write_json(&override_path, &over).unwrap();

    assert!(store.exists(&override_path));
    let back: BoardIdsOverrideFile = store.read_json(&override_path).unwrap();
    assert_eq!(back.from_index, 3);
    assert_eq!(back.frames.len(), 1);
}

#[test]
fn motion_csv_accumulates_rows_across_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = RunStore::create(dir.path()).unwrap();
    let path = store.paths().motion_csv();

    for i in 0..5 {
        store
            .append_csv_row(
                &path,
                &MotionCsvRow {
                    time: i as f64 * 0.5,
                    motion: 0.01,
                    is_stable: true,
                },
            )
            .unwrap();
    }

    let rows: Vec<MotionCsvRow> = store.read_csv(&path).unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4].time, 2.0);
}
