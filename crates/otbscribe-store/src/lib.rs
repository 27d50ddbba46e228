//! Run directory layout and atomic artifact writes.
//!
//! A client struct wrapping a single resource root with typed read/write
//! methods per artifact (spec §4.F, §6) — a local run directory instead of
//! an object store bucket, but the same one-client-one-root shape.

pub mod artifacts;
pub mod error;
pub mod paths;

pub use artifacts::{
    AnalysisJson, AnalysisMetadata, AnnotatedPly, BoardIdsFile, BoardIdsFrame,
    BoardIdsOverrideFile, BoardStateSnapshot, BoardStatesSnapshot, DiagnosticReport,
    FrameDiagnostic, MotionCsvRow, MovesJsonEntry, RunMeta, StepConfidenceEntry,
    TagMetricsCsvRow, UncertainMoveEntry,
};
pub use error::{StoreError, StoreResult};
pub use paths::RunPaths;

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// A client for one run's on-disk artifacts.
///
/// Every write goes through [`RunStore::write_atomic`]: content lands at a
/// sibling temp path first, then an OS-level rename makes it visible under
/// its real name (spec §5, "atomic at file granularity"). A reader never
/// observes a partially written artifact.
#[derive(Debug, Clone)]
pub struct RunStore {
    paths: RunPaths,
}

impl RunStore {
    /// Create a store rooted at `root`, creating the directory (and its
    /// `debug/` subdirectory) if it doesn't exist yet.
    pub fn create(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::CreateDir {
            path: root.clone(),
            source,
        })?;
        let paths = RunPaths::new(root);
        std::fs::create_dir_all(paths.debug_dir()).map_err(|source| StoreError::CreateDir {
            path: paths.debug_dir(),
            source,
        })?;
        Ok(Self { paths })
    }

    /// Open a store for an existing run directory without creating anything
    /// (used by `watch`'s override-reload path, spec §6 "Override semantics").
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            paths: RunPaths::new(root),
        }
    }

    #[must_use]
    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// Write `bytes` to `path` atomically: write to a sibling `.tmp-<pid>`
    /// file, flush, then rename over the destination.
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let tmp_path = path.with_extension(format!(
            "tmp-{}",
            std::process::id()
        ));
        std::fs::write(&tmp_path, bytes).map_err(|source| StoreError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, path).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
        Ok(())
    }

    /// Serialize `value` as pretty JSON and write it atomically.
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_atomic(path, &bytes)
    }

    /// Read and deserialize a JSON artifact.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> StoreResult<T> {
        let bytes = std::fs::read(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether an artifact exists at `path` (used to detect
    /// `board_ids_override.json`, spec §6 "Override semantics").
    #[must_use]
    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Append one row to a CSV artifact, writing the header first if the
    /// file doesn't exist yet. CSV rows are appended incrementally rather
    /// than rewritten atomically as a whole, since `motion.csv` and
    /// `tag_metrics.csv` are progress logs meant to be tailed mid-run.
    pub fn append_csv_row<T: Serialize>(&self, path: &Path, row: &T) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let write_header = !path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(row).map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read an entire CSV artifact back into memory (used by the `analyze`
    /// CLI's summary output and by tests).
    pub fn read_csv<T: DeserializeOwned>(&self, path: &Path) -> StoreResult<Vec<T>> {
        let file = std::fs::File::open(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);
        reader
            .deserialize()
            .collect::<Result<Vec<T>, csv::Error>>()
            .map_err(|source| StoreError::Csv {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Dummy {
        a: u32,
        b: String,
    }

    #[test]
    fn write_then_read_json_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::create(dir.path()).unwrap();
        let value = Dummy {
            a: 7,
            b: "hi".to_string(),
        };
        let path = store.paths().run_meta();
        store.write_json(&path, &value).unwrap();
        let back: Dummy = store.read_json(&path).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn write_atomic_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::create(dir.path()).unwrap();
        let path = store.paths().game_pgn();
        store.write_atomic(&path, b"[Event \"x\"]").unwrap();
        assert!(path.exists());
        let siblings: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert!(!siblings.iter().any(|n| n.contains("tmp-")));
    }

    #[test]
    fn create_makes_debug_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::create(dir.path()).unwrap();
        assert!(store.paths().debug_dir().is_dir());
    }

    #[test]
    fn append_csv_row_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::create(dir.path()).unwrap();
        let path = store.paths().motion_csv();
        store
            .append_csv_row(
                &path,
                &artifacts::MotionCsvRow {
                    time: 0.0,
                    motion: 0.01,
                    is_stable: true,
                },
            )
            .unwrap();
        store
            .append_csv_row(
                &path,
                &artifacts::MotionCsvRow {
                    time: 0.5,
                    motion: 0.02,
                    is_stable: true,
                },
            )
            .unwrap();
        let rows: Vec<artifacts::MotionCsvRow> = store.read_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
