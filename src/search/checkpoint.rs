//! Durable traversal snapshots.
//!
//! A checkpoint is a small JSON document holding a versioned
//! [`TraversalState`]. Writes go to a temp file in the target directory that
//! is then persisted over the checkpoint path, so a crash mid-write leaves the
//! previous snapshot intact.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::error::CheckpointError;
use super::state::TraversalState;

/// Current checkpoint file format version.
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Serialize)]
struct CheckpointFileRef<'a> {
    version: u32,
    state: &'a TraversalState,
}

#[derive(Deserialize)]
struct CheckpointFile {
    version: u32,
    state: serde_json::Value,
}

/// Reads and writes traversal checkpoints keyed by file path.
///
/// An empty key disables persistence: saves are no-ops and loads find
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointStore;

impl CheckpointStore {
    /// Creates a checkpoint store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Key used by iterative traversal for its `call`-th page checkpoint.
    ///
    /// Returns an empty key when `base` is empty so persistence stays off.
    #[must_use]
    pub fn iterative_key(base: &str, call: u64) -> String {
        if base.is_empty() {
            String::new()
        } else {
            format!("{base}_{call}")
        }
    }

    /// Finds the newest iterative checkpoint written for `base`, i.e. the
    /// existing `<base>_<n>` file with the largest `n`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the checkpoint directory exists but
    /// cannot be listed.
    pub fn latest_iterative_key(&self, base: &str) -> Result<Option<String>, CheckpointError> {
        if base.is_empty() {
            return Ok(None);
        }
        let base_path = Path::new(base);
        let Some(stem) = base_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(None);
        };
        let prefix = format!("{stem}_");
        let dir = parent_dir(base_path);

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckpointError::io(&dir, e)),
        };

        let newest = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_prefix(&prefix)?.parse::<u64>().ok()
            })
            .max();

        Ok(newest.map(|call| Self::iterative_key(base, call)))
    }

    /// Writes `state` under `key`, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the parent directory cannot be created
    /// or the file cannot be written and persisted.
    #[instrument(level = "debug", skip(self, state), fields(page_index = state.page_index(), identifiers = state.buffer().len()))]
    pub fn save(&self, key: &str, state: &TraversalState) -> Result<(), CheckpointError> {
        if key.is_empty() {
            debug!("no checkpoint key configured; skipping save");
            return Ok(());
        }

        let path = PathBuf::from(key);
        let parent = parent_dir(&path);
        std::fs::create_dir_all(&parent).map_err(|e| CheckpointError::io(&parent, e))?;

        let temp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| CheckpointError::io(&parent, e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(
                &mut writer,
                &CheckpointFileRef {
                    version: CHECKPOINT_VERSION,
                    state,
                },
            )
            .map_err(|e| CheckpointError::serialization(&path, e))?;
            writer.flush().map_err(|e| CheckpointError::io(&path, e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| CheckpointError::io(&path, e))?;
        temp.persist(&path)
            .map_err(|e| CheckpointError::io(&path, e.error))?;

        debug!(path = %path.display(), "checkpoint saved");
        Ok(())
    }

    /// Loads the snapshot stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is empty or no file exists there; a
    /// missing checkpoint is logged and means "start fresh".
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the file exists but cannot be read, is
    /// not a valid checkpoint, or has an unsupported version.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, key: &str) -> Result<Option<TraversalState>, CheckpointError> {
        if key.is_empty() {
            return Ok(None);
        }

        let path = Path::new(key);
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "checkpoint file missing; starting a fresh traversal");
                return Ok(None);
            }
            Err(e) => return Err(CheckpointError::io(path, e)),
        };

        let file: CheckpointFile =
            serde_json::from_slice(&bytes).map_err(|e| CheckpointError::serialization(path, e))?;
        if file.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: file.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        let state: TraversalState = serde_json::from_value(file.state)
            .map_err(|e| CheckpointError::serialization(path, e))?;

        info!(
            path = %path.display(),
            page_index = state.page_index(),
            identifiers = state.buffer().len(),
            cursor = ?state.cursor(),
            "restored traversal from checkpoint"
        );
        Ok(Some(state))
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
