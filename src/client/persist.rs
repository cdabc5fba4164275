//! Persisted Client State
//!
//! Keeps the rotation slot and maze seed across reloads. Loading never
//! fails: missing, unreadable or out-of-range state falls back to defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::maze::MazeData;

/// State that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Rotation slot.
    #[serde(default)]
    pub current_maze_index: usize,
    /// Seed and dimensions of the last maze.
    #[serde(default)]
    pub maze_data: Option<MazeData>,
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// State could not be encoded.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON file holding a [`PersistedState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved state, or defaults if there is none or it is corrupt.
    pub fn load(&self) -> PersistedState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved state");
                return PersistedState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "could not read saved state: {}", e);
                return PersistedState::default();
            }
        };

        match serde_json::from_str::<PersistedState>(&raw) {
            Ok(state) if state.maze_data.as_ref().map_or(true, MazeData::has_valid_dimensions) => {
                state
            }
            Ok(state) => {
                warn!(
                    path = %self.path.display(),
                    maze_data = ?state.maze_data,
                    "discarding saved state with out-of-range maze dimensions"
                );
                PersistedState::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), "discarding corrupt saved state: {}", e);
                PersistedState::default()
            }
        }
    }

    /// Write `state`, creating parent directories.
    pub fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    /// Forget saved state.
    pub fn clear(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
