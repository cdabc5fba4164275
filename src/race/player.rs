//! Player Records
//!
//! Per-participant race bookkeeping: position, finish time, last checkpoint
//! and teleport cooldown.

use crate::maze::{GridCoord, MazeGrid, Position};
use super::clock::Millis;

/// Stable player identifier. Survives reconnects; distinct from the
/// transient connection handle.
pub type PlayerId = String;

/// Characters of the id used in a generated display name.
const DEFAULT_NAME_ID_CHARS: usize = 5;

/// One participant in a room or local race.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    /// Stable id, kept across reconnects.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Last reported world position.
    pub position: Position,
    /// Finish time this round.
    pub finish_time_ms: Option<u64>,
    /// Respawn point after a hazard, if any checkpoint was reached.
    pub last_checkpoint: Option<GridCoord>,
    last_teleport_at: Option<Millis>,
}

impl PlayerRecord {
    /// Fresh record at the origin with no progress.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: Position::default(),
            finish_time_ms: None,
            last_checkpoint: None,
            last_teleport_at: None,
        }
    }

    /// `Player_<first five chars of id>`.
    pub fn default_name(id: &str) -> String {
        let short: String = id.chars().take(DEFAULT_NAME_ID_CHARS).collect();
        format!("Player_{}", short)
    }

    /// Finished this round.
    pub fn has_finished(&self) -> bool {
        self.finish_time_ms.is_some()
    }

    /// Record a reached checkpoint. Returns `false` if it was already the latest.
    pub fn reach_checkpoint(&mut self, at: GridCoord) -> bool {
        if self.last_checkpoint == Some(at) {
            return false;
        }
        self.last_checkpoint = Some(at);
        true
    }

    /// Where a hazard sends this player: last checkpoint, else start.
    pub fn respawn_point(&self, grid: &MazeGrid) -> GridCoord {
        self.last_checkpoint.unwrap_or_else(|| grid.start())
    }

    /// Claim a teleport if the cooldown has elapsed.
    pub fn try_teleport(&mut self, now: Millis, cooldown_ms: u64) -> bool {
        if let Some(last) = self.last_teleport_at {
            if now.saturating_sub(last) < cooldown_ms as i64 {
                return false;
            }
        }
        self.last_teleport_at = Some(now);
        true
    }

    /// Clear per-round state for a new maze.
    pub fn reset_for_round(&mut self) {
        self.finish_time_ms = None;
        self.last_checkpoint = None;
        self.last_teleport_at = None;
    }
}
