//! Activation Zones
//!
//! Registry of everything a player can trigger by stepping on a cell,
//! built once per round from the grid metadata. Collision code asks this
//! registry instead of inspecting rendered objects.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Deserialize};

use super::cell::{Cell, GridCoord, Position};
use super::grid::MazeGrid;

/// Height players stand at above the floor.
pub const FLOOR_HEIGHT: f64 = 0.5;

/// Trap kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    Spike,
    Blade,
    Crusher,
}

impl HazardKind {
    fn from_cell(cell: Cell) -> Option<Self> {
        match cell {
            Cell::SpikeTrap => Some(HazardKind::Spike),
            Cell::BladeTrap => Some(HazardKind::Blade),
            Cell::CrusherTrap => Some(HazardKind::Crusher),
            _ => None,
        }
    }
}

/// What stepping on a cell does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    Hazard(HazardKind),
    Teleport { to: GridCoord },
    Checkpoint(GridCoord),
    Finish,
}

/// Per-round lookup from cell to activation.
#[derive(Clone, Debug, Default)]
pub struct ActivationZones {
    width: usize,
    height: usize,
    hazards: BTreeMap<GridCoord, HazardKind>,
    teleports: BTreeMap<GridCoord, GridCoord>,
    checkpoints: BTreeSet<GridCoord>,
    finish: Option<GridCoord>,
}

impl ActivationZones {
    /// Build from a generated grid.
    pub fn build(grid: &MazeGrid) -> Self {
        let mut hazards = BTreeMap::new();
        for (y, row) in grid.rows().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(kind) = HazardKind::from_cell(*cell) {
                    hazards.insert(GridCoord::new(x, y), kind);
                }
            }
        }

        let mut teleports = BTreeMap::new();
        for pair in grid.teleporter_pairs() {
            teleports.insert(pair.entry, pair.exit);
            teleports.insert(pair.exit, pair.entry);
        }

        Self {
            width: grid.width(),
            height: grid.height(),
            hazards,
            teleports,
            checkpoints: grid.checkpoints().iter().copied().collect(),
            finish: Some(grid.finish()),
        }
    }

    /// Activation at a grid cell, if any.
    pub fn probe(&self, at: GridCoord) -> Option<Activation> {
        if self.finish == Some(at) {
            return Some(Activation::Finish);
        }
        if let Some(kind) = self.hazards.get(&at) {
            return Some(Activation::Hazard(*kind));
        }
        if let Some(to) = self.teleports.get(&at) {
            return Some(Activation::Teleport { to: *to });
        }
        if self.checkpoints.contains(&at) {
            return Some(Activation::Checkpoint(at));
        }
        None
    }

    /// Activation under a world position, with the cell it maps to.
    pub fn probe_world(&self, position: &Position) -> Option<(GridCoord, Activation)> {
        let at = world_to_grid(position, self.width, self.height)?;
        self.probe(at).map(|activation| (at, activation))
    }

    pub fn hazard_count(&self) -> usize {
        self.hazards.len()
    }

    pub fn teleporter_count(&self) -> usize {
        self.teleports.len()
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

// =============================================================================
// WORLD <-> GRID
// =============================================================================

/// World-space centre of a cell. The maze is centred on the origin.
pub fn grid_to_world(at: GridCoord, width: usize, height: usize) -> Position {
    Position::new(
        at.x as f64 - width as f64 / 2.0,
        FLOOR_HEIGHT,
        at.y as f64 - height as f64 / 2.0,
    )
}

/// Nearest cell to a world position, `None` if off the grid or not finite.
pub fn world_to_grid(position: &Position, width: usize, height: usize) -> Option<GridCoord> {
    if !position.is_finite() {
        return None;
    }
    let col = (position.x + width as f64 / 2.0).round();
    let row = (position.z + height as f64 / 2.0).round();
    if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
        return None;
    }
    Some(GridCoord::new(col as usize, row as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MazeGrid {
        MazeGrid::from_ascii(&[
            "#########",
            "#S ^ T  #",
            "####### #",
            "#F C* T #",
            "#########",
        ])
    }

    #[test]
    fn test_build_registers_everything() {
        let grid = fixture();
        let zones = ActivationZones::build(&grid);

        assert_eq!(zones.hazard_count(), 2);
        assert_eq!(zones.teleporter_count(), 2);
        assert_eq!(zones.checkpoint_count(), 1);
    }

    #[test]
    fn test_probe_kinds() {
        let zones = ActivationZones::build(&fixture());

        assert_eq!(
            zones.probe(GridCoord::new(3, 1)),
            Some(Activation::Hazard(HazardKind::Spike))
        );
        assert_eq!(
            zones.probe(GridCoord::new(4, 3)),
            Some(Activation::Hazard(HazardKind::Blade))
        );
        assert_eq!(
            zones.probe(GridCoord::new(5, 1)),
            Some(Activation::Teleport { to: GridCoord::new(6, 3) })
        );
        assert_eq!(
            zones.probe(GridCoord::new(6, 3)),
            Some(Activation::Teleport { to: GridCoord::new(5, 1) })
        );
        assert_eq!(
            zones.probe(GridCoord::new(3, 3)),
            Some(Activation::Checkpoint(GridCoord::new(3, 3)))
        );
        assert_eq!(zones.probe(GridCoord::new(1, 3)), Some(Activation::Finish));
        assert_eq!(zones.probe(GridCoord::new(2, 1)), None);
    }

    #[test]
    fn test_world_grid_round_trip() {
        let at = GridCoord::new(5, 7);
        let world = grid_to_world(at, 31, 31);
        assert_eq!(world, Position::new(-10.5, FLOOR_HEIGHT, -8.5));
        assert_eq!(world_to_grid(&world, 31, 31), Some(at));
    }

    #[test]
    fn test_world_to_grid_rounds_and_bounds() {
        // Slightly off-centre still maps to the same cell.
        let near = Position::new(-10.3, 0.5, -8.7);
        assert_eq!(world_to_grid(&near, 31, 31), Some(GridCoord::new(5, 7)));

        let off = Position::new(-40.0, 0.5, 0.0);
        assert_eq!(world_to_grid(&off, 31, 31), None);

        let bad = Position::new(f64::NAN, 0.5, 0.0);
        assert_eq!(world_to_grid(&bad, 31, 31), None);
    }

    #[test]
    fn test_probe_world() {
        let grid = fixture();
        let zones = ActivationZones::build(&grid);
        let finish_world = grid_to_world(grid.finish(), grid.width(), grid.height());
        assert_eq!(
            zones.probe_world(&finish_world),
            Some((grid.finish(), Activation::Finish))
        );
    }
}
