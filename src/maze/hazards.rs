//! Hazard, Teleporter and Checkpoint Placement
//!
//! Overlay passes run on a carved, solvable grid. Order matters: each pass
//! only targets cells still tagged `Path`, so earlier placements block later
//! ones from stacking on the same cell.

use crate::core::rng::SeededRng;
use super::cell::{Cell, GridCoord};
use super::grid::{MazeGrid, TeleporterPair};

/// Spike chance per eligible corridor cell.
pub const SPIKE_CHANCE: f64 = 0.05;
/// Blade chance per eligible junction cell.
pub const BLADE_CHANCE: f64 = 0.03;
/// Crusher chance per eligible corridor cell.
pub const CRUSHER_CHANCE: f64 = 0.02;

/// Spikes keep this Chebyshev distance clear around start.
const SPIKE_START_CLEARANCE: usize = 2;
/// Blades keep this distance clear around start and finish.
const BLADE_CLEARANCE: usize = 3;
/// Crushers keep this distance clear around start and finish.
const CRUSHER_CLEARANCE: usize = 4;
/// Teleporter pads must be strictly farther than this from start and finish.
const TELEPORTER_CLEARANCE: usize = 5;
/// At most this many pad pairs per maze.
pub const MAX_TELEPORTER_PAIRS: usize = 2;

/// A checkpoint every this many steps along the route.
pub const CHECKPOINT_STRIDE: usize = 15;
/// Route steps kept clear of checkpoints at the finish end.
const CHECKPOINT_END_MARGIN: usize = 5;

/// Run every overlay pass in order.
pub fn place_all(grid: &mut MazeGrid, route: &[GridCoord], rng: &mut SeededRng) {
    place_spikes(grid, rng);
    place_blades(grid, rng);
    place_crushers(grid, rng);
    place_teleporters(grid, rng);
    place_checkpoints(grid, route);
}

/// Interior cells, row-major.
fn interior(grid: &MazeGrid) -> Vec<GridCoord> {
    let mut cells = Vec::new();
    for y in 1..grid.height().saturating_sub(1) {
        for x in 1..grid.width().saturating_sub(1) {
            cells.push(GridCoord::new(x, y));
        }
    }
    cells
}

fn is_open_at(grid: &MazeGrid, at: GridCoord, dx: i32, dy: i32) -> bool {
    grid.offset(at, dx, dy)
        .map(|n| grid.cell(n).is_open())
        .unwrap_or(false)
}

/// One-wide passage: walls on one axis, open on the other.
fn is_strict_corridor(grid: &MazeGrid, at: GridCoord) -> bool {
    let up = is_open_at(grid, at, 0, -1);
    let down = is_open_at(grid, at, 0, 1);
    let left = is_open_at(grid, at, -1, 0);
    let right = is_open_at(grid, at, 1, 0);

    (!up && !down && left && right) || (!left && !right && up && down)
}

/// Clear of both start and finish by more than `clearance`.
fn clear_of_ends(grid: &MazeGrid, at: GridCoord, clearance: usize) -> bool {
    at.chebyshev(grid.start()) > clearance && at.chebyshev(grid.finish()) > clearance
}

// =============================================================================
// TRAPS
// =============================================================================

pub fn place_spikes(grid: &mut MazeGrid, rng: &mut SeededRng) -> usize {
    let mut placed = 0;
    for at in interior(grid) {
        if grid.cell(at) != Cell::Path
            || !is_strict_corridor(grid, at)
            || at.chebyshev(grid.start()) <= SPIKE_START_CLEARANCE
        {
            continue;
        }
        if rng.chance(SPIKE_CHANCE) {
            grid.set(at, Cell::SpikeTrap);
            placed += 1;
        }
    }
    placed
}

pub fn place_blades(grid: &mut MazeGrid, rng: &mut SeededRng) -> usize {
    let mut placed = 0;
    for at in interior(grid) {
        if grid.cell(at) != Cell::Path
            || grid.open_neighbor_count(at) < 2
            || !clear_of_ends(grid, at, BLADE_CLEARANCE)
        {
            continue;
        }
        if rng.chance(BLADE_CHANCE) {
            grid.set(at, Cell::BladeTrap);
            placed += 1;
        }
    }
    placed
}

pub fn place_crushers(grid: &mut MazeGrid, rng: &mut SeededRng) -> usize {
    let mut placed = 0;
    for at in interior(grid) {
        if grid.cell(at) != Cell::Path
            || grid.wall_neighbor_count(at) != 2
            || !clear_of_ends(grid, at, CRUSHER_CLEARANCE)
        {
            continue;
        }
        if rng.chance(CRUSHER_CHANCE) {
            grid.set(at, Cell::CrusherTrap);
            placed += 1;
        }
    }
    placed
}

// =============================================================================
// TELEPORTERS
// =============================================================================

/// Pair up shuffled dead ends. Returns the number of pairs placed.
pub fn place_teleporters(grid: &mut MazeGrid, rng: &mut SeededRng) -> usize {
    let mut candidates: Vec<GridCoord> = interior(grid)
        .into_iter()
        .filter(|&at| {
            grid.cell(at) == Cell::Path
                && grid.open_neighbor_count(at) == 1
                && clear_of_ends(grid, at, TELEPORTER_CLEARANCE)
        })
        .collect();

    rng.shuffle(&mut candidates);

    let mut pairs = 0;
    for chunk in candidates.chunks_exact(2).take(MAX_TELEPORTER_PAIRS) {
        let (entry, exit) = (chunk[0], chunk[1]);
        grid.set(entry, Cell::Teleporter);
        grid.set(exit, Cell::Teleporter);
        grid.push_teleporter_pair(TeleporterPair { entry, exit });
        pairs += 1;
    }
    pairs
}

// =============================================================================
// CHECKPOINTS
// =============================================================================

/// Drop checkpoints along the route, skipping cells already overlaid.
pub fn place_checkpoints(grid: &mut MazeGrid, route: &[GridCoord]) -> usize {
    let mut placed = 0;
    let mut step = CHECKPOINT_STRIDE;
    while step + CHECKPOINT_END_MARGIN < route.len() {
        let at = route[step];
        if grid.cell(at) == Cell::Path {
            grid.set(at, Cell::Checkpoint);
            grid.push_checkpoint(at);
            placed += 1;
        }
        step += CHECKPOINT_STRIDE;
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_corridor_detection() {
        let grid = MazeGrid::from_ascii(&[
            "#######",
            "#S    #",
            "#### ##",
            "#    F#",
            "#######",
        ]);
        assert!(is_strict_corridor(&grid, GridCoord::new(2, 1)));
        assert!(is_strict_corridor(&grid, GridCoord::new(4, 2)));
        // junction: open left, right and below
        assert!(!is_strict_corridor(&grid, GridCoord::new(4, 1)));
        // dead end
        assert!(!is_strict_corridor(&grid, GridCoord::new(5, 1)));
    }

    #[test]
    fn test_teleporters_need_far_dead_ends() {
        let mut grid = MazeGrid::from_ascii(&[
            "###########################",
            "#S                        #",
            "#########################F#",
            "#######             #######",
            "###########################",
        ]);
        let before = grid.count(Cell::Path);
        let mut rng = SeededRng::new(9);
        let pairs = place_teleporters(&mut grid, &mut rng);

        assert_eq!(pairs, 1);
        assert_eq!(grid.count(Cell::Teleporter), 2);
        assert_eq!(grid.count(Cell::Path), before - 2);

        let pair = grid.teleporter_pairs()[0];
        let mut ends = [pair.entry, pair.exit];
        ends.sort();
        assert_eq!(ends, [GridCoord::new(7, 3), GridCoord::new(19, 3)]);
    }

    #[test]
    fn test_teleporter_cap() {
        // Eight one-cell stubs under a long corridor, all far from S and F.
        let mut stubs = vec!['#'; 31];
        for x in (8..=22).step_by(2) {
            stubs[x] = ' ';
        }
        let rows = vec![
            "#".repeat(31),
            format!("#S{}F#", " ".repeat(27)),
            "#".repeat(31),
            format!("#{}#", " ".repeat(29)),
            stubs.iter().collect::<String>(),
            "#".repeat(31),
        ];
        let refs: Vec<&str> = rows.iter().map(|r| r.as_str()).collect();
        let mut grid = MazeGrid::from_ascii(&refs);

        let mut rng = SeededRng::new(4);
        assert_eq!(place_teleporters(&mut grid, &mut rng), MAX_TELEPORTER_PAIRS);
        assert_eq!(grid.teleporter_pairs().len(), MAX_TELEPORTER_PAIRS);
        assert_eq!(grid.count(Cell::Teleporter), MAX_TELEPORTER_PAIRS * 2);
        for at in grid.positions_of(Cell::Teleporter) {
            assert_eq!(at.y, 4);
        }
    }

    #[test]
    fn test_checkpoints_follow_route_and_skip_overlays() {
        let row = format!("#S{}F#", " ".repeat(46));
        let wall = "#".repeat(50);
        let mut grid = MazeGrid::from_ascii(&[&wall, &row, &wall]);
        let route: Vec<GridCoord> = (1..49).map(|x| GridCoord::new(x, 1)).collect();
        // Block the second stride slot with a trap.
        grid.set(route[30], Cell::BladeTrap);

        let placed = place_checkpoints(&mut grid, &route);
        assert_eq!(placed, 1);
        assert_eq!(grid.checkpoints(), &[route[15]]);
        assert_eq!(grid.cell(route[15]), Cell::Checkpoint);
        assert_eq!(grid.cell(route[30]), Cell::BladeTrap);
    }

    #[test]
    fn test_checkpoint_end_margin() {
        let row = format!("#S{}F#", " ".repeat(18));
        let wall = "#".repeat(22);
        let mut grid = MazeGrid::from_ascii(&[&wall, &row, &wall]);
        // 20 steps: index 15 leaves only 4 steps to finish.
        let route: Vec<GridCoord> = (1..21).map(|x| GridCoord::new(x, 1)).collect();
        assert_eq!(place_checkpoints(&mut grid, &route), 0);
    }

    #[test]
    fn test_traps_respect_start_clearance() {
        let mut grid = MazeGrid::from_ascii(&[
            "#########",
            "#S      #",
            "####### #",
            "#F      #",
            "#########",
        ]);
        // Sweep seeds so some rolls land.
        for seed in 0..200 {
            let mut g = grid.clone();
            let mut rng = SeededRng::new(seed);
            place_spikes(&mut g, &mut rng);
            for at in g.positions_of(Cell::SpikeTrap) {
                assert!(at.chebyshev(g.start()) > SPIKE_START_CLEARANCE);
            }
        }
        let mut rng = SeededRng::new(1);
        place_crushers(&mut grid, &mut rng);
        for at in grid.positions_of(Cell::CrusherTrap) {
            assert!(at.chebyshev(grid.start()) > CRUSHER_CLEARANCE);
            assert!(at.chebyshev(grid.finish()) > CRUSHER_CLEARANCE);
        }
    }
}
