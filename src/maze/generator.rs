//! Maze Generator
//!
//! Deterministic, seed-driven maze construction:
//!
//! 1. Walled grid, start stamped at (1, 1)
//! 2. Biased random walk from start toward finish with short branches
//! 3. Embellishment: scattered cells, small rooms, loop connections
//! 4. Clear apron around finish, finish stamped last
//! 5. BFS validation with an emergency corridor if needed
//! 6. Unreachable cells filled back in
//! 7. Hazard, teleporter and checkpoint overlays
//!
//! Every random decision draws from one [`SeededRng`], so the same
//! `(width, height, variant, seed)` always yields the same grid.

use tracing::{debug, warn};

use crate::core::rng::SeededRng;
use super::cell::{Cell, GridCoord, CARDINALS};
use super::grid::MazeGrid;
use super::hazards;
use super::pathfinder::{find_path, reachable_from, SolutionPath};

/// Smallest side length a maze is generated at.
pub const MIN_DIMENSION: usize = 15;

/// Largest side length accepted before normalisation.
pub const MAX_DIMENSION: usize = 201;

/// Number of variant presets; indices wrap modulo this.
pub const VARIANT_COUNT: usize = 5;

/// Parameters that shape one variant's topology.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VariantParams {
    /// Chance of small rooms and side branches.
    pub complexity: f64,
    /// Chance of walk branches and loop connections.
    pub branch_factor: f64,
}

const VARIANTS: [VariantParams; VARIANT_COUNT] = [
    VariantParams { complexity: 0.30, branch_factor: 0.20 },
    VariantParams { complexity: 0.40, branch_factor: 0.25 },
    VariantParams { complexity: 0.50, branch_factor: 0.30 },
    VariantParams { complexity: 0.25, branch_factor: 0.15 },
    VariantParams { complexity: 0.35, branch_factor: 0.35 },
];

/// Preset for a variant index (wraps).
pub fn variant_params(variant_index: usize) -> VariantParams {
    VARIANTS[variant_index % VARIANT_COUNT]
}

/// Round down to odd, then clamp to the minimum.
pub fn normalize_dimension(n: usize) -> usize {
    ((n / 2) * 2 + 1).max(MIN_DIMENSION)
}

/// Whether `width x height` is small enough to generate.
pub fn dimensions_in_range(width: usize, height: usize) -> bool {
    width <= MAX_DIMENSION
        && height <= MAX_DIMENSION
        && width.checked_mul(height).is_some()
}

/// Generation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("maze {width}x{height} exceeds the side limit of {}", MAX_DIMENSION)]
    InvalidDimensions { width: usize, height: usize },

    #[error("finish {finish:?} unreachable from start {start:?} after repair (seed {seed})")]
    Unsolvable {
        seed: u32,
        start: GridCoord,
        finish: GridCoord,
    },
}

/// Generate a maze.
///
/// Dimensions above [`MAX_DIMENSION`] are rejected. Anything smaller is
/// normalized with [`normalize_dimension`] and the variant index wraps.
pub fn generate(
    width: usize,
    height: usize,
    variant_index: usize,
    seed: u32,
) -> Result<MazeGrid, GenerationError> {
    if !dimensions_in_range(width, height) {
        return Err(GenerationError::InvalidDimensions { width, height });
    }
    let width = normalize_dimension(width);
    let height = normalize_dimension(height);
    let variant_index = variant_index % VARIANT_COUNT;
    let params = variant_params(variant_index);
    let mut rng = SeededRng::new(seed);

    let start = GridCoord::new(1, 1);
    let finish = GridCoord::new(width - 2, height - 2);

    let mut grid = MazeGrid::walled(width, height, seed, variant_index, start, finish);
    grid.set(start, Cell::Start);

    carve_primary_route(&mut grid, &mut rng, params);
    scatter_rooms(&mut grid, &mut rng, params);
    add_loops(&mut grid, &mut rng, params);
    clear_finish_apron(&mut grid);
    grid.set(finish, Cell::Finish);

    let route = match find_path(&grid, start, finish) {
        Some(route) => route,
        None => {
            warn!(seed, variant_index, "no route after carving, cutting emergency corridor");
            carve_emergency_corridor(&mut grid);
            find_path(&grid, start, finish)
                .ok_or(GenerationError::Unsolvable { seed, start, finish })?
        }
    };

    let pruned = prune_unreachable(&mut grid);
    hazards::place_all(&mut grid, &route, &mut rng);

    debug!(
        seed,
        width,
        height,
        variant_index,
        route_len = route.len(),
        pruned,
        teleporter_pairs = grid.teleporter_pairs().len(),
        checkpoints = grid.checkpoints().len(),
        "maze generated"
    );

    #[cfg(feature = "debug-tracing")]
    debug!("\n{}", grid.render_ascii());

    Ok(grid)
}

/// Generate with an optional seed, falling back to a random one.
///
/// The seed actually used is on the returned grid.
pub fn generate_with_optional_seed(
    width: usize,
    height: usize,
    variant_index: usize,
    seed: Option<u32>,
) -> Result<MazeGrid, GenerationError> {
    let rng = SeededRng::from_optional(seed);
    generate(width, height, variant_index, rng.seed())
}

/// Route from start to finish on a generated grid, ignoring overlays.
///
/// Advisory only; used by diagnostics and tests.
pub fn solution_path(grid: &MazeGrid) -> Option<SolutionPath> {
    super::pathfinder::find_path_with(grid, grid.start(), grid.finish(), Cell::is_open)
}

// =============================================================================
// CARVING
// =============================================================================

/// Carve a straight run of up to `length` cells from `from` along (dx, dy).
fn carve_run(grid: &mut MazeGrid, from: GridCoord, dx: i32, dy: i32, length: i32) {
    let mut at = from;
    for _ in 0..length {
        match grid.offset(at, dx, dy) {
            Some(next) if !grid.is_border(next) => {
                grid.carve(next);
                at = next;
            }
            _ => break,
        }
    }
}

/// Walk from start to finish, advancing on one axis every step.
fn carve_primary_route(grid: &mut MazeGrid, rng: &mut SeededRng, params: VariantParams) {
    let finish = grid.finish();
    let mut at = grid.start();

    while at != finish {
        let can_right = at.x < finish.x;
        let can_down = at.y < finish.y;
        let horizontal = match (can_right, can_down) {
            (true, true) => rng.chance(0.5),
            (true, false) => true,
            _ => false,
        };

        at = if horizontal {
            GridCoord::new(at.x + 1, at.y)
        } else {
            GridCoord::new(at.x, at.y + 1)
        };
        grid.carve(at);

        if rng.chance(params.branch_factor) {
            let (dx, dy) = CARDINALS[rng.next_int(CARDINALS.len())];
            let length = rng.next_int_range(1, 3);
            carve_run(grid, at, dx, dy, length);
        }

        if rng.chance(params.complexity * 0.25) {
            // Perpendicular to the step just taken.
            let sign = if rng.chance(0.5) { 1 } else { -1 };
            let (dx, dy) = if horizontal { (0, sign) } else { (sign, 0) };
            let length = rng.next_int_range(2, 4);
            carve_run(grid, at, dx, dy, length);
        }
    }
}

/// Open scattered cells, some growing into one- or two-cell rooms.
fn scatter_rooms(grid: &mut MazeGrid, rng: &mut SeededRng, params: VariantParams) {
    let samples = grid.width() * grid.height() / 4;
    let inner_w = grid.width() - 2;
    let inner_h = grid.height() - 2;

    for _ in 0..samples {
        let at = GridCoord::new(1 + rng.next_int(inner_w), 1 + rng.next_int(inner_h));
        if !grid.carve(at) {
            continue;
        }
        if rng.chance(params.complexity) {
            let (dx, dy) = CARDINALS[rng.next_int(CARDINALS.len())];
            let length = rng.next_int_range(1, 2);
            carve_run(grid, at, dx, dy, length);
        }
    }
}

/// Knock through walls that already touch two open cells.
///
/// Candidates are collected before any carving so the pass does not feed on itself.
fn add_loops(grid: &mut MazeGrid, rng: &mut SeededRng, params: VariantParams) {
    let mut candidates = Vec::new();
    for y in 1..grid.height() - 1 {
        for x in 1..grid.width() - 1 {
            let at = GridCoord::new(x, y);
            if grid.cell(at) == Cell::Wall && grid.open_neighbor_count(at) >= 2 {
                candidates.push(at);
            }
        }
    }

    for at in candidates {
        if rng.chance(params.branch_factor) {
            grid.carve(at);
        }
    }
}

/// 3x3 clear area around finish, clamped to the interior. Walls only.
fn clear_finish_apron(grid: &mut MazeGrid) {
    let finish = grid.finish();
    let y_lo = finish.y.saturating_sub(1).max(1);
    let y_hi = (finish.y + 1).min(grid.height() - 2);
    let x_lo = finish.x.saturating_sub(1).max(1);
    let x_hi = (finish.x + 1).min(grid.width() - 2);

    for y in y_lo..=y_hi {
        for x in x_lo..=x_hi {
            grid.carve(GridCoord::new(x, y));
        }
    }
}

/// L-shaped corridor: along the start row, then down the finish column.
fn carve_emergency_corridor(grid: &mut MazeGrid) {
    let start = grid.start();
    let finish = grid.finish();

    for x in start.x..=finish.x {
        grid.carve(GridCoord::new(x, start.y));
    }
    for y in start.y..=finish.y {
        grid.carve(GridCoord::new(finish.x, y));
    }
}

/// Fill path cells that cannot be reached from start. Returns how many.
fn prune_unreachable(grid: &mut MazeGrid) -> usize {
    let mask = reachable_from(grid, grid.start(), Cell::is_traversable);
    let width = grid.width();
    let mut pruned = 0;

    for (i, reachable) in mask.iter().enumerate() {
        let at = GridCoord::new(i % width, i / width);
        if !reachable && grid.cell(at) == Cell::Path {
            grid.set(at, Cell::Wall);
            pruned += 1;
        }
    }
    pruned
}

// =============================================================================
// TESTS
// =============================================================================
