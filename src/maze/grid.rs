//! Maze Grid
//!
//! The generated maze: a row-major cell matrix plus the metadata the race
//! layer needs (start, finish, teleporter pairs, checkpoints). Immutable
//! once the generator hands it out.

use serde::{Serialize, Deserialize};

use crate::core::hash::compute_grid_fingerprint;
use super::cell::{Cell, GridCoord, CARDINALS};

/// Two linked teleporter pads. Entering either end sends the player to the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeleporterPair {
    /// Pad placed first.
    pub entry: GridCoord,
    /// Its partner.
    pub exit: GridCoord,
}

impl TeleporterPair {
    /// Destination for a player entering at `from`, if `from` is one of the ends.
    pub fn partner_of(&self, from: GridCoord) -> Option<GridCoord> {
        if from == self.entry {
            Some(self.exit)
        } else if from == self.exit {
            Some(self.entry)
        } else {
            None
        }
    }
}

/// What peers exchange instead of the full grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MazeData {
    /// Generator seed.
    pub seed: u32,
    /// Requested width, normalized by the generator.
    pub width: usize,
    /// Requested height, normalized by the generator.
    pub height: usize,
    /// Hex fingerprint of the grid the sender generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl MazeData {
    /// Record without a fingerprint.
    pub fn new(seed: u32, width: usize, height: usize) -> Self {
        Self { seed, width, height, fingerprint: None }
    }

    /// False when the dimensions are too large to regenerate.
    pub fn has_valid_dimensions(&self) -> bool {
        super::generator::dimensions_in_range(self.width, self.height)
    }
}

/// A generated maze.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MazeGrid {
    width: usize,
    height: usize,
    seed: u32,
    variant_index: usize,
    cells: Vec<Cell>,
    start: GridCoord,
    finish: GridCoord,
    teleporter_pairs: Vec<TeleporterPair>,
    checkpoints: Vec<GridCoord>,
}

impl MazeGrid {
    /// All-wall grid. Start/finish are recorded but not stamped.
    pub(crate) fn walled(
        width: usize,
        height: usize,
        seed: u32,
        variant_index: usize,
        start: GridCoord,
        finish: GridCoord,
    ) -> Self {
        Self {
            width,
            height,
            seed,
            variant_index,
            cells: vec![Cell::Wall; width * height],
            start,
            finish,
            teleporter_pairs: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Columns (odd).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows (odd).
    pub fn height(&self) -> usize {
        self.height
    }

    /// Seed the grid was generated from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Variant preset used, already wrapped.
    pub fn variant_index(&self) -> usize {
        self.variant_index
    }

    /// Always `(1, 1)` for generated grids.
    pub fn start(&self) -> GridCoord {
        self.start
    }

    /// Always `(width - 2, height - 2)` for generated grids.
    pub fn finish(&self) -> GridCoord {
        self.finish
    }

    /// Linked pads, at most two pairs.
    pub fn teleporter_pairs(&self) -> &[TeleporterPair] {
        &self.teleporter_pairs
    }

    /// Checkpoints in route order.
    pub fn checkpoints(&self) -> &[GridCoord] {
        &self.checkpoints
    }

    /// Cell at a coordinate, `None` if out of bounds.
    #[inline]
    pub fn get(&self, at: GridCoord) -> Option<Cell> {
        if self.in_bounds(at) {
            Some(self.cells[self.index(at)])
        } else {
            None
        }
    }

    /// Cell at a coordinate, treating out of bounds as wall.
    #[inline]
    pub fn cell(&self, at: GridCoord) -> Cell {
        self.get(at).unwrap_or(Cell::Wall)
    }

    /// Whether `at` lies inside the grid.
    #[inline]
    pub fn in_bounds(&self, at: GridCoord) -> bool {
        at.x < self.width && at.y < self.height
    }

    /// Outer ring of the grid. Never carved.
    #[inline]
    pub fn is_border(&self, at: GridCoord) -> bool {
        at.x == 0 || at.y == 0 || at.x + 1 >= self.width || at.y + 1 >= self.height
    }

    /// Rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }

    /// In-bounds cardinal neighbours.
    pub fn neighbors(&self, at: GridCoord) -> impl Iterator<Item = GridCoord> + '_ {
        CARDINALS.iter().filter_map(move |&(dx, dy)| self.offset(at, dx, dy))
    }

    /// Coordinate shifted by (dx, dy), if still on the grid.
    pub fn offset(&self, at: GridCoord, dx: i32, dy: i32) -> Option<GridCoord> {
        let x = at.x as i64 + dx as i64;
        let y = at.y as i64 + dy as i64;
        if x < 0 || y < 0 {
            return None;
        }
        let next = GridCoord::new(x as usize, y as usize);
        self.in_bounds(next).then_some(next)
    }

    /// Number of non-wall cardinal neighbours.
    pub fn open_neighbor_count(&self, at: GridCoord) -> usize {
        CARDINALS
            .iter()
            .filter(|&&(dx, dy)| {
                self.offset(at, dx, dy)
                    .map(|n| self.cell(n).is_open())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Number of wall cardinal neighbours. Off-grid counts as wall.
    pub fn wall_neighbor_count(&self, at: GridCoord) -> usize {
        4 - self.open_neighbor_count(at)
    }

    /// How many cells carry the given tag.
    pub fn count(&self, kind: Cell) -> usize {
        self.cells.iter().filter(|c| **c == kind).count()
    }

    /// Coordinates of every cell carrying the given tag, row-major.
    pub fn positions_of(&self, kind: Cell) -> Vec<GridCoord> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == kind)
            .map(|(i, _)| GridCoord::new(i % self.width, i / self.width))
            .collect()
    }

    /// Where a player entering a teleporter at `from` comes out.
    pub fn teleport_destination(&self, from: GridCoord) -> Option<GridCoord> {
        self.teleporter_pairs.iter().find_map(|pair| pair.partner_of(from))
    }

    /// Hex SHA-256 over dimensions, seed, variant and cells.
    pub fn fingerprint(&self) -> String {
        compute_grid_fingerprint(
            self.width,
            self.height,
            self.seed,
            self.variant_index,
            |hasher| {
                for cell in &self.cells {
                    hasher.update_u8(cell.code());
                }
            },
        )
    }

    /// Seed/dimension summary for the wire, fingerprint included.
    pub fn maze_data(&self) -> MazeData {
        MazeData {
            seed: self.seed,
            width: self.width,
            height: self.height,
            fingerprint: Some(self.fingerprint()),
        }
    }

    /// One line per row, using [`Cell::glyph`].
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.rows() {
            out.extend(row.iter().map(|c| c.glyph()));
            out.push('\n');
        }
        out
    }

    // =========================================================================
    // Generator-side mutation
    // =========================================================================

    #[inline]
    fn index(&self, at: GridCoord) -> usize {
        at.y * self.width + at.x
    }

    pub(crate) fn set(&mut self, at: GridCoord, cell: Cell) {
        if self.in_bounds(at) {
            let idx = self.index(at);
            self.cells[idx] = cell;
        }
    }

    /// Turn a wall into path. Border and non-wall cells are left alone.
    pub(crate) fn carve(&mut self, at: GridCoord) -> bool {
        if self.in_bounds(at) && !self.is_border(at) && self.cell(at) == Cell::Wall {
            self.set(at, Cell::Path);
            true
        } else {
            false
        }
    }

    pub(crate) fn push_teleporter_pair(&mut self, pair: TeleporterPair) {
        self.teleporter_pairs.push(pair);
    }

    pub(crate) fn push_checkpoint(&mut self, at: GridCoord) {
        self.checkpoints.push(at);
    }

    /// Build from glyph rows. Test fixture only.
    #[cfg(test)]
    pub(crate) fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows[0].chars().count();
        let mut grid = Self::walled(width, height, 0, 0, GridCoord::new(0, 0), GridCoord::new(0, 0));
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let cell = match ch {
                    '#' => Cell::Wall,
                    'S' => Cell::Start,
                    'F' => Cell::Finish,
                    '^' => Cell::SpikeTrap,
                    '*' => Cell::BladeTrap,
                    '=' => Cell::CrusherTrap,
                    'T' => Cell::Teleporter,
                    'C' => Cell::Checkpoint,
                    _ => Cell::Path,
                };
                let at = GridCoord::new(x, y);
                grid.set(at, cell);
                match cell {
                    Cell::Start => grid.start = at,
                    Cell::Finish => grid.finish = at,
                    Cell::Checkpoint => grid.checkpoints.push(at),
                    _ => {}
                }
            }
        }
        let pads = grid.positions_of(Cell::Teleporter);
        for pair in pads.chunks_exact(2) {
            grid.teleporter_pairs.push(TeleporterPair { entry: pair[0], exit: pair[1] });
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MazeGrid {
        MazeGrid::from_ascii(&[
            "#######",
            "#S  T##",
            "###C###",
            "#T   F#",
            "#######",
        ])
    }

    #[test]
    fn test_from_ascii_metadata() {
        let grid = sample();
        assert_eq!(grid.width(), 7);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.start(), GridCoord::new(1, 1));
        assert_eq!(grid.finish(), GridCoord::new(5, 3));
        assert_eq!(grid.checkpoints(), &[GridCoord::new(3, 2)]);
        assert_eq!(grid.teleporter_pairs().len(), 1);
    }

    #[test]
    fn test_teleport_destination_is_mutual() {
        let grid = sample();
        let a = GridCoord::new(4, 1);
        let b = GridCoord::new(1, 3);
        assert_eq!(grid.teleport_destination(a), Some(b));
        assert_eq!(grid.teleport_destination(b), Some(a));
        assert_eq!(grid.teleport_destination(GridCoord::new(2, 1)), None);
    }

    #[test]
    fn test_neighbor_counts() {
        let grid = sample();
        // (2,1): open left (S) and right, walls above and below
        assert_eq!(grid.open_neighbor_count(GridCoord::new(2, 1)), 2);
        assert_eq!(grid.wall_neighbor_count(GridCoord::new(2, 1)), 2);
        // corner cell has two off-grid sides
        assert_eq!(grid.open_neighbor_count(GridCoord::new(0, 0)), 0);
        assert_eq!(grid.neighbors(GridCoord::new(0, 0)).count(), 2);
    }

    #[test]
    fn test_carve_respects_border_and_tags() {
        let mut grid = sample();
        assert!(!grid.carve(GridCoord::new(0, 2)));
        assert!(!grid.carve(GridCoord::new(1, 1)));
        assert!(grid.carve(GridCoord::new(2, 2)));
        assert_eq!(grid.cell(GridCoord::new(2, 2)), Cell::Path);
    }

    #[test]
    fn test_out_of_bounds_is_wall() {
        let grid = sample();
        assert_eq!(grid.get(GridCoord::new(7, 0)), None);
        assert_eq!(grid.cell(GridCoord::new(7, 0)), Cell::Wall);
    }

    #[test]
    fn test_render_ascii_round_trips_glyphs() {
        let rows = ["#####", "#S F#", "#####"];
        let grid = MazeGrid::from_ascii(&rows);
        let rendered = grid.render_ascii();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, rows);
    }

    #[test]
    fn test_fingerprint_tracks_cells() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.carve(GridCoord::new(2, 2));
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.maze_data().fingerprint, Some(a.fingerprint()));
    }

    #[test]
    fn test_maze_data_wire_shape() {
        let data = MazeData::new(42, 31, 31);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"seed":42,"width":31,"height":31}"#);

        let parsed: MazeData = serde_json::from_str(r#"{"seed":7,"width":15,"height":17}"#).unwrap();
        assert_eq!(parsed, MazeData::new(7, 15, 17));
    }

    #[test]
    fn test_maze_data_dimension_check() {
        assert!(MazeData::new(1, 31, 31).has_valid_dimensions());
        assert!(MazeData::new(1, 0, 0).has_valid_dimensions());
        assert!(!MazeData::new(1, usize::MAX, 31).has_valid_dimensions());
        assert!(!MazeData::new(1, 31, 10_000).has_valid_dimensions());
    }
}
