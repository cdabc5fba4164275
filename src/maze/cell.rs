//! Cell Types and Coordinates
//!
//! The grid vocabulary shared by the generator, pathfinder and activation
//! registry. Numeric codes are part of the client contract and must not move.

use serde::{Serialize, Deserialize};

/// One grid unit's type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cell {
    Path = 0,
    Wall = 1,
    Finish = 2,
    Start = 3,
    SpikeTrap = 4,
    BladeTrap = 5,
    CrusherTrap = 6,
    Teleporter = 7,
    Checkpoint = 8,
}

impl Cell {
    /// Stable numeric code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse from numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Cell::Path),
            1 => Some(Cell::Wall),
            2 => Some(Cell::Finish),
            3 => Some(Cell::Start),
            4 => Some(Cell::SpikeTrap),
            5 => Some(Cell::BladeTrap),
            6 => Some(Cell::CrusherTrap),
            7 => Some(Cell::Teleporter),
            8 => Some(Cell::Checkpoint),
            _ => None,
        }
    }

    /// Cells the pathfinder may step on (the pre-overlay route set).
    #[inline]
    pub fn is_traversable(self) -> bool {
        matches!(self, Cell::Path | Cell::Start | Cell::Finish)
    }

    /// Anything a player can stand on.
    #[inline]
    pub fn is_open(self) -> bool {
        self != Cell::Wall
    }

    /// Trap cells that cost a respawn.
    #[inline]
    pub fn is_hazard(self) -> bool {
        matches!(self, Cell::SpikeTrap | Cell::BladeTrap | Cell::CrusherTrap)
    }

    /// Single-character glyph for ASCII renders.
    pub fn glyph(self) -> char {
        match self {
            Cell::Path => ' ',
            Cell::Wall => '#',
            Cell::Finish => 'F',
            Cell::Start => 'S',
            Cell::SpikeTrap => '^',
            Cell::BladeTrap => '*',
            Cell::CrusherTrap => '=',
            Cell::Teleporter => 'T',
            Cell::Checkpoint => 'C',
        }
    }
}

/// Grid coordinate: `x` is the column, `y` is the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: usize,
    pub y: usize,
}

impl GridCoord {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Chebyshev (king-move) distance.
    #[inline]
    pub fn chebyshev(self, other: GridCoord) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Manhattan distance.
    #[inline]
    pub fn manhattan(self, other: GridCoord) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Cardinal step directions as (dx, dy), in the order the pathfinder expands them.
pub const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// World-space position reported by clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// All three components are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
