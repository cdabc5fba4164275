//! Maze domain.
//!
//! Grid vocabulary, the seeded generator, the BFS pathfinder and the
//! per-round activation registry.

pub mod cell;
pub mod grid;
pub mod pathfinder;
pub mod generator;
pub mod hazards;
pub mod zones;

pub use cell::{Cell, GridCoord, Position};
pub use grid::{MazeGrid, MazeData, TeleporterPair};
pub use pathfinder::{find_path, SolutionPath};
pub use generator::{
    dimensions_in_range, generate, GenerationError, VariantParams, MAX_DIMENSION, MIN_DIMENSION,
    VARIANT_COUNT,
};
pub use zones::{Activation, ActivationZones, HazardKind};
