//! Core deterministic primitives.
//!
//! Everything a peer needs to reproduce a maze from a published seed:
//! the seeded random stream and the grid fingerprint.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::SeededRng;
pub use hash::{GridHasher, compute_grid_fingerprint};
