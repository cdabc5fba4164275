//! Grid Fingerprinting
//!
//! Deterministic hashing of generated mazes so peers can confirm they
//! rebuilt the same grid from the same seed without shipping the cells.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type GridHash = [u8; 32];

/// Domain separator for maze fingerprints.
const MAZE_DOMAIN: &[u8] = b"MAZE_RACE_GRID_V1";

/// Deterministic hasher for maze grids.
///
/// Wraps SHA-256 with little-endian integer helpers.
/// Order of updates is critical for determinism.
pub struct GridHasher {
    hasher: Sha256,
}

impl GridHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for maze grids.
    pub fn for_maze() -> Self {
        Self::new(MAZE_DOMAIN)
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> GridHash {
        self.hasher.finalize().into()
    }

    /// Finalize and return the hash as lowercase hex.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.finalize())
    }
}

/// Compute the hex fingerprint of a maze.
///
/// Dimensions, seed and variant are always hashed first; the closure then
/// feeds the cells in row-major order.
pub fn compute_grid_fingerprint<F>(
    width: usize,
    height: usize,
    seed: u32,
    variant_index: usize,
    add_cells: F,
) -> String
where
    F: FnOnce(&mut GridHasher),
{
    let mut hasher = GridHasher::for_maze();

    hasher.update_u32(width as u32);
    hasher.update_u32(height as u32);
    hasher.update_u32(seed);
    hasher.update_u32(variant_index as u32);

    add_cells(&mut hasher);

    hasher.finalize_hex()
}

// =============================================================================
// TESTS
// =============================================================================
