//! Seeded Random Number Generator
//!
//! 32-bit linear congruential generator used by maze generation.
//! Given the same seed, produces the identical stream on every peer, so a
//! client can rebuild a maze from the seed the server broadcasts.

/// LCG multiplier (Numerical Recipes).
const LCG_MULTIPLIER: u32 = 1_664_525;

/// LCG increment. Non-zero, so a zero seed still yields a full-period stream.
const LCG_INCREMENT: u32 = 1_013_904_223;

/// 2^32 as a float, for mapping state into [0, 1).
const STATE_SPAN: f64 = 4_294_967_296.0;

/// Upper bound (exclusive) for seeds handed out to peers.
pub const MAX_PUBLISHED_SEED: u32 = 1_000_000;

/// Deterministic PRNG over a 32-bit linear congruential recurrence.
///
/// No cryptographic properties. The only guarantee is reproducibility:
/// the same seed always produces the same infinite sequence.
///
/// # Example
///
/// ```
/// use maze_race::core::rng::SeededRng;
///
/// let mut a = SeededRng::new(12345);
/// let mut b = SeededRng::new(12345);
/// assert_eq!(a.next_u32(), b.next_u32());
/// ```
#[derive(Clone, Debug)]
pub struct SeededRng {
    seed: u32,
    state: u32,
}

impl SeededRng {
    /// Create a new generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self { seed, state: seed }
    }

    /// Create a generator from an optional seed.
    ///
    /// Falls back to a fresh random seed when none is supplied. The seed
    /// actually used is available through [`SeededRng::seed`].
    pub fn from_optional(seed: Option<u32>) -> Self {
        Self::new(seed.unwrap_or_else(random_seed))
    }

    /// Seed this stream was created from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Generate the next raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Generate a float in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / STATE_SPAN
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        // Scale rather than modulo: the low bits of an LCG are weak.
        ((self.next_f64() * max as f64) as usize).min(max - 1)
    }

    /// Generate a random integer in range [min, max].
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as usize;
        min + self.next_int(range) as i32
    }

    /// Return true with the given probability (clamped to [0, 1]).
    #[inline]
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Shuffle a slice in place using Fisher-Yates.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int(i + 1);
            slice.swap(i, j);
        }
    }

    /// Draw a seed suitable for publishing to peers, in `1..MAX_PUBLISHED_SEED`.
    pub fn next_published_seed(&mut self) -> u32 {
        1 + self.next_int(MAX_PUBLISHED_SEED as usize - 1) as u32
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: u32) {
        self.state = state;
    }
}

/// Fresh non-deterministic seed in `1..MAX_PUBLISHED_SEED`.
pub fn random_seed() -> u32 {
    use rand::Rng;
    rand::thread_rng().gen_range(1..MAX_PUBLISHED_SEED)
}

// =============================================================================
// TESTS
// =============================================================================
