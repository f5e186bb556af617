//! Deterministic array generation.
//!
//! Fills a buffer from a SplitMix64 stream so that the same seed always
//! yields the same array, on every platform.

use crate::error::{PminmaxError, Result};

/// SplitMix64 pseudo-random generator.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    /// Create a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Advance and return the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Next non-negative `i32` (top 31 bits of the stream).
    pub fn next_i32(&mut self) -> i32 {
        (self.next_u64() >> 33) as i32
    }
}

/// Generate `size` integers from `seed`.
///
/// Allocation goes through `try_reserve_exact`, so an impossible size is
/// reported as [`PminmaxError::Allocation`] instead of aborting.
pub fn generate_array(seed: u64, size: usize) -> Result<Vec<i32>> {
    let mut array = Vec::new();
    array
        .try_reserve_exact(size)
        .map_err(|_| PminmaxError::Allocation { elements: size })?;

    let mut rng = SplitMix64::new(seed);
    array.extend((0..size).map(|_| rng.next_i32()));
    Ok(array)
}
