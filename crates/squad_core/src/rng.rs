//! Seeded randomness for ability rolls and random targeting.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Source of random numbers for the simulation.
///
/// The engine owns a [`BattleRng`]; tests can substitute a scripted source.
pub trait RandomSource {
    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Uniform draw in `[0, 1)`.
    fn next_fraction(&mut self) -> Fixed {
        // Upper 32 bits become the fractional part of an I32F32.
        Fixed::from_bits((self.next_u64() >> 32) as i64)
    }

    /// Uniform index in `[0, len)`. Returns 0 for an empty range.
    fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }
}

/// Deterministic RNG (SplitMix64), serializable with battle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRng {
    state: u64,
}

impl BattleRng {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Internal state, for hashing.
    #[must_use]
    pub const fn state(&self) -> u64 {
        self.state
    }
}

impl RandomSource for BattleRng {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}
