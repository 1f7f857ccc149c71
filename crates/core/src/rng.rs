//! RNG module - deterministic randomness for tile spawns
//!
//! A tiny LCG keeps games reproducible from a seed: the same seed and the same
//! sequence of moves always produce the same spawns. This matters for
//! replaying games and for tests.

use crate::types::{SPAWN_FOUR_PERCENT, SPAWN_HIGH_VALUE, SPAWN_LOW_VALUE};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    ///
    /// Uses the high bits of the state; the low bits of a power-of-two LCG
    /// cycle with a short period.
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        ((self.next_u32() as u64 * max as u64) >> 32) as u32
    }

    /// True with the given percent probability
    pub fn chance_percent(&mut self, percent: u32) -> bool {
        self.next_range(100) < percent
    }

    /// Value for a freshly spawned tile: 2 (90%) or 4 (10%)
    pub fn spawn_value(&mut self) -> u32 {
        if self.chance_percent(SPAWN_FOUR_PERCENT) {
            SPAWN_HIGH_VALUE
        } else {
            SPAWN_LOW_VALUE
        }
    }

    /// Current RNG state (for restarting a game with the same sequence)
    pub fn seed(&self) -> u32 {
        self.state
    }
}

impl Default for SimpleRng {
    fn default() -> Self {
        Self::new(1)
    }
}
