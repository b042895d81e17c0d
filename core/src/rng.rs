//! Deterministic pseudo-random stream.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! Every draw is reconstructed from a single 32-bit start value by
//! repeated application of the game's xorshift transform.
//!
//! The stream is generated per request and owned by that request.
//! Overflow wraparound is part of the mechanic, not an error.

use crate::types::Seed;

/// The game's xorshift32 step: `x ^= x << 13; x ^= x >> 17; x ^= x << 15`.
pub fn next_seed(seed: Seed) -> Seed {
    let mut x = seed;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 15;
    x
}

/// An ordered, index-addressable run of stream values.
/// Index 0 is always the supplied start value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedStream {
    values: Vec<Seed>,
}

impl SeedStream {
    /// Generate `n + 1` values: the start value followed by `n` successors.
    pub fn generate(seed0: Seed, n: usize) -> Self {
        let mut values = Vec::with_capacity(n + 1);
        values.push(seed0);
        let mut current = seed0;
        for _ in 0..n {
            current = next_seed(current);
            values.push(current);
        }
        Self { values }
    }

    pub fn start(&self) -> Seed {
        self.values[0]
    }

    pub fn get(&self, index: usize) -> Option<Seed> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Seed] {
        &self.values
    }
}
