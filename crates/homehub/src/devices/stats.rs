//! Randomness behind the simulated usage stats.

use std::ops::RangeInclusive;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of bounded random integers for the stats simulator
pub trait RandomSource: Send + Sync {
    fn next_in(&self, range: RangeInclusive<u32>) -> u32;
}

/// Thread-local OS-seeded generator, used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_in(&self, range: RangeInclusive<u32>) -> u32 {
        rand::rng().random_range(range)
    }
}

/// Deterministic generator: the same seed yields the same sequence
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_in(&self, range: RangeInclusive<u32>) -> u32 {
        // A poisoned lock only means another caller panicked mid-draw
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_range(range)
    }
}

/// Always returns the same value clamped into the range
#[cfg(test)]
#[derive(Debug)]
pub struct FixedRandom(pub u32);

#[cfg(test)]
impl RandomSource for FixedRandom {
    fn next_in(&self, range: RangeInclusive<u32>) -> u32 {
        self.0.clamp(*range.start(), *range.end())
    }
}
