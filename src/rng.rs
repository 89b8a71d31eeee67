//! Deterministic random number generation
//!
//! Seeds are derived from (stream, entity, day) so that a draw never depends on
//! how many other entities were processed before it.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Stream identifier for derived generators
pub type StreamId = u32;

/// Stream used for per-agent daily decisions.
pub const DECISION_STREAM: StreamId = 1;

#[derive(Clone, Debug)]
pub struct RngManager {
    master_seed: u64,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self { master_seed: seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Generator for one agent's decision on one day
    pub fn agent_rng(&self, agent: usize, day: u32) -> ChaCha8Rng {
        self.entity_rng(DECISION_STREAM, agent as u64, day)
    }

    /// Create a deterministic RNG for a specific (stream, entity, day)
    pub fn entity_rng(&self, stream: StreamId, entity: u64, day: u32) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.derive_seed(stream, entity, day))
    }

    fn derive_seed(&self, stream: StreamId, entity: u64, day: u32) -> u64 {
        let mut seed = self.master_seed;
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= (stream as u64).wrapping_mul(1103515245);
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= entity.wrapping_mul(48271);
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= (day as u64).wrapping_mul(69069);
        seed
    }
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}

pub trait RngExt {
    /// Single Bernoulli trial; probabilities outside [0, 1] saturate.
    fn bernoulli(&mut self, probability: f64) -> bool;
}

impl<R: Rng> RngExt for R {
    fn bernoulli(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        self.gen::<f64>() < probability
    }
}
