//! Deterministic RNG hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each `(round, field, sample)`
//! tuple of the meta-parameter search. Sub-seeds are derived via BLAKE3 hashing,
//! independently of thread scheduling order, so a search produces identical draws
//! regardless of how rayon distributes its trials.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic RNG hierarchy.
///
/// The master seed is expanded into per-(round, field, sample) sub-seeds using
/// BLAKE3. Because derivation is hash-based (not order-dependent), the same
/// master seed produces identical sub-seeds regardless of the order in which
/// trials are evaluated.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (round, field, sample).
    pub fn sub_seed(&self, round: u64, field: &str, sample: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(&round.to_le_bytes());
        hasher.update(field.as_bytes());
        hasher.update(&sample.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng from a sub-seed.
    pub fn rng_for(&self, round: u64, field: &str, sample: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(round, field, sample))
    }

    /// Seeded StdRng for one-off initialisation draws (weights, parameters).
    pub fn init_rng(&self, label: &str) -> StdRng {
        self.rng_for(u64::MAX, label, 0)
    }
}
