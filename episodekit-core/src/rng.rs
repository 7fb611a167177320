//! Deterministic seed hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each
//! `(sampler name, task, sample index)` tuple. Sub-seeds are derived via BLAKE3
//! hashing, so a nested sampler built from episode `n` always gets the same
//! stream no matter how many sibling samplers were created before it.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (name, task, index).
    pub fn sub_seed(&self, name: &str, task: usize, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(&(task as u64).to_le_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, name: &str, task: usize, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(name, task, index))
    }

    /// Hierarchy for a child identified by `(name, task, index)`.
    pub fn child(&self, name: &str, task: usize, index: u64) -> SeedHierarchy {
        SeedHierarchy::new(self.sub_seed(name, task, index))
    }
}
