//! Stable seeding for the deterministic demo paths
//!
//! Every pseudo-random draw in this crate goes through a private `StdRng`
//! built here. Nothing touches a thread-local or global generator, so
//! concurrent requests cannot disturb each other's sequences.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use sha2::{Digest, Sha256};

/// Seed derived from the first 8 bytes of SHA-256(key), big-endian
///
/// Identical across runs, processes and platforms.
pub fn stable_seed(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Private generator seeded from a string key
pub fn rng_for_key(key: &str) -> StdRng {
    StdRng::seed_from_u64(stable_seed(key))
}

/// Private generator seeded from a raw value
pub fn rng_for_seed(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// `len` independent standard-normal draws
pub fn standard_normal_vec(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| StandardNormal.sample(rng)).collect()
}
