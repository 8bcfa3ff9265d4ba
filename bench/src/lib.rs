//! Datasets and fixtures shared by the benchmarks.

use coro_probe::{ChainedTable, FastRange, LinearModel, MurmurFinalizer, RmiHash};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type BenchTable<const B: usize> = ChainedTable<u64, u64, B, MurmurFinalizer, FastRange>;

/// `n` distinct keys drawn uniformly from `[0, u64::MAX)`.
pub fn uniform_keys(n: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys: Vec<u64> = (0..n).map(|_| rng.gen_range(0..u64::MAX)).collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// `0..n`
pub fn dense_keys(n: usize) -> Vec<u64> {
    (0..n as u64).collect()
}

/// Probe batch where roughly `hit_ratio` of the keys are present.
pub fn probe_keys(stored: &[u64], n: usize, hit_ratio: f64, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            if !stored.is_empty() && rng.gen_bool(hit_ratio) {
                stored[rng.gen_range(0..stored.len())]
            } else {
                rng.gen_range(0..u64::MAX)
            }
        })
        .collect()
}

/// Table at load factor `keys.len() / capacity`.
pub fn build_table<const B: usize>(keys: &[u64], capacity: usize) -> BenchTable<B> {
    let mut table = BenchTable::<B>::new(capacity, MurmurFinalizer);
    for (i, &key) in keys.iter().enumerate() {
        // Generators never emit u64::MAX.
        let _ = table.insert(key, i as u64);
    }
    table
}

/// Equal-width piecewise model over sorted `keys`, predicting into
/// `[0, full_size)`.
pub fn piecewise_rmi<const MAX_LEAVES: usize>(keys: &[u64], leaves: usize, full_size: usize) -> RmiHash<MAX_LEAVES> {
    let (Some(&min), Some(&max)) = (keys.first(), keys.last()) else {
        return RmiHash::from_parts(LinearModel::default(), Vec::new(), full_size);
    };
    let root = LinearModel::through(min as f64, 0.0, max as f64, 1.0);
    let leaves = leaves.min(MAX_LEAVES).min(keys.len());
    let models = (0..leaves)
        .map(|i| {
            let lo = i * keys.len() / leaves;
            let hi = ((i + 1) * keys.len() / leaves).max(lo + 1) - 1;
            LinearModel::through(
                keys[lo] as f64,
                lo as f64 / keys.len() as f64,
                keys[hi] as f64,
                hi as f64 / keys.len() as f64,
            )
        })
        .collect();
    RmiHash::from_parts(root, models, full_size)
}
