//! Two-level recursive model index used as a hash function.
//!
//! The root model picks one of `leaf_count` leaf models; the leaf then
//! predicts a position in `[0, max_output]`. Leaf arrays can be far larger
//! than cache, so [`HashTask`] prefetches the chosen leaf before reading it.

mod hash_task;
mod linear;

pub use hash_task::HashTask;
pub use linear::LinearModel;

use tracing::{debug, warn};

use crate::config::InterleaveConfig;
use crate::error::Result;
use crate::hashing::HashFn;
use crate::key::{ensure_probe_key, ensure_probe_keys, Key};
use crate::throttler::{drive, validate_streams, InterleaveStats};

/// A key paired with its predicted position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashResult<K> {
    key: K,
    hash: usize,
}

impl<K: Copy> HashResult<K> {
    pub fn new(key: K, hash: usize) -> Self {
        Self { key, hash }
    }

    pub fn key(&self) -> K {
        self.key
    }

    pub fn hash(&self) -> usize {
        self.hash
    }
}

/// Learned hash with at most `MAX_LEAVES` second-level models.
#[derive(Clone, Debug, PartialEq)]
pub struct RmiHash<const MAX_LEAVES: usize> {
    root: LinearModel,
    leaves: Vec<LinearModel>,
    max_output: usize,
}

impl<const MAX_LEAVES: usize> RmiHash<MAX_LEAVES> {
    /// Assemble an already trained model that predicts into `[0, full_size)`.
    ///
    /// With no leaves the root alone predicts the output.
    ///
    /// # Panics
    /// Panics if more than `MAX_LEAVES` leaves are given.
    pub fn from_parts(root: LinearModel, leaves: Vec<LinearModel>, full_size: usize) -> Self {
        assert!(
            leaves.len() <= MAX_LEAVES,
            "{} leaf models exceed the maximum of {MAX_LEAVES}",
            leaves.len()
        );
        Self {
            root,
            leaves,
            max_output: full_size.saturating_sub(1),
        }
    }

    /// Unchecked evaluation. Sentinel keys evaluate like any other value.
    #[inline]
    pub fn eval<K: Key>(&self, key: K) -> usize {
        let x = key.to_u64() as f64;
        if self.leaves.is_empty() {
            return self.root.predict(x, self.max_output);
        }
        self.leaves[self.leaf_index(x)].predict(x, self.max_output)
    }

    pub fn hash<K: Key>(&self, key: K) -> Result<HashResult<K>> {
        let key = ensure_probe_key(key)?;
        Ok(HashResult::new(key, self.eval(key)))
    }

    pub fn hash_task<K: Key>(&self, key: K) -> Result<HashTask<'_, K, MAX_LEAVES>> {
        HashTask::new(self, key)
    }

    /// Hash every key with up to `n_streams` leaf reads in flight.
    ///
    /// Results are appended in completion order. Stream count and keys are
    /// validated before any task starts.
    pub fn interleaved_multihash<K: Key>(
        &self,
        keys: &[K],
        results: &mut Vec<HashResult<K>>,
        n_streams: usize,
    ) -> Result<InterleaveStats> {
        if let Err(err) = validate_streams(n_streams).and_then(|()| ensure_probe_keys(keys)) {
            warn!(keys = keys.len(), n_streams, error = %err, "interleaved multihash rejected");
            return Err(err);
        }

        debug!(keys = keys.len(), n_streams, leaves = self.leaf_count(), "interleaved multihash");
        results.reserve(keys.len());
        let tasks = keys.iter().map(|&key| HashTask::unchecked(self, key));
        let stats = drive(tasks, n_streams, |result| results.push(result))?;
        debug!(
            tasks = stats.tasks,
            suspensions = stats.suspensions,
            peak_outstanding = stats.peak_outstanding,
            "interleaved multihash done"
        );
        Ok(stats)
    }

    /// Config-driven [`interleaved_multihash`](Self::interleaved_multihash).
    pub fn interleaved_multihash_with<K: Key>(
        &self,
        keys: &[K],
        results: &mut Vec<HashResult<K>>,
        config: &InterleaveConfig,
    ) -> Result<InterleaveStats> {
        config.validate()?;
        if !config.enabled {
            self.sequential_multihash(keys, results)?;
            return Ok(InterleaveStats {
                tasks: keys.len(),
                suspensions: 0,
                peak_outstanding: usize::from(!keys.is_empty()),
            });
        }
        self.interleaved_multihash(keys, results, config.n_streams)
    }

    pub fn sequential_multihash<K: Key>(&self, keys: &[K], results: &mut Vec<HashResult<K>>) -> Result<()> {
        ensure_probe_keys(keys)?;
        results.extend(keys.iter().map(|&key| HashResult::new(key, self.eval(key))));
        Ok(())
    }

    /// Root plus leaves.
    pub fn model_count(&self) -> usize {
        1 + self.leaves.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn max_output(&self) -> usize {
        self.max_output
    }

    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.leaves.len() * std::mem::size_of::<LinearModel>()
    }

    pub fn name() -> String {
        format!("coro_rmi_hash_{MAX_LEAVES}")
    }

    pub(crate) fn root(&self) -> &LinearModel {
        &self.root
    }

    pub(crate) fn leaf(&self, index: usize) -> &LinearModel {
        &self.leaves[index]
    }

    #[inline]
    pub(crate) fn leaf_index(&self, x: f64) -> usize {
        debug_assert!(!self.leaves.is_empty());
        self.root.predict(x, self.leaves.len() - 1)
    }
}

impl<K: Key, const MAX_LEAVES: usize> HashFn<K> for RmiHash<MAX_LEAVES> {
    #[inline]
    fn hash(&self, key: K) -> u64 {
        self.eval(key) as u64
    }

    fn name() -> String {
        Self::name()
    }
}
