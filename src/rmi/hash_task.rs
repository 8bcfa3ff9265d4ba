use crate::error::Result;
use crate::key::{ensure_probe_key, Key};
use crate::prefetch::prefetch_and_schedule_on;
use crate::scheduler::{Context, Coroutine, Step};

use super::{HashResult, RmiHash};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HashState {
    Init,
    AwaitLeaf(usize),
    Done,
}

/// Resumable evaluation of an [`RmiHash`] for one key.
///
/// Suspends exactly once, on the selected leaf model, unless the model has
/// no leaves.
pub struct HashTask<'m, K, const MAX_LEAVES: usize> {
    model: &'m RmiHash<MAX_LEAVES>,
    key: K,
    state: HashState,
}

impl<'m, K: Key, const MAX_LEAVES: usize> HashTask<'m, K, MAX_LEAVES> {
    pub fn new(model: &'m RmiHash<MAX_LEAVES>, key: K) -> Result<Self> {
        Ok(Self::unchecked(model, ensure_probe_key(key)?))
    }

    pub(crate) fn unchecked(model: &'m RmiHash<MAX_LEAVES>, key: K) -> Self {
        debug_assert!(!key.is_sentinel());
        Self {
            model,
            key,
            state: HashState::Init,
        }
    }

    pub fn key(&self) -> K {
        self.key
    }

    fn finish(&mut self, hash: usize) -> Step<HashResult<K>> {
        self.state = HashState::Done;
        Step::Complete(HashResult::new(self.key, hash))
    }
}

impl<K: Key, const MAX_LEAVES: usize> Coroutine for HashTask<'_, K, MAX_LEAVES> {
    type Output = HashResult<K>;

    fn resume(&mut self, cx: &mut Context<'_>) -> Step<Self::Output> {
        let model = self.model;
        let x = self.key.to_u64() as f64;
        match self.state {
            HashState::Init if model.leaf_count() == 0 => {
                self.finish(model.root().predict(x, model.max_output()))
            }
            HashState::Init => {
                let leaf = model.leaf_index(x);
                self.state = HashState::AwaitLeaf(leaf);
                prefetch_and_schedule_on(Some(model.leaf(leaf)), cx)
            }
            HashState::AwaitLeaf(leaf) => {
                let hash = model.leaf(leaf).predict(x, model.max_output());
                debug_assert!(hash <= model.max_output());
                self.finish(hash)
            }
            HashState::Done => panic!("hash task for {:?} resumed after completion", self.key),
        }
    }
}
