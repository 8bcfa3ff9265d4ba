use crate::error::Result;
use crate::hashing::{HashFn, ReductionFn};
use crate::key::{ensure_probe_key, Key};
use crate::prefetch::prefetch_and_schedule_on;
use crate::scheduler::{Context, Coroutine, Step};

use super::{BucketId, ChainedTable, LookupResult, Scan};

/// Where a suspended lookup resumes.
///
/// The inline-hit check and the bucket scan run to completion inside a
/// single resume, so only the awaits are states of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LookupState {
    Init,
    /// Prefetch of the chain head issued; may be NULL.
    AwaitChainHead(BucketId),
    AwaitNextBucket(BucketId),
    Done,
}

/// Resumable lookup of one key in a [`ChainedTable`].
///
/// Suspends once before touching the chain head and once per further
/// bucket it follows. A hit on the inline slot completes without
/// suspending.
pub struct LookupTask<'t, K, P, const BUCKET_SIZE: usize, H, R> {
    table: &'t ChainedTable<K, P, BUCKET_SIZE, H, R>,
    key: K,
    state: LookupState,
}

impl<'t, K, P, const BUCKET_SIZE: usize, H, R> LookupTask<'t, K, P, BUCKET_SIZE, H, R>
where
    K: Key,
    P: Copy + Default,
    H: HashFn<K>,
    R: ReductionFn,
{
    pub fn new(table: &'t ChainedTable<K, P, BUCKET_SIZE, H, R>, key: K) -> Result<Self> {
        Ok(Self::unchecked(table, ensure_probe_key(key)?))
    }

    /// Caller has already rejected the sentinel key.
    pub(crate) fn unchecked(table: &'t ChainedTable<K, P, BUCKET_SIZE, H, R>, key: K) -> Self {
        debug_assert!(!key.is_sentinel());
        Self {
            table,
            key,
            state: LookupState::Init,
        }
    }

    pub fn key(&self) -> K {
        self.key
    }

    pub fn is_done(&self) -> bool {
        self.state == LookupState::Done
    }

    fn finish(&mut self, result: LookupResult<'t, K, P>) -> Step<LookupResult<'t, K, P>> {
        self.state = LookupState::Done;
        Step::Complete(result)
    }

    fn scan(&mut self, id: BucketId, cx: &mut Context<'_>) -> Step<LookupResult<'t, K, P>> {
        let table = self.table;
        let Some(bucket) = table.bucket(id) else {
            return self.finish(LookupResult::absent(self.key));
        };
        match bucket.scan(self.key) {
            Scan::Found(payload) => self.finish(LookupResult::found(self.key, payload)),
            Scan::Hole => self.finish(LookupResult::absent(self.key)),
            Scan::Exhausted if bucket.next.is_null() => self.finish(LookupResult::absent(self.key)),
            Scan::Exhausted => {
                self.state = LookupState::AwaitNextBucket(bucket.next);
                prefetch_and_schedule_on(table.bucket(bucket.next), cx)
            }
        }
    }
}

impl<'t, K, P, const BUCKET_SIZE: usize, H, R> Coroutine for LookupTask<'t, K, P, BUCKET_SIZE, H, R>
where
    K: Key,
    P: Copy + Default,
    H: HashFn<K>,
    R: ReductionFn,
{
    type Output = LookupResult<'t, K, P>;

    fn resume(&mut self, cx: &mut Context<'_>) -> Step<Self::Output> {
        match self.state {
            LookupState::Init => {
                let table = self.table;
                let slot = table.slot_for(self.key);
                if slot.key == self.key {
                    return self.finish(LookupResult::found(self.key, &slot.payload));
                }
                self.state = LookupState::AwaitChainHead(slot.head);
                prefetch_and_schedule_on(table.bucket(slot.head), cx)
            }
            LookupState::AwaitChainHead(id) | LookupState::AwaitNextBucket(id) => self.scan(id, cx),
            LookupState::Done => panic!("lookup task for {:?} resumed after completion", self.key),
        }
    }
}
