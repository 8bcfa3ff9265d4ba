//! Bucket-chaining hash table with interleaved, prefetching lookups.
//!
//! ```text
//!  Directory (Vec<FirstLevelSlot>)          Bucket arena (Vec<Bucket>)
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │ key │ payload │ head: 0      │───────►│ 0: [k,p; B]  next: 2         │──┐
//! ├──────────────────────────────┤        ├──────────────────────────────┤  │
//! │ key │ payload │ head: NULL   │        │ 1: [k,p; B]  next: NULL      │  │
//! ├──────────────────────────────┤        ├──────────────────────────────┤  │
//! │ key │ payload │ head: 1      │───────►│ 2: [k,p; B]  next: NULL      │◄─┘
//! └──────────────────────────────┘        └──────────────────────────────┘
//! ```
//!
//! The first entry of every chain is stored inline in its directory slot, so
//! a collision-free lookup never leaves the directory. Overflow buckets are
//! allocated in an arena and linked by [`BucketId`] handles; the all-ones
//! handle stands for "no bucket".

mod lookup;

pub use lookup::LookupTask;

use tracing::{debug, trace, warn};

use crate::config::InterleaveConfig;
use crate::error::Result;
use crate::hashing::{HashFn, ReductionFn};
use crate::key::{ensure_probe_key, ensure_probe_keys, Key};
use crate::throttler::{drive, validate_streams, InterleaveStats};

// =============================================================================
// Storage
// =============================================================================

/// Handle of a bucket in the table's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub(crate) struct BucketId(u32);

impl BucketId {
    pub(crate) const NULL: BucketId = BucketId(u32::MAX);

    /// # Panics
    /// Panics if the arena outgrows 32-bit handles.
    fn from_index(index: usize) -> Self {
        assert!(index < u32::MAX as usize, "bucket arena too large");
        Self(index as u32)
    }

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    fn index(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Entry<K, P> {
    pub(crate) key: K,
    pub(crate) payload: P,
}

impl<K: Key, P: Default> Entry<K, P> {
    fn empty() -> Self {
        Self {
            key: K::SENTINEL,
            payload: P::default(),
        }
    }
}

/// Result of scanning one bucket for a key.
pub(crate) enum Scan<'t, P> {
    Found(&'t P),
    /// Hit an empty slot first: nothing further down the chain.
    Hole,
    /// Every slot was occupied by another key.
    Exhausted,
}

#[derive(Clone, Debug)]
pub(crate) struct Bucket<K, P, const BUCKET_SIZE: usize> {
    entries: [Entry<K, P>; BUCKET_SIZE],
    pub(crate) next: BucketId,
}

impl<K: Key, P: Copy + Default, const BUCKET_SIZE: usize> Bucket<K, P, BUCKET_SIZE> {
    fn with_first(key: K, payload: P) -> Self {
        let mut entries = [Entry::empty(); BUCKET_SIZE];
        entries[0] = Entry { key, payload };
        Self {
            entries,
            next: BucketId::NULL,
        }
    }

    #[inline]
    pub(crate) fn scan(&self, key: K) -> Scan<'_, P> {
        for entry in &self.entries {
            if entry.key == key {
                return Scan::Found(&entry.payload);
            }
            if entry.key.is_sentinel() {
                return Scan::Hole;
            }
        }
        Scan::Exhausted
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FirstLevelSlot<K, P> {
    pub(crate) key: K,
    pub(crate) payload: P,
    pub(crate) head: BucketId,
}

impl<K: Key, P: Default> FirstLevelSlot<K, P> {
    fn empty() -> Self {
        Self {
            key: K::SENTINEL,
            payload: P::default(),
            head: BucketId::NULL,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of probing one key.
///
/// The payload is borrowed from the table, so a result cannot outlive it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupResult<'t, K, P> {
    key: K,
    payload: Option<&'t P>,
}

impl<'t, K: Copy, P> LookupResult<'t, K, P> {
    pub fn found(key: K, payload: &'t P) -> Self {
        Self {
            key,
            payload: Some(payload),
        }
    }

    pub fn absent(key: K) -> Self {
        Self { key, payload: None }
    }

    /// The probed key. Interleaved drivers emit results in completion
    /// order, so this is how a result is matched back to its input.
    pub fn key(&self) -> K {
        self.key
    }

    pub fn payload(&self) -> Option<&'t P> {
        self.payload
    }

    pub fn is_found(&self) -> bool {
        self.payload.is_some()
    }
}

// =============================================================================
// Table
// =============================================================================

/// Chained hash table keyed by `K` with `BUCKET_SIZE`-wide overflow buckets.
///
/// The table is populated once through [`insert`](Self::insert) and then
/// probed read-only, either one key at a time or through the interleaved
/// drivers.
pub struct ChainedTable<K, P, const BUCKET_SIZE: usize, H, R> {
    hashfn: H,
    reduction: R,
    capacity: usize,
    slots: Vec<FirstLevelSlot<K, P>>,
    buckets: Vec<Bucket<K, P, BUCKET_SIZE>>,
    len: usize,
}

impl<K, P, const BUCKET_SIZE: usize, H, R> ChainedTable<K, P, BUCKET_SIZE, H, R>
where
    K: Key,
    P: Copy + Default,
    H: HashFn<K>,
    R: ReductionFn,
{
    /// Create a table with `capacity` directory slots.
    ///
    /// # Panics
    /// Panics if `BUCKET_SIZE` is zero.
    pub fn new(capacity: usize, hashfn: H) -> Self {
        assert!(BUCKET_SIZE > 0, "BUCKET_SIZE must be at least 1");
        let directory_len = Self::directory_address_count(capacity);
        Self {
            hashfn,
            reduction: R::new(directory_len),
            capacity,
            slots: (0..directory_len).map(|_| FirstLevelSlot::empty()).collect(),
            buckets: Vec::new(),
            len: 0,
        }
    }

    /// Insert a key/payload pair.
    ///
    /// Returns `Ok(false)` if the key is already present. The sentinel key is
    /// rejected with [`Error::SentinelKey`](crate::Error::SentinelKey).
    pub fn insert(&mut self, key: K, payload: P) -> Result<bool> {
        let key = ensure_probe_key(key)?;
        let slot_idx = self.slot_index(key);

        let slot = &mut self.slots[slot_idx];
        if slot.key == key {
            return Ok(false);
        }
        if slot.key.is_sentinel() {
            slot.key = key;
            slot.payload = payload;
            self.len += 1;
            return Ok(true);
        }

        let mut id = slot.head;
        if id.is_null() {
            let head = self.alloc_bucket(key, payload);
            self.slots[slot_idx].head = head;
            self.len += 1;
            return Ok(true);
        }

        loop {
            let bucket = &mut self.buckets[id.index()];
            for entry in bucket.entries.iter_mut() {
                if entry.key.is_sentinel() {
                    *entry = Entry { key, payload };
                    self.len += 1;
                    return Ok(true);
                }
                if entry.key == key {
                    return Ok(false);
                }
            }
            if bucket.next.is_null() {
                break;
            }
            id = bucket.next;
        }

        let tail = self.alloc_bucket(key, payload);
        self.buckets[id.index()].next = tail;
        self.len += 1;
        trace!(slot = slot_idx, buckets = self.buckets.len(), "chain grown");
        Ok(true)
    }

    /// Blocking probe for `key`.
    pub fn lookup(&self, key: K) -> Result<LookupResult<'_, K, P>> {
        let key = ensure_probe_key(key)?;
        let slot = self.slot_for(key);
        if slot.key == key {
            return Ok(LookupResult::found(key, &slot.payload));
        }

        let mut id = slot.head;
        while let Some(bucket) = self.bucket(id) {
            match bucket.scan(key) {
                Scan::Found(payload) => return Ok(LookupResult::found(key, payload)),
                Scan::Hole => break,
                Scan::Exhausted => id = bucket.next,
            }
        }
        Ok(LookupResult::absent(key))
    }

    /// Create a not-yet-started lookup task for `key`.
    pub fn lookup_task(&self, key: K) -> Result<LookupTask<'_, K, P, BUCKET_SIZE, H, R>> {
        LookupTask::new(self, key)
    }

    /// Probe every key with up to `n_streams` lookups in flight.
    ///
    /// One result per key is appended to `results` in completion order,
    /// which generally differs from input order. Stream count and keys are
    /// validated before any lookup starts.
    pub fn interleaved_multilookup<'t>(
        &'t self,
        keys: &[K],
        results: &mut Vec<LookupResult<'t, K, P>>,
        n_streams: usize,
    ) -> Result<InterleaveStats> {
        if let Err(err) = validate_streams(n_streams).and_then(|()| ensure_probe_keys(keys)) {
            warn!(keys = keys.len(), n_streams, error = %err, "interleaved multilookup rejected");
            return Err(err);
        }

        debug!(keys = keys.len(), n_streams, "interleaved multilookup");
        results.reserve(keys.len());
        let tasks = keys.iter().map(|&key| LookupTask::unchecked(self, key));
        let stats = drive(tasks, n_streams, |result| results.push(result))?;
        debug!(
            tasks = stats.tasks,
            suspensions = stats.suspensions,
            peak_outstanding = stats.peak_outstanding,
            "interleaved multilookup done"
        );
        Ok(stats)
    }

    /// [`interleaved_multilookup`](Self::interleaved_multilookup) driven by a
    /// config. A disabled config runs the sequential loop instead.
    pub fn interleaved_multilookup_with<'t>(
        &'t self,
        keys: &[K],
        results: &mut Vec<LookupResult<'t, K, P>>,
        config: &InterleaveConfig,
    ) -> Result<InterleaveStats> {
        config.validate()?;
        if !config.enabled {
            self.sequential_multilookup(keys, results)?;
            return Ok(InterleaveStats {
                tasks: keys.len(),
                suspensions: 0,
                peak_outstanding: usize::from(!keys.is_empty()),
            });
        }
        self.interleaved_multilookup(keys, results, config.n_streams)
    }

    /// Probe every key in input order with the blocking lookup.
    pub fn sequential_multilookup<'t>(
        &'t self,
        keys: &[K],
        results: &mut Vec<LookupResult<'t, K, P>>,
    ) -> Result<()> {
        ensure_probe_keys(keys)?;
        results.reserve(keys.len());
        for &key in keys {
            results.push(self.lookup(key)?);
        }
        Ok(())
    }

    /// Remove every entry and release the bucket arena.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = FirstLevelSlot::empty();
        }
        self.buckets.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes held by the directory and the bucket arena.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.slots.len() * Self::slot_byte_size()
            + self.buckets.len() * Self::bucket_byte_size()
    }

    pub const fn bucket_byte_size() -> usize {
        std::mem::size_of::<Bucket<K, P, BUCKET_SIZE>>()
    }

    pub const fn slot_byte_size() -> usize {
        std::mem::size_of::<FirstLevelSlot<K, P>>()
    }

    pub const fn bucket_size() -> usize {
        BUCKET_SIZE
    }

    /// Directory slots allocated for `capacity`. Never zero.
    pub const fn directory_address_count(capacity: usize) -> usize {
        if capacity == 0 {
            1
        } else {
            capacity
        }
    }

    pub fn name() -> String {
        format!(
            "chained_{}_{}_{}",
            Self::hash_name(),
            Self::reducer_name(),
            BUCKET_SIZE
        )
    }

    pub fn hash_name() -> String {
        H::name()
    }

    pub fn reducer_name() -> String {
        R::name()
    }

    #[inline]
    fn slot_index(&self, key: K) -> usize {
        self.reduction.reduce(self.hashfn.hash(key))
    }

    #[inline]
    pub(crate) fn slot_for(&self, key: K) -> &FirstLevelSlot<K, P> {
        &self.slots[self.slot_index(key)]
    }

    #[inline]
    pub(crate) fn bucket(&self, id: BucketId) -> Option<&Bucket<K, P, BUCKET_SIZE>> {
        if id.is_null() {
            None
        } else {
            Some(&self.buckets[id.index()])
        }
    }

    fn alloc_bucket(&mut self, key: K, payload: P) -> BucketId {
        let id = BucketId::from_index(self.buckets.len());
        self.buckets.push(Bucket::with_first(key, payload));
        id
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::error::Error;
    use crate::hashing::{FastRange, Modulo, MurmurFinalizer};

    type Table = ChainedTable<u64, u64, 4, MurmurFinalizer, FastRange>;

    #[test]
    fn test_insert_and_lookup() {
        let mut t = Table::new(64, MurmurFinalizer);
        for k in 0..500u64 {
            assert_eq!(t.insert(k, k + 1), Ok(true));
        }
        assert_eq!(t.len(), 500);
        for k in 0..500u64 {
            let r = t.lookup(k).unwrap();
            assert_eq!(r.key(), k);
            assert_eq!(r.payload(), Some(&(k + 1)));
        }
        assert!(!t.lookup(10_000).unwrap().is_found());
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut t = colliding_table::<1>();
        assert_eq!(t.insert(3, 1), Ok(false));
        assert_eq!(t.insert(19, 1), Ok(false));
        assert_eq!(t.len(), 3);
        assert_eq!(t.lookup(19).unwrap().payload(), Some(&1900));
    }

    #[test]
    fn test_sentinel_key_is_rejected() {
        let mut t = Table::new(16, MurmurFinalizer);
        assert_eq!(t.insert(u64::MAX, 1), Err(Error::SentinelKey));
        assert_eq!(t.lookup(u64::MAX), Err(Error::SentinelKey));
        assert!(t.lookup_task(u64::MAX).is_err());
        assert!(t.is_empty());
    }

    #[test]
    fn test_chain_layout() {
        let t = colliding_table::<1>();
        let slot = t.slot_for(3);
        assert_eq!(slot.key, 3);
        let first = t.bucket(slot.head).unwrap();
        assert_eq!(first.entries[0].key, 11);
        let second = t.bucket(first.next).unwrap();
        assert_eq!(second.entries[0].key, 19);
        assert!(second.next.is_null());
        assert_eq!(t.buckets.len(), 2);
    }

    #[test]
    fn test_bucket_scan() {
        // [11, 19] fills the only bucket.
        let t = colliding_table::<2>();
        assert_eq!(t.buckets.len(), 1);
        let bucket = t.bucket(t.slot_for(3).head).unwrap();
        assert!(matches!(bucket.scan(27), Scan::Exhausted));
        assert!(!t.lookup(27).unwrap().is_found());

        // [11, 19, _, _] stops at the first hole.
        let mut t = colliding_table::<4>();
        let bucket = t.bucket(t.slot_for(3).head).unwrap();
        assert!(matches!(bucket.scan(27), Scan::Hole));
        assert!(matches!(bucket.scan(19), Scan::Found(&1900)));

        assert_eq!(t.insert(27, 2700), Ok(true));
        assert_eq!(t.buckets.len(), 1);
        assert_eq!(t.lookup(27).unwrap().payload(), Some(&2700));
    }

    #[test]
    fn test_zero_capacity_still_probes() {
        let mut t = Table::new(0, MurmurFinalizer);
        assert_eq!(t.insert(1, 10), Ok(true));
        assert_eq!(t.insert(2, 20), Ok(true));
        assert_eq!(t.lookup(2).unwrap().payload(), Some(&20));
    }

    #[test]
    fn test_clear() {
        let mut t = colliding_table::<1>();
        t.clear();
        assert!(t.is_empty());
        assert!(!t.lookup(11).unwrap().is_found());
        assert_eq!(t.insert(11, 5), Ok(true));
        assert_eq!(t.lookup(11).unwrap().payload(), Some(&5));
    }

    #[test]
    fn test_names_and_sizes() {
        assert_eq!(
            ChainedTable::<u64, u64, 1, MurmurFinalizer, Modulo>::name(),
            "chained_murmur_finalizer64_modulo_1"
        );
        assert_eq!(Table::bucket_size(), 4);
        assert_eq!(Table::directory_address_count(100), 100);

        let t = colliding_table::<1>();
        let expected = std::mem::size_of::<CollidingTable<1>>()
            + 8 * CollidingTable::<1>::slot_byte_size()
            + 2 * CollidingTable::<1>::bucket_byte_size();
        assert_eq!(t.byte_size(), expected);
    }
}
