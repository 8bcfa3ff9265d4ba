//! Pluggable hash functions and reductions.
//!
//! A table maps `key -> hash -> directory index` in two steps: a [`HashFn`]
//! produces a raw 64-bit value and a [`ReductionFn`] folds it into
//! `[0, directory_len)`. Learned hashes already predict an in-range index
//! and pair with [`DoNothing`].

use crate::key::Key;

/// A hash function over keys of type `K`.
pub trait HashFn<K: Key> {
    fn hash(&self, key: K) -> u64;

    /// Short identifier used in table names.
    fn name() -> String
    where
        Self: Sized;
}

/// Folds a raw hash into a directory index.
pub trait ReductionFn {
    /// Build a reduction onto `[0, directory_len)`.
    fn new(directory_len: usize) -> Self;

    fn reduce(&self, hash: u64) -> usize;

    fn name() -> String
    where
        Self: Sized;
}

// =============================================================================
// Hash functions
// =============================================================================

/// Murmur3 64-bit finalizer (`fmix64`).
#[derive(Clone, Copy, Debug, Default)]
pub struct MurmurFinalizer;

impl<K: Key> HashFn<K> for MurmurFinalizer {
    #[inline]
    fn hash(&self, key: K) -> u64 {
        let mut h = key.to_u64();
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
        h ^= h >> 33;
        h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        h ^= h >> 33;
        h
    }

    fn name() -> String {
        "murmur_finalizer64".to_string()
    }
}

/// Multiplicative hash with a fixed odd 64-bit multiplier.
#[derive(Clone, Copy, Debug, Default)]
pub struct MultPrime64;

impl MultPrime64 {
    const PRIME: u64 = 0x9e37_79b9_7f4a_7c15;
}

impl<K: Key> HashFn<K> for MultPrime64 {
    #[inline]
    fn hash(&self, key: K) -> u64 {
        key.to_u64().wrapping_mul(Self::PRIME)
    }

    fn name() -> String {
        "mult_prime64".to_string()
    }
}

// =============================================================================
// Reductions
// =============================================================================

/// Passes the hash through unchanged.
///
/// The hash must already lie in `[0, directory_len)`, which holds for
/// learned hashes trained onto the table size.
#[derive(Clone, Copy, Debug)]
pub struct DoNothing {
    directory_len: usize,
}

impl ReductionFn for DoNothing {
    fn new(directory_len: usize) -> Self {
        Self { directory_len }
    }

    #[inline]
    fn reduce(&self, hash: u64) -> usize {
        debug_assert!((hash as usize) < self.directory_len.max(1));
        hash as usize
    }

    fn name() -> String {
        "do_nothing".to_string()
    }
}

/// Plain modulo.
#[derive(Clone, Copy, Debug)]
pub struct Modulo {
    directory_len: u64,
}

impl ReductionFn for Modulo {
    fn new(directory_len: usize) -> Self {
        Self {
            directory_len: directory_len.max(1) as u64,
        }
    }

    #[inline]
    fn reduce(&self, hash: u64) -> usize {
        (hash % self.directory_len) as usize
    }

    fn name() -> String {
        "modulo".to_string()
    }
}

/// Lemire's multiply-shift range reduction.
#[derive(Clone, Copy, Debug)]
pub struct FastRange {
    directory_len: u64,
}

impl ReductionFn for FastRange {
    fn new(directory_len: usize) -> Self {
        Self {
            directory_len: directory_len as u64,
        }
    }

    #[inline]
    fn reduce(&self, hash: u64) -> usize {
        ((u128::from(hash) * u128::from(self.directory_len)) >> 64) as usize
    }

    fn name() -> String {
        "fastrange64".to_string()
    }
}
