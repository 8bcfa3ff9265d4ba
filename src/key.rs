//! Key contract shared by the table and the learned model.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

/// A fixed-width key with a reserved sentinel value.
///
/// The sentinel is the "empty" marker of every slot, so it is never a
/// valid key. For the unsigned integers implemented here it is `MAX`.
pub trait Key: Copy + Eq + Hash + Debug {
    /// Reserved value marking an empty slot.
    const SENTINEL: Self;

    /// Widen to `u64` for hashing and model evaluation.
    fn to_u64(self) -> u64;

    #[inline]
    fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }
}

macro_rules! impl_key {
    ($($t:ty),*) => {
        $(
            impl Key for $t {
                const SENTINEL: Self = <$t>::MAX;

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_key!(u32, u64, usize);

/// Reject the sentinel before it reaches a probe.
#[inline]
pub(crate) fn ensure_probe_key<K: Key>(key: K) -> Result<K> {
    if key.is_sentinel() {
        return Err(Error::SentinelKey);
    }
    Ok(key)
}

/// Validate a whole batch up front so a driver never starts partially.
pub(crate) fn ensure_probe_keys<K: Key>(keys: &[K]) -> Result<()> {
    match keys.iter().position(|k| k.is_sentinel()) {
        Some(_) => Err(Error::SentinelKey),
        None => Ok(()),
    }
}
