//! # coro-probe
//!
//! Interleaved, prefetching lookups over chained hash tables and two-level
//! learned hash models.
//!
//! A pointer-chasing probe spends most of its time waiting on cache misses.
//! Each probe here is a small resumable task: before every dependent load it
//! issues a prefetch and yields, and a single-threaded scheduler resumes the
//! other in-flight probes while the line arrives. A throttler keeps a fixed
//! number of probes (`n_streams`) in flight.
//!
//! ## Example
//!
//! ```rust
//! use coro_probe::{ChainedTable, FastRange, MurmurFinalizer};
//!
//! let mut table: ChainedTable<u64, u64, 4, MurmurFinalizer, FastRange> =
//!     ChainedTable::new(1024, MurmurFinalizer);
//! for key in 0..1000u64 {
//!     table.insert(key, key * 2).unwrap();
//! }
//!
//! let keys = [7u64, 999, 4242];
//! let mut results = Vec::new();
//! let stats = table.interleaved_multilookup(&keys, &mut results, 8).unwrap();
//! assert_eq!(stats.tasks, 3);
//!
//! // Results arrive in completion order; match them by key.
//! results.sort_by_key(|r| r.key());
//! assert_eq!(results[0].payload(), Some(&14));
//! assert_eq!(results[1].payload(), Some(&1998));
//! assert!(!results[2].is_found());
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod chained;
pub mod config;
pub mod error;
pub mod hashing;
pub mod key;
pub mod prefetch;
pub mod rmi;
pub mod scheduler;
pub mod throttler;

pub use chained::{ChainedTable, LookupResult, LookupTask};
pub use config::{InterleaveConfig, DEFAULT_STREAMS};
pub use error::{Error, Result};
pub use hashing::{DoNothing, FastRange, HashFn, Modulo, MultPrime64, MurmurFinalizer, ReductionFn};
pub use key::Key;
pub use rmi::{HashResult, HashTask, LinearModel, RmiHash};
pub use scheduler::{Context, Coroutine, ReadyQueue, Scheduler, Step, TaskId, MAX_CORO, QUEUE_CAPACITY};
pub use throttler::{drive, InterleaveStats, Throttler};

#[cfg(test)]
mod proptests;
