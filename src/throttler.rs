//! Bounding the number of in-flight tasks.
//!
//! Spawning one task per key up front would overflow the fixed ready queue,
//! and past the memory system's outstanding-miss window extra tasks add no
//! latency hiding anyway. The throttler starts tasks as capacity frees up,
//! so at steady state exactly `n_streams` tasks are mid-flight.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::scheduler::{Coroutine, Scheduler, MAX_CORO};

/// Counters gathered over one interleaved call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InterleaveStats {
    /// Tasks spawned (one per input key).
    pub tasks: usize,
    /// Prefetch suspensions served by the scheduler.
    pub suspensions: u64,
    /// Highest number of simultaneously outstanding tasks.
    pub peak_outstanding: usize,
}

/// Check `1 <= n_streams <= MAX_CORO`.
pub fn validate_streams(n_streams: usize) -> Result<()> {
    if n_streams == 0 || n_streams > MAX_CORO {
        return Err(Error::InvalidStreams {
            n_streams,
            max: MAX_CORO,
        });
    }
    Ok(())
}

/// Caps in-flight tasks at `n_streams` and feeds completions to a sink.
pub struct Throttler<T: Coroutine, S> {
    scheduler: Scheduler<T>,
    n_streams: usize,
    outstanding: usize,
    peak: usize,
    spawned: usize,
    sink: S,
}

impl<T, S> Throttler<T, S>
where
    T: Coroutine,
    S: FnMut(T::Output),
{
    /// Create a throttler. `sink` receives every task output in completion
    /// order.
    pub fn new(n_streams: usize, sink: S) -> Result<Self> {
        validate_streams(n_streams)?;
        Ok(Self {
            scheduler: Scheduler::with_frame_capacity(n_streams),
            n_streams,
            outstanding: 0,
            peak: 0,
            spawned: 0,
            sink,
        })
    }

    /// Take ownership of a not-yet-started task and start it.
    ///
    /// If `n_streams` tasks are already in flight, ready tasks are resumed
    /// until one of them completes.
    pub fn spawn(&mut self, task: T) {
        while self.outstanding >= self.n_streams {
            if !self.resume_one() {
                break;
            }
        }
        debug_assert!(self.outstanding < self.n_streams);

        self.outstanding += 1;
        self.spawned += 1;
        self.peak = self.peak.max(self.outstanding);
        if let Some(output) = self.scheduler.start(task) {
            self.on_task_complete(output);
        }
    }

    /// Record a finished task.
    #[inline]
    pub fn on_task_complete(&mut self, output: T::Output) {
        debug_assert!(self.outstanding > 0);
        self.outstanding -= 1;
        (self.sink)(output);
    }

    /// Resume ready tasks until every spawned task has completed.
    pub fn run(&mut self) -> InterleaveStats {
        while self.outstanding > 0 {
            if !self.resume_one() {
                break;
            }
        }
        debug_assert_eq!(self.outstanding, 0, "outstanding tasks left with an empty ready queue");
        self.stats()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn peak_outstanding(&self) -> usize {
        self.peak
    }

    pub fn n_streams(&self) -> usize {
        self.n_streams
    }

    pub fn stats(&self) -> InterleaveStats {
        InterleaveStats {
            tasks: self.spawned,
            suspensions: self.scheduler.suspensions(),
            peak_outstanding: self.peak,
        }
    }

    /// Resume one ready task. Returns `false` if none was ready.
    fn resume_one(&mut self) -> bool {
        match self.scheduler.resume_next() {
            Some(Some(output)) => {
                self.on_task_complete(output);
                true
            }
            Some(None) => true,
            None => false,
        }
    }
}

/// Spawn every task under an `n_streams` cap and run until all complete.
///
/// `n_streams` is validated before the first task is pulled from `tasks`.
pub fn drive<T, I, S>(tasks: I, n_streams: usize, sink: S) -> Result<InterleaveStats>
where
    T: Coroutine,
    I: IntoIterator<Item = T>,
    S: FnMut(T::Output),
{
    let mut throttler = Throttler::new(n_streams, sink)?;
    for task in tasks {
        throttler.spawn(task);
    }
    Ok(throttler.run())
}
