//! Single-threaded cooperative scheduler for stackless probe tasks.
//!
//! A task is an explicit state machine implementing [`Coroutine`]. Each call
//! to [`Coroutine::resume`] runs the task until it either finishes or hits a
//! prefetch, in which case it parks its own handle on the ready queue (see
//! [`crate::prefetch::prefetch_and_schedule_on`]) and returns
//! [`Step::Suspended`]. The scheduler then resumes whichever task has waited
//! longest, giving each prefetch one round of sibling work to complete.
//!
//! Task frames live in a slab owned by the scheduler. A frame is allocated
//! when a task starts and dropped exactly once when it completes. The slab
//! belongs to a single interleaved call, so nothing is shared across calls
//! or threads.

/// Largest supported number of concurrently in-flight tasks.
pub const MAX_CORO: usize = 64;

/// Ready queue capacity.
pub const QUEUE_CAPACITY: usize = MAX_CORO + 1;

/// Handle of a suspended task: an index into the frame slab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct TaskId(u16);

impl TaskId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Outcome of one resumption.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<O> {
    /// The task issued a prefetch and parked itself on the ready queue.
    Suspended,
    /// The task finished with its output. Its frame is released.
    Complete(O),
}

/// A resumable probe.
pub trait Coroutine {
    type Output;

    /// Run from the saved state to the next suspension point or to the end.
    fn resume(&mut self, cx: &mut Context<'_>) -> Step<Self::Output>;
}

/// View of the scheduler handed to a running task.
pub struct Context<'q> {
    ready: &'q mut ReadyQueue,
    handle: TaskId,
}

impl Context<'_> {
    /// Handle of the running task.
    pub fn handle(&self) -> TaskId {
        self.handle
    }

    /// Put the running task back on the ready queue.
    #[inline]
    pub(crate) fn reschedule(&mut self) {
        self.ready.enqueue(self.handle);
    }
}

// =============================================================================
// Ready queue
// =============================================================================

/// Fixed-capacity FIFO ring of suspended task handles.
pub struct ReadyQueue {
    slots: [TaskId; QUEUE_CAPACITY],
    head: usize,
    len: usize,
    enqueued: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            slots: [TaskId(0); QUEUE_CAPACITY],
            head: 0,
            len: 0,
            enqueued: 0,
        }
    }

    /// Append a handle.
    ///
    /// # Panics
    /// Panics if the queue is full. The throttler caps in-flight tasks
    /// below the capacity, so this only fires on a scheduling defect.
    #[inline]
    pub fn enqueue(&mut self, handle: TaskId) {
        assert!(
            self.len < QUEUE_CAPACITY,
            "ready queue overflow (capacity {QUEUE_CAPACITY})"
        );
        let tail = (self.head + self.len) % QUEUE_CAPACITY;
        self.slots[tail] = handle;
        self.len += 1;
        self.enqueued += 1;
    }

    #[inline]
    pub fn pop(&mut self) -> Option<TaskId> {
        if self.len == 0 {
            return None;
        }
        let handle = self.slots[self.head];
        self.head = (self.head + 1) % QUEUE_CAPACITY;
        self.len -= 1;
        Some(handle)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == QUEUE_CAPACITY
    }

    /// Total handles ever enqueued, i.e. suspensions served.
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Ready queue plus the frame slab of one interleaved call.
pub struct Scheduler<T> {
    ready: ReadyQueue,
    frames: Vec<Option<T>>,
    free: Vec<TaskId>,
}

impl<T: Coroutine> Scheduler<T> {
    pub fn new() -> Self {
        Self::with_frame_capacity(0)
    }

    /// Pre-size the frame slab for `frames` simultaneous tasks.
    pub fn with_frame_capacity(frames: usize) -> Self {
        let frames = frames.min(QUEUE_CAPACITY);
        Self {
            ready: ReadyQueue::new(),
            frames: Vec::with_capacity(frames),
            free: Vec::with_capacity(frames),
        }
    }

    /// Place `task` in a fresh frame and run it up to its first suspension.
    ///
    /// Returns the output if the task finished without suspending.
    pub fn start(&mut self, task: T) -> Option<T::Output> {
        let handle = self.alloc_frame(task);
        self.resume(handle)
    }

    /// Park a handle for a later resume.
    pub fn enqueue(&mut self, handle: TaskId) {
        self.ready.enqueue(handle);
    }

    /// Pop the oldest ready task and resume it.
    ///
    /// `None` means the queue was empty. Otherwise the inner value is the
    /// task's output if this resumption completed it.
    pub fn resume_next(&mut self) -> Option<Option<T::Output>> {
        let handle = self.ready.pop()?;
        Some(self.resume(handle))
    }

    /// Number of tasks waiting on the ready queue.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Number of live frames.
    pub fn live_frames(&self) -> usize {
        self.frames.len() - self.free.len()
    }

    /// Suspensions served since construction.
    pub fn suspensions(&self) -> u64 {
        self.ready.enqueued()
    }

    fn alloc_frame(&mut self, task: T) -> TaskId {
        if let Some(handle) = self.free.pop() {
            debug_assert!(self.frames[handle.index()].is_none());
            self.frames[handle.index()] = Some(task);
            return handle;
        }
        assert!(
            self.frames.len() < QUEUE_CAPACITY,
            "frame slab exhausted (capacity {QUEUE_CAPACITY})"
        );
        let handle = TaskId(self.frames.len() as u16);
        self.frames.push(Some(task));
        handle
    }

    fn resume(&mut self, handle: TaskId) -> Option<T::Output> {
        let Self { ready, frames, free } = self;
        let frame = match frames[handle.index()].as_mut() {
            Some(frame) => frame,
            None => panic!("resumed task {handle:?} has no live frame"),
        };
        let mut cx = Context { ready, handle };
        match frame.resume(&mut cx) {
            Step::Suspended => None,
            Step::Complete(output) => {
                frames[handle.index()] = None;
                free.push(handle);
                Some(output)
            }
        }
    }
}

impl<T: Coroutine> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
