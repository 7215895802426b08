//! Thread control blocks
//!
//! One `ThreadControlBlock` per live thread: identity, scheduling state,
//! quantum accounting, sleep countdown, and the resources needed to run
//! it (stack and saved context). Dropping a block releases its stack.

use crate::arch::ThreadStart;
use crate::context::ExecutionContext;
use crate::memory::ThreadStack;
use nix::sys::signal::SigSet;
use uthread_core::{SchedResult, ThreadId, ThreadState};

/// Entry function of a spawned thread
pub type EntryFn = fn();

/// Per-thread record owned by the scheduler
pub struct ThreadControlBlock {
    id: ThreadId,
    state: ThreadState,

    /// Quanta in which this thread was the running one
    quantums_run: u64,

    /// Quanta left before a sleeping thread becomes ready
    sleep_remaining: u32,

    /// Saved registers and signal mask, kept inline
    context: ExecutionContext,

    /// Private stack (None for the main thread, which uses the process stack)
    stack: Option<ThreadStack>,
}

impl ThreadControlBlock {
    /// Block for the already-running main thread
    ///
    /// Starts Running with its first quantum counted.
    pub fn main(id: ThreadId) -> SchedResult<Self> {
        Ok(Self {
            id,
            state: ThreadState::Running,
            quantums_run: 1,
            sleep_remaining: 0,
            context: ExecutionContext::running()?,
            stack: None,
        })
    }

    /// Block for a new thread that will run `entry` on a private stack
    ///
    /// The first resumption enters `start` with `entry` as its argument,
    /// with `sigmask` as the thread's initial signal mask.
    pub fn spawned(
        id: ThreadId,
        stack_size: usize,
        entry: EntryFn,
        start: ThreadStart,
        sigmask: SigSet,
    ) -> SchedResult<Self> {
        let stack = ThreadStack::new(stack_size)?;
        // The stack is moved into the block below; its mapping does not move.
        let context = unsafe {
            ExecutionContext::fresh(stack.aligned_top(), start, entry as usize, sigmask)
        };

        Ok(Self {
            id,
            state: ThreadState::Ready,
            quantums_run: 0,
            sleep_remaining: 0,
            context,
            stack: Some(stack),
        })
    }

    #[inline]
    pub fn id(&self) -> ThreadId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    #[inline]
    pub fn quantums_run(&self) -> u64 {
        self.quantums_run
    }

    /// Count one more quantum for this thread
    #[inline]
    pub fn bump_quantum(&mut self) {
        self.quantums_run += 1;
    }

    /// Begin sleeping for `quantums` quanta
    pub fn start_sleep(&mut self, quantums: u32) {
        self.state = ThreadState::Sleeping;
        self.sleep_remaining = quantums;
    }

    /// Count down one quantum; returns what is left
    #[inline]
    pub fn tick_sleep(&mut self) -> u32 {
        self.sleep_remaining = self.sleep_remaining.saturating_sub(1);
        self.sleep_remaining
    }

    /// Quanta left until wake-up, 0 unless sleeping
    #[inline]
    pub fn sleep_remaining(&self) -> u32 {
        if self.state == ThreadState::Sleeping {
            self.sleep_remaining
        } else {
            0
        }
    }

    #[inline]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Whether `addr` lies on this thread's private stack
    #[inline]
    pub fn runs_on(&self, addr: usize) -> bool {
        self.stack.as_ref().is_some_and(|s| s.contains(addr))
    }
}

impl core::fmt::Debug for ThreadControlBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadControlBlock")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("quantums_run", &self.quantums_run)
            .field("sleep_remaining", &self.sleep_remaining)
            .field("stack", &self.stack)
            .finish()
    }
}
