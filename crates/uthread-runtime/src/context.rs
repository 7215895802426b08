//! Execution contexts
//!
//! An execution context is everything needed to resume a suspended
//! thread: its callee-saved registers and the signal mask it had when it
//! was suspended. Contexts live inline in the thread table, so switching
//! never allocates.

use crate::arch::ThreadStart;
use crate::current_arch::{self, SavedRegs};
use nix::sys::signal::SigSet;
use uthread_core::{SchedError, SchedResult};

/// Resumable state of one thread
pub struct ExecutionContext {
    regs: SavedRegs,
    sigmask: SigSet,
}

impl ExecutionContext {
    /// Context for the thread that is already running (main)
    ///
    /// Registers are filled in by the first switch away from it.
    pub fn running() -> SchedResult<Self> {
        Ok(Self {
            regs: SavedRegs::default(),
            sigmask: current_mask()?,
        })
    }

    /// Context whose first resumption calls `start(arg)` on `stack_top`
    ///
    /// `sigmask` is installed by `start` before any user code runs.
    ///
    /// # Safety
    ///
    /// `stack_top` must be the top of a mapped stack that outlives the
    /// context.
    pub unsafe fn fresh(
        stack_top: *mut u8,
        start: ThreadStart,
        arg: usize,
        sigmask: SigSet,
    ) -> Self {
        let mut regs = SavedRegs::default();
        current_arch::init_context(&mut regs, stack_top, start, arg);
        Self { regs, sigmask }
    }

    /// Signal mask to reinstate when this context resumes
    #[inline]
    pub fn sigmask(&self) -> &SigSet {
        &self.sigmask
    }

    /// Install this context's saved signal mask on the calling thread
    pub fn apply_sigmask(&self) -> SchedResult<()> {
        self.sigmask.thread_set_mask().map_err(errno_of)
    }
}

/// How to leave the current thread after a dispatch
#[derive(Debug, Clone, Copy)]
pub enum Switch {
    /// The outgoing thread keeps running
    Stay,
    /// Save the outgoing thread, resume the incoming one
    Swap {
        from: *mut ExecutionContext,
        to: *const ExecutionContext,
    },
    /// The outgoing thread removed itself; just resume the incoming one
    Resume { to: *const ExecutionContext },
}

/// Carry out a switch decided by the scheduler
///
/// For `Swap` this returns once the outgoing thread is resumed again.
/// `Resume` never returns.
///
/// # Safety
///
/// The pointers must reference contexts that stay in place until the
/// switch completes. Must be called with the quantum signal masked.
pub unsafe fn perform(switch: Switch) -> SchedResult<()> {
    match switch {
        Switch::Stay => Ok(()),
        Switch::Swap { from, to } => {
            (*from).sigmask = current_mask()?;
            current_arch::context_switch(
                core::ptr::addr_of_mut!((*from).regs),
                core::ptr::addr_of!((*to).regs),
            );
            // Resumed
            (*from).apply_sigmask()
        }
        Switch::Resume { to } => current_arch::context_restore(core::ptr::addr_of!((*to).regs)),
    }
}

/// Signal mask of the calling thread
pub fn current_mask() -> SchedResult<SigSet> {
    SigSet::thread_get_mask().map_err(errno_of)
}

pub(crate) fn errno_of(e: nix::Error) -> SchedError {
    SchedError::SignalSetup(e as i32)
}
