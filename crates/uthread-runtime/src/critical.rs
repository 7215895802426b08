//! Critical sections
//!
//! A critical section masks the quantum notification so scheduler state
//! can be mutated without the handler interleaving. Sections nest; only
//! the outermost one unmasks.
//!
//! The depth counter is shared by every green thread. It is only nonzero
//! while the signal is masked, and every switch happens at depth zero, so
//! a thread never resumes into another thread's count.
//!
//! On leaving the outermost section, a notification that arrived while
//! masked is consumed and its dispatch performed synchronously, still
//! masked, before unmasking. Operations that must give up the CPU
//! (self-block, sleep, self-terminate) call [`CriticalSection::yield_now`]
//! at whatever depth they are.

use core::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use uthread_core::{QuantumTimer, SchedResult};

/// Quantum timer plus critical-section bookkeeping
pub struct Preemption<T: QuantumTimer> {
    timer: T,

    /// Nesting depth of open critical sections
    depth: AtomicU32,

    /// Dispatch to run when a masked notification is found on exit
    on_expiry: fn(),
}

impl<T: QuantumTimer> Preemption<T> {
    pub const fn new(timer: T, on_expiry: fn()) -> Self {
        Self {
            timer,
            depth: AtomicU32::new(0),
            on_expiry,
        }
    }

    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Open critical sections
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Acquire)
    }

    /// Enter a critical section
    ///
    /// Masks on every call, nested or not; the count only moves once the
    /// signal is blocked.
    pub fn enter(&self) -> SchedResult<CriticalSection<'_, T>> {
        self.timer.mask()?;
        self.depth.fetch_add(1, Ordering::AcqRel);
        Ok(CriticalSection {
            owner: self,
            done: false,
            _not_send: PhantomData,
        })
    }

    fn leave(&self) -> SchedResult<()> {
        if self.depth.fetch_sub(1, Ordering::AcqRel) != 1 {
            return Ok(());
        }

        self.replay_pending()?;
        self.timer.unmask()
    }

    /// Run the dispatch of a notification held back by the mask
    fn replay_pending(&self) -> SchedResult<()> {
        if self.timer.is_pending()? {
            self.timer.take_pending()?;
            (self.on_expiry)();
        }
        Ok(())
    }
}

/// Guard for an open critical section
///
/// Dropping it leaves the section; errors on that path are fatal. Use
/// [`CriticalSection::exit`] to observe them instead.
pub struct CriticalSection<'a, T: QuantumTimer> {
    owner: &'a Preemption<T>,
    done: bool,
    _not_send: PhantomData<*const ()>,
}

impl<T: QuantumTimer> CriticalSection<'_, T> {
    /// Dispatch right now, whatever the nesting depth
    ///
    /// Raises a notification and replays it on the spot, so one already
    /// pending merges into it. Other threads run with no section open.
    /// Returns when the calling thread is resumed, with its sections as
    /// they were.
    pub fn yield_now(&self) -> SchedResult<()> {
        let owner = self.owner;
        owner.timer.raise_now()?;
        let depth = owner.depth.swap(0, Ordering::AcqRel);
        let replayed = owner.replay_pending();
        owner.depth.store(depth, Ordering::Release);
        replayed
    }

    /// Leave the section, reporting failures to the caller
    pub fn exit(mut self) -> SchedResult<()> {
        self.done = true;
        self.owner.leave()
    }
}

impl<T: QuantumTimer> Drop for CriticalSection<'_, T> {
    fn drop(&mut self) {
        if !self.done {
            if let Err(e) = self.owner.leave() {
                crate::global::fatal(e);
            }
        }
    }
}
