//! Thread state and pending-scenario types

use core::fmt;

/// State of a logical thread
///
/// `Terminated` is not a variant: a terminated thread simply has no
/// control block any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Waiting in the ready queue
    Ready = 0,

    /// Currently dispatched
    Running = 1,

    /// Parked until someone calls resume
    Blocked = 2,

    /// Counting down scheduler ticks until an automatic wake
    Sleeping = 3,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadState::Ready => write!(f, "READY"),
            ThreadState::Running => write!(f, "RUNNING"),
            ThreadState::Blocked => write!(f, "BLOCKED"),
            ThreadState::Sleeping => write!(f, "SLEEPING"),
        }
    }
}

/// What happens to the running thread at the next dispatch boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Scenario {
    /// Quantum expired: requeue at the tail of the ready queue
    #[default]
    Routine = 0,

    /// The thread blocked itself
    ToBlock = 1,

    /// The thread put itself to sleep
    ToSleep = 2,

    /// The thread terminated itself; its TCB waits in the pending-free slot
    ToSelfRemove = 3,
}

impl Scenario {
    /// Whether the running thread's own fate changed, so a dispatch
    /// must happen right away instead of at the next timer tick
    #[inline]
    pub const fn needs_dispatch(&self) -> bool {
        !matches!(self, Scenario::Routine)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Routine => write!(f, "routine"),
            Scenario::ToBlock => write!(f, "to-block"),
            Scenario::ToSleep => write!(f, "to-sleep"),
            Scenario::ToSelfRemove => write!(f, "to-self-remove"),
        }
    }
}
