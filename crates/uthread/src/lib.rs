//! # uthread - preemptive user-level threads
//!
//! Many threads of control multiplexed onto the calling OS thread, with
//! strict round-robin scheduling. Each thread runs for one quantum at a
//! time; a process interval timer ends the quantum and the next ready
//! thread takes over.
//!
//! ## Features
//!
//! - **Preemptive**: CPU-bound threads are switched out without cooperation
//! - **Deterministic ids**: a new thread gets the smallest free id
//! - **Blocking and sleeping**: block/resume by id, sleep by quantum count
//! - **Quantum accounting**: per-thread and global quantum counters
//!
//! ## Quick Start
//!
//! ```ignore
//! use uthread::{init, spawn, terminate, ThreadId};
//!
//! fn worker() {
//!     for _ in 0..1_000_000 {
//!         std::hint::black_box(());
//!     }
//!     // Returning ends the thread
//! }
//!
//! fn main() {
//!     init(10_000).unwrap(); // 10ms quanta
//!     let id = spawn(worker).unwrap();
//!     while uthread::quantums_of(id).is_ok() {}
//!     terminate(ThreadId::MAIN).unwrap(); // exits the process
//! }
//! ```
//!
//! ## Errors
//!
//! Misuse (unknown id, operating on main, bad input, full table) returns
//! an `Err`, prints `thread library error: ...` to stderr and changes
//! nothing. Failures of the underlying system facilities print
//! `system error: ...` and exit the process with status 1.
//!
//! ## Caveats
//!
//! Preemption can land anywhere, including inside the allocator or while
//! stdout is locked. Threads that print should do so inside
//! [`without_preemption`].

// Re-export core types
pub use uthread_core::{SchedError, SchedResult, ThreadId, ThreadState};

// Re-export kprint macros for debug logging
pub use uthread_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use uthread_core::kprint::{LogLevel, init as init_logging, set_log_level};

// Re-export env utilities
pub use uthread_core::{env_get, env_get_bool, env_get_opt};

// Re-export runtime types
pub use uthread_runtime::{EntryFn, SchedulerConfig, TimerClock};

use uthread_runtime::global;

/// Initialize the library with quanta of `quantum_usecs` microseconds
///
/// Other settings come from the environment (see [`SchedulerConfig::from_env`]).
/// The caller becomes the main thread, id 0.
pub fn init(quantum_usecs: u64) -> SchedResult<()> {
    if quantum_usecs == 0 {
        let e = SchedError::InvalidInput("quantum must be positive");
        e.report();
        return Err(e);
    }
    global::init(SchedulerConfig::from_env().quantum_usecs(quantum_usecs))
}

/// Initialize the library with an explicit configuration
pub fn init_with_config(config: SchedulerConfig) -> SchedResult<()> {
    global::init(config)
}

/// Create a thread that runs `entry`
///
/// The new thread is appended to the ready queue and gets the smallest
/// free id. When `entry` returns, the thread terminates itself.
#[inline]
pub fn spawn(entry: EntryFn) -> SchedResult<ThreadId> {
    global::spawn(entry)
}

/// Terminate thread `id`
///
/// - `ThreadId::MAIN` releases everything and exits the process (status 0)
/// - the calling thread's own id does not return
#[inline]
pub fn terminate(id: ThreadId) -> SchedResult<()> {
    global::terminate(id)
}

/// Terminate the calling thread
#[inline]
pub fn exit() -> ! {
    global::exit_current()
}

/// Block thread `id` until [`resume`]d
///
/// Blocking the calling thread gives up the CPU. Blocking the main thread
/// is an error; blocking a blocked or sleeping thread does nothing.
#[inline]
pub fn block(id: ThreadId) -> SchedResult<()> {
    global::block(id)
}

/// Move a blocked thread to the back of the ready queue
///
/// No effect on threads that are not blocked.
#[inline]
pub fn resume(id: ThreadId) -> SchedResult<()> {
    global::resume(id)
}

/// Give up the CPU for `quantums` quanta (not allowed on main)
#[inline]
pub fn sleep(quantums: u32) -> SchedResult<()> {
    global::sleep(quantums)
}

/// Quanta until thread `id` wakes up; 0 if it is not sleeping
#[inline]
pub fn time_until_wakeup(id: ThreadId) -> SchedResult<u32> {
    global::time_until_wakeup(id)
}

/// Id of the calling thread
#[inline]
pub fn current_id() -> ThreadId {
    global::current_id()
}

/// Quanta started since init, the current one included
#[inline]
pub fn total_quantums() -> u64 {
    global::total_quantums()
}

/// Quanta in which thread `id` was running, the current one included
#[inline]
pub fn quantums_of(id: ThreadId) -> SchedResult<u64> {
    global::quantums_of(id)
}

/// Run `f` without being preempted
///
/// Blocking or sleeping the caller from `f` still gives up the CPU right
/// away; `f` carries on when the thread is dispatched again. [`exit`] and
/// self-[`terminate`] do not return.
#[inline]
pub fn without_preemption<R>(f: impl FnOnce() -> R) -> SchedResult<R> {
    global::without_preemption(f)
}

/// Integer-sentinel interface
///
/// Same operations as the crate root, with plain integer ids and results:
/// non-negative on success, `-1` on a (reported) user error.
pub mod raw {
    use super::*;

    /// Failure sentinel
    pub const FAILURE: i32 = -1;

    fn to_id(tid: i32) -> SchedResult<ThreadId> {
        u32::try_from(tid)
            .map(ThreadId::new)
            .map_err(|_| SchedError::IdOutOfRange(ThreadId::NONE))
    }

    fn status<T>(result: SchedResult<T>) -> i32 {
        match result {
            Ok(_) => 0,
            Err(_) => FAILURE,
        }
    }

    fn reported<T>(result: SchedResult<T>) -> SchedResult<T> {
        if let Err(e) = &result {
            e.report();
        }
        result
    }

    fn clamp(n: u64) -> i32 {
        i32::try_from(n).unwrap_or(i32::MAX)
    }

    /// 0 on success, -1 for a non-positive quantum
    pub fn init(quantum_usecs: i32) -> i32 {
        match u64::try_from(quantum_usecs) {
            Ok(q) => status(super::init(q)),
            Err(_) => status(reported::<()>(Err(SchedError::InvalidInput(
                "quantum must be positive",
            )))),
        }
    }

    /// New thread id, or -1
    pub fn spawn(entry: EntryFn) -> i32 {
        match super::spawn(entry) {
            Ok(id) => clamp(id.as_u32() as u64),
            Err(_) => FAILURE,
        }
    }

    /// 0, or -1; does not return for the caller's own id or 0
    pub fn terminate(tid: i32) -> i32 {
        status(reported(to_id(tid)).and_then(super::terminate))
    }

    pub fn block(tid: i32) -> i32 {
        status(reported(to_id(tid)).and_then(super::block))
    }

    pub fn resume(tid: i32) -> i32 {
        status(reported(to_id(tid)).and_then(super::resume))
    }

    /// 0, or -1 for main or a non-positive count
    pub fn sleep(num_quantums: i32) -> i32 {
        match u32::try_from(num_quantums) {
            Ok(n) => status(super::sleep(n)),
            Err(_) => status(reported::<()>(Err(SchedError::InvalidInput(
                "sleep requires at least one quantum",
            )))),
        }
    }

    pub fn time_until_wakeup(tid: i32) -> i32 {
        match reported(to_id(tid)).and_then(super::time_until_wakeup) {
            Ok(n) => clamp(n as u64),
            Err(_) => FAILURE,
        }
    }

    /// Calling thread's id, or -1 before init
    pub fn current_id() -> i32 {
        let id = super::current_id();
        if id.is_none() {
            FAILURE
        } else {
            clamp(id.as_u32() as u64)
        }
    }

    pub fn total_quantums() -> i32 {
        clamp(super::total_quantums())
    }

    pub fn quantums_of(tid: i32) -> i32 {
        match reported(to_id(tid)).and_then(super::quantums_of) {
            Ok(n) => clamp(n),
            Err(_) => FAILURE,
        }
    }

}
