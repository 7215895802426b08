//! Process-wide runtime
//!
//! Holds the single scheduler and preemption controller, the quantum
//! handler, and the public operations. Every operation runs inside a
//! critical section, so the handler never observes a half-applied change.
//!
//! # Safety model
//!
//! All green threads share one OS thread. The scheduler is only touched
//! with the quantum signal masked (inside a critical section, or from the
//! handler, which runs with the signal blocked), so accesses never
//! overlap. No borrow of the scheduler is held across a context switch.

use core::cell::UnsafeCell;
use core::time::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::config::SchedulerConfig;
use crate::context::{self, current_mask};
use crate::critical::Preemption;
use crate::scheduler::Scheduler;
use crate::signal::SignalTimer;
use crate::tcb::EntryFn;

use uthread_core::error::FATAL_EXIT_STATUS;
use uthread_core::kprint::{self, LogLevel};
use uthread_core::{kdebug, kerror};
use uthread_core::{QuantumTimer, Scenario, SchedError, SchedResult, ThreadId};

/// Scheduler storage; see the module docs for why this is sound
struct SchedulerCell(UnsafeCell<Option<Scheduler>>);

unsafe impl Sync for SchedulerCell {}

static SCHEDULER: SchedulerCell = SchedulerCell(UnsafeCell::new(None));

/// Timer and critical-section state, set once by `init`
struct Runtime {
    preemption: Preemption<SignalTimer>,
    quantum: Duration,
}

static RUNTIME: OnceLock<Runtime> = OnceLock::new();
static INIT_STARTED: AtomicBool = AtomicBool::new(false);

/// Mutable access to the scheduler
///
/// # Safety
///
/// Caller must have the quantum signal masked and must not keep the
/// reference across a context switch.
#[inline]
unsafe fn scheduler_mut() -> Option<&'static mut Scheduler> {
    (*SCHEDULER.0.get()).as_mut()
}

#[inline]
fn runtime() -> SchedResult<&'static Runtime> {
    RUNTIME.get().ok_or(SchedError::NotInitialized)
}

/// Whether `init` has completed
pub fn is_initialized() -> bool {
    RUNTIME.get().is_some()
}

/// Initialize the library and start preemption
///
/// The caller becomes the main thread (id 0), running its first quantum.
/// A zero quantum or an invalid config is a user error. Failing to set up
/// the timer or its signal is fatal.
pub fn init(config: SchedulerConfig) -> SchedResult<()> {
    if config.debug_logging && kprint::log_level() < LogLevel::Debug {
        kprint::set_log_level(LogLevel::Debug);
    }

    if let Err(e) = config.validate() {
        let e = SchedError::from(e);
        e.report();
        return Err(e);
    }
    if INIT_STARTED.swap(true, Ordering::AcqRel) {
        let e = SchedError::AlreadyInitialized;
        e.report();
        return Err(e);
    }

    let runtime = Runtime {
        preemption: Preemption::new(SignalTimer::new(config.timer_clock), tick),
        quantum: config.quantum,
    };
    let runtime = RUNTIME.get_or_init(|| runtime);

    // Nothing can preempt until the handler is installed
    let scheduler = Scheduler::new(&config, thread_start).unwrap_or_else(|e| fatal(e));
    unsafe {
        *SCHEDULER.0.get() = Some(scheduler);
    }
    kprint::set_thread_id(ThreadId::MAIN.as_u32());

    let timer = runtime.preemption.timer();
    if let Err(e) = timer.install(on_quantum_expired) {
        fatal(e);
    }
    if let Err(e) = timer.arm(runtime.quantum) {
        fatal(e);
    }

    kdebug!(
        "uthread initialized: quantum={:?} clock={} max_threads={} stack_size={}",
        config.quantum,
        config.timer_clock,
        config.max_threads,
        config.stack_size
    );
    Ok(())
}

/// Run `op` on the scheduler inside a critical section
///
/// User errors are printed to the error sink and returned; system errors
/// terminate the process. If `op` changed the running thread's fate, the
/// dispatch happens before returning, even inside an enclosing section.
/// After a self-removal it never returns.
fn with_critical<R>(op: impl FnOnce(&mut Scheduler) -> SchedResult<R>) -> SchedResult<R> {
    let runtime = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            e.report();
            return Err(e);
        }
    };
    let cs = runtime.preemption.enter().unwrap_or_else(|e| fatal(e));

    let (result, scenario) = {
        let sched = match unsafe { scheduler_mut() } {
            Some(s) => s,
            None => fatal(SchedError::Internal("scheduler missing after init")),
        };
        let result = op(sched);
        (result, sched.current_scenario())
    };

    match &result {
        Err(e) if e.is_fatal() => fatal(e.clone()),
        Err(e) => e.report(),
        Ok(_) => {}
    }

    if scenario.needs_dispatch() {
        cs.yield_now().unwrap_or_else(|e| fatal(e));
        if scenario == Scenario::ToSelfRemove {
            fatal(SchedError::Internal("thread resumed after terminating itself"));
        }
    }
    cs.exit().unwrap_or_else(|e| fatal(e));
    result
}

/// Quantum signal handler
extern "C" fn on_quantum_expired(_signum: libc::c_int) {
    tick();
}

/// End the current quantum: dispatch and switch
///
/// Runs with the quantum signal masked, either in the handler or on exit
/// from a critical section. Returns once the calling thread is resumed.
/// Must not allocate or log.
fn tick() {
    let Ok(runtime) = runtime() else { return };

    // The incoming thread gets a full quantum
    if let Err(e) = runtime.preemption.timer().arm(runtime.quantum) {
        fatal(e);
    }

    let switch = match unsafe { scheduler_mut() } {
        Some(sched) => sched.dispatch().unwrap_or_else(|e| fatal(e)),
        None => return,
    };

    if let Err(e) = unsafe { context::perform(switch) } {
        fatal(e);
    }

    land();
}

/// Bookkeeping on arrival at a thread after a dispatch
fn land() {
    if let Some(sched) = unsafe { scheduler_mut() } {
        sched.collect_pending_free();
        kprint::set_thread_id(sched.running_id().as_u32());
    }
}

/// First code run by every spawned thread, on its own stack
///
/// Entered straight out of a dispatch with the quantum signal masked.
extern "C" fn thread_start(arg: usize) -> ! {
    land();

    let mask = match unsafe { scheduler_mut() } {
        Some(sched) => sched.running_context().map(|ctx| ctx.apply_sigmask()),
        None => Err(SchedError::NotInitialized),
    };
    if let Err(e) = mask.and_then(|applied| applied) {
        fatal(e);
    }

    let entry: EntryFn = unsafe { core::mem::transmute::<usize, EntryFn>(arg) };
    if std::panic::catch_unwind(entry).is_err() {
        kerror!("thread {} panicked", current_id());
    }

    exit_current()
}

/// Report a system error, release everything and exit with status 1
pub fn fatal(err: SchedError) -> ! {
    err.report();
    if let Some(rt) = RUNTIME.get() {
        let timer = rt.preemption.timer();
        let _ = timer.mask();
        let _ = timer.disarm();
    }
    if let Some(sched) = unsafe { scheduler_mut() } {
        sched.teardown();
    }
    std::process::exit(FATAL_EXIT_STATUS)
}

/// Release every thread and exit the process with `status`
fn shutdown(sched: &mut Scheduler, status: i32) -> ! {
    if let Some(rt) = RUNTIME.get() {
        let _ = rt.preemption.timer().disarm();
    }
    kdebug!("shutting down, {} threads live", sched.thread_count());
    sched.teardown();
    std::process::exit(status)
}

// ---------------------------------------------------------------
// Operations
// ---------------------------------------------------------------

/// Create a thread that will run `entry`, appended to the ready queue
///
/// The new thread starts with the caller's signal mask, minus the
/// quantum signal.
pub fn spawn(entry: EntryFn) -> SchedResult<ThreadId> {
    with_critical(|sched| {
        let mut mask = current_mask()?;
        if let Ok(rt) = runtime() {
            mask.remove(rt.preemption.timer().signal());
        }
        let id = sched.spawn(entry, mask)?;
        kdebug!("spawned thread {}", id);
        Ok(id)
    })
}

/// Terminate thread `id`
///
/// `id == 0` releases everything and exits the process with status 0.
/// Terminating the calling thread does not return.
pub fn terminate(id: ThreadId) -> SchedResult<()> {
    with_critical(|sched| {
        if id.is_main() {
            shutdown(sched, 0);
        }
        sched.terminate(id)?;
        kdebug!("terminated thread {}", id);
        Ok(())
    })
}

/// Terminate the calling thread (exits the process when called on main)
pub fn exit_current() -> ! {
    let id = current_id();
    // Only returns if the thread was not removed
    let result = terminate(id);
    fatal(match result {
        Err(e) => e,
        Ok(()) => SchedError::Internal("thread resumed after terminating itself"),
    })
}

/// Block thread `id` until resumed; blocking oneself gives up the CPU
pub fn block(id: ThreadId) -> SchedResult<()> {
    with_critical(|sched| {
        sched.block(id)?;
        kdebug!("blocked thread {}", id);
        Ok(())
    })
}

/// Make a blocked thread ready again
pub fn resume(id: ThreadId) -> SchedResult<()> {
    with_critical(|sched| sched.resume(id))
}

/// Put the calling thread to sleep for `quantums` quanta
pub fn sleep(quantums: u32) -> SchedResult<()> {
    with_critical(|sched| {
        sched.sleep(quantums)?;
        kdebug!("sleeping for {} quanta", quantums);
        Ok(())
    })
}

/// Quanta until thread `id` wakes (0 if not sleeping)
pub fn time_until_wakeup(id: ThreadId) -> SchedResult<u32> {
    with_critical(|sched| sched.time_until_wakeup(id))
}

/// Id of the calling thread (NONE before init)
pub fn current_id() -> ThreadId {
    if !is_initialized() {
        return ThreadId::NONE;
    }
    with_critical(|sched| Ok(sched.running_id())).unwrap_or(ThreadId::NONE)
}

/// Quanta started since init, the first one included (0 before init)
pub fn total_quantums() -> u64 {
    if !is_initialized() {
        return 0;
    }
    with_critical(|sched| Ok(sched.total_quantums())).unwrap_or(0)
}

/// Quanta in which thread `id` has run, the current one included
pub fn quantums_of(id: ThreadId) -> SchedResult<u64> {
    with_critical(|sched| sched.quantums_of(id))
}

/// Run `f` with preemption held off
///
/// Operations called from `f` apply immediately. One that gives up the CPU
/// (blocking or putting the caller to sleep) suspends `f` until the thread
/// is dispatched again, still with preemption held off. Terminating the
/// caller does not return.
pub fn without_preemption<R>(f: impl FnOnce() -> R) -> SchedResult<R> {
    let runtime = runtime()?;
    let cs = runtime.preemption.enter()?;
    let value = f();
    cs.exit()?;
    Ok(value)
}
