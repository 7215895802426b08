//! Round-robin scheduler
//!
//! Owns the thread table and the ready/blocked/sleeping sets, and decides
//! what runs next. Nothing here switches stacks or touches signals: a
//! `dispatch` returns a [`Switch`] describing the transition and the
//! runtime carries it out. That keeps every state transition testable on
//! a single ordinary thread.
//!
//! # Allocation
//!
//! All collections are sized for `max_threads` up front. After `new`, only
//! `spawn` allocates (the new stack); `dispatch`, `terminate`, `block`,
//! `resume` and `sleep` never touch the heap, so they are safe to run from
//! the quantum handler.
//!
//! # Deferred release
//!
//! A thread that terminates itself is still executing on its own stack, so
//! its block cannot be dropped yet. It is parked in a single pending slot
//! and released by `collect_pending_free`, which the runtime calls right
//! after landing on the next thread.

use std::collections::VecDeque;

use crate::arch::ThreadStart;
use crate::config::SchedulerConfig;
use crate::context::{ExecutionContext, Switch};
use crate::tcb::{EntryFn, ThreadControlBlock};

use nix::sys::signal::SigSet;
use uthread_core::{
    IdAllocator, IdBitmap, Scenario, SchedError, SchedResult, ThreadId, ThreadState,
};

/// Scheduler state for one process
pub struct Scheduler {
    /// Thread table indexed by id; never resized
    threads: Box<[Option<ThreadControlBlock>]>,

    /// Id allocator (smallest free id first)
    ids: IdAllocator,

    /// FIFO of ready threads
    ready: VecDeque<ThreadId>,

    /// Blocked threads
    blocked: IdBitmap,

    /// Sleeping threads, in the order they went to sleep
    sleeping: Vec<ThreadId>,

    /// Currently running thread; NONE between a self-removal and the
    /// dispatch that follows it
    running: ThreadId,

    /// What the next dispatch must do with the running thread
    scenario: Scenario,

    /// Self-terminated thread awaiting release
    pending_free: Option<ThreadControlBlock>,

    /// Quanta started since init, the first one included
    total_quantums: u64,

    /// Usable stack size for spawned threads
    stack_size: usize,

    /// Where fresh threads begin executing
    start: ThreadStart,
}

impl Scheduler {
    /// Create a scheduler and register the caller as the main thread
    ///
    /// Main gets id 0 and is Running in the first quantum.
    pub fn new(config: &SchedulerConfig, start: ThreadStart) -> SchedResult<Self> {
        config.validate()?;

        let max = config.max_threads;
        let mut threads = Vec::with_capacity(max);
        threads.resize_with(max, || None);

        let mut sched = Self {
            threads: threads.into_boxed_slice(),
            ids: IdAllocator::new(max),
            ready: VecDeque::with_capacity(max),
            blocked: IdBitmap::new(max),
            sleeping: Vec::with_capacity(max),
            running: ThreadId::NONE,
            scenario: Scenario::Routine,
            pending_free: None,
            total_quantums: 1,
            stack_size: config.stack_size,
            start,
        };

        let main = sched.ids.allocate()?;
        debug_assert!(main.is_main());
        sched.threads[main.as_usize()] = Some(ThreadControlBlock::main(main)?);
        sched.running = main;

        Ok(sched)
    }

    // ---------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------

    fn check_range(&self, id: ThreadId) -> SchedResult<()> {
        if self.ids.in_range(id) {
            Ok(())
        } else {
            Err(SchedError::IdOutOfRange(id))
        }
    }

    fn tcb(&self, id: ThreadId) -> SchedResult<&ThreadControlBlock> {
        self.check_range(id)?;
        self.threads[id.as_usize()]
            .as_ref()
            .ok_or(SchedError::NoSuchId(id))
    }

    fn tcb_mut(&mut self, id: ThreadId) -> SchedResult<&mut ThreadControlBlock> {
        self.check_range(id)?;
        self.threads[id.as_usize()]
            .as_mut()
            .ok_or(SchedError::NoSuchId(id))
    }

    /// Block that the sets claim exists; a miss is an internal error
    fn listed_mut(&mut self, id: ThreadId) -> SchedResult<&mut ThreadControlBlock> {
        self.threads
            .get_mut(id.as_usize())
            .and_then(Option::as_mut)
            .ok_or(SchedError::Internal("scheduled id has no thread"))
    }

    // ---------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------

    /// Create a thread running `entry` and append it to the ready queue
    ///
    /// Gets the smallest free id. `sigmask` becomes the thread's initial
    /// signal mask. On a stack failure the id is given back before the
    /// (fatal) error is returned.
    pub fn spawn(&mut self, entry: EntryFn, sigmask: SigSet) -> SchedResult<ThreadId> {
        let id = self.ids.allocate()?;

        let tcb = match ThreadControlBlock::spawned(id, self.stack_size, entry, self.start, sigmask)
        {
            Ok(tcb) => tcb,
            Err(e) => {
                self.ids.release(id);
                return Err(e);
            }
        };

        self.threads[id.as_usize()] = Some(tcb);
        self.ready.push_back(id);
        Ok(id)
    }

    /// Remove thread `id` (not main)
    ///
    /// Terminating the running thread only marks it for removal; the
    /// caller must dispatch right away, and the block is released after
    /// the switch. Any other thread is unlinked and released now.
    /// Ending the process (id 0) is the runtime's job.
    pub fn terminate(&mut self, id: ThreadId) -> SchedResult<()> {
        self.check_range(id)?;
        if id.is_main() {
            return Err(SchedError::IllegalOnMain);
        }

        if id == self.running {
            let tcb = self.threads[id.as_usize()]
                .take()
                .ok_or(SchedError::NoSuchId(id))?;
            // A previous self-removal is off-stack by now
            self.collect_pending_free();
            self.pending_free = Some(tcb);
            self.running = ThreadId::NONE;
            self.scenario = Scenario::ToSelfRemove;
            return Ok(());
        }

        match self.tcb(id)?.state() {
            ThreadState::Ready => {
                if let Some(pos) = self.ready.iter().position(|&r| r == id) {
                    self.ready.remove(pos);
                }
            }
            ThreadState::Blocked => {
                self.blocked.clear(id);
            }
            ThreadState::Sleeping => {
                if let Some(pos) = self.sleeping.iter().position(|&s| s == id) {
                    self.sleeping.remove(pos);
                }
            }
            ThreadState::Running => {
                return Err(SchedError::Internal("running state on a non-running thread"));
            }
        }

        self.threads[id.as_usize()] = None;
        self.ids.release(id);
        Ok(())
    }

    /// Block thread `id` until resumed
    ///
    /// Blocking the running thread marks it for a dispatch. Blocking a
    /// thread that is already blocked or sleeping does nothing.
    pub fn block(&mut self, id: ThreadId) -> SchedResult<()> {
        self.check_range(id)?;
        if id.is_main() {
            return Err(SchedError::IllegalOnMain);
        }

        let running = self.running;
        let tcb = self.tcb_mut(id)?;

        if id == running {
            tcb.set_state(ThreadState::Blocked);
            self.scenario = Scenario::ToBlock;
            return Ok(());
        }

        match tcb.state() {
            ThreadState::Blocked | ThreadState::Sleeping => Ok(()),
            ThreadState::Ready => {
                tcb.set_state(ThreadState::Blocked);
                if let Some(pos) = self.ready.iter().position(|&r| r == id) {
                    self.ready.remove(pos);
                }
                self.blocked.set(id);
                Ok(())
            }
            ThreadState::Running => Err(SchedError::Internal("running state on a non-running thread")),
        }
    }

    /// Move a blocked thread to the back of the ready queue
    ///
    /// No effect on a thread that is running, ready or sleeping.
    pub fn resume(&mut self, id: ThreadId) -> SchedResult<()> {
        let running = self.running;
        let tcb = self.tcb_mut(id)?;

        if id == running || tcb.state() != ThreadState::Blocked {
            return Ok(());
        }

        tcb.set_state(ThreadState::Ready);
        self.blocked.clear(id);
        self.ready.push_back(id);
        Ok(())
    }

    /// Put the running thread to sleep for `quantums` quanta
    ///
    /// The thread is skipped for the `quantums` quanta that follow the
    /// current one and becomes ready at the end of the last of them.
    pub fn sleep(&mut self, quantums: u32) -> SchedResult<()> {
        let running = self.running;
        if running.is_main() {
            return Err(SchedError::IllegalOnMain);
        }
        if quantums == 0 {
            return Err(SchedError::InvalidInput("sleep requires at least one quantum"));
        }

        self.tcb_mut(running)?.start_sleep(quantums);
        self.scenario = Scenario::ToSleep;
        Ok(())
    }

    /// Decide the next quantum's thread
    ///
    /// 1. Count down sleepers, waking those that reach zero
    /// 2. File the outgoing thread according to the pending scenario
    /// 3. Start the head of the ready queue
    ///
    /// Does not allocate.
    pub fn dispatch(&mut self) -> SchedResult<Switch> {
        self.wake_sleepers()?;

        let outgoing = self.running;
        let scenario = core::mem::take(&mut self.scenario);

        match scenario {
            Scenario::Routine => {
                if outgoing.is_some() {
                    self.listed_mut(outgoing)?.set_state(ThreadState::Ready);
                    self.ready.push_back(outgoing);
                }
            }
            Scenario::ToBlock => {
                self.blocked.set(outgoing);
            }
            Scenario::ToSleep => {
                self.sleeping.push(outgoing);
            }
            Scenario::ToSelfRemove => {}
        }

        let incoming = self
            .ready
            .pop_front()
            .ok_or(SchedError::Internal("ready queue empty at dispatch"))?;

        let tcb = self.listed_mut(incoming)?;
        tcb.set_state(ThreadState::Running);
        tcb.bump_quantum();
        let to = tcb.context() as *const ExecutionContext;

        self.total_quantums += 1;
        self.running = incoming;

        if outgoing.is_none() {
            return Ok(Switch::Resume { to });
        }
        if outgoing == incoming {
            return Ok(Switch::Stay);
        }

        let from = self.listed_mut(outgoing)?.context_mut() as *mut ExecutionContext;
        Ok(Switch::Swap { from, to })
    }

    fn wake_sleepers(&mut self) -> SchedResult<()> {
        let mut i = 0;
        while i < self.sleeping.len() {
            let id = self.sleeping[i];
            let tcb = self.listed_mut(id)?;
            if tcb.tick_sleep() == 0 {
                tcb.set_state(ThreadState::Ready);
                self.sleeping.remove(i);
                self.ready.push_back(id);
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// Release a self-terminated thread's block and id
    ///
    /// Must only run once execution has left that thread's stack.
    pub fn collect_pending_free(&mut self) {
        if let Some(tcb) = self.pending_free.take() {
            let id = tcb.id();
            drop(tcb);
            self.ids.release(id);
        }
    }

    /// Release every thread, leaving the scheduler empty
    ///
    /// The stack that is executing this call is leaked rather than
    /// unmapped from under the caller; the process is about to exit.
    pub fn teardown(&mut self) {
        let marker = 0u8;
        let here = &marker as *const u8 as usize;

        let release = |tcb: ThreadControlBlock| {
            if tcb.runs_on(here) {
                core::mem::forget(tcb);
            } else {
                drop(tcb);
            }
        };

        for slot in self.threads.iter_mut() {
            if let Some(tcb) = slot.take() {
                release(tcb);
            }
        }
        if let Some(tcb) = self.pending_free.take() {
            release(tcb);
        }

        self.ready.clear();
        self.sleeping.clear();
        self.blocked.clear_all();
        self.ids.reset();
        self.running = ThreadId::NONE;
        self.scenario = Scenario::Routine;
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Id of the running thread
    #[inline]
    pub fn running_id(&self) -> ThreadId {
        self.running
    }

    /// Scenario the next dispatch will apply
    #[inline]
    pub fn current_scenario(&self) -> Scenario {
        self.scenario
    }

    /// Quanta started since init, the first one included
    #[inline]
    pub fn total_quantums(&self) -> u64 {
        self.total_quantums
    }

    /// Quanta in which thread `id` was running, the current one included
    pub fn quantums_of(&self, id: ThreadId) -> SchedResult<u64> {
        Ok(self.tcb(id)?.quantums_run())
    }

    /// Quanta until a sleeping thread wakes; 0 if not sleeping
    pub fn time_until_wakeup(&self, id: ThreadId) -> SchedResult<u32> {
        Ok(self.tcb(id)?.sleep_remaining())
    }

    /// State of thread `id`
    pub fn state_of(&self, id: ThreadId) -> SchedResult<ThreadState> {
        Ok(self.tcb(id)?.state())
    }

    /// Saved context of the running thread
    pub fn running_context(&self) -> SchedResult<&ExecutionContext> {
        Ok(self.tcb(self.running)?.context())
    }

    /// Live threads in the table (a pending self-removal excluded)
    pub fn thread_count(&self) -> usize {
        self.threads.iter().filter(|t| t.is_some()).count()
    }

    /// Size of the thread table
    #[inline]
    pub fn max_threads(&self) -> usize {
        self.threads.len()
    }

    /// Ready queue, head first
    pub fn ready_ids(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.ready.iter().copied()
    }

    /// Whether a self-removed thread still awaits release
    #[inline]
    pub fn has_pending_free(&self) -> bool {
        self.pending_free.is_some()
    }

    /// Every live thread is in exactly one of: running, ready, blocked,
    /// sleeping, and its state says which
    #[cfg(test)]
    fn invariants_hold(&self) -> bool {
        let mut listed = 0;
        for (idx, slot) in self.threads.iter().enumerate() {
            let Some(tcb) = slot else { continue };
            let id = ThreadId::new(idx as u32);
            let in_ready = self.ready.contains(&id);
            let in_blocked = self.blocked.is_set(id);
            let in_sleeping = self.sleeping.contains(&id);
            let is_running = self.running == id;
            let memberships = [in_ready, in_blocked, in_sleeping, is_running]
                .iter()
                .filter(|&&b| b)
                .count();
            // The running thread may carry its next state before dispatch
            if memberships != 1 {
                return false;
            }
            let consistent = match tcb.state() {
                ThreadState::Ready => in_ready,
                ThreadState::Blocked => in_blocked || is_running,
                ThreadState::Sleeping => in_sleeping || is_running,
                ThreadState::Running => is_running,
            };
            if !consistent {
                return false;
            }
            listed += 1;
        }
        listed + usize::from(self.pending_free.is_some()) == self.ids.allocated_count()
    }
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.running)
            .field("scenario", &self.scenario)
            .field("ready", &self.ready)
            .field("blocked", &self.blocked.count())
            .field("sleeping", &self.sleeping)
            .field("total_quantums", &self.total_quantums)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::current_mask;

    extern "C" fn never(_: usize) -> ! {
        std::process::abort()
    }

    fn work() {}

    fn sched(max_threads: usize) -> Scheduler {
        let config = SchedulerConfig::new()
            .max_threads(max_threads)
            .stack_size(16 * 1024);
        Scheduler::new(&config, never).unwrap()
    }

    fn spawn(s: &mut Scheduler) -> ThreadId {
        s.spawn(work, current_mask().unwrap()).unwrap()
    }

    /// Dispatch and land, as the runtime would
    fn tick(s: &mut Scheduler) -> Switch {
        let switch = s.dispatch().unwrap();
        s.collect_pending_free();
        assert!(s.invariants_hold());
        switch
    }

    fn tid(n: u32) -> ThreadId {
        ThreadId::new(n)
    }

    #[test]
    fn test_new_registers_main() {
        let s = sched(4);
        assert_eq!(s.running_id(), ThreadId::MAIN);
        assert_eq!(s.total_quantums(), 1);
        assert_eq!(s.quantums_of(ThreadId::MAIN), Ok(1));
        assert_eq!(s.state_of(ThreadId::MAIN), Ok(ThreadState::Running));
        assert_eq!(s.thread_count(), 1);
        assert!(s.invariants_hold());
    }

    #[test]
    fn test_spawn_smallest_free_id() {
        let mut s = sched(8);
        assert_eq!(spawn(&mut s), tid(1));
        assert_eq!(spawn(&mut s), tid(2));
        assert_eq!(spawn(&mut s), tid(3));

        s.terminate(tid(2)).unwrap();
        assert_eq!(spawn(&mut s), tid(2));
        assert_eq!(spawn(&mut s), tid(4));
        assert!(s.invariants_hold());
    }

    #[test]
    fn test_spawn_capacity() {
        let mut s = sched(3);
        spawn(&mut s);
        spawn(&mut s);
        let ready_before: Vec<_> = s.ready_ids().collect();

        let err = s.spawn(work, current_mask().unwrap()).unwrap_err();
        assert_eq!(err, SchedError::CapacityExceeded);
        assert!(!err.is_fatal());

        // Table untouched by the failed spawn
        assert_eq!(s.thread_count(), 3);
        assert_eq!(s.ready_ids().collect::<Vec<_>>(), ready_before);
        assert_eq!(s.state_of(tid(1)), Ok(ThreadState::Ready));
        assert_eq!(s.state_of(tid(2)), Ok(ThreadState::Ready));
        assert_eq!(s.running_id(), ThreadId::MAIN);
        assert!(s.invariants_hold());

        // No id was consumed: the freed slot is the next one handed out
        s.terminate(tid(1)).unwrap();
        assert_eq!(spawn(&mut s), tid(1));
        assert_eq!(s.ready_ids().collect::<Vec<_>>(), vec![tid(2), tid(1)]);
    }

    #[test]
    fn test_round_robin_order_and_counts() {
        let mut s = sched(4);
        spawn(&mut s);
        spawn(&mut s);

        let mut order = Vec::new();
        for _ in 0..6 {
            tick(&mut s);
            order.push(s.running_id().as_u32());
        }
        assert_eq!(order, vec![1, 2, 0, 1, 2, 0]);

        assert_eq!(s.total_quantums(), 7);
        assert_eq!(s.quantums_of(tid(0)), Ok(3));
        assert_eq!(s.quantums_of(tid(1)), Ok(2));
        assert_eq!(s.quantums_of(tid(2)), Ok(2));
    }

    #[test]
    fn test_lone_main_stays() {
        let mut s = sched(2);
        assert!(matches!(tick(&mut s), Switch::Stay));
        assert!(matches!(tick(&mut s), Switch::Stay));
        assert_eq!(s.quantums_of(ThreadId::MAIN), Ok(3));
        assert_eq!(s.total_quantums(), 3);
    }

    #[test]
    fn test_switch_kinds() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);
        assert!(matches!(tick(&mut s), Switch::Swap { .. }));
        assert_eq!(s.running_id(), t1);

        s.terminate(t1).unwrap();
        assert!(s.has_pending_free());
        assert!(matches!(s.dispatch().unwrap(), Switch::Resume { .. }));
        assert_eq!(s.running_id(), ThreadId::MAIN);
    }

    #[test]
    fn test_block_self_then_resume() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);
        let t2 = spawn(&mut s);
        tick(&mut s); // t1 running

        s.block(t1).unwrap();
        assert_eq!(s.current_scenario(), Scenario::ToBlock);
        assert_eq!(s.state_of(t1), Ok(ThreadState::Blocked));

        tick(&mut s);
        assert_eq!(s.running_id(), t2);
        assert_eq!(s.state_of(t1), Ok(ThreadState::Blocked));
        assert_eq!(s.ready_ids().collect::<Vec<_>>(), vec![ThreadId::MAIN]);

        // Blocked threads are skipped
        tick(&mut s);
        assert_eq!(s.running_id(), ThreadId::MAIN);
        tick(&mut s);
        assert_eq!(s.running_id(), t2);

        s.resume(t1).unwrap();
        assert_eq!(s.state_of(t1), Ok(ThreadState::Ready));
        assert_eq!(s.ready_ids().collect::<Vec<_>>(), vec![ThreadId::MAIN, t1]);
        tick(&mut s);
        tick(&mut s);
        assert_eq!(s.running_id(), t1);
    }

    #[test]
    fn test_block_ready_thread() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);
        let t2 = spawn(&mut s);

        s.block(t1).unwrap();
        assert_eq!(s.current_scenario(), Scenario::Routine);
        assert_eq!(s.ready_ids().collect::<Vec<_>>(), vec![t2]);
        assert!(s.invariants_hold());

        tick(&mut s);
        assert_eq!(s.running_id(), t2);
    }

    #[test]
    fn test_block_errors_and_noops() {
        let mut s = sched(4);
        assert_eq!(s.block(ThreadId::MAIN), Err(SchedError::IllegalOnMain));
        assert_eq!(s.block(tid(3)), Err(SchedError::NoSuchId(tid(3))));
        assert_eq!(s.block(tid(4)), Err(SchedError::IdOutOfRange(tid(4))));
        assert_eq!(s.block(ThreadId::NONE), Err(SchedError::IdOutOfRange(ThreadId::NONE)));

        let t1 = spawn(&mut s);
        s.block(t1).unwrap();
        s.block(t1).unwrap();
        assert_eq!(s.state_of(t1), Ok(ThreadState::Blocked));
        assert!(s.invariants_hold());
    }

    #[test]
    fn test_resume_noops() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);

        // Ready and running threads are left alone
        s.resume(t1).unwrap();
        s.resume(ThreadId::MAIN).unwrap();
        assert_eq!(s.ready_ids().collect::<Vec<_>>(), vec![t1]);

        assert_eq!(s.resume(tid(2)), Err(SchedError::NoSuchId(tid(2))));
        assert_eq!(s.resume(tid(9)), Err(SchedError::IdOutOfRange(tid(9))));
        assert!(s.invariants_hold());
    }

    #[test]
    fn test_sleep_wakes_after_n_quanta() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);
        tick(&mut s); // quantum Q: t1 running

        s.sleep(2).unwrap();
        assert_eq!(s.current_scenario(), Scenario::ToSleep);
        assert_eq!(s.time_until_wakeup(t1), Ok(2));

        tick(&mut s); // Q+1
        assert_eq!(s.running_id(), ThreadId::MAIN);
        assert_eq!(s.state_of(t1), Ok(ThreadState::Sleeping));
        assert_eq!(s.time_until_wakeup(t1), Ok(2));

        tick(&mut s); // Q+2
        assert_eq!(s.state_of(t1), Ok(ThreadState::Sleeping));
        assert_eq!(s.time_until_wakeup(t1), Ok(1));

        tick(&mut s); // Q+3: woke at the end of Q+2
        assert_eq!(s.running_id(), t1);
        assert_eq!(s.time_until_wakeup(t1), Ok(0));
    }

    #[test]
    fn test_sleepers_wake_in_order() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);
        let t2 = spawn(&mut s);

        tick(&mut s);
        s.sleep(1).unwrap(); // t1
        tick(&mut s);
        s.sleep(1).unwrap(); // t2
        tick(&mut s); // main; t1 woke

        assert_eq!(s.ready_ids().collect::<Vec<_>>(), vec![t1]);
        tick(&mut s); // t1; t2 woke
        assert_eq!(s.running_id(), t1);
        assert_eq!(s.ready_ids().collect::<Vec<_>>(), vec![t2, ThreadId::MAIN]);
    }

    #[test]
    fn test_sleep_errors() {
        let mut s = sched(4);
        assert_eq!(s.sleep(3), Err(SchedError::IllegalOnMain));

        spawn(&mut s);
        tick(&mut s);
        assert!(matches!(s.sleep(0), Err(SchedError::InvalidInput(_))));
        assert_eq!(s.current_scenario(), Scenario::Routine);
    }

    #[test]
    fn test_blocking_a_sleeper_is_noop() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);
        tick(&mut s);
        s.sleep(3).unwrap();
        tick(&mut s);

        s.block(t1).unwrap();
        assert_eq!(s.state_of(t1), Ok(ThreadState::Sleeping));
        s.resume(t1).unwrap();
        assert_eq!(s.state_of(t1), Ok(ThreadState::Sleeping));
        assert!(s.invariants_hold());
    }

    #[test]
    fn test_terminate_other_threads() {
        let mut s = sched(8);
        let ready = spawn(&mut s);
        let blocked = spawn(&mut s);
        let sleeper = spawn(&mut s);

        s.block(blocked).unwrap();
        tick(&mut s); // ready
        tick(&mut s); // sleeper
        assert_eq!(s.running_id(), sleeper);
        s.sleep(5).unwrap();
        tick(&mut s);

        for id in [ready, blocked, sleeper] {
            s.terminate(id).unwrap();
            assert_eq!(s.state_of(id), Err(SchedError::NoSuchId(id)));
            assert!(s.invariants_hold());
        }
        assert_eq!(s.thread_count(), 1);

        // Ids are free again, smallest first
        assert_eq!(spawn(&mut s), ready);
    }

    #[test]
    fn test_terminate_self_defers_release() {
        let mut s = sched(4);
        let t1 = spawn(&mut s);
        tick(&mut s);

        s.terminate(t1).unwrap();
        assert_eq!(s.current_scenario(), Scenario::ToSelfRemove);
        assert!(s.running_id().is_none());
        assert_eq!(s.quantums_of(t1), Err(SchedError::NoSuchId(t1)));

        // Id stays taken until the switch away has happened
        assert_eq!(spawn(&mut s), tid(2));
        s.terminate(tid(2)).unwrap();

        s.dispatch().unwrap();
        assert!(s.has_pending_free());
        s.collect_pending_free();
        assert!(!s.has_pending_free());
        assert!(s.invariants_hold());
        assert_eq!(spawn(&mut s), t1);
    }

    #[test]
    fn test_terminate_errors() {
        let mut s = sched(4);
        assert_eq!(s.terminate(ThreadId::MAIN), Err(SchedError::IllegalOnMain));
        assert_eq!(s.terminate(tid(1)), Err(SchedError::NoSuchId(tid(1))));
        assert_eq!(s.terminate(tid(4)), Err(SchedError::IdOutOfRange(tid(4))));
    }

    #[test]
    fn test_quantum_queries() {
        let mut s = sched(4);
        assert_eq!(s.quantums_of(tid(2)), Err(SchedError::NoSuchId(tid(2))));
        assert_eq!(s.time_until_wakeup(tid(7)), Err(SchedError::IdOutOfRange(tid(7))));
        assert_eq!(s.time_until_wakeup(ThreadId::MAIN), Ok(0));

        let t1 = spawn(&mut s);
        assert_eq!(s.quantums_of(t1), Ok(0));
        tick(&mut s);
        assert_eq!(s.quantums_of(t1), Ok(1));
    }

    #[test]
    fn test_teardown() {
        let mut s = sched(4);
        spawn(&mut s);
        spawn(&mut s);
        tick(&mut s);

        s.teardown();
        assert_eq!(s.thread_count(), 0);
        assert!(s.running_id().is_none());
        assert_eq!(s.ready_ids().count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SchedulerConfig::new().max_threads(0);
        let err = Scheduler::new(&config, never).unwrap_err();
        assert!(matches!(err, SchedError::InvalidInput(_)));
    }
}
