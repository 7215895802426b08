//! Blocking, resuming and sleeping end to end
//!
//! Runs without the test harness; see round_robin.rs.

use std::hint::black_box;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use uthread::{SchedError, SchedulerConfig, ThreadId, TimerClock};

static SLEEP_BEFORE: AtomicU64 = AtomicU64::new(0);
static SLEEP_AFTER: AtomicU64 = AtomicU64::new(0);
static SLEEP_ZERO_REJECTED: AtomicBool = AtomicBool::new(false);

static ABOUT_TO_BLOCK: AtomicBool = AtomicBool::new(false);
static RESUMED: AtomicBool = AtomicBool::new(false);

fn sleeper() {
    if let Err(SchedError::InvalidInput(_)) = uthread::sleep(0) {
        SLEEP_ZERO_REJECTED.store(true, Ordering::Release);
    }
    SLEEP_BEFORE.store(uthread::total_quantums(), Ordering::Release);
    uthread::sleep(3).unwrap();
    SLEEP_AFTER.store(uthread::total_quantums(), Ordering::Release);
    loop {
        black_box(());
    }
}

fn self_blocker() {
    ABOUT_TO_BLOCK.store(true, Ordering::Release);
    let me = uthread::current_id();
    uthread::block(me).unwrap();
    RESUMED.store(true, Ordering::Release);
    uthread::exit();
}

fn spinner() {
    loop {
        black_box(());
    }
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !cond() {
        for i in 0..50_000u64 {
            black_box(i);
        }
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
    }
}

fn wait_quanta(n: u64) {
    let start = uthread::total_quantums();
    wait_until("quanta to pass", || uthread::total_quantums() >= start + n);
}

fn main() {
    let config = SchedulerConfig::new()
        .max_threads(6)
        .quantum_usecs(2_000)
        .timer_clock(TimerClock::Virtual);
    uthread::init_with_config(config).unwrap();

    // Sleeping: skipped for exactly the requested number of quanta
    let s = uthread::spawn(sleeper).unwrap();
    wait_until("sleeper to wake", || SLEEP_AFTER.load(Ordering::Acquire) != 0);
    assert!(SLEEP_ZERO_REJECTED.load(Ordering::Acquire));
    let slept = SLEEP_AFTER.load(Ordering::Acquire) - SLEEP_BEFORE.load(Ordering::Acquire);
    assert!(slept >= 4, "woke after {} quanta", slept);
    assert_eq!(uthread::time_until_wakeup(s), Ok(0));

    // Blocking and resuming another thread
    let t = uthread::spawn(spinner).unwrap();
    wait_until("spinner to run", || uthread::quantums_of(t).unwrap() > 0);
    uthread::block(t).unwrap();
    uthread::block(t).unwrap();
    let frozen = uthread::quantums_of(t).unwrap();
    wait_quanta(10);
    assert_eq!(uthread::quantums_of(t).unwrap(), frozen);

    uthread::resume(t).unwrap();
    uthread::resume(t).unwrap();
    wait_until("spinner to run again", || uthread::quantums_of(t).unwrap() > frozen);

    // A thread blocking itself stays off the CPU until resumed
    let b = uthread::spawn(self_blocker).unwrap();
    wait_until("self-block", || ABOUT_TO_BLOCK.load(Ordering::Acquire));
    wait_quanta(6);
    assert!(!RESUMED.load(Ordering::Acquire));
    uthread::resume(b).unwrap();
    wait_until("blocker to exit", || uthread::quantums_of(b).is_err());
    assert!(RESUMED.load(Ordering::Acquire));

    // Errors leave state untouched
    assert_eq!(uthread::resume(ThreadId::new(5)), Err(SchedError::NoSuchId(ThreadId::new(5))));
    assert_eq!(uthread::time_until_wakeup(ThreadId::new(9)), Err(SchedError::IdOutOfRange(ThreadId::new(9))));
    assert_eq!(uthread::raw::block(0), -1);
    assert_eq!(uthread::raw::sleep(-3), -1);

    // Terminating threads in any state
    uthread::terminate(s).unwrap();
    uthread::block(t).unwrap();
    uthread::terminate(t).unwrap();
    assert_eq!(uthread::terminate(t), Err(SchedError::NoSuchId(t)));

    println!("block_and_sleep: ok");
    uthread::terminate(ThreadId::MAIN).unwrap();
    unreachable!("terminating main exits the process");
}
