//! Library calls racing a short quantum
//!
//! Several threads call into the library back to back while the timer
//! fires every 200µs, so expiries keep landing on section boundaries.
//! Every thread, main included, must keep getting the CPU, and the
//! scheduler's answers must stay consistent. Runs without the test
//! harness; see round_robin.rs.

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use uthread::{SchedulerConfig, ThreadId, TimerClock};

const WORKERS: usize = 5;

static CALLS: [AtomicU64; WORKERS + 1] = [const { AtomicU64::new(0) }; WORKERS + 1];
static WRONG_ID: AtomicU64 = AtomicU64::new(0);

fn worker() {
    let me = uthread::current_id();
    let slot = me.as_usize();
    loop {
        if uthread::current_id() != me {
            WRONG_ID.fetch_add(1, Ordering::Relaxed);
        }
        let _ = black_box(uthread::quantums_of(me));
        let _ = black_box(uthread::time_until_wakeup(me));
        // Resuming a running thread does nothing
        let _ = uthread::resume(me);
        let inner = uthread::without_preemption(|| {
            uthread::without_preemption(uthread::current_id).unwrap_or(ThreadId::NONE)
        });
        if inner != Ok(me) {
            WRONG_ID.fetch_add(1, Ordering::Relaxed);
        }
        CALLS[slot].fetch_add(1, Ordering::Relaxed);
    }
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while !cond() {
        for i in 0..20_000u64 {
            black_box(i);
        }
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
    }
}

/// Exit with a failure if main stops being scheduled
fn start_watchdog() {
    // Spawned with the quantum signal masked, so the timer never picks
    // this OS thread for delivery
    uthread::without_preemption(|| {
        std::thread::spawn(|| {
            std::thread::sleep(Duration::from_secs(60));
            eprintln!("contention: main thread starved");
            std::process::exit(2);
        })
    })
    .unwrap();
}

fn main() {
    let config = SchedulerConfig::new()
        .max_threads(WORKERS + 1)
        .quantum_usecs(200)
        .timer_clock(TimerClock::Virtual);
    uthread::init_with_config(config).unwrap();
    start_watchdog();

    let ids: Vec<ThreadId> = (0..WORKERS).map(|_| uthread::spawn(worker).unwrap()).collect();

    let start = uthread::total_quantums();
    wait_until("quanta to pass", || uthread::total_quantums() >= start + 2_000);
    for id in &ids {
        let slot = id.as_usize();
        wait_until("every worker to make calls", || CALLS[slot].load(Ordering::Relaxed) > 0);
    }

    // Main kept being dispatched throughout
    assert!(uthread::quantums_of(ThreadId::MAIN).unwrap() > 2_000 / (WORKERS as u64 + 1) / 2);
    assert_eq!(WRONG_ID.load(Ordering::Relaxed), 0);

    // Every dispatch counted exactly once, for exactly one thread
    let (total, per_thread) = uthread::without_preemption(|| {
        let per_thread: u64 = std::iter::once(ThreadId::MAIN)
            .chain(ids.iter().copied())
            .map(|id| uthread::quantums_of(id).unwrap())
            .sum();
        (uthread::total_quantums(), per_thread)
    })
    .unwrap();
    assert_eq!(total, per_thread);

    println!("contention: ok ({} quanta)", total);
    uthread::terminate(ThreadId::MAIN).unwrap();
    unreachable!("terminating main exits the process");
}
