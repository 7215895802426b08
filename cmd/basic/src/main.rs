//! Basic uthread example
//!
//! Spawns a few threads that sleep, block and finish, while main watches.
//!
//! # Environment Variables
//!
//! - `UTHREAD_FLUSH_EPRINT=1` - Flush debug output immediately (useful for crash debugging)
//! - `UTHREAD_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `UTHREAD_QUANTUM_USECS=<n>` - Quantum length

use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};

use uthread::{kinfo, SchedulerConfig, ThreadId};

// UTHREAD_LOG_LEVEL=debug UTHREAD_FLUSH_EPRINT=1 cargo run -p uthread-basic

static COMPLETED: AtomicUsize = AtomicUsize::new(0);

fn busy(rounds: u64) {
    for i in 0..rounds {
        black_box(i);
    }
}

/// Print from a thread; stdout and the allocator are not preemption-safe
fn say(msg: std::fmt::Arguments<'_>) {
    let id = uthread::current_id();
    let q = uthread::total_quantums();
    let _ = uthread::without_preemption(|| println!("[thread {} @ quantum {}] {}", id, q, msg));
}

fn counter() {
    for round in 0..3 {
        busy(2_000_000);
        say(format_args!("round {}", round));
    }
    COMPLETED.fetch_add(1, Ordering::SeqCst);
}

fn napper() {
    say(format_args!("going to sleep for 5 quanta"));
    let _ = uthread::sleep(5);
    say(format_args!("awake"));
    COMPLETED.fetch_add(1, Ordering::SeqCst);
}

fn waiter() {
    say(format_args!("blocking until main resumes me"));
    let _ = uthread::block(uthread::current_id());
    say(format_args!("resumed"));
    COMPLETED.fetch_add(1, Ordering::SeqCst);
}

fn main() {
    println!("=== uthread Basic Example ===\n");

    let config = SchedulerConfig::from_env().quantum_usecs(20_000);
    if uthread::init_with_config(config).is_err() {
        std::process::exit(1);
    }

    kinfo!("Spawning threads...");
    // From here on, allocate only with preemption held off
    let ids = [
        uthread::spawn(counter),
        uthread::spawn(napper),
        uthread::spawn(waiter),
    ];
    let mut spawned = 0;
    for id in ids.iter().flatten() {
        spawned += 1;
        let _ = uthread::without_preemption(|| println!("Spawned thread {}", id));
    }
    let waiter_id = match &ids[2] {
        Ok(id) => *id,
        Err(_) => ThreadId::NONE,
    };

    // Give the waiter time to block, then let it go
    let start = uthread::total_quantums();
    while uthread::total_quantums() < start + 10 {
        busy(100_000);
    }
    let _ = uthread::resume(waiter_id);

    while COMPLETED.load(Ordering::SeqCst) < spawned {
        busy(100_000);
    }

    let _ = uthread::without_preemption(|| {
        println!("\n{} thread(s) completed", COMPLETED.load(Ordering::SeqCst));
        println!("main ran {:?} quanta of {}", uthread::quantums_of(ThreadId::MAIN), uthread::total_quantums());
        println!("\n=== Example Complete ===");
    });

    let _ = uthread::terminate(ThreadId::MAIN);
}
