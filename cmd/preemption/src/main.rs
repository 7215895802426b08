//! Preemption example
//!
//! CPU-bound threads that never yield still take turns: each one only
//! counts, and the interval timer switches between them. Main prints how
//! the quanta were shared.
//!
//! Usage: preemption [threads] [quanta]

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

use uthread::{SchedulerConfig, ThreadId};

const MAX_WORKERS: usize = 8;

static COUNTERS: [AtomicU64; MAX_WORKERS] = [const { AtomicU64::new(0) }; MAX_WORKERS];

fn count_forever() {
    let slot = uthread::current_id().as_usize() - 1;
    loop {
        COUNTERS[slot].fetch_add(1, Ordering::Relaxed);
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let workers: usize = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(4)
        .clamp(1, MAX_WORKERS);
    let quanta: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(200);

    println!("=== uthread Preemption Example ===");
    println!("{} busy threads, {} quanta\n", workers, quanta);

    let config = SchedulerConfig::from_env()
        .max_threads(workers + 1)
        .quantum_usecs(5_000);
    config.print();
    if uthread::init_with_config(config).is_err() {
        std::process::exit(1);
    }

    let mut ids = Vec::with_capacity(workers);
    for _ in 0..workers {
        match uthread::spawn(count_forever) {
            Ok(id) => ids.push(id),
            Err(_) => std::process::exit(1),
        }
    }

    while uthread::total_quantums() < quanta {
        for i in 0..100_000u64 {
            black_box(i);
        }
    }

    let _ = uthread::without_preemption(|| {
        println!("\n{:>8} {:>10} {:>14}", "thread", "quanta", "iterations");
        println!("{:>8} {:>10} {:>14}", ThreadId::MAIN, uthread::quantums_of(ThreadId::MAIN).unwrap_or(0), "-");
        for &id in &ids {
            let q = uthread::quantums_of(id).unwrap_or(0);
            let n = COUNTERS[id.as_usize() - 1].load(Ordering::Relaxed);
            println!("{:>8} {:>10} {:>14}", id, q, n);
        }
        println!("\ntotal quanta: {}", uthread::total_quantums());
    });

    let _ = uthread::terminate(ThreadId::MAIN);
}
