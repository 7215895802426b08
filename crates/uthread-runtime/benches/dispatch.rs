//! Dispatch cost with a populated ready queue
//!
//! Measures scheduling decisions only; no stacks are switched.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uthread_runtime::context::current_mask;
use uthread_runtime::{Scheduler, SchedulerConfig};

extern "C" fn never(_: usize) -> ! {
    std::process::abort()
}

fn work() {}

fn populated(threads: usize) -> Scheduler {
    let config = SchedulerConfig::new()
        .max_threads(threads + 1)
        .stack_size(16 * 1024);
    let mut sched = Scheduler::new(&config, never).expect("scheduler");
    let mask = current_mask().expect("signal mask");
    for _ in 0..threads {
        sched.spawn(work, mask).expect("spawn");
    }
    sched
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for threads in [1usize, 16, 99] {
        let mut sched = populated(threads);
        group.bench_with_input(BenchmarkId::new("routine", threads), &threads, |b, _| {
            b.iter(|| {
                let switch = sched.dispatch().expect("dispatch");
                sched.collect_pending_free();
                black_box(switch);
            })
        });
    }

    let mut sched = populated(16);
    group.bench_function("sleep_cycle", |b| {
        b.iter(|| {
            if !sched.running_id().is_main() {
                sched.sleep(1).expect("sleep");
            }
            black_box(sched.dispatch().expect("dispatch"));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
