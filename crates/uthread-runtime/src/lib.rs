//! # uthread-runtime
//!
//! Platform-specific runtime implementation for the uthread scheduler.
//!
//! This crate provides:
//! - Stack management (mmap with a guard page)
//! - Interval-timer preemption (SIGVTALRM / SIGALRM)
//! - Context switching (architecture-specific assembly)
//! - The round-robin scheduler and its thread table
//! - Critical sections and the process-wide runtime

pub mod config;
pub mod memory;
pub mod signal;
pub mod arch;
pub mod context;
pub mod tcb;
pub mod scheduler;
pub mod critical;
pub mod global;

// Re-exports
pub use config::{SchedulerConfig, TimerClock};
pub use scheduler::Scheduler;
pub use tcb::EntryFn;

// Platform detection
cfg_if::cfg_if! {
    if #[cfg(not(unix))] {
        compile_error!("Unsupported platform");
    }
}

// Architecture detection
cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub use arch::x86_64 as current_arch;
    } else if #[cfg(target_arch = "aarch64")] {
        pub use arch::aarch64 as current_arch;
    } else {
        compile_error!("Unsupported architecture");
    }
}
