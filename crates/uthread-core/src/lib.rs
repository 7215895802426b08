//! # uthread-core
//!
//! Core types and traits for the uthread (user-level thread) scheduler.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! All platform-specific implementations are in `uthread-runtime`.
//!
//! ## Modules
//!
//! - `id` - Thread identifier type
//! - `state` - Thread state and pending-scenario enums
//! - `bitmap` - Fixed-size id bitmap
//! - `id_alloc` - Smallest-free id allocator
//! - `error` - Error taxonomy and the error sink
//! - `traits` - Preemption controller contract
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod id;
pub mod state;
pub mod bitmap;
pub mod id_alloc;
pub mod error;
pub mod traits;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use id::ThreadId;
pub use state::{ThreadState, Scenario};
pub use bitmap::IdBitmap;
pub use id_alloc::IdAllocator;
pub use error::{SchedError, SchedResult, MemoryError};
pub use traits::QuantumTimer;
pub use env::{env_get, env_get_bool, env_get_opt};

/// Constants shared by the core and the runtime
pub mod constants {
    /// Id permanently reserved for the main thread
    pub const MAIN_THREAD_ID: u32 = 0;

    /// No thread sentinel value
    pub const THREAD_NONE: u32 = u32::MAX;

    /// Default size of the thread table (main thread included)
    pub const DEFAULT_MAX_THREADS: usize = 100;

    /// Default stack size per spawned thread
    pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

    /// Smallest stack a spawned thread may be given
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Guard page size (4 KB)
    pub const GUARD_SIZE: usize = 4096;

    /// Microseconds per second
    pub const MICROS_PER_SEC: u64 = 1_000_000;

    cfg_if::cfg_if! {
        if #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))] {
            /// Initial stack pointer alignment required by the ABI
            pub const STACK_ALIGN: usize = 16;
        } else {
            /// Initial stack pointer alignment (word size)
            pub const STACK_ALIGN: usize = core::mem::size_of::<usize>();
        }
    }
}
