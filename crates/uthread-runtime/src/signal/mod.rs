//! Signal handling for preemption
//!
//! A process interval timer delivers one signal per quantum
//! (SIGVTALRM for virtual time, SIGALRM for wall time). The same signal
//! doubles as the critical-section primitive: masking it holds back the
//! quantum handler, and raising it while masked queues a dispatch for the
//! moment the mask is lifted.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::*;
    } else {
        compile_error!("Unsupported platform");
    }
}
