//! Architecture-specific context switching
//!
//! Each architecture provides the same surface:
//!
//! - `SavedRegs` - callee-saved register file of a suspended thread
//! - `init_context` - prepare a fresh register file so the first switch
//!   into it calls `start(arg)` on the given stack
//! - `context_switch` - save into one register file, resume another
//! - `context_restore` - resume a register file without saving anything

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
    }
}

/// Function a fresh thread starts in, on its own stack
///
/// Receives the word passed to `init_context` and never returns.
pub type ThreadStart = extern "C" fn(usize) -> !;
