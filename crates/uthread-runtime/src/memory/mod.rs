//! Thread stack memory
//!
//! Every spawned thread owns one anonymous mapping: a guard page at the
//! low end (no access) followed by the usable stack. Stacks grow down, so
//! an overflow runs into the guard page and faults instead of silently
//! corrupting a neighbour.
//!
//! Platform-specific implementations handle virtual memory allocation.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::*;
    } else {
        compile_error!("Unsupported platform");
    }
}

use core::ptr::NonNull;
use uthread_core::constants::STACK_ALIGN;

/// Stack owned by one spawned thread
///
/// Released (unmapped) on drop. Unmapping is async-signal-safe, so a
/// stack may be dropped from inside the quantum handler.
pub struct ThreadStack {
    /// Start of the mapping (guard page first)
    base: NonNull<u8>,

    /// Total mapping length, guard included
    mapped_len: usize,

    /// Length of the guard region at `base`
    guard_len: usize,
}

impl ThreadStack {
    /// One past the highest usable address (stack grows down from here)
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.as_ptr().add(self.mapped_len) }
    }

    /// Initial stack pointer, aligned for the ABI
    #[inline]
    pub fn aligned_top(&self) -> *mut u8 {
        let top = self.top() as usize & !(STACK_ALIGN - 1);
        top as *mut u8
    }

    /// Usable bytes
    #[inline]
    pub fn usable_size(&self) -> usize {
        self.mapped_len - self.guard_len
    }

    /// Whether `addr` lies inside this mapping (guard included)
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        let start = self.base.as_ptr() as usize;
        addr >= start && addr < start + self.mapped_len
    }
}

impl core::fmt::Debug for ThreadStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadStack")
            .field("base", &self.base)
            .field("top", &self.top())
            .field("usable_size", &self.usable_size())
            .finish()
    }
}
