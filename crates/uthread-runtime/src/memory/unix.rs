//! Unix stack implementation using mmap

use super::ThreadStack;
use core::ptr::NonNull;
use uthread_core::constants::{GUARD_SIZE, MIN_STACK_SIZE};
use uthread_core::error::{MemoryError, SchedResult};
use uthread_core::kwarn;

/// System page size
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        GUARD_SIZE
    } else {
        size as usize
    }
}

impl ThreadStack {
    /// Map a new stack with at least `size` usable bytes
    ///
    /// The usable size is rounded up to whole pages. The guard region is
    /// one page (at least `GUARD_SIZE`) below the usable part.
    pub fn new(size: usize) -> SchedResult<Self> {
        if size < MIN_STACK_SIZE {
            return Err(MemoryError::InvalidSize.into());
        }

        let page = page_size();
        let guard_len = GUARD_SIZE.max(page);
        let usable = size
            .checked_next_multiple_of(page)
            .ok_or(MemoryError::InvalidSize)?;
        let mapped_len = usable
            .checked_add(guard_len)
            .ok_or(MemoryError::InvalidSize)?;

        // Map everything readable/writable, then drop access to the guard
        let base = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                mapped_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };

        if base == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed.into());
        }

        let ret = unsafe { libc::mprotect(base, guard_len, libc::PROT_NONE) };
        if ret != 0 {
            unsafe { libc::munmap(base, mapped_len) };
            return Err(MemoryError::ProtectionFailed.into());
        }

        let base = NonNull::new(base as *mut u8).ok_or(MemoryError::AllocationFailed)?;

        Ok(Self {
            base,
            mapped_len,
            guard_len,
        })
    }
}

impl Drop for ThreadStack {
    fn drop(&mut self) {
        let ret = unsafe {
            libc::munmap(self.base.as_ptr() as *mut libc::c_void, self.mapped_len)
        };
        if ret != 0 {
            kwarn!("munmap of stack at {:p} failed", self.base.as_ptr());
        }
    }
}
