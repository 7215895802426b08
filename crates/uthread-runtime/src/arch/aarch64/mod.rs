//! aarch64 context switching implementation
//!
//! AAPCS64 callee-saved state: x19-x28, frame pointer, link register,
//! stack pointer, the low halves of v8-v15, and FPCR (rounding mode and
//! trap enables are per thread, as MXCSR is on x86_64).

use super::ThreadStart;
use std::arch::naked_asm;

/// Callee-saved state of a suspended thread
///
/// Field offsets are hard-coded in the assembly below.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedRegs {
    /// x19..=x28, then x29 (fp) and x30 (lr)
    pub x: [u64; 12], // 0x00..0x60
    pub sp: u64,      // 0x60
    /// d8..=d15
    pub d: [u64; 8],  // 0x68..0xA8
    pub fpcr: u64,    // 0xA8
}

/// FPCR of a fresh thread: round to nearest, no traps
const FPCR_DEFAULT: u64 = 0;

/// Initialize a fresh thread's register file
///
/// The first switch into `regs` "returns" into the trampoline with the
/// stack pointer at `stack_top`, which then calls `start(arg)`.
///
/// # Safety
///
/// `regs` must point to valid SavedRegs memory.
/// `stack_top` must be the top of a mapped, writable stack.
#[inline]
pub unsafe fn init_context(
    regs: *mut SavedRegs,
    stack_top: *mut u8,
    start: ThreadStart,
    arg: usize,
) {
    let regs = &mut *regs;
    *regs = SavedRegs::default();
    regs.x[0] = start as usize as u64; // x19
    regs.x[1] = arg as u64; // x20
    regs.x[11] = uthread_entry_trampoline as usize as u64; // x30
    regs.sp = (stack_top as usize & !0xF) as u64;
    regs.fpcr = FPCR_DEFAULT;
}

/// Trampoline that calls the start function with its argument
#[unsafe(naked)]
pub unsafe extern "C" fn uthread_entry_trampoline() {
    naked_asm!(
        "mov x0, x20",
        "blr x19",
        // start() never returns
        "brk #0x1",
    );
}

/// Save the current thread into `old_regs` and resume `new_regs`
///
/// Returns when something later switches back into `old_regs`.
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(
    _old_regs: *mut SavedRegs,
    _new_regs: *const SavedRegs,
) {
    naked_asm!(
        // Save to old_regs (x0)
        "stp x19, x20, [x0, #0x00]",
        "stp x21, x22, [x0, #0x10]",
        "stp x23, x24, [x0, #0x20]",
        "stp x25, x26, [x0, #0x30]",
        "stp x27, x28, [x0, #0x40]",
        "stp x29, x30, [x0, #0x50]",
        "mov x9, sp",
        "str x9, [x0, #0x60]",
        "stp d8, d9, [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",
        "mrs x9, fpcr",
        "str x9, [x0, #0xA8]",
        // Load from new_regs (x1)
        "ldp x19, x20, [x1, #0x00]",
        "ldp x21, x22, [x1, #0x10]",
        "ldp x23, x24, [x1, #0x20]",
        "ldp x25, x26, [x1, #0x30]",
        "ldp x27, x28, [x1, #0x40]",
        "ldp x29, x30, [x1, #0x50]",
        "ldr x9, [x1, #0x60]",
        "mov sp, x9",
        "ldp d8, d9, [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
        "ldr x9, [x1, #0xA8]",
        "msr fpcr, x9",
        // Return through the new link register
        "ret",
    );
}

/// Resume `regs` without saving the current thread
///
/// Used when the outgoing thread has removed itself.
#[unsafe(naked)]
pub unsafe extern "C" fn context_restore(_regs: *const SavedRegs) -> ! {
    naked_asm!(
        "ldp x19, x20, [x0, #0x00]",
        "ldp x21, x22, [x0, #0x10]",
        "ldp x23, x24, [x0, #0x20]",
        "ldp x25, x26, [x0, #0x30]",
        "ldp x27, x28, [x0, #0x40]",
        "ldp x29, x30, [x0, #0x50]",
        "ldr x9, [x0, #0x60]",
        "mov sp, x9",
        "ldp d8, d9, [x0, #0x68]",
        "ldp d10, d11, [x0, #0x78]",
        "ldp d12, d13, [x0, #0x88]",
        "ldp d14, d15, [x0, #0x98]",
        "ldr x9, [x0, #0xA8]",
        "msr fpcr, x9",
        "ret",
    );
}
