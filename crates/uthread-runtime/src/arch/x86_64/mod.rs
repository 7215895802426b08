//! x86_64 context switching implementation
//!
//! Uses naked functions for the switch itself.
//! Stable in Rust 1.88+

use super::ThreadStart;
use std::arch::naked_asm;

/// Default MXCSR: all exceptions masked, round to nearest
const MXCSR_DEFAULT: u32 = 0x1F80;

/// Default x87 control word
const FPCW_DEFAULT: u16 = 0x037F;

/// Callee-saved state of a suspended thread (System V AMD64)
///
/// Field offsets are hard-coded in the assembly below.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedRegs {
    pub rsp: u64,   // 0x00
    pub rip: u64,   // 0x08
    pub rbx: u64,   // 0x10
    pub rbp: u64,   // 0x18
    pub r12: u64,   // 0x20
    pub r13: u64,   // 0x28
    pub r14: u64,   // 0x30
    pub r15: u64,   // 0x38
    pub mxcsr: u32, // 0x40
    pub fpcw: u16,  // 0x44
    _pad: u16,
}

/// Initialize a fresh thread's register file
///
/// The first switch into `regs` enters the trampoline with the stack
/// pointer at `stack_top`, which then calls `start(arg)`.
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
    // The trampoline is entered by jmp, so rsp must be 16-byte aligned
    // here; its `call` then leaves start() with the ABI-mandated rsp+8.
    let aligned_sp = stack_top as usize & !0xF;

    let regs = &mut *regs;
    regs.rsp = aligned_sp as u64;
    regs.rip = uthread_entry_trampoline as usize as u64;
    regs.rbx = 0;
    regs.rbp = 0;
    regs.r12 = start as usize as u64;
    regs.r13 = arg as u64;
    regs.r14 = 0;
    regs.r15 = 0;
    regs.mxcsr = MXCSR_DEFAULT;
    regs.fpcw = FPCW_DEFAULT;
}

/// Trampoline that calls the start function with its argument
#[unsafe(naked)]
pub unsafe extern "C" fn uthread_entry_trampoline() {
    naked_asm!(
        "mov rdi, r13",
        "call r12",
        // start() never returns
        "ud2",
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
        // Save callee-saved registers to old_regs (RDI)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        "stmxcsr dword ptr [rdi + 0x40]",
        "fnstcw word ptr [rdi + 0x44]",
        // Load callee-saved registers from new_regs (RSI)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "ldmxcsr dword ptr [rsi + 0x40]",
        "fldcw word ptr [rsi + 0x44]",
        // Jump to new RIP
        "jmp rax",
        // Return point for saved context
        "2:",
        "ret",
    );
}

/// Resume `regs` without saving the current thread
///
/// Used when the outgoing thread has removed itself.
#[unsafe(naked)]
pub unsafe extern "C" fn context_restore(_regs: *const SavedRegs) -> ! {
    naked_asm!(
        "mov rsp, [rdi + 0x00]",
        "mov rax, [rdi + 0x08]",
        "mov rbx, [rdi + 0x10]",
        "mov rbp, [rdi + 0x18]",
        "mov r12, [rdi + 0x20]",
        "mov r13, [rdi + 0x28]",
        "mov r14, [rdi + 0x30]",
        "mov r15, [rdi + 0x38]",
        "ldmxcsr dword ptr [rdi + 0x40]",
        "fldcw word ptr [rdi + 0x44]",
        "jmp rax",
    );
}
