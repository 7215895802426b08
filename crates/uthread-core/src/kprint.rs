//! Kernel-style print macros for uthread
//!
//! Leveled diagnostics on stderr, in the spirit of the kernel's printk.
//!
//! # Environment Variables
//!
//! - `UTHREAD_LOG_LEVEL=<level>` - 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
//!   (names are accepted too)
//!
//! # Usage
//!
//! ```ignore
//! use uthread_core::{kprintln, kdebug, kerror};
//!
//! kprintln!("Simple message");
//! kdebug!("spawned thread {}", id);
//! kerror!("stack release failed");
//! ```
//!
//! Each line is formatted into a fixed buffer on the caller's stack and
//! handed to the stderr descriptor in one `write`. Nothing here takes the
//! std `Stderr` lock or allocates, so a green thread preempted in the
//! middle of its own `eprintln!` cannot wedge library logging. Lines
//! longer than [`LINE_CAPACITY`] are cut short.

use core::fmt::{self, Write as _};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use crate::constants::THREAD_NONE;

/// Log levels (matches common conventions)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a level name or number, as accepted by `UTHREAD_LOG_LEVEL`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "1" => Some(LogLevel::Error),
            "warn" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

/// Longest line, newline included, written by one log call
pub const LINE_CAPACITY: usize = 512;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static LEVEL_LOADED: AtomicBool = AtomicBool::new(false);

// Logical thread currently dispatched, for line context
static THREAD_ID: AtomicU32 = AtomicU32::new(THREAD_NONE);

/// Read `UTHREAD_LOG_LEVEL` once
///
/// Runs on the first log call unless called earlier. A level set with
/// [`set_log_level`] wins over the environment.
pub fn init() {
    if LEVEL_LOADED.swap(true, Ordering::AcqRel) {
        return;
    }
    if let Some(level) = std::env::var("UTHREAD_LOG_LEVEL")
        .ok()
        .and_then(|v| LogLevel::parse(&v))
    {
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

/// Current log level
#[inline]
pub fn log_level() -> LogLevel {
    if !LEVEL_LOADED.load(Ordering::Acquire) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_log_level(level: LogLevel) {
    LEVEL_LOADED.store(true, Ordering::Release);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
pub fn level_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

/// Record the running logical thread for log line context
///
/// A plain atomic store, so the dispatcher may call it.
#[inline]
pub fn set_thread_id(id: u32) {
    THREAD_ID.store(id, Ordering::Relaxed);
}

/// Logical thread recorded for log context, if any
#[inline]
pub fn thread_id() -> Option<u32> {
    match THREAD_ID.load(Ordering::Relaxed) {
        THREAD_NONE => None,
        id => Some(id),
    }
}

/// One output line under construction
struct LineBuf {
    bytes: [u8; LINE_CAPACITY],
    len: usize,
}

impl LineBuf {
    const fn new() -> Self {
        Self {
            bytes: [0; LINE_CAPACITY],
            len: 0,
        }
    }

    /// Terminate with a newline, overwriting the last byte if full
    fn end_line(&mut self) {
        if self.len == LINE_CAPACITY {
            self.len -= 1;
        }
        self.bytes[self.len] = b'\n';
        self.len += 1;
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let n = s.len().min(LINE_CAPACITY - self.len);
        self.bytes[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        // Overflow is silently dropped; the rest of the line still formats
        Ok(())
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn emit(bytes: &[u8]) {
            use std::io::Write;
            use std::mem::ManuallyDrop;
            use std::os::fd::FromRawFd;

            // fd 2 is borrowed, never closed
            let mut err = ManuallyDrop::new(unsafe { std::fs::File::from_raw_fd(2) });
            let _ = err.write_all(bytes);
        }
    } else {
        fn emit(bytes: &[u8]) {
            use std::io::Write;
            let _ = std::io::stderr().write_all(bytes);
        }
    }
}

#[doc(hidden)]
pub fn _kprint_impl(args: fmt::Arguments<'_>) {
    let mut line = LineBuf::new();
    let _ = line.write_fmt(args);
    emit(line.as_bytes());
}

#[doc(hidden)]
pub fn _kprintln_impl(args: fmt::Arguments<'_>) {
    let mut line = LineBuf::new();
    let _ = line.write_fmt(args);
    line.end_line();
    emit(line.as_bytes());
}

#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let mut line = LineBuf::new();
    let _ = write!(line, "{} ", level.tag());
    if let Some(id) = thread_id() {
        let _ = write!(line, "[T{}] ", id);
    }
    let _ = line.write_fmt(args);
    line.end_line();
    emit(line.as_bytes());
}

// ============================================================================
// Public Macros
// ============================================================================

/// Print to stderr (no newline)
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        $crate::kprint::_kprint_impl(format_args!($($arg)*));
    }};
}

/// Print to stderr with newline, regardless of log level
#[macro_export]
macro_rules! kprintln {
    () => {{
        $crate::kprint::_kprintln_impl(format_args!(""));
    }};
    ($($arg:tt)*) => {{
        $crate::kprint::_kprintln_impl(format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Error, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Warn, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Info, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Debug, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::kprint::_klog_impl($crate::kprint::LogLevel::Trace, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_log_levels() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert_eq!(LogLevel::from_u8(4), LogLevel::Debug);
        assert_eq!(LogLevel::from_u8(99), LogLevel::Trace);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" 2 "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_thread_context() {
        set_thread_id(3);
        assert_eq!(thread_id(), Some(3));
        set_thread_id(THREAD_NONE);
        assert_eq!(thread_id(), None);
    }

    #[test]
    fn test_long_line_truncated_with_newline() {
        let mut line = LineBuf::new();
        for _ in 0..LINE_CAPACITY {
            let _ = line.write_str("ab");
        }
        line.end_line();
        assert_eq!(line.as_bytes().len(), LINE_CAPACITY);
        assert_eq!(line.as_bytes().last(), Some(&b'\n'));

        let mut short = LineBuf::new();
        let _ = write!(short, "T{}", 7);
        short.end_line();
        assert_eq!(short.as_bytes(), b"T7\n");
    }

    #[test]
    fn test_print_while_std_stderr_is_held() {
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let holder = std::thread::spawn(move || {
            let _guard = std::io::stderr().lock();
            held_tx.send(()).unwrap();
            let _ = release_rx.recv();
        });
        held_rx.recv().unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        std::thread::spawn(move || {
            kprintln!("written while std stderr is locked elsewhere");
            let _ = done_tx.send(());
        });
        let finished = done_rx.recv_timeout(Duration::from_secs(5)).is_ok();

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert!(finished);
    }

    #[test]
    fn test_macros_compile() {
        set_log_level(LogLevel::Off);
        kprint!("");
        kerror!("error {}", "msg");
        kwarn!("warn");
        kinfo!("info");
        kdebug!("debug");
        ktrace!("trace");
    }
}
