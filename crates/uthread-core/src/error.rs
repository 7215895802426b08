//! Error types for the uthread scheduler
//!
//! Errors come in two classes. User errors (bad id, illegal operation on
//! the main thread, bad input, full thread table) are recoverable: the
//! operation has no effect and the caller gets an `Err`. System errors
//! (a stack mapping or the timer facility failed, or an internal
//! invariant broke) are fatal: the runtime releases everything it owns
//! and terminates the process.

use core::fmt;
use crate::id::ThreadId;

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Prefix printed by the error sink for recoverable errors
pub const LIB_ERROR_PREFIX: &str = "thread library error: ";

/// Prefix printed by the error sink for fatal errors
pub const SYSTEM_ERROR_PREFIX: &str = "system error: ";

/// Exit status used when a fatal error terminates the process
pub const FATAL_EXIT_STATUS: i32 = 1;

/// Errors that can occur in scheduler operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// No live thread has this id
    NoSuchId(ThreadId),

    /// Id outside `[0, max_threads)`
    IdOutOfRange(ThreadId),

    /// Operation not allowed on the main thread
    IllegalOnMain,

    /// Bad argument
    InvalidInput(&'static str),

    /// Thread table is full
    CapacityExceeded,

    /// Library used before init
    NotInitialized,

    /// init called twice
    AlreadyInitialized,

    /// Stack mapping failed
    MemoryError(MemoryError),

    /// Interval timer could not be configured (errno)
    TimerSetup(i32),

    /// Signal disposition or mask could not be changed (errno)
    SignalSetup(i32),

    /// Scheduler invariant violated
    Internal(&'static str),
}

impl SchedError {
    /// Whether this error must terminate the process
    #[inline]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchedError::MemoryError(_)
                | SchedError::TimerSetup(_)
                | SchedError::SignalSetup(_)
                | SchedError::Internal(_)
        )
    }

    /// Sink prefix for this error's class
    #[inline]
    pub const fn prefix(&self) -> &'static str {
        if self.is_fatal() {
            SYSTEM_ERROR_PREFIX
        } else {
            LIB_ERROR_PREFIX
        }
    }

    /// Print this error to the error sink (stderr)
    ///
    /// Always printed, independent of the log level.
    pub fn report(&self) {
        crate::kprintln!("{}{}", self.prefix(), self);
    }
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::NoSuchId(id) => write!(f, "no thread with id {}", id),
            SchedError::IdOutOfRange(id) => write!(f, "thread id {} out of range", id),
            SchedError::IllegalOnMain => write!(f, "invalid operation on main thread"),
            SchedError::InvalidInput(what) => write!(f, "invalid input: {}", what),
            SchedError::CapacityExceeded => write!(f, "already reached max number of threads"),
            SchedError::NotInitialized => write!(f, "library not initialized"),
            SchedError::AlreadyInitialized => write!(f, "library already initialized"),
            SchedError::MemoryError(e) => write!(f, "memory error: {}", e),
            SchedError::TimerSetup(errno) => write!(f, "timer setup failed (errno {})", errno),
            SchedError::SignalSetup(errno) => write!(f, "signal handling failed (errno {})", errno),
            SchedError::Internal(what) => write!(f, "internal error: {}", what),
        }
    }
}

impl std::error::Error for SchedError {}

/// Memory-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap failed
    AllocationFailed,

    /// mprotect failed
    ProtectionFailed,

    /// munmap failed
    ReleaseFailed,

    /// Requested stack size overflows or is below the minimum
    InvalidSize,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "memory protection change failed"),
            MemoryError::ReleaseFailed => write!(f, "memory release failed"),
            MemoryError::InvalidSize => write!(f, "invalid stack size"),
        }
    }
}

impl From<MemoryError> for SchedError {
    fn from(e: MemoryError) -> Self {
        SchedError::MemoryError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SchedError::NoSuchId(ThreadId::new(4));
        assert_eq!(format!("{}", e), "no thread with id 4");

        let e = SchedError::MemoryError(MemoryError::AllocationFailed);
        assert_eq!(format!("{}", e), "memory error: allocation failed");
    }

    #[test]
    fn test_classification() {
        assert!(!SchedError::IllegalOnMain.is_fatal());
        assert!(!SchedError::CapacityExceeded.is_fatal());
        assert!(!SchedError::InvalidInput("sleep").is_fatal());
        assert!(SchedError::TimerSetup(22).is_fatal());
        assert!(SchedError::Internal("x").is_fatal());

        assert_eq!(SchedError::IllegalOnMain.prefix(), LIB_ERROR_PREFIX);
        assert_eq!(SchedError::SignalSetup(1).prefix(), SYSTEM_ERROR_PREFIX);
    }

    #[test]
    fn test_error_conversion() {
        let sched_err: SchedError = MemoryError::ProtectionFailed.into();
        assert!(matches!(sched_err, SchedError::MemoryError(MemoryError::ProtectionFailed)));
        assert!(sched_err.is_fatal());
    }
}
