//! Thread identifier type

use core::fmt;
use crate::constants::{MAIN_THREAD_ID, THREAD_NONE};

/// Identifier of a logical thread
///
/// Ids are small integers handed out smallest-first, so an id may be
/// given to an unrelated thread after the previous owner terminated.
/// The maximum value (u32::MAX) is reserved as a sentinel for "no thread".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ThreadId(u32);

impl ThreadId {
    /// Sentinel value indicating no thread
    pub const NONE: ThreadId = ThreadId(THREAD_NONE);

    /// The main thread, which runs on the process's original stack
    pub const MAIN: ThreadId = ThreadId(MAIN_THREAD_ID);

    /// Create a new ThreadId from a raw value
    #[inline]
    pub const fn new(id: u32) -> Self {
        ThreadId(id)
    }

    /// Get the raw u32 value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get as usize for indexing
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == THREAD_NONE
    }

    /// Check if this is a real thread id
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != THREAD_NONE
    }

    /// Check if this is the main thread
    #[inline]
    pub const fn is_main(self) -> bool {
        self.0 == MAIN_THREAD_ID
    }

    /// Convert to Option
    #[inline]
    pub const fn to_option(self) -> Option<ThreadId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u32> for ThreadId {
    #[inline]
    fn from(id: u32) -> Self {
        ThreadId(id)
    }
}

impl From<ThreadId> for u32 {
    #[inline]
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ThreadId(NONE)")
        } else {
            write!(f, "ThreadId({})", self.0)
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        ThreadId::NONE
    }
}
