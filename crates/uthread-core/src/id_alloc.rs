//! Smallest-free thread id allocator
//!
//! Hands out the smallest id in `[0, max_threads)` that is not in use.
//! Backed by an [`IdBitmap`], so allocation is a scan over a handful of
//! words and release is a single bit clear.

use crate::bitmap::IdBitmap;
use crate::error::{SchedError, SchedResult};
use crate::id::ThreadId;

/// Id allocator bounded by the configured thread-table size
#[derive(Debug, Clone)]
pub struct IdAllocator {
    /// One bit per id in use
    in_use: IdBitmap,
}

impl IdAllocator {
    /// Create an allocator for ids `[0, max_threads)`
    pub fn new(max_threads: usize) -> Self {
        Self {
            in_use: IdBitmap::new(max_threads),
        }
    }

    /// Allocate the smallest unused id
    pub fn allocate(&mut self) -> SchedResult<ThreadId> {
        let id = self.in_use.first_clear().ok_or(SchedError::CapacityExceeded)?;
        self.in_use.set(id);
        Ok(id)
    }

    /// Return an id for future reuse
    ///
    /// Releasing an id that is not allocated is a no-op.
    pub fn release(&mut self, id: ThreadId) {
        self.in_use.clear(id);
    }

    /// Check if an id lies inside `[0, max_threads)`
    #[inline]
    pub fn in_range(&self, id: ThreadId) -> bool {
        id.is_some() && id.as_usize() < self.in_use.capacity()
    }

    /// Number of ids currently handed out
    #[inline]
    pub fn allocated_count(&self) -> usize {
        self.in_use.count()
    }

    /// Size of the id space
    #[inline]
    pub fn max_threads(&self) -> usize {
        self.in_use.capacity()
    }

    /// Forget every allocation
    pub fn reset(&mut self) {
        self.in_use.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sequential() {
        let mut alloc = IdAllocator::new(100);

        assert_eq!(alloc.allocate().unwrap().as_u32(), 0);
        assert_eq!(alloc.allocate().unwrap().as_u32(), 1);
        assert_eq!(alloc.allocate().unwrap().as_u32(), 2);
        assert_eq!(alloc.allocated_count(), 3);
    }

    #[test]
    fn test_reuse_smallest_first() {
        let mut alloc = IdAllocator::new(100);
        let ids: Vec<_> = (0..6).map(|_| alloc.allocate().unwrap()).collect();

        alloc.release(ids[4]);
        alloc.release(ids[2]);

        // Smallest free id wins, regardless of release order
        assert_eq!(alloc.allocate().unwrap(), ids[2]);
        assert_eq!(alloc.allocate().unwrap(), ids[4]);
        assert_eq!(alloc.allocate().unwrap().as_u32(), 6);
    }

    #[test]
    fn test_allocate_exhaustion() {
        let mut alloc = IdAllocator::new(3);
        for _ in 0..3 {
            alloc.allocate().unwrap();
        }

        let result = alloc.allocate();
        assert!(matches!(result, Err(SchedError::CapacityExceeded)));
        assert_eq!(alloc.allocated_count(), 3);
    }

    #[test]
    fn test_release_unallocated_is_noop() {
        let mut alloc = IdAllocator::new(4);
        alloc.release(ThreadId::new(2));
        alloc.release(ThreadId::new(99));
        assert_eq!(alloc.allocated_count(), 0);
        assert_eq!(alloc.allocate().unwrap().as_u32(), 0);
    }

    #[test]
    fn test_range() {
        let alloc = IdAllocator::new(4);
        assert!(alloc.in_range(ThreadId::new(3)));
        assert!(!alloc.in_range(ThreadId::new(4)));
        assert!(!alloc.in_range(ThreadId::NONE));
    }
}
