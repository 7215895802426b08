//! Fixed-size id bitmap
//!
//! One bit per thread id, sized once at construction. Every operation
//! works on the pre-sized block array, so nothing here allocates after
//! `new` and it is safe to use from the tick path.

use crate::id::ThreadId;

/// Number of bits per block
const BITS_PER_BLOCK: usize = 64;

/// Bitmap over ids `[0, capacity)`
#[derive(Debug, Clone)]
pub struct IdBitmap {
    /// Bitmap blocks (each u64 holds 64 id bits)
    blocks: Box<[u64]>,

    /// Number of ids this bitmap can hold
    capacity: usize,

    /// Number of bits currently set
    count: usize,
}

impl IdBitmap {
    /// Create an empty bitmap for ids `[0, capacity)`
    pub fn new(capacity: usize) -> Self {
        let num_blocks = capacity.div_ceil(BITS_PER_BLOCK);
        Self {
            blocks: vec![0u64; num_blocks].into_boxed_slice(),
            capacity,
            count: 0,
        }
    }

    /// Number of ids this bitmap covers
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of set bits
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn locate(&self, id: ThreadId) -> Option<(usize, u64)> {
        let idx = id.as_usize();
        if id.is_none() || idx >= self.capacity {
            return None;
        }
        Some((idx / BITS_PER_BLOCK, 1u64 << (idx % BITS_PER_BLOCK)))
    }

    /// Set a bit; returns false if it was already set or out of range
    #[inline]
    pub fn set(&mut self, id: ThreadId) -> bool {
        let Some((block, mask)) = self.locate(id) else {
            return false;
        };
        if self.blocks[block] & mask != 0 {
            return false;
        }
        self.blocks[block] |= mask;
        self.count += 1;
        true
    }

    /// Clear a bit; returns false if it was not set
    #[inline]
    pub fn clear(&mut self, id: ThreadId) -> bool {
        let Some((block, mask)) = self.locate(id) else {
            return false;
        };
        if self.blocks[block] & mask == 0 {
            return false;
        }
        self.blocks[block] &= !mask;
        self.count -= 1;
        true
    }

    /// Check if a bit is set
    #[inline]
    pub fn is_set(&self, id: ThreadId) -> bool {
        match self.locate(id) {
            Some((block, mask)) => self.blocks[block] & mask != 0,
            None => false,
        }
    }

    /// Lowest id whose bit is clear
    pub fn first_clear(&self) -> Option<ThreadId> {
        for (block_idx, &block) in self.blocks.iter().enumerate() {
            if block == u64::MAX {
                continue;
            }
            let idx = block_idx * BITS_PER_BLOCK + (!block).trailing_zeros() as usize;
            // Tail bits of the last block lie past capacity
            if idx >= self.capacity {
                return None;
            }
            return Some(ThreadId::new(idx as u32));
        }
        None
    }

    /// Iterate over set ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.blocks.iter().enumerate().flat_map(|(block_idx, &block)| {
            let mut bits = block;
            core::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(ThreadId::new((block_idx * BITS_PER_BLOCK + bit) as u32))
            })
        })
    }

    /// Clear every bit
    pub fn clear_all(&mut self) {
        self.blocks.iter_mut().for_each(|b| *b = 0);
        self.count = 0;
    }
}
