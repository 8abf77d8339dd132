//! # Stack Region Allocator
//!
//! One statically sized arena carved into `MAX_TASKS` equal slabs, one per
//! task slot. Stacks are full-descending: slot 0 owns the highest slab and
//! every later slot sits `STACK_WORDS` lower.
//!
//! ```text
//!  high ┌───────────────┐ ◄─ top() = slab_base(0)
//!       │   slab 0      │
//!       ├───────────────┤ ◄─ slab_base(1)
//!       │   slab 1      │
//!       ├───────────────┤ ◄─ slab_base(2)
//!       │     ...       │
//!   low └───────────────┘ ◄─ 0
//! ```
//!
//! Positions are word offsets into the arena, never raw addresses. Only the
//! arch layer converts between the two, via [`StackRegion::address_of`] and
//! [`StackRegion::offset_of`].

use crate::config::{MAX_TASKS, STACK_WORDS};

/// Total number of words in the arena.
pub const REGION_WORDS: usize = MAX_TASKS * STACK_WORDS;

/// Backing memory for every task stack. Aligned to 8 bytes as required by
/// the ARM AAPCS at public interfaces and exception entry.
#[repr(C, align(8))]
pub struct StackRegion {
    words: [u32; REGION_WORDS],
}

impl StackRegion {
    /// A zero-filled region, usable in `static` initializers.
    pub const fn new() -> Self {
        Self {
            words: [0; REGION_WORDS],
        }
    }

    /// Offset one past the highest word of the region.
    #[inline]
    pub const fn top() -> usize {
        REGION_WORDS
    }

    /// Base (one past the highest word) of slot `slot`'s slab:
    /// `top − slot × STACK_WORDS`.
    ///
    /// No bounds checking beyond the registry's capacity bound.
    #[inline]
    pub const fn slab_base(slot: usize) -> usize {
        Self::top() - slot * STACK_WORDS
    }

    /// Lowest word offset still belonging to `slot`'s slab.
    #[inline]
    pub const fn slab_limit(slot: usize) -> usize {
        Self::slab_base(slot) - STACK_WORDS
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// Hardware address of the word at `offset`. `offset == top()` yields
    /// the one-past-the-end address, which is a valid empty stack pointer.
    #[inline]
    pub fn address_of(&mut self, offset: usize) -> *mut u32 {
        debug_assert!(offset <= REGION_WORDS);
        self.words.as_mut_ptr().wrapping_add(offset)
    }

    /// Word offset of a hardware stack pointer that lies inside the region.
    #[inline]
    pub fn offset_of(&self, address: *const u32) -> usize {
        let base = self.words.as_ptr() as usize;
        let offset = (address as usize).wrapping_sub(base) / core::mem::size_of::<u32>();
        debug_assert!(offset <= REGION_WORDS);
        offset
    }
}

impl Default for StackRegion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slabs_descend_from_top() {
        assert_eq!(StackRegion::slab_base(0), REGION_WORDS);
        assert_eq!(StackRegion::slab_base(1), REGION_WORDS - STACK_WORDS);
        assert_eq!(StackRegion::slab_limit(MAX_TASKS - 1), 0);
    }

    #[test]
    fn test_slabs_do_not_overlap() {
        for slot in 1..MAX_TASKS {
            assert_eq!(StackRegion::slab_limit(slot - 1), StackRegion::slab_base(slot));
        }
    }

    #[test]
    fn test_address_offset_conversion() {
        let mut region = StackRegion::new();
        let base = StackRegion::slab_base(3);
        let addr = region.address_of(base - 16);
        assert_eq!(region.offset_of(addr), base - 16);
        assert_eq!(addr as usize % 4, 0);
    }

    #[test]
    fn test_region_is_eight_byte_aligned() {
        let mut region = StackRegion::new();
        assert_eq!(region.address_of(0) as usize % 8, 0);
        assert_eq!(region.address_of(StackRegion::top()) as usize % 8, 0);
    }
}
