//! # Growable Pool
//!
//! A chain of arenas ("blocks") that grows on demand.
//!
//! ## Growth Policy
//!
//! Requests try every block, newest first. When all of them refuse, a new
//! block of `max(needed, next_block_capacity)` bytes is appended and
//! `next_block_capacity` doubles. Blocks are never resized or dropped
//! individually; `clear()` releases all of them and resets the growth
//! counter to the first block's capacity.
//!
//! Handles carry the index of their block, so finding the owner of a
//! record is a bounds-checked index rather than an address-range scan.

use std::fmt;

use tracing::debug;

use crate::alignment::{add_padding, checked_padding, POINTER_SIZE};
use crate::arena::Arena;
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::handle::{RecordRef, SlotHandle, StringHandle};

use super::allocator::{BlockAllocator, HeapAllocator};
use super::{MemoryPool, DEFAULT_POOL_SIZE};

/// A memory pool that appends larger blocks as it fills up.
///
/// # Example
///
/// ```rust
/// use arbor_memory::{GrowablePool, MemoryPool};
///
/// let mut pool: GrowablePool<u64> = GrowablePool::with_initial_capacity(64);
/// for _ in 0..32 {
///     pool.alloc_variant()?;
/// }
/// assert!(pool.block_count() > 1);
/// # Ok::<(), arbor_memory::PoolError>(())
/// ```
pub struct GrowablePool<S, A: BlockAllocator = HeapAllocator> {
    /// Source of block storage.
    allocator: A,
    /// Blocks, oldest first. A block's index is the one its handles carry.
    blocks: Vec<Arena<S>>,
    /// Capacity requested for the next block.
    next_block_capacity: usize,
    /// Generation new blocks start at. Old handles read as stale against it.
    generation: u32,
}

impl<S> GrowablePool<S> {
    /// Creates an empty pool whose first block will hold
    /// [`DEFAULT_POOL_SIZE`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_initial_capacity(DEFAULT_POOL_SIZE)
    }

    /// Creates an empty pool whose first block will hold `capacity` bytes.
    #[must_use]
    pub fn with_initial_capacity(capacity: usize) -> Self {
        Self::with_allocator(HeapAllocator, capacity)
    }

    /// Creates an empty pool whose first block is sized by
    /// `config.capacity`.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the configuration does not validate.
    pub fn from_config(config: &PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self::with_initial_capacity(config.capacity))
    }
}

impl<S> Default for GrowablePool<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A: BlockAllocator> GrowablePool<S, A> {
    /// Creates an empty pool drawing its blocks from `allocator`.
    ///
    /// No block is allocated until the first request.
    #[must_use]
    pub fn with_allocator(allocator: A, initial_capacity: usize) -> Self {
        Self {
            allocator,
            blocks: Vec::new(),
            next_block_capacity: initial_capacity,
            generation: 0,
        }
    }

    /// Overrides the capacity of the next block.
    #[inline]
    pub fn reserve(&mut self, capacity: usize) {
        self.next_block_capacity = capacity;
    }

    /// Number of blocks currently held.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Capacity that will be requested for the next block.
    #[inline]
    #[must_use]
    pub const fn next_block_capacity(&self) -> usize {
        self.next_block_capacity
    }

    /// Sum of all block capacities.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks.iter().map(Arena::capacity).sum()
    }

    /// The block allocator.
    #[inline]
    #[must_use]
    pub const fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Block `index`, if the pool has it.
    #[must_use]
    pub fn block(&self, index: u16) -> Option<&Arena<S>> {
        self.blocks.get(usize::from(index))
    }

    fn arena(&self, block: u16) -> PoolResult<&Arena<S>> {
        self.blocks
            .get(usize::from(block))
            .ok_or(PoolError::ForeignBlock { block })
    }

    fn arena_mut(&mut self, block: u16) -> PoolResult<&mut Arena<S>> {
        self.blocks
            .get_mut(usize::from(block))
            .ok_or(PoolError::ForeignBlock { block })
    }

    /// Appends a block able to hold at least `needed` bytes.
    fn add_block(&mut self, needed: usize) -> PoolResult<u16> {
        let index = u16::try_from(self.blocks.len()).map_err(|_| PoolError::OutOfMemory {
            requested: needed,
            available: 0,
        })?;
        let capacity = checked_padding(needed.max(self.next_block_capacity).max(1))
            .filter(|capacity| u32::try_from(*capacity).is_ok())
            .ok_or(PoolError::CapacityExceeded {
                requested: needed,
                capacity: u32::MAX as usize,
            })?;
        let storage = self
            .allocator
            .allocate(capacity / POINTER_SIZE)
            .ok_or(PoolError::OutOfMemory {
                requested: capacity,
                available: 0,
            })?;

        self.blocks.push(Arena::with_generation(storage, self.generation)?);
        self.next_block_capacity = capacity.saturating_mul(2);
        debug!(
            block = index,
            capacity,
            next_capacity = self.next_block_capacity,
            "added pool block"
        );
        Ok(index)
    }

    /// Runs `allocate` against each block, newest first, then against a new
    /// block of at least `needed` bytes.
    fn allocate_with<F>(&mut self, needed: usize, mut allocate: F) -> PoolResult<(u16, RecordRef)>
    where
        F: FnMut(&mut Arena<S>) -> PoolResult<RecordRef>,
    {
        for (index, arena) in self.blocks.iter_mut().enumerate().rev() {
            match allocate(arena) {
                // Block indices fit u16 (checked in `add_block`).
                Ok(record) => return Ok((index as u16, record)),
                Err(err) if err.is_out_of_memory() => {}
                Err(err) => return Err(err),
            }
        }

        let index = self.add_block(needed)?;
        allocate(&mut self.blocks[usize::from(index)]).map(|record| (index, record))
    }

    /// Returns every block to the allocator.
    fn release_blocks(&mut self) {
        let next = self
            .blocks
            .iter()
            .map(Arena::next_generation)
            .max()
            .unwrap_or(self.generation);
        self.generation = next.max(self.generation);
        for arena in self.blocks.drain(..).rev() {
            self.allocator.deallocate(arena.into_storage());
        }
    }
}

impl<S, A: BlockAllocator> MemoryPool for GrowablePool<S, A> {
    type Slot = S;

    fn alloc_variant(&mut self) -> PoolResult<SlotHandle>
    where
        Self::Slot: Default,
    {
        if let Some(index) = self.blocks.iter().rposition(Arena::has_recycled_slot) {
            let record = self.blocks[index].alloc_slot()?;
            return Ok(SlotHandle::new(index as u16, record));
        }
        let (block, record) = self.allocate_with(Arena::<S>::RECORD_SIZE, Arena::alloc_slot)?;
        Ok(SlotHandle::new(block, record))
    }

    fn free_variant(&mut self, slot: SlotHandle) -> PoolResult<S> {
        self.arena_mut(slot.block())?.free_slot(slot.record())
    }

    fn variant(&self, slot: SlotHandle) -> PoolResult<&S> {
        self.arena(slot.block())?.slot(slot.record())
    }

    fn variant_mut(&mut self, slot: SlotHandle) -> PoolResult<&mut S> {
        self.arena_mut(slot.block())?.slot_mut(slot.record())
    }

    fn alloc_frozen_string(&mut self, len: usize) -> PoolResult<StringHandle> {
        let needed = checked_padding(len)
            .and_then(|bytes| bytes.checked_add(Arena::<S>::RECORD_SIZE))
            .ok_or(PoolError::CapacityExceeded {
                requested: len,
                capacity: u32::MAX as usize,
            })?;
        let (block, record) =
            self.allocate_with(needed, |arena| arena.alloc_frozen_string(len))?;
        Ok(StringHandle::new(block, record))
    }

    fn alloc_expandable_string(&mut self) -> PoolResult<StringHandle> {
        let (block, record) =
            self.allocate_with(Arena::<S>::RECORD_SIZE, Arena::alloc_expandable_string)?;
        Ok(StringHandle::new(block, record))
    }

    fn try_append(&mut self, string: StringHandle, byte: u8) -> PoolResult<()> {
        self.arena_mut(string.block())?.append(string.record(), byte)
    }

    fn expand_string(&mut self, string: StringHandle) -> PoolResult<StringHandle> {
        let (block, record) = (string.block(), string.record());
        let arena = self.arena(block)?;
        if !arena.is_expandable(record)? {
            return Err(PoolError::FrozenString {
                offset: record.offset(),
            });
        }
        let len = arena.string_len(record)?;
        let needed = add_padding(len + 1) + Arena::<S>::RECORD_SIZE;

        let index = self.add_block(needed)?;
        let (older, newest) = self.blocks.split_at_mut(usize::from(index));
        let source = &older[usize::from(block)];
        let target = &mut newest[0];
        let moved = target.alloc_expandable_string()?;
        target.extend_string(moved, source.string_bytes(record)?)?;

        self.blocks[usize::from(block)].free_string(record)?;
        debug!(from_block = block, to_block = index, len, "relocated expandable string");
        Ok(StringHandle::new(index, moved))
    }

    fn freeze_string(&mut self, string: StringHandle) -> PoolResult<()> {
        self.arena_mut(string.block())?.freeze_string(string.record())
    }

    fn free_string(&mut self, string: StringHandle) -> PoolResult<()> {
        self.arena_mut(string.block())?.free_string(string.record())
    }

    fn string_bytes(&self, string: StringHandle) -> PoolResult<&[u8]> {
        self.arena(string.block())?.string_bytes(string.record())
    }

    fn string_bytes_mut(&mut self, string: StringHandle) -> PoolResult<&mut [u8]> {
        self.arena_mut(string.block())?
            .string_bytes_mut(string.record())
    }

    fn size(&self) -> usize {
        self.blocks.iter().map(Arena::size).sum()
    }

    fn clear(&mut self) {
        let Some(first) = self.blocks.first() else {
            return;
        };
        self.next_block_capacity = first.capacity();
        let released = self.blocks.len();
        self.release_blocks();
        debug!(
            released,
            next_capacity = self.next_block_capacity,
            "cleared growable pool"
        );
    }
}

impl<S, A: BlockAllocator> Drop for GrowablePool<S, A> {
    fn drop(&mut self) {
        self.release_blocks();
    }
}

impl<S, A: BlockAllocator> fmt::Debug for GrowablePool<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowablePool")
            .field("blocks", &self.blocks)
            .field("next_block_capacity", &self.next_block_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestPool = GrowablePool<[u64; 2]>;

    const RECORD: usize = Arena::<[u64; 2]>::RECORD_SIZE;

    #[test]
    fn test_no_block_until_first_request() {
        let pool = TestPool::with_initial_capacity(64);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.next_block_capacity(), 64);
    }

    #[test]
    fn test_blocks_double() {
        let mut pool = TestPool::with_initial_capacity(RECORD);
        pool.alloc_variant().unwrap();
        pool.alloc_variant().unwrap();
        pool.alloc_variant().unwrap();

        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.block(0).map(Arena::capacity), Some(RECORD));
        assert_eq!(pool.block(1).map(Arena::capacity), Some(2 * RECORD));
        assert_eq!(pool.next_block_capacity(), 4 * RECORD);
    }

    #[test]
    fn test_reserve_overrides_next_block() {
        let mut pool = TestPool::with_initial_capacity(RECORD);
        pool.reserve(10 * RECORD);
        pool.alloc_variant().unwrap();
        assert_eq!(pool.capacity(), 10 * RECORD);
    }

    #[test]
    fn test_unknown_block_is_foreign() {
        let mut pool = TestPool::with_initial_capacity(256);
        let slot = pool.alloc_variant().unwrap();
        let foreign = SlotHandle::new(9, slot.record());
        assert_eq!(pool.free_variant(foreign), Err(PoolError::ForeignBlock { block: 9 }));
    }

    #[test]
    fn test_recycled_slot_preferred_over_new_space() {
        let mut pool = TestPool::with_initial_capacity(RECORD);
        let first = pool.alloc_variant().unwrap();
        let second = pool.alloc_variant().unwrap();
        pool.free_variant(first).unwrap();

        let again = pool.alloc_variant().unwrap();
        assert_eq!(again.block(), first.block());
        assert_eq!(again.offset(), first.offset());
        assert_ne!(again.block(), second.block());
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    fn test_clear_outdates_handles() {
        let mut pool = TestPool::with_initial_capacity(256);
        let slot = pool.alloc_variant().unwrap();
        pool.clear();

        let fresh = pool.alloc_variant().unwrap();
        assert_eq!(fresh.offset(), slot.offset());
        assert!(pool.variant(slot).is_err());
        assert!(pool.variant(fresh).is_ok());
    }

    #[test]
    fn test_handles_from_released_blocks_read_as_stale() {
        let mut pool = TestPool::with_initial_capacity(4 * RECORD);
        let first = pool.alloc_variant().unwrap();
        let second = pool.alloc_variant().unwrap();
        pool.clear();

        let fresh = pool.alloc_variant().unwrap();
        assert_eq!(fresh.offset(), first.offset());
        assert!(matches!(
            pool.free_variant(second),
            Err(PoolError::StaleHandle { .. })
        ));
        assert!(matches!(
            pool.variant(first),
            Err(PoolError::StaleHandle { .. })
        ));
    }
}
