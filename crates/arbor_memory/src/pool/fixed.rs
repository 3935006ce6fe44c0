//! # Fixed Pool
//!
//! A single arena whose capacity never changes. Once full, every request
//! fails until something is freed or the pool is cleared.

use crate::alignment::add_padding;
use crate::arena::Arena;
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::handle::{RecordRef, SlotHandle, StringHandle};

use super::MemoryPool;

/// A memory pool over one fixed-size buffer.
///
/// # Example
///
/// ```rust
/// use arbor_memory::{FixedPool, MemoryPool};
///
/// let mut pool: FixedPool<u64> = FixedPool::new(128)?;
/// let slot = pool.alloc_variant()?;
/// *pool.variant_mut(slot)? = 7;
///
/// let text = pool.save_string(b"hello")?;
/// assert_eq!(pool.string_bytes(text)?, b"hello");
/// # Ok::<(), arbor_memory::PoolError>(())
/// ```
#[derive(Debug)]
pub struct FixedPool<S> {
    arena: Arena<S>,
}

impl<S> FixedPool<S> {
    /// Creates a pool of `capacity` bytes, rounded up to the pointer size
    /// and never below one pointer.
    ///
    /// # Errors
    ///
    /// [`PoolError::CapacityExceeded`] if `capacity` does not fit 32-bit
    /// offsets, [`PoolError::OutOfMemory`] if the heap cannot supply it.
    pub fn new(capacity: usize) -> PoolResult<Self> {
        Ok(Self {
            arena: Arena::with_capacity(capacity.max(1))?,
        })
    }

    /// Creates a pool over a caller-supplied buffer.
    ///
    /// # Errors
    ///
    /// [`PoolError::CapacityExceeded`] if the buffer does not fit 32-bit
    /// offsets.
    pub fn from_buffer(buffer: Box<[usize]>) -> PoolResult<Self> {
        Ok(Self {
            arena: Arena::new(buffer)?,
        })
    }

    /// Creates a pool sized by `config.capacity`.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the configuration does not validate.
    pub fn from_config(config: &PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Self::new(config.capacity)
    }

    /// Total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// The arena behind the pool.
    #[inline]
    #[must_use]
    pub const fn arena(&self) -> &Arena<S> {
        &self.arena
    }

    /// Gives the buffer back.
    #[must_use]
    pub fn into_buffer(self) -> Box<[usize]> {
        self.arena.into_storage()
    }

    /// Checks that a handle was issued by this pool's single block.
    fn local(block: u16, record: RecordRef) -> PoolResult<RecordRef> {
        if block == 0 {
            Ok(record)
        } else {
            Err(PoolError::ForeignBlock { block })
        }
    }
}

impl<S> MemoryPool for FixedPool<S> {
    type Slot = S;

    fn alloc_variant(&mut self) -> PoolResult<SlotHandle>
    where
        Self::Slot: Default,
    {
        self.arena.alloc_slot().map(|record| SlotHandle::new(0, record))
    }

    fn free_variant(&mut self, slot: SlotHandle) -> PoolResult<S> {
        let record = Self::local(slot.block(), slot.record())?;
        self.arena.free_slot(record)
    }

    fn variant(&self, slot: SlotHandle) -> PoolResult<&S> {
        let record = Self::local(slot.block(), slot.record())?;
        self.arena.slot(record)
    }

    fn variant_mut(&mut self, slot: SlotHandle) -> PoolResult<&mut S> {
        let record = Self::local(slot.block(), slot.record())?;
        self.arena.slot_mut(record)
    }

    fn alloc_frozen_string(&mut self, len: usize) -> PoolResult<StringHandle> {
        self.arena
            .alloc_frozen_string(len)
            .map(|record| StringHandle::new(0, record))
    }

    fn alloc_expandable_string(&mut self) -> PoolResult<StringHandle> {
        self.arena
            .alloc_expandable_string()
            .map(|record| StringHandle::new(0, record))
    }

    fn try_append(&mut self, string: StringHandle, byte: u8) -> PoolResult<()> {
        let record = Self::local(string.block(), string.record())?;
        self.arena.append(record, byte)
    }

    fn expand_string(&mut self, string: StringHandle) -> PoolResult<StringHandle> {
        let record = Self::local(string.block(), string.record())?;
        if !self.arena.is_expandable(record)? {
            return Err(PoolError::FrozenString {
                offset: record.offset(),
            });
        }
        // There is no larger block to move into.
        let len = self.arena.string_len(record)?;
        Err(PoolError::OutOfMemory {
            requested: add_padding(len + 1),
            available: self.arena.free_bytes(),
        })
    }

    fn freeze_string(&mut self, string: StringHandle) -> PoolResult<()> {
        let record = Self::local(string.block(), string.record())?;
        self.arena.freeze_string(record)
    }

    fn free_string(&mut self, string: StringHandle) -> PoolResult<()> {
        let record = Self::local(string.block(), string.record())?;
        self.arena.free_string(record)
    }

    fn string_bytes(&self, string: StringHandle) -> PoolResult<&[u8]> {
        let record = Self::local(string.block(), string.record())?;
        self.arena.string_bytes(record)
    }

    fn string_bytes_mut(&mut self, string: StringHandle) -> PoolResult<&mut [u8]> {
        let record = Self::local(string.block(), string.record())?;
        self.arena.string_bytes_mut(record)
    }

    fn size(&self) -> usize {
        self.arena.size()
    }

    fn clear(&mut self) {
        self.arena.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::POINTER_SIZE;

    #[test]
    fn test_capacity_is_padded() {
        let pool: FixedPool<u8> = FixedPool::new(0).unwrap();
        assert_eq!(pool.capacity(), POINTER_SIZE);

        let pool: FixedPool<u8> = FixedPool::new(POINTER_SIZE + 1).unwrap();
        assert_eq!(pool.capacity(), 2 * POINTER_SIZE);
    }

    #[test]
    fn test_foreign_block_rejected() {
        let mut pool: FixedPool<u64> = FixedPool::new(256).unwrap();
        let slot = pool.alloc_variant().unwrap();
        let foreign = SlotHandle::new(3, slot.record());

        assert_eq!(pool.variant(foreign), Err(PoolError::ForeignBlock { block: 3 }));
        assert_eq!(
            pool.free_string(StringHandle::new(1, RecordRef::new(0, 0))),
            Err(PoolError::ForeignBlock { block: 1 })
        );
    }

    #[test]
    fn test_expand_string_always_fails() {
        let mut pool: FixedPool<u64> = FixedPool::new(256).unwrap();
        let string = pool.alloc_expandable_string().unwrap();

        assert!(pool.expand_string(string).unwrap_err().is_out_of_memory());
        // The string is still usable afterwards.
        pool.try_append(string, b'a').unwrap();
        pool.freeze_string(string).unwrap();
        assert_eq!(pool.string_bytes(string).unwrap(), b"a");
    }

    #[test]
    fn test_from_config() {
        let pool: FixedPool<u64> = FixedPool::from_config(&PoolConfig::embedded()).unwrap();
        assert_eq!(pool.capacity(), 256);
    }
}
