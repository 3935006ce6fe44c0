//! # Pools
//!
//! The surface the tree layer allocates through.
//!
//! Two flavors implement [`MemoryPool`]:
//! - [`FixedPool`]: one arena of fixed capacity, no growth
//! - [`GrowablePool`]: a chain of arenas, each twice the size of the last
//!
//! Consumers are generic over the trait, so either flavor compiles down to
//! direct calls.

mod allocator;
mod fixed;
mod growable;

pub use allocator::{BlockAllocator, HeapAllocator};
pub use fixed::FixedPool;
pub use growable::GrowablePool;

use crate::builder::StringBuilder;
use crate::error::PoolResult;
use crate::handle::{SlotHandle, StringHandle};

/// Default capacity in bytes of a pool built without configuration.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// The allocation contract shared by every pool flavor.
///
/// Slots are address-stable: a [`SlotHandle`] keeps naming the same record
/// until [`MemoryPool::free_variant`]. Strings are relocatable: a
/// [`StringHandle`] stays valid, but byte slices borrowed from it must be
/// re-fetched after any call that frees a string.
///
/// Every failure is returned. An exhausted pool yields an error for which
/// [`crate::PoolError::is_out_of_memory`] is `true`; the caller is expected to
/// abandon whatever it was building.
pub trait MemoryPool {
    /// Record type stored in each slot.
    type Slot;

    /// Allocates a slot holding `Self::Slot::default()`.
    ///
    /// # Errors
    ///
    /// Out-of-memory when no arena (and no new block) can hold it.
    fn alloc_variant(&mut self) -> PoolResult<SlotHandle>
    where
        Self::Slot: Default;

    /// Releases one slot and returns its contents.
    ///
    /// Only this record is released; freeing the slots it links to is the
    /// tree layer's job.
    ///
    /// # Errors
    ///
    /// Misuse errors (stale, foreign, double-freed or non-slot handle).
    fn free_variant(&mut self, slot: SlotHandle) -> PoolResult<Self::Slot>;

    /// Reads a slot.
    ///
    /// # Errors
    ///
    /// Misuse errors if `slot` is not live.
    fn variant(&self, slot: SlotHandle) -> PoolResult<&Self::Slot>;

    /// Mutates a slot in place.
    ///
    /// # Errors
    ///
    /// Misuse errors if `slot` is not live.
    fn variant_mut(&mut self, slot: SlotHandle) -> PoolResult<&mut Self::Slot>;

    /// Reserves exactly `len` bytes for a string.
    ///
    /// # Errors
    ///
    /// Out-of-memory if no single arena has `len` bytes free.
    fn alloc_frozen_string(&mut self, len: usize) -> PoolResult<StringHandle>;

    /// Starts an empty string that grows through [`MemoryPool::append`].
    ///
    /// # Errors
    ///
    /// Out-of-memory if not even the header fits.
    fn alloc_expandable_string(&mut self) -> PoolResult<StringHandle>;

    /// Appends one byte to an expandable string without relocating it.
    ///
    /// # Errors
    ///
    /// Out-of-memory when the string cannot grow where it is;
    /// [`crate::PoolError::FrozenString`] on a frozen string.
    fn try_append(&mut self, string: StringHandle, byte: u8) -> PoolResult<()>;

    /// Moves an expandable string somewhere it can grow by at least one byte.
    ///
    /// Returns the new handle; the old one is released.
    ///
    /// # Errors
    ///
    /// Out-of-memory when there is nowhere to go, which for a fixed pool is
    /// always.
    fn expand_string(&mut self, string: StringHandle) -> PoolResult<StringHandle>;

    /// Fixes an expandable string at its current length.
    ///
    /// # Errors
    ///
    /// Misuse errors if `string` is not live.
    fn freeze_string(&mut self, string: StringHandle) -> PoolResult<()>;

    /// Releases a string and compacts the arena that held it.
    ///
    /// # Errors
    ///
    /// Misuse errors if `string` is not live.
    fn free_string(&mut self, string: StringHandle) -> PoolResult<()>;

    /// Bytes of a string.
    ///
    /// # Errors
    ///
    /// Misuse errors if `string` is not live.
    fn string_bytes(&self, string: StringHandle) -> PoolResult<&[u8]>;

    /// Mutable bytes of a string.
    ///
    /// # Errors
    ///
    /// Misuse errors if `string` is not live.
    fn string_bytes_mut(&mut self, string: StringHandle) -> PoolResult<&mut [u8]>;

    /// Live bytes: allocated minus free-listed.
    fn size(&self) -> usize;

    /// Discards every record. All handles become stale.
    fn clear(&mut self);

    /// Appends one byte, relocating the string if it has run out of room.
    ///
    /// Returns the handle to keep using, which differs from `string` after a
    /// relocation.
    ///
    /// # Errors
    ///
    /// Out-of-memory when the string can neither grow nor move. If the
    /// write fails after a move, the moved copy is released too.
    fn append(&mut self, string: StringHandle, byte: u8) -> PoolResult<StringHandle> {
        match self.try_append(string, byte) {
            Ok(()) => Ok(string),
            Err(err) if err.is_out_of_memory() => {
                let moved = self.expand_string(string)?;
                if let Err(err) = self.try_append(moved, byte) {
                    self.free_string(moved)?;
                    return Err(err);
                }
                Ok(moved)
            }
            Err(err) => Err(err),
        }
    }

    /// Copies `bytes` into a new frozen string.
    ///
    /// # Errors
    ///
    /// Out-of-memory if no arena has room for them.
    fn save_string(&mut self, bytes: &[u8]) -> PoolResult<StringHandle> {
        let string = self.alloc_frozen_string(bytes.len())?;
        self.string_bytes_mut(string)?.copy_from_slice(bytes);
        Ok(string)
    }

    /// Starts building a string of unknown length.
    fn start_string(&mut self) -> StringBuilder<'_, Self>
    where
        Self: Sized,
    {
        StringBuilder::new(self)
    }
}
