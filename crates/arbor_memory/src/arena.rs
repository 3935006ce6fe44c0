//! # Arena
//!
//! One contiguous byte region shared by two bump pointers.
//!
//! ```text
//! 0                                      capacity
//! v                                            v
//! +-------------+----------------+-------------+
//! | strings...  |     (free)     |  ...records |
//! +-------------+----------------+-------------+
//!               ^                ^
//!             left             right
//! ```
//!
//! Strings are carved front-to-back from `left`, records (tree slots and
//! string headers) back-to-front from `right`. Records never move while
//! live. String bytes do: freeing a string closes its hole by shifting
//! everything above it down, and the headers of the shifted strings are
//! rewritten. Handles point at headers, so they survive the move.
//!
//! ## Invariants
//!
//! - `0 <= left <= right <= capacity`, all multiples of the pointer size
//! - `records.len() * RECORD_SIZE == capacity - right`
//! - Record `i` sits at offset `capacity - (i + 1) * RECORD_SIZE`
//! - Live string byte ranges tile `[0, left)` in offset order
//!
//! ## Generations
//!
//! Every record position carries a generation that only grows: by one when
//! the record is freed, by two when the arena is cleared. A handle is valid
//! while its generation matches. A position whose generation reaches
//! `u32::MAX` is retired: allocation skips it and never hands it out again,
//! so an old handle can never alias a new record.

use std::fmt;
use std::mem;

use crate::alignment::{add_padding, checked_padding, record_size, POINTER_SIZE};
use crate::error::{PoolError, PoolResult};
use crate::free_list::FreeList;
use crate::handle::{RecordKind, RecordRef};
use crate::pool::{BlockAllocator, HeapAllocator};

/// Generation of a position that may no longer be handed out.
const RETIRED_GENERATION: u32 = u32::MAX;

/// Header of a string living in the left region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StringRecord {
    /// Byte offset of the first character.
    offset: usize,
    /// Bytes written so far.
    len: usize,
    /// Still growing through `extend_string`.
    expandable: bool,
}

impl StringRecord {
    /// One past the padded end of the string's bytes.
    #[inline]
    const fn end(&self) -> usize {
        self.offset + add_padding(self.len)
    }
}

/// Contents of one record position on the right side.
enum Record<S> {
    Free,
    Slot(S),
    String(StringRecord),
}

impl<S> Record<S> {
    const fn kind(&self) -> RecordKind {
        match self {
            Self::Free => RecordKind::Free,
            Self::Slot(_) => RecordKind::Slot,
            Self::String(_) => RecordKind::String,
        }
    }
}

/// A dual bump-pointer arena holding slots of type `S` and strings.
///
/// The byte region is a word buffer, so every offset that is a multiple of
/// the pointer size is also a pointer-aligned address.
///
/// # Thread Safety
///
/// Not synchronised. Wrap the owning pool in [`crate::LockedPool`] to share
/// it.
///
/// # Example
///
/// ```rust
/// use arbor_memory::Arena;
///
/// let mut arena: Arena<u64> = Arena::with_capacity(256)?;
/// let slot = arena.alloc_slot()?;
/// *arena.slot_mut(slot)? = 42;
///
/// let name = arena.alloc_frozen_string(5)?;
/// arena.string_bytes_mut(name)?.copy_from_slice(b"hello");
/// assert_eq!(arena.string_bytes(name)?, b"hello");
/// # Ok::<(), arbor_memory::PoolError>(())
/// ```
pub struct Arena<S> {
    /// Backing storage, viewed as bytes through `bytemuck`.
    storage: Box<[usize]>,
    /// Capacity in bytes.
    capacity: usize,
    /// End of the string region.
    left: usize,
    /// Start of the record region.
    right: usize,
    /// Record contents, nearest-to-`capacity` first.
    records: Vec<Record<S>>,
    /// Generation of every record position the arena can ever hold.
    generations: Box<[u32]>,
    /// Claimed positions that are retired.
    retired: usize,
    /// Recycled slot records.
    free_slots: FreeList,
    /// Recycled string headers.
    free_strings: FreeList,
}

impl<S> Arena<S> {
    /// Bytes taken by one slot or string header.
    pub const RECORD_SIZE: usize = record_size::<S>();

    /// Creates an arena over `storage`.
    ///
    /// # Errors
    ///
    /// [`PoolError::CapacityExceeded`] if the buffer is too large for 32-bit
    /// offsets.
    pub fn new(storage: Box<[usize]>) -> PoolResult<Self> {
        Self::with_generation(storage, 0)
    }

    /// Creates an arena whose records start at `generation`.
    ///
    /// A pool that replaces its arenas passes [`Self::next_generation`] of
    /// the arena being replaced, so that handles into the old one read as
    /// stale rather than valid.
    ///
    /// # Errors
    ///
    /// [`PoolError::CapacityExceeded`] if the buffer is too large for 32-bit
    /// offsets.
    pub fn with_generation(storage: Box<[usize]>, generation: u32) -> PoolResult<Self> {
        let capacity = storage.len() * POINTER_SIZE;
        if u32::try_from(capacity).is_err() {
            return Err(PoolError::CapacityExceeded {
                requested: capacity,
                capacity: u32::MAX as usize,
            });
        }

        let max_records = capacity / Self::RECORD_SIZE;
        Ok(Self {
            storage,
            capacity,
            left: 0,
            right: capacity,
            records: Vec::with_capacity(max_records),
            generations: vec![generation; max_records].into_boxed_slice(),
            retired: 0,
            free_slots: FreeList::new(Self::RECORD_SIZE, max_records),
            free_strings: FreeList::new(Self::RECORD_SIZE, max_records),
        })
    }

    /// Creates an arena with its own zeroed buffer of at least `bytes`.
    ///
    /// # Errors
    ///
    /// [`PoolError::CapacityExceeded`] if `bytes` does not fit 32-bit
    /// offsets, [`PoolError::OutOfMemory`] if the heap cannot supply the
    /// buffer. Nothing is allocated before the size is checked.
    pub fn with_capacity(bytes: usize) -> PoolResult<Self> {
        let padded = checked_padding(bytes)
            .filter(|padded| u32::try_from(*padded).is_ok())
            .ok_or(PoolError::CapacityExceeded {
                requested: bytes,
                capacity: u32::MAX as usize,
            })?;
        let storage = HeapAllocator
            .allocate(padded / POINTER_SIZE)
            .ok_or(PoolError::OutOfMemory {
                requested: padded,
                available: 0,
            })?;
        Self::new(storage)
    }

    /// Gives the backing buffer back, discarding every record.
    #[must_use]
    pub fn into_storage(self) -> Box<[usize]> {
        self.storage
    }

    /// Total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// End of the string region.
    #[inline]
    #[must_use]
    pub const fn left(&self) -> usize {
        self.left
    }

    /// Start of the record region.
    #[inline]
    #[must_use]
    pub const fn right(&self) -> usize {
        self.right
    }

    /// Bytes between the two regions.
    #[inline]
    #[must_use]
    pub const fn free_bytes(&self) -> usize {
        self.right - self.left
    }

    /// Bytes claimed by either bump pointer, free-listed records included.
    #[inline]
    #[must_use]
    pub const fn allocated_bytes(&self) -> usize {
        self.left + (self.capacity - self.right)
    }

    /// Live bytes: everything claimed minus what sits on the free lists and
    /// in retired positions.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.allocated_bytes()
            - self.free_slots.size()
            - self.free_strings.size()
            - self.retired * Self::RECORD_SIZE
    }

    /// Returns `true` if `bytes` more can be bump-allocated.
    #[inline]
    #[must_use]
    pub fn can_alloc(&self, bytes: usize) -> bool {
        self.left
            .checked_add(bytes)
            .is_some_and(|end| end <= self.right)
    }

    /// Returns `true` if `record` names a live record of this arena.
    #[must_use]
    pub fn owns(&self, record: RecordRef) -> bool {
        self.locate(record).is_ok()
    }

    /// A generation that every handle issued by this arena reads as stale
    /// against, rather than as a double free.
    #[must_use]
    pub fn next_generation(&self) -> u32 {
        self.generations
            .iter()
            .max()
            .map_or(0, |newest| newest.saturating_add(2))
    }

    /// Number of claimed positions retired for good.
    #[inline]
    #[must_use]
    pub const fn retired_count(&self) -> usize {
        self.retired
    }

    /// Returns `true` if a freed slot is waiting for reuse.
    #[inline]
    #[must_use]
    pub fn has_recycled_slot(&self) -> bool {
        !self.free_slots.is_empty()
    }

    /// Number of live slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record, Record::Slot(_)))
            .count()
    }

    /// Number of live strings.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record, Record::String(_)))
            .count()
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// Allocates a slot holding `S::default()`.
    ///
    /// The most recently freed slot is reused first.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfMemory`] when no record fits between the regions.
    pub fn alloc_slot(&mut self) -> PoolResult<RecordRef>
    where
        S: Default,
    {
        let index = match self.free_slots.pop() {
            Some(index) => index as usize,
            None => self.alloc_right()?,
        };
        self.records[index] = Record::Slot(S::default());
        Ok(self.record_ref(index))
    }

    /// Releases one slot and returns what it held.
    ///
    /// Only this record is released. Slots it links to are the caller's
    /// business.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live slot of this arena.
    pub fn free_slot(&mut self, record: RecordRef) -> PoolResult<S> {
        let index = self.locate(record)?;
        match mem::replace(&mut self.records[index], Record::Free) {
            Record::Slot(value) => {
                if self.retire(index) {
                    self.free_slots.push(index as u32);
                }
                Ok(value)
            }
            other => {
                let found = other.kind();
                self.records[index] = other;
                Err(PoolError::WrongKind {
                    offset: record.offset(),
                    expected: RecordKind::Slot,
                    found,
                })
            }
        }
    }

    /// Reads a slot.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live slot of this arena.
    pub fn slot(&self, record: RecordRef) -> PoolResult<&S> {
        let index = self.locate(record)?;
        match &self.records[index] {
            Record::Slot(value) => Ok(value),
            other => Err(Self::wrong_kind(record, RecordKind::Slot, other)),
        }
    }

    /// Mutates a slot in place.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live slot of this arena.
    pub fn slot_mut(&mut self, record: RecordRef) -> PoolResult<&mut S> {
        let index = self.locate(record)?;
        match &mut self.records[index] {
            Record::Slot(value) => Ok(value),
            other => Err(Self::wrong_kind(record, RecordKind::Slot, other)),
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Reserves exactly `len` bytes for a string of known length.
    ///
    /// Nothing is claimed unless both the header and the bytes fit.
    ///
    /// # Errors
    ///
    /// [`PoolError::CapacityExceeded`] if the string could not fit even in
    /// an empty arena, [`PoolError::OutOfMemory`] otherwise.
    pub fn alloc_frozen_string(&mut self, len: usize) -> PoolResult<RecordRef> {
        let footprint = checked_padding(len)
            .and_then(|bytes| bytes.checked_add(Self::RECORD_SIZE))
            .ok_or(PoolError::CapacityExceeded {
                requested: len,
                capacity: self.capacity,
            })?;
        let bytes = footprint - Self::RECORD_SIZE;
        if self.free_strings.is_empty() {
            self.skip_retired();
        }
        let needed = bytes + self.header_cost();
        if !self.can_alloc(needed) {
            return Err(self.exhausted(needed, footprint));
        }

        let index = self.take_string_header()?;
        let offset = self.left;
        self.left += bytes;
        self.records[index] = Record::String(StringRecord {
            offset,
            len,
            expandable: false,
        });
        Ok(self.record_ref(index))
    }

    /// Starts a string whose final length is unknown.
    ///
    /// The string owns no bytes yet; it may grow through
    /// [`Self::extend_string`] into whatever space remains.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutOfMemory`] if no header fits.
    pub fn alloc_expandable_string(&mut self) -> PoolResult<RecordRef> {
        if self.free_strings.is_empty() {
            self.skip_retired();
        }
        let needed = self.header_cost();
        if !self.can_alloc(needed) {
            return Err(self.exhausted(needed, Self::RECORD_SIZE));
        }

        let index = self.take_string_header()?;
        self.records[index] = Record::String(StringRecord {
            offset: self.left,
            len: 0,
            expandable: true,
        });
        Ok(self.record_ref(index))
    }

    /// Appends one byte to an expandable string.
    ///
    /// # Errors
    ///
    /// See [`Self::extend_string`].
    #[inline]
    pub fn append(&mut self, record: RecordRef, byte: u8) -> PoolResult<()> {
        self.extend_string(record, &[byte])
    }

    /// Appends `bytes` to an expandable string.
    ///
    /// The string grows inside its own padding or, when it is the last
    /// string of the region, into the free space. `left` follows the padded
    /// length, so records allocated between two appends never overlap it.
    ///
    /// # Errors
    ///
    /// [`PoolError::FrozenString`] for frozen strings;
    /// [`PoolError::OutOfMemory`] when the string cannot grow in place
    /// (no room, or another string was allocated after it). Nothing is
    /// written on failure.
    pub fn extend_string(&mut self, record: RecordRef, bytes: &[u8]) -> PoolResult<()> {
        let (index, string) = self.string_at(record)?;
        if !string.expandable {
            return Err(PoolError::FrozenString {
                offset: record.offset(),
            });
        }

        let len = string.len + bytes.len();
        let end = string.offset + add_padding(len);
        if end > string.end() {
            if string.end() != self.left || end > self.right {
                let growth = end - string.end();
                return Err(self.exhausted(growth, add_padding(len) + Self::RECORD_SIZE));
            }
            self.left = end;
        }

        let start = string.offset + string.len;
        self.bytes_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        self.records[index] = Record::String(StringRecord { len, ..string });
        Ok(())
    }

    /// Fixes an expandable string at its current length.
    ///
    /// `left` already sits at the padded end of the string, so there is no
    /// tail to give back. Freezing a frozen string does nothing.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn freeze_string(&mut self, record: RecordRef) -> PoolResult<()> {
        let (index, string) = self.string_at(record)?;
        self.records[index] = Record::String(StringRecord {
            expandable: false,
            ..string
        });
        Ok(())
    }

    /// Releases a string and compacts the string region.
    ///
    /// Every string above the hole moves down by the hole's size. Their
    /// handles stay valid; previously borrowed byte slices do not.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn free_string(&mut self, record: RecordRef) -> PoolResult<()> {
        let (index, string) = self.string_at(record)?;
        self.records[index] = Record::Free;
        if self.retire(index) {
            self.free_strings.push(index as u32);
        }

        self.compact(string.offset, string.end() - string.offset);
        self.reclaim_boundary();
        Ok(())
    }

    /// Bytes of a string.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn string_bytes(&self, record: RecordRef) -> PoolResult<&[u8]> {
        let (_, string) = self.string_at(record)?;
        Ok(&self.bytes()[string.offset..string.offset + string.len])
    }

    /// Mutable bytes of a string.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn string_bytes_mut(&mut self, record: RecordRef) -> PoolResult<&mut [u8]> {
        let (_, string) = self.string_at(record)?;
        Ok(&mut self.bytes_mut()[string.offset..string.offset + string.len])
    }

    /// Current byte offset of a string's first character.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn string_offset(&self, record: RecordRef) -> PoolResult<usize> {
        self.string_at(record).map(|(_, string)| string.offset)
    }

    /// Length of a string in bytes.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn string_len(&self, record: RecordRef) -> PoolResult<usize> {
        self.string_at(record).map(|(_, string)| string.len)
    }

    /// Bytes the string may occupy without moving: the free space above it
    /// when it is still expandable and topmost, its padded length otherwise.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn string_capacity(&self, record: RecordRef) -> PoolResult<usize> {
        let (_, string) = self.string_at(record)?;
        if string.expandable && string.end() == self.left {
            Ok(self.right - string.offset)
        } else {
            Ok(add_padding(string.len))
        }
    }

    /// Returns `true` while the string may still grow.
    ///
    /// # Errors
    ///
    /// Any handle error if `record` is not a live string of this arena.
    pub fn is_expandable(&self, record: RecordRef) -> PoolResult<bool> {
        self.string_at(record).map(|(_, string)| string.expandable)
    }

    /// Discards every record and string.
    ///
    /// Handles issued before the call become stale. Retired positions stay
    /// retired.
    pub fn clear(&mut self) {
        for (index, record) in self.records.iter().enumerate() {
            if !matches!(record, Record::Free) {
                self.generations[index] = self.generations[index].saturating_add(2);
            }
        }
        self.retired = 0;
        self.records.clear();
        self.free_slots.clear();
        self.free_strings.clear();
        self.left = 0;
        self.right = self.capacity;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.storage)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.storage)
    }

    /// Offset of record position `index`.
    #[inline]
    const fn offset_of(&self, index: usize) -> usize {
        self.capacity - (index + 1) * Self::RECORD_SIZE
    }

    #[inline]
    fn record_ref(&self, index: usize) -> RecordRef {
        // capacity fits in u32 (checked in `new`)
        RecordRef::new(self.offset_of(index) as u32, self.generations[index])
    }

    /// Moves a freed position to its next generation. Returns `false` once
    /// the position is retired.
    #[inline]
    fn retire(&mut self, index: usize) -> bool {
        let generation = self.generations[index].saturating_add(1);
        self.generations[index] = generation;
        if generation == RETIRED_GENERATION {
            self.retired += 1;
            tracing::trace!(index, "retired record position");
            false
        } else {
            true
        }
    }

    /// Bytes a new string header will take from the free space.
    #[inline]
    fn header_cost(&self) -> usize {
        if self.free_strings.is_empty() {
            Self::RECORD_SIZE
        } else {
            0
        }
    }

    fn exhausted(&self, needed: usize, footprint: usize) -> PoolError {
        if footprint > self.capacity {
            PoolError::CapacityExceeded {
                requested: footprint,
                capacity: self.capacity,
            }
        } else {
            PoolError::OutOfMemory {
                requested: needed,
                available: self.free_bytes(),
            }
        }
    }

    /// Claims one record position at `right`.
    fn alloc_right(&mut self) -> PoolResult<usize> {
        self.skip_retired();
        if !self.can_alloc(Self::RECORD_SIZE) {
            return Err(self.exhausted(Self::RECORD_SIZE, Self::RECORD_SIZE));
        }
        self.right -= Self::RECORD_SIZE;
        self.records.push(Record::Free);
        Ok(self.records.len() - 1)
    }

    /// Moves `right` past retired positions so the next one claimed is
    /// usable.
    fn skip_retired(&mut self) {
        while self
            .generations
            .get(self.records.len())
            .is_some_and(|generation| *generation == RETIRED_GENERATION)
            && self.can_alloc(Self::RECORD_SIZE)
        {
            self.right -= Self::RECORD_SIZE;
            self.records.push(Record::Free);
            self.retired += 1;
        }
    }

    fn take_string_header(&mut self) -> PoolResult<usize> {
        match self.free_strings.pop() {
            Some(index) => Ok(index as usize),
            None => self.alloc_right(),
        }
    }

    /// Maps a record reference to its position, checking generation.
    fn locate(&self, record: RecordRef) -> PoolResult<usize> {
        let offset = record.offset();
        let distance = self
            .capacity
            .checked_sub(offset)
            .filter(|distance| *distance > 0 && distance % Self::RECORD_SIZE == 0)
            .ok_or(PoolError::InvalidHandle { offset })?;
        let index = distance / Self::RECORD_SIZE - 1;
        let current = *self
            .generations
            .get(index)
            .ok_or(PoolError::InvalidHandle { offset })?;

        if current == record.generation() && current != RETIRED_GENERATION {
            return if index < self.records.len() {
                Ok(index)
            } else {
                Err(PoolError::InvalidHandle { offset })
            };
        }

        let freed = self
            .records
            .get(index)
            .map_or(true, |slot| matches!(slot, Record::Free));
        if freed && record.generation().checked_add(1) == Some(current) {
            Err(PoolError::DoubleFree { offset })
        } else {
            Err(PoolError::StaleHandle {
                offset,
                generation: record.generation(),
            })
        }
    }

    fn string_at(&self, record: RecordRef) -> PoolResult<(usize, StringRecord)> {
        let index = self.locate(record)?;
        match &self.records[index] {
            Record::String(string) => Ok((index, *string)),
            other => Err(Self::wrong_kind(record, RecordKind::String, other)),
        }
    }

    fn wrong_kind(record: RecordRef, expected: RecordKind, found: &Record<S>) -> PoolError {
        PoolError::WrongKind {
            offset: record.offset(),
            expected,
            found: found.kind(),
        }
    }

    /// Closes the hole `[hole_start, hole_start + hole_size)` in the string
    /// region and rewrites the headers of every string above it.
    fn compact(&mut self, hole_start: usize, hole_size: usize) {
        if hole_size == 0 {
            return;
        }
        let hole_end = hole_start + hole_size;
        let left = self.left;
        self.bytes_mut().copy_within(hole_end..left, hole_start);
        self.left -= hole_size;

        for record in &mut self.records {
            if let Record::String(string) = record {
                if string.offset >= hole_end {
                    string.offset -= hole_size;
                }
            }
        }
        tracing::trace!(hole_start, hole_size, left = self.left, "compacted string region");
    }

    /// Gives free string headers and retired positions sitting at `right`
    /// back to the free space.
    fn reclaim_boundary(&mut self) {
        while let Some(last) = self.records.len().checked_sub(1) {
            if !matches!(self.records[last], Record::Free) {
                break;
            }
            if self.generations[last] == RETIRED_GENERATION {
                self.retired -= 1;
            } else if !self.free_strings.remove(last as u32) {
                break;
            }
            self.records.pop();
            self.right += Self::RECORD_SIZE;
        }
    }
}

impl<S> fmt::Debug for Arena<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("left", &self.left)
            .field("right", &self.right)
            .field("records", &self.records.len())
            .field("free_slots", &self.free_slots.len())
            .field("free_strings", &self.free_strings.len())
            .field("retired", &self.retired)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestArena = Arena<[u64; 2]>;

    const RECORD: usize = TestArena::RECORD_SIZE;

    fn frozen(arena: &mut TestArena, text: &[u8]) -> RecordRef {
        let record = arena.alloc_frozen_string(text.len()).unwrap();
        arena.string_bytes_mut(record).unwrap().copy_from_slice(text);
        record
    }

    #[test]
    fn test_slots_come_from_the_right() {
        let mut arena = TestArena::with_capacity(4 * RECORD).unwrap();
        let first = arena.alloc_slot().unwrap();
        let second = arena.alloc_slot().unwrap();

        assert_eq!(first.offset(), 3 * RECORD);
        assert_eq!(second.offset(), 2 * RECORD);
        assert_eq!(arena.right(), 2 * RECORD);
        assert_eq!(arena.left(), 0);
    }

    #[test]
    fn test_free_slot_returns_value_and_recycles() {
        let mut arena = TestArena::with_capacity(4 * RECORD).unwrap();
        let slot = arena.alloc_slot().unwrap();
        *arena.slot_mut(slot).unwrap() = [7, 9];

        assert_eq!(arena.free_slot(slot).unwrap(), [7, 9]);
        let again = arena.alloc_slot().unwrap();
        assert_eq!(again.offset(), slot.offset());
        assert_eq!(*arena.slot(again).unwrap(), [0, 0]);
    }

    #[test]
    fn test_double_free_is_reported() {
        let mut arena = TestArena::with_capacity(4 * RECORD).unwrap();
        let slot = arena.alloc_slot().unwrap();
        arena.free_slot(slot).unwrap();

        assert_eq!(
            arena.free_slot(slot),
            Err(PoolError::DoubleFree { offset: slot.offset() })
        );
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut arena = TestArena::with_capacity(4 * RECORD).unwrap();
        let old = arena.alloc_slot().unwrap();
        arena.free_slot(old).unwrap();
        let _new = arena.alloc_slot().unwrap();

        assert!(matches!(arena.slot(old), Err(PoolError::StaleHandle { .. })));
    }

    #[test]
    fn test_invalid_offsets_are_rejected() {
        let arena = TestArena::with_capacity(4 * RECORD).unwrap();
        assert_eq!(
            arena.slot(RecordRef::new(3, 0)),
            Err(PoolError::InvalidHandle { offset: 3 })
        );
        // Grid-aligned but never allocated.
        let unused = (3 * RECORD) as u32;
        assert!(matches!(
            arena.slot(RecordRef::new(unused, 0)),
            Err(PoolError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_wrong_kind() {
        let mut arena = TestArena::with_capacity(4 * RECORD).unwrap();
        let string = arena.alloc_frozen_string(3).unwrap();

        assert_eq!(
            arena.free_slot(string),
            Err(PoolError::WrongKind {
                offset: string.offset(),
                expected: RecordKind::Slot,
                found: RecordKind::String,
            })
        );
        // The failed free left the string alone.
        assert_eq!(arena.string_len(string), Ok(3));
    }

    #[test]
    fn test_frozen_string_layout() {
        let mut arena = TestArena::with_capacity(128).unwrap();
        let a = frozen(&mut arena, b"hi");
        let b = frozen(&mut arena, b"there");

        assert_eq!(arena.string_offset(a), Ok(0));
        assert_eq!(arena.string_offset(b), Ok(POINTER_SIZE));
        assert_eq!(arena.left(), 2 * POINTER_SIZE);
        assert_eq!(arena.size(), 2 * (POINTER_SIZE + RECORD));
    }

    #[test]
    fn test_oversized_frozen_string_claims_nothing() {
        let mut arena = TestArena::with_capacity(64).unwrap();
        let before = arena.size();

        assert!(matches!(
            arena.alloc_frozen_string(64),
            Err(PoolError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            arena.alloc_frozen_string(usize::MAX),
            Err(PoolError::CapacityExceeded { .. })
        ));
        assert_eq!(arena.size(), before);
        assert_eq!(arena.right(), 64);
    }

    #[test]
    fn test_compaction_moves_later_strings() {
        let mut arena = TestArena::with_capacity(256).unwrap();
        let a = frozen(&mut arena, b"hello");
        let b = frozen(&mut arena, b"world!");
        let c = frozen(&mut arena, b"0123456789");
        let old_b = arena.string_offset(b).unwrap();

        arena.free_string(a).unwrap();

        assert_eq!(arena.string_bytes(b).unwrap(), b"world!");
        assert_eq!(arena.string_bytes(c).unwrap(), b"0123456789");
        assert_eq!(arena.string_offset(b), Ok(old_b - POINTER_SIZE));
        assert_eq!(arena.left(), POINTER_SIZE + add_padding(10));
    }

    #[test]
    fn test_free_string_reclaims_boundary_header() {
        let mut arena = TestArena::with_capacity(256).unwrap();
        let string = frozen(&mut arena, b"transient");
        arena.free_string(string).unwrap();

        assert_eq!(arena.left(), 0);
        assert_eq!(arena.right(), 256);
        assert_eq!(arena.size(), 0);
    }

    #[test]
    fn test_buried_header_stays_on_free_list() {
        let mut arena = TestArena::with_capacity(256).unwrap();
        let string = frozen(&mut arena, b"key");
        let slot = arena.alloc_slot().unwrap();
        arena.free_string(string).unwrap();

        // The slot sits below the header, so the header cannot be reclaimed.
        assert_eq!(arena.right(), 256 - 2 * RECORD);
        assert_eq!(arena.size(), RECORD);

        // ...but the next string reuses it.
        let again = arena.alloc_frozen_string(1).unwrap();
        assert_eq!(again.offset(), string.offset());
        assert!(arena.owns(slot));
    }

    #[test]
    fn test_expandable_string_grows_and_freezes() {
        let mut arena = TestArena::with_capacity(128).unwrap();
        let string = arena.alloc_expandable_string().unwrap();
        assert_eq!(arena.string_capacity(string), Ok(128 - RECORD));

        for byte in b"abcdefghij" {
            arena.append(string, *byte).unwrap();
        }
        assert_eq!(arena.left(), add_padding(10));

        arena.freeze_string(string).unwrap();
        assert_eq!(arena.string_bytes(string).unwrap(), b"abcdefghij");
        assert_eq!(
            arena.append(string, b'!'),
            Err(PoolError::FrozenString { offset: string.offset() })
        );
    }

    #[test]
    fn test_expandable_string_stops_when_buried() {
        let mut arena = TestArena::with_capacity(128).unwrap();
        let string = arena.alloc_expandable_string().unwrap();
        arena.append(string, b'a').unwrap();
        let _other = frozen(&mut arena, b"x");

        // Growth inside the string's own padding is still fine.
        for byte in &b"bcdefgh"[..POINTER_SIZE - 1] {
            arena.append(string, *byte).unwrap();
        }
        assert!(matches!(
            arena.append(string, b'z'),
            Err(PoolError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn test_expandable_string_full_arena() {
        let mut arena = TestArena::with_capacity(RECORD + POINTER_SIZE).unwrap();
        let string = arena.alloc_expandable_string().unwrap();
        arena.extend_string(string, &[b'x'; POINTER_SIZE]).unwrap();

        assert!(arena.append(string, b'y').unwrap_err().is_out_of_memory());
        assert_eq!(arena.string_len(string), Ok(POINTER_SIZE));
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut arena = TestArena::with_capacity(128).unwrap();
        let slot = arena.alloc_slot().unwrap();
        let string = frozen(&mut arena, b"abc");

        arena.clear();

        assert_eq!(arena.size(), 0);
        assert!(arena.slot(slot).is_err());
        assert!(arena.string_bytes(string).is_err());
        let fresh = arena.alloc_slot().unwrap();
        assert_eq!(fresh.offset(), slot.offset());
        assert_ne!(fresh.generation(), slot.generation());
    }

    #[test]
    fn test_generation_seed_outdates_old_handles() {
        let mut old = TestArena::with_capacity(64).unwrap();
        let slot = old.alloc_slot().unwrap();
        old.free_slot(slot).unwrap();
        let live = old.alloc_slot().unwrap();

        let seed = old.next_generation();
        let mut fresh = TestArena::with_generation(old.into_storage(), seed).unwrap();
        let reissued = fresh.alloc_slot().unwrap();

        assert_eq!(reissued.offset(), live.offset());
        assert!(fresh.slot(live).is_err());
        assert!(fresh.slot(reissued).is_ok());
    }

    #[test]
    fn test_clear_reports_old_handles_as_stale() {
        let mut arena = TestArena::with_capacity(4 * RECORD).unwrap();
        arena.alloc_slot().unwrap();
        let second = arena.alloc_slot().unwrap();

        arena.clear();
        arena.alloc_slot().unwrap();

        assert!(matches!(
            arena.free_slot(second),
            Err(PoolError::StaleHandle { .. })
        ));
    }

    #[test]
    fn test_stale_handle_detected_past_u16_generations() {
        let mut arena = TestArena::with_capacity(4 * RECORD).unwrap();
        let stale = arena.alloc_slot().unwrap();
        arena.free_slot(stale).unwrap();

        let mut live = arena.alloc_slot().unwrap();
        for _ in 0..=u32::from(u16::MAX) {
            arena.free_slot(live).unwrap();
            live = arena.alloc_slot().unwrap();
        }
        *arena.slot_mut(live).unwrap() = [9, 9];

        assert_eq!(live.offset(), stale.offset());
        assert_ne!(live, stale);
        assert!(matches!(arena.slot(stale), Err(PoolError::StaleHandle { .. })));
        assert!(matches!(
            arena.free_slot(stale),
            Err(PoolError::StaleHandle { .. })
        ));
        assert_eq!(*arena.slot(live).unwrap(), [9, 9]);
    }

    #[test]
    fn test_exhausted_position_is_retired() {
        let storage = vec![0_usize; 4 * RECORD / POINTER_SIZE].into_boxed_slice();
        let mut arena = TestArena::with_generation(storage, u32::MAX - 2).unwrap();

        let first = arena.alloc_slot().unwrap();
        arena.free_slot(first).unwrap();
        let second = arena.alloc_slot().unwrap();
        assert_eq!(second.offset(), first.offset());
        arena.free_slot(second).unwrap();

        assert_eq!(arena.retired_count(), 1);
        assert_eq!(arena.size(), 0);

        let third = arena.alloc_slot().unwrap();
        assert_ne!(third.offset(), second.offset());
        assert_eq!(arena.size(), RECORD);
        assert_eq!(
            arena.free_slot(second),
            Err(PoolError::DoubleFree { offset: second.offset() })
        );
        assert!(matches!(arena.slot(first), Err(PoolError::StaleHandle { .. })));

        // Clearing pushes the live position past its last generation too.
        arena.clear();
        assert_eq!(arena.size(), 0);
        let fourth = arena.alloc_slot().unwrap();
        assert_eq!(fourth.offset(), RECORD);
        assert_eq!(arena.retired_count(), 2);
        assert_eq!(arena.size(), RECORD);
        assert!(arena.slot(third).is_err());
    }

    #[test]
    fn test_retired_header_at_boundary_is_reclaimed() {
        let storage = vec![0_usize; 4 * RECORD / POINTER_SIZE].into_boxed_slice();
        let mut arena = TestArena::with_generation(storage, u32::MAX - 1).unwrap();

        let string = frozen(&mut arena, b"gone");
        arena.free_string(string).unwrap();

        assert_eq!(arena.retired_count(), 0);
        assert_eq!(arena.right(), arena.capacity());
        assert_eq!(arena.size(), 0);
    }

    #[test]
    fn test_oversized_capacity_is_rejected_before_allocating() {
        assert!(matches!(
            TestArena::with_capacity(usize::MAX - 7),
            Err(PoolError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            TestArena::with_capacity(usize::MAX),
            Err(PoolError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_string_bytes_are_pointer_aligned() {
        let mut arena = TestArena::with_capacity(256).unwrap();
        for len in 1..=POINTER_SIZE {
            let string = arena.alloc_frozen_string(len).unwrap();
            let address = arena.string_bytes(string).unwrap().as_ptr() as usize;
            assert_eq!(address % POINTER_SIZE, 0);
        }
    }
}
