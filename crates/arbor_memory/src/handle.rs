//! # Handles
//!
//! Callers never see raw addresses. A handle carries three things:
//! - A 32-bit byte offset of the record inside its arena
//! - A 16-bit index of the arena (block) inside its pool
//! - A 32-bit generation counter for detecting stale handles
//!
//! The offset plays the role of an address: it is pointer-aligned, never
//! changes while the record is live, and is handed out again when the record
//! is recycled. The generation of a position only ever grows, and a position
//! whose generation runs out is never handed out again, so no two handles to
//! different lives of one position compare equal.
//!
//! Packed as bits (see `to_bits`):
//! - Bits 0..32: offset
//! - Bits 32..48: block
//! - Bits 48..80: generation

use std::fmt;

/// Position of one record inside one arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordRef {
    offset: u32,
    generation: u32,
}

impl RecordRef {
    #[inline]
    pub(crate) const fn new(offset: u32, generation: u32) -> Self {
        Self { offset, generation }
    }

    /// Byte offset of the record from the start of its arena.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset as usize
    }

    /// Generation the record had when this reference was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

macro_rules! packed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            record: RecordRef,
            block: u16,
        }

        impl $name {
            /// Joins a block index and a record position into a handle.
            #[inline]
            #[must_use]
            pub const fn new(block: u16, record: RecordRef) -> Self {
                Self { record, block }
            }

            /// Index of the block that owns the record.
            #[inline]
            #[must_use]
            pub const fn block(self) -> u16 {
                self.block
            }

            /// Byte offset of the record inside its block.
            #[inline]
            #[must_use]
            pub const fn offset(self) -> usize {
                self.record.offset()
            }

            /// Generation counter captured at allocation time.
            #[inline]
            #[must_use]
            pub const fn generation(self) -> u32 {
                self.record.generation
            }

            /// The block-local part of the handle.
            #[inline]
            #[must_use]
            pub const fn record(self) -> RecordRef {
                self.record
            }

            /// Packed representation.
            #[inline]
            #[must_use]
            pub const fn to_bits(self) -> u128 {
                ((self.record.generation as u128) << 48)
                    | ((self.block as u128) << 32)
                    | self.record.offset as u128
            }

            /// Rebuilds a handle from [`Self::to_bits`]. Bits above 80 are
            /// ignored.
            #[inline]
            #[must_use]
            pub const fn from_bits(bits: u128) -> Self {
                Self {
                    record: RecordRef::new(bits as u32, (bits >> 48) as u32),
                    block: (bits >> 32) as u16,
                }
            }
        }
    };
}

packed_handle! {
    /// Handle to a fixed-size slot record.
    ///
    /// The offset never changes while the slot is live, so the tree layer may
    /// keep the handle for the slot's whole lifetime.
    SlotHandle
}

packed_handle! {
    /// Handle to a string record.
    ///
    /// The handle points at the string's header, which never moves. The
    /// string's bytes may be relocated by compaction; always re-fetch them
    /// through the pool.
    StringHandle
}

/// What a record position currently holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// On a free list, waiting for reuse.
    Free,
    /// A live tree slot.
    Slot,
    /// A live string header.
    String,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Free => "free record",
            Self::Slot => "slot",
            Self::String => "string",
        };
        f.write_str(name)
    }
}
