//! # Pool Error Types
//!
//! All errors that can occur while allocating or releasing pool records.
//! Nothing in this crate panics on caller input: a failed request is
//! returned and leaves the pool exactly as it was.

use thiserror::Error;

use crate::handle::RecordKind;

/// Errors that can occur in the memory pools.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Not enough free space right now (free lists, arena and, for growable
    /// pools, a fresh block all failed).
    #[error("out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory {
        /// Bytes the request needed.
        requested: usize,
        /// Bytes that were free in the arena that refused it.
        available: usize,
    },

    /// The request could not be satisfied even by an empty pool.
    #[error("capacity exceeded: requested {requested} bytes, capacity is {capacity}")]
    CapacityExceeded {
        /// Bytes the request needed.
        requested: usize,
        /// Total capacity of the arena that refused it.
        capacity: usize,
    },

    /// The handle names a block this pool does not have.
    #[error("block {block} does not belong to this pool")]
    ForeignBlock {
        /// Block index carried by the handle.
        block: u16,
    },

    /// No record starts at this offset.
    #[error("no record starts at offset {offset}")]
    InvalidHandle {
        /// Offset carried by the handle.
        offset: usize,
    },

    /// The record was freed (and possibly reused) since the handle was issued.
    #[error("stale handle: record at offset {offset} is past generation {generation}")]
    StaleHandle {
        /// Offset carried by the handle.
        offset: usize,
        /// Generation carried by the handle.
        generation: u32,
    },

    /// The record was already released with this very handle.
    #[error("double free of record at offset {offset}")]
    DoubleFree {
        /// Offset carried by the handle.
        offset: usize,
    },

    /// The record holds something else than the operation expects.
    #[error("record at offset {offset} is a {found}, expected a {expected}")]
    WrongKind {
        /// Offset carried by the handle.
        offset: usize,
        /// Kind the operation works on.
        expected: RecordKind,
        /// Kind actually found.
        found: RecordKind,
    },

    /// Only expandable strings can grow.
    #[error("string at offset {offset} is frozen")]
    FrozenString {
        /// Offset of the string header.
        offset: usize,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PoolError {
    /// Returns `true` for the two exhaustion errors.
    ///
    /// A growable pool treats these as "try elsewhere"; every other error is
    /// a caller mistake and is passed straight through.
    #[inline]
    #[must_use]
    pub const fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::CapacityExceeded { .. })
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_classification() {
        assert!(PoolError::OutOfMemory { requested: 8, available: 0 }.is_out_of_memory());
        assert!(PoolError::CapacityExceeded { requested: 80, capacity: 64 }.is_out_of_memory());
        assert!(!PoolError::DoubleFree { offset: 48 }.is_out_of_memory());
    }

    #[test]
    fn test_wrong_kind_message() {
        let err = PoolError::WrongKind {
            offset: 16,
            expected: RecordKind::Slot,
            found: RecordKind::String,
        };
        assert_eq!(err.to_string(), "record at offset 16 is a string, expected a slot");
    }
}
