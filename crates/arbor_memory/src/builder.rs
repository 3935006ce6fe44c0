//! # String Builder
//!
//! Sequential construction of a pool string whose length is not known up
//! front, such as a token being read by a parser.

use std::mem;

use crate::error::{PoolError, PoolResult};
use crate::handle::StringHandle;
use crate::pool::MemoryPool;

/// Appends bytes to an expandable pool string, then freezes it.
///
/// The first failure is sticky: later appends do nothing, the partial
/// string is released, and [`StringBuilder::complete`] returns the error.
///
/// # Example
///
/// ```rust
/// use arbor_memory::{FixedPool, MemoryPool};
///
/// let mut pool: FixedPool<u64> = FixedPool::new(128)?;
/// let mut builder = pool.start_string();
/// builder.append_str("key");
/// builder.append(b'!');
/// let key = builder.complete()?;
///
/// assert_eq!(pool.string_bytes(key)?, b"key!");
/// # Ok::<(), arbor_memory::PoolError>(())
/// ```
pub struct StringBuilder<'a, P: MemoryPool> {
    pool: &'a mut P,
    string: PoolResult<StringHandle>,
}

impl<'a, P: MemoryPool> StringBuilder<'a, P> {
    /// Starts an empty expandable string in `pool`.
    pub fn new(pool: &'a mut P) -> Self {
        let string = pool.alloc_expandable_string();
        Self { pool, string }
    }

    /// Appends one byte, relocating the string when the pool can.
    pub fn append(&mut self, byte: u8) {
        let Ok(&string) = self.string.as_ref() else {
            return;
        };
        let err = match self.pool.try_append(string, byte) {
            Ok(()) => return,
            Err(err) if err.is_out_of_memory() => match self.pool.expand_string(string) {
                Ok(moved) => {
                    // The old handle died with the move.
                    self.string = Ok(moved);
                    match self.pool.try_append(moved, byte) {
                        Ok(()) => return,
                        Err(err) => err,
                    }
                }
                Err(err) => err,
            },
            Err(err) => err,
        };
        self.fail(err);
    }

    /// Appends every byte of `bytes`.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.string.is_err() {
                return;
            }
            self.append(byte);
        }
    }

    /// Appends a UTF-8 string.
    #[inline]
    pub fn append_str(&mut self, text: &str) {
        self.append_bytes(text.as_bytes());
    }

    /// The error that stopped the build, if any.
    #[must_use]
    pub fn error(&self) -> Option<&PoolError> {
        self.string.as_ref().err()
    }

    /// Bytes appended so far, empty after a failure.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.string {
            Ok(string) => self.pool.string_bytes(*string).unwrap_or_default(),
            Err(_) => &[],
        }
    }

    /// Freezes the string and returns its handle.
    ///
    /// # Errors
    ///
    /// The first error met while building.
    pub fn complete(self) -> PoolResult<StringHandle> {
        let string = self.string?;
        self.pool.freeze_string(string)?;
        Ok(string)
    }

    /// Records `err` and releases the string the pool still holds.
    fn fail(&mut self, err: PoolError) {
        if let Ok(string) = mem::replace(&mut self.string, Err(err)) {
            let released = self.pool.free_string(string);
            debug_assert!(released.is_ok(), "partial string was not live: {released:?}");
        }
    }
}
