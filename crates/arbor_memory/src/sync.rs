//! # Shared Pools
//!
//! Pools are single-owner. To share one between threads, put the whole
//! pool behind one lock; every operation then runs with exclusive access.

use parking_lot::Mutex;

use crate::pool::MemoryPool;

/// A pool behind a `parking_lot` mutex.
///
/// # Example
///
/// ```rust
/// use arbor_memory::{FixedPool, LockedPool, MemoryPool};
///
/// let shared = LockedPool::new(FixedPool::<u64>::new(256)?);
/// let slot = shared.with(|pool| pool.alloc_variant())?;
/// assert_eq!(shared.with(|pool| pool.variant(slot).copied())?, 0);
/// # Ok::<(), arbor_memory::PoolError>(())
/// ```
#[derive(Debug)]
pub struct LockedPool<P> {
    pool: Mutex<P>,
}

impl<P: MemoryPool> LockedPool<P> {
    /// Wraps `pool`.
    pub fn new(pool: P) -> Self {
        Self {
            pool: Mutex::new(pool),
        }
    }

    /// Runs `f` with exclusive access to the pool.
    pub fn with<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let mut pool = self.pool.lock();
        f(&mut pool)
    }

    /// Live bytes of the wrapped pool.
    pub fn size(&self) -> usize {
        self.pool.lock().size()
    }

    /// Unwraps the pool.
    pub fn into_inner(self) -> P {
        self.pool.into_inner()
    }
}
