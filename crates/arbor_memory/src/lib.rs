//! # ARBOR Memory
//!
//! Memory pools for a tree of variant values on memory-constrained targets.
//!
//! - Fixed-size **slots** (tree nodes) are address-stable: a slot handle
//!   names the same record until the slot is freed
//! - Variable-length **strings** are relocatable: freeing one compacts the
//!   string region, and handles follow their string
//!
//! ## Architecture
//!
//! 1. [`Arena`]: one byte region, strings bump up from the bottom and
//!    records bump down from the top
//! 2. [`FixedPool`]: a single arena of fixed capacity
//! 3. [`GrowablePool`]: a chain of arenas that double in size
//! 4. [`MemoryPool`]: the contract the tree layer allocates through
//!
//! ## Example
//!
//! ```rust
//! use arbor_memory::{GrowablePool, MemoryPool};
//!
//! let mut pool: GrowablePool<[u64; 2]> = GrowablePool::new();
//! let node = pool.alloc_variant()?;
//! let name = pool.save_string(b"temperature")?;
//!
//! pool.free_string(name)?;
//! pool.free_variant(node)?;
//! assert_eq!(pool.size(), 0);
//! # Ok::<(), arbor_memory::PoolError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod alignment;
mod arena;
mod builder;
mod config;
mod error;
mod free_list;
mod handle;
mod pool;
mod sync;

pub use alignment::{add_padding, record_size, string_footprint, POINTER_SIZE};
pub use arena::Arena;
pub use builder::StringBuilder;
pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use free_list::FreeList;
pub use handle::{RecordKind, RecordRef, SlotHandle, StringHandle};
pub use pool::{
    BlockAllocator, FixedPool, GrowablePool, HeapAllocator, MemoryPool, DEFAULT_POOL_SIZE,
};
pub use sync::LockedPool;
