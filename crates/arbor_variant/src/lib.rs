//! # ARBOR Variant
//!
//! Tree nodes stored in ARBOR memory pools.
//!
//! This crate decides how slots link into arrays and objects; it never
//! allocates on its own. Every record comes from a
//! [`arbor_memory::MemoryPool`], and freeing a subtree means walking it here
//! and handing each slot back to the pool.
//!
//! ## Example
//!
//! ```rust
//! use arbor_memory::{FixedPool, MemoryPool};
//! use arbor_variant::{slot_free, slot_set_key, VariantData, VariantSlot};
//!
//! let mut pool: FixedPool<VariantSlot> = FixedPool::new(512)?;
//! let member = pool.alloc_variant()?;
//! pool.variant_mut(member)?.value = VariantData::Integer(21);
//! slot_set_key(&mut pool, member, b"answer")?;
//!
//! let object = pool.alloc_variant()?;
//! pool.variant_mut(object)?.value = VariantData::Object { head: Some(member) };
//!
//! slot_free(&mut pool, object)?;
//! assert_eq!(pool.size(), 0);
//! # Ok::<(), arbor_memory::PoolError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod functions;
mod slot;

pub use functions::{
    slot_advance, slot_free, slot_key, slot_set_key, slot_set_static_key, slot_size,
};
pub use slot::{SlotKey, VariantData, VariantSlot};
