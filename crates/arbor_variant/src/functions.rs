//! # Slot Functions
//!
//! Tree-side operations over slots. The pool only ever releases the single
//! record it is handed, so walking a subtree to free it happens here.

use arbor_memory::{MemoryPool, PoolResult, SlotHandle};

use crate::slot::{SlotKey, VariantData, VariantSlot};

/// Copies `key` into the pool and makes it the slot's key.
///
/// A previously pooled key is released. On failure the slot keeps its old
/// key.
///
/// # Errors
///
/// Out-of-memory if the key does not fit; misuse errors if `slot` is not
/// live.
pub fn slot_set_key<P>(pool: &mut P, slot: SlotHandle, key: &[u8]) -> PoolResult<()>
where
    P: MemoryPool<Slot = VariantSlot>,
{
    pool.variant(slot)?;
    let saved = pool.save_string(key)?;
    let previous = pool.variant_mut(slot)?.key.replace(SlotKey::Pooled(saved));
    release_key(pool, previous)
}

/// Makes a static string the slot's key without copying it.
///
/// # Errors
///
/// Misuse errors if `slot` is not live.
pub fn slot_set_static_key<P>(pool: &mut P, slot: SlotHandle, key: &'static str) -> PoolResult<()>
where
    P: MemoryPool<Slot = VariantSlot>,
{
    let previous = pool.variant_mut(slot)?.key.replace(SlotKey::Static(key));
    release_key(pool, previous)
}

/// Bytes of the slot's key, if it has one.
///
/// # Errors
///
/// Misuse errors if `slot` or its pooled key is not live.
pub fn slot_key<P>(pool: &P, slot: SlotHandle) -> PoolResult<Option<&[u8]>>
where
    P: MemoryPool<Slot = VariantSlot>,
{
    match pool.variant(slot)?.key {
        None => Ok(None),
        Some(SlotKey::Static(key)) => Ok(Some(key.as_bytes())),
        Some(SlotKey::Pooled(key)) => pool.string_bytes(key).map(Some),
    }
}

/// Follows `next` links `distance` times. Stops early at the end of the
/// list.
///
/// # Errors
///
/// Misuse errors if a link names a dead slot.
pub fn slot_advance<P>(
    pool: &P,
    mut slot: Option<SlotHandle>,
    mut distance: usize,
) -> PoolResult<Option<SlotHandle>>
where
    P: MemoryPool<Slot = VariantSlot>,
{
    while distance > 0 {
        let Some(current) = slot else {
            break;
        };
        slot = pool.variant(current)?.next;
        distance -= 1;
    }
    Ok(slot)
}

/// Number of slots from `slot` to the end of its list.
///
/// # Errors
///
/// Misuse errors if a link names a dead slot.
pub fn slot_size<P>(pool: &P, mut slot: Option<SlotHandle>) -> PoolResult<usize>
where
    P: MemoryPool<Slot = VariantSlot>,
{
    let mut count = 0;
    while let Some(current) = slot {
        count += 1;
        slot = pool.variant(current)?.next;
    }
    Ok(count)
}

/// Frees `slot` and everything below it.
///
/// Members of arrays and objects are freed along with their pooled keys
/// and string values. The slot's own siblings are left alone.
///
/// # Errors
///
/// Misuse errors if any slot in the subtree is not live. Slots freed before
/// the error stay freed.
pub fn slot_free<P>(pool: &mut P, slot: SlotHandle) -> PoolResult<()>
where
    P: MemoryPool<Slot = VariantSlot>,
{
    let mut pending = vec![slot];
    while let Some(current) = pending.pop() {
        let freed = pool.free_variant(current)?;
        release_key(pool, freed.key)?;

        match freed.value {
            VariantData::String(string) => pool.free_string(string)?,
            VariantData::Array { head } | VariantData::Object { head } => {
                // Read each link before its slot is released.
                let mut member = head;
                while let Some(child) = member {
                    member = pool.variant(child)?.next;
                    pending.push(child);
                }
            }
            VariantData::Null
            | VariantData::Bool(_)
            | VariantData::Integer(_)
            | VariantData::Float(_) => {}
        }
    }
    Ok(())
}

fn release_key<P>(pool: &mut P, key: Option<SlotKey>) -> PoolResult<()>
where
    P: MemoryPool<Slot = VariantSlot>,
{
    match key {
        Some(SlotKey::Pooled(string)) => pool.free_string(string),
        Some(SlotKey::Static(_)) | None => Ok(()),
    }
}
