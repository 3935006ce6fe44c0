//! # Variant Slots
//!
//! The record every tree node occupies. Arrays and objects are singly
//! linked lists of slots: the collection holds the head, each member holds
//! the next sibling.

use arbor_memory::{SlotHandle, StringHandle};

/// The value held by one node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum VariantData {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating-point number.
    Float(f64),
    /// A string owned by the pool.
    String(StringHandle),
    /// An ordered list of member slots.
    Array {
        /// First member, if any.
        head: Option<SlotHandle>,
    },
    /// A list of keyed member slots.
    Object {
        /// First member, if any.
        head: Option<SlotHandle>,
    },
}

impl VariantData {
    /// An empty array.
    pub const EMPTY_ARRAY: Self = Self::Array { head: None };

    /// An empty object.
    pub const EMPTY_OBJECT: Self = Self::Object { head: None };

    /// First member of an array or object.
    #[inline]
    #[must_use]
    pub const fn head(&self) -> Option<SlotHandle> {
        match self {
            Self::Array { head } | Self::Object { head } => *head,
            _ => None,
        }
    }

    /// Returns `true` for arrays and objects.
    #[inline]
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Array { .. } | Self::Object { .. })
    }
}

/// Key of an object member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKey {
    /// A key with static lifetime, referenced without copying.
    Static(&'static str),
    /// A key copied into the pool; released with the slot.
    Pooled(StringHandle),
}

/// One tree node: a value, an optional key and a link to the next sibling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VariantSlot {
    /// The node's value.
    pub value: VariantData,
    /// Key, for object members.
    pub key: Option<SlotKey>,
    /// Next sibling in the enclosing collection.
    pub next: Option<SlotHandle>,
}

impl VariantSlot {
    /// A slot holding `value`, unkeyed and unlinked.
    #[must_use]
    pub const fn new(value: VariantData) -> Self {
        Self {
            value,
            key: None,
            next: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slot_is_null() {
        let slot = VariantSlot::default();
        assert_eq!(slot.value, VariantData::Null);
        assert!(slot.key.is_none());
        assert!(slot.next.is_none());
    }

    #[test]
    fn test_head_only_for_collections() {
        assert_eq!(VariantData::Integer(3).head(), None);
        assert!(!VariantData::Bool(true).is_collection());
        assert!(VariantData::EMPTY_OBJECT.is_collection());

        let member = SlotHandle::from_bits(48);
        let array = VariantData::Array { head: Some(member) };
        assert_eq!(array.head(), Some(member));
    }
}
