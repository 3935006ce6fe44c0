//! # Free List
//!
//! LIFO recycling of fixed-size records.
//!
//! Records are named by their index on the arena's slot side rather than by
//! a link stored inside the freed record, so a freed record can never be
//! read back as live data.

/// A stack of freed record indices.
///
/// `pop` always returns the most recently pushed record. `remove` excises
/// an arbitrary record, which compaction needs when a freed header ends up
/// on the region boundary.
///
/// # Example
///
/// ```rust
/// use arbor_memory::FreeList;
///
/// let mut list = FreeList::new(16, 4);
/// list.push(0);
/// list.push(3);
/// assert_eq!(list.size(), 32);
/// assert_eq!(list.pop(), Some(3));
/// ```
#[derive(Clone, Debug)]
pub struct FreeList {
    /// Freed indices, most recent last.
    stack: Vec<u32>,
    /// Bytes each record occupies.
    record_size: usize,
}

impl FreeList {
    /// Creates an empty list for records of `record_size` bytes.
    ///
    /// `capacity` pre-allocates room for that many entries so that pushing
    /// never reallocates while the arena is in use.
    #[must_use]
    pub fn new(record_size: usize, capacity: usize) -> Self {
        Self {
            stack: Vec::with_capacity(capacity),
            record_size,
        }
    }

    /// Adds a freed record.
    #[inline]
    pub fn push(&mut self, index: u32) {
        self.stack.push(index);
    }

    /// Takes the most recently freed record.
    #[inline]
    pub fn pop(&mut self) -> Option<u32> {
        self.stack.pop()
    }

    /// Removes `index` wherever it sits. Returns `false` if it was not listed.
    ///
    /// The search starts from the most recent entry, which is where
    /// compaction finds the header it has just freed.
    pub fn remove(&mut self, index: u32) -> bool {
        match self.stack.iter().rposition(|&listed| listed == index) {
            Some(position) => {
                self.stack.remove(position);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `index` is listed.
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        self.stack.contains(&index)
    }

    /// Iterates from the most recently freed record to the oldest.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.stack.iter().rev().copied()
    }

    /// Number of listed records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if nothing is waiting for reuse.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Bytes held by listed records.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.stack.len() * self.record_size
    }

    /// Forgets every listed record.
    #[inline]
    pub fn clear(&mut self) {
        self.stack.clear();
    }
}
