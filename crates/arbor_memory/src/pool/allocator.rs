//! Backing storage for growable pool blocks.

/// Source of block storage for a [`super::GrowablePool`].
///
/// Blocks are word buffers so that every byte offset that is a multiple of
/// the pointer size is a pointer-aligned address.
pub trait BlockAllocator {
    /// Returns a zeroed buffer of exactly `words` machine words, or `None`
    /// if the memory is not available.
    fn allocate(&mut self, words: usize) -> Option<Box<[usize]>>;

    /// Takes back a buffer obtained from [`Self::allocate`].
    fn deallocate(&mut self, block: Box<[usize]>) {
        drop(block);
    }
}

/// Allocates blocks from the global heap.
///
/// Allocation failure is reported as `None` rather than aborting the
/// process.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl BlockAllocator for HeapAllocator {
    fn allocate(&mut self, words: usize) -> Option<Box<[usize]>> {
        let mut block = Vec::new();
        block.try_reserve_exact(words).ok()?;
        block.resize(words, 0);
        Some(block.into_boxed_slice())
    }
}
