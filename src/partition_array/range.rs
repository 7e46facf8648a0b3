use std::ops::{Index, IndexMut};

/// Exclusive view over the elements `[start, end)` of a partitioned array.
///
/// Built by [`PartitionedArray::split_ranges_mut`](super::PartitionedArray::split_ranges_mut).
/// Indexing uses the same global indices as the array, so code written against the array can run
/// unchanged on a range. The first chunk starts at `start`, every following chunk starts on a
/// partition boundary.
pub struct RangeMut<'a, T, const SHIFT: u32> {
    start: usize,
    end: usize,
    chunks: Vec<&'a mut [T]>,
}

impl<'a, T, const SHIFT: u32> RangeMut<'a, T, SHIFT> {
    const MASK: usize = (1 << SHIFT) - 1;

    pub(super) fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            chunks: Vec::new(),
        }
    }

    pub(super) fn push_chunk(&mut self, chunk: &'a mut [T]) {
        self.chunks.push(chunk);
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, usize) {
        debug_assert!(
            self.start <= index && index < self.end,
            "index {index} outside of {}..{}",
            self.start,
            self.end
        );

        let chunk = (index >> SHIFT) - (self.start >> SHIFT);
        let offset = if chunk == 0 {
            index - self.start
        } else {
            index & Self::MASK
        };
        (chunk, offset)
    }
}

impl<T, const SHIFT: u32> Index<usize> for RangeMut<'_, T, SHIFT> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        let (chunk, offset) = self.locate(index);
        &self.chunks[chunk][offset]
    }
}

impl<T, const SHIFT: u32> IndexMut<usize> for RangeMut<'_, T, SHIFT> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let (chunk, offset) = self.locate(index);
        &mut self.chunks[chunk][offset]
    }
}
