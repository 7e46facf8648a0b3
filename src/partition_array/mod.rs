//! Segmented storage with O(1) shift/mask addressing.
//!
//! A [`PartitionedArray`] stores `len` elements across `ceil(len / 2^SHIFT)` fixed-size blocks
//! ("partitions"). Element `i` lives in partition `i >> SHIFT` at offset `i & MASK`. Growing the
//! array only allocates new partitions and grows the last one, so elements of interior partitions
//! are never relocated. The last partition may be reallocated while it fills up.
//!
//! Every interior partition holds exactly `2^SHIFT` elements. The last partition holds
//! `len & MASK` elements, or a full `2^SHIFT` when that remainder is zero. A partition is never
//! empty, an empty array has no partitions at all. No block is given more capacity than the
//! partition size.

mod attach;
mod cursor;
mod range;

use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};

use crate::alloc::{HeapAllocator, PartitionAllocator};
use crate::error::Result;

pub use attach::{AttachedArray, PartitionTable};
pub use cursor::{Cursor, Iter, IterMut};
pub use range::RangeMut;

/// Partition shift used when none is given, 2048 elements per partition.
pub const DEFAULT_SHIFT: u32 = 11;

pub struct PartitionedArray<T, const SHIFT: u32 = DEFAULT_SHIFT, A = HeapAllocator>
where
    A: PartitionAllocator,
{
    len: usize,
    table: Vec<Vec<T>>,
    alloc: A,
}

impl<T, const SHIFT: u32> PartitionedArray<T, SHIFT, HeapAllocator> {
    pub fn new() -> Self {
        Self::with_allocator(HeapAllocator)
    }

    /// Array of `len` default elements.
    pub fn with_len(len: usize) -> Result<Self>
    where
        T: Default,
    {
        let mut array = Self::new();
        array.resize(len)?;
        Ok(array)
    }

    pub fn from_slice(values: &[T]) -> Result<Self>
    where
        T: Clone,
    {
        let mut array = Self::new();
        array.extend_from_slice(values)?;
        Ok(array)
    }
}

impl<T, const SHIFT: u32> Default for PartitionedArray<T, SHIFT, HeapAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> PartitionedArray<T, SHIFT, A> {
    pub const PARTITION_SIZE: usize = 1 << SHIFT;
    pub const MASK: usize = Self::PARTITION_SIZE - 1;

    pub fn with_allocator(alloc: A) -> Self {
        Self {
            len: 0,
            table: Vec::new(),
            alloc,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn partition_count(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn partition_size(&self) -> usize {
        Self::PARTITION_SIZE
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The partition blocks in index order.
    pub fn partitions(&self) -> &[Vec<T>] {
        &self.table
    }

    /// Partition count and size of the last partition for an array of `len` elements.
    ///
    /// The remainder is never zero: an exact multiple of the partition size ends in a full
    /// partition instead of an extra empty one, and `len == 0` has no partitions.
    #[inline]
    pub fn layout(len: usize) -> (usize, usize) {
        if len == 0 {
            return (0, 0);
        }

        let mut count = (len >> SHIFT) + 1;
        let mut remainder = len & Self::MASK;
        if remainder == 0 {
            count -= 1;
            remainder = Self::PARTITION_SIZE;
        }

        (count, remainder)
    }

    #[inline]
    fn split_index(index: usize) -> (usize, usize) {
        (index >> SHIFT, index & Self::MASK)
    }

    /// Grows or shrinks the array to hold exactly `new_len` elements.
    ///
    /// New elements are `T::default()`. Elements below `min(len, new_len)` keep their values, those
    /// in interior partitions also keep their addresses. On allocation failure the array keeps a
    /// consistent shape, possibly grown part of the way, and
    /// [`Error::OutOfMemory`](crate::Error::OutOfMemory) is returned.
    pub fn resize(&mut self, new_len: usize) -> Result<()>
    where
        T: Default,
    {
        if new_len == self.len {
            return Ok(());
        }

        let (old_count, _) = Self::layout(self.len);
        let (new_count, new_remainder) = Self::layout(new_len);

        log::trace!(
            "resize {} -> {new_len} elements, {old_count} -> {new_count} partitions",
            self.len
        );

        if new_len > self.len {
            self.grow(old_count, new_count, new_remainder)
        } else {
            self.shrink(new_count, new_remainder);
            Ok(())
        }
    }

    fn grow(&mut self, old_count: usize, new_count: usize, new_remainder: usize) -> Result<()>
    where
        T: Default,
    {
        if new_count == old_count {
            // Growth stays inside the last partition.
            let last = &mut self.table[old_count - 1];
            self.alloc.resize(last, new_remainder)?;
            self.len = ((old_count - 1) << SHIFT) + new_remainder;
            return Ok(());
        }

        self.alloc.reserve(&mut self.table, new_count - old_count)?;

        if old_count > 0 {
            // The old last partition becomes an interior one.
            let last = &mut self.table[old_count - 1];
            self.alloc.resize(last, Self::PARTITION_SIZE)?;
            self.len = old_count << SHIFT;
        }

        for partition in old_count..new_count {
            let size = if partition + 1 == new_count {
                new_remainder
            } else {
                Self::PARTITION_SIZE
            };

            let block = self.alloc.allocate(size)?;
            self.table.push(block);
            self.len += size;
        }

        Ok(())
    }

    fn shrink(&mut self, new_count: usize, new_remainder: usize) {
        while self.table.len() > new_count {
            if let Some(block) = self.table.pop() {
                self.alloc.release(block);
            }
        }
        self.alloc.shrink(&mut self.table, new_count);

        if let Some(last) = self.table.last_mut() {
            self.alloc.shrink(last, new_remainder);
        }

        self.len = if new_count == 0 {
            0
        } else {
            ((new_count - 1) << SHIFT) + new_remainder
        };
    }

    /// Appends one element. Does not require `T: Default`.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len & Self::MASK != 0 {
            if let Some(last) = self.table.last_mut() {
                if last.len() == last.capacity() {
                    // Doubling, capped at the partition size.
                    let target = (last.capacity() * 2).min(Self::PARTITION_SIZE);
                    self.alloc.reserve_exact(last, target - last.len())?;
                }
                last.push(value);
                self.len += 1;
                return Ok(());
            }
        }

        // Either empty or the last partition is full.
        self.alloc.reserve(&mut self.table, 1)?;
        let mut block = Vec::new();
        self.alloc.reserve_exact(&mut block, 1)?;
        block.push(value);
        self.table.push(block);
        self.len += 1;

        Ok(())
    }

    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()>
    where
        T: Clone,
    {
        for value in values {
            self.push(value.clone())?;
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            let (partition, offset) = Self::split_index(index);
            Some(&self.table[partition][offset])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len {
            let (partition, offset) = Self::split_index(index);
            Some(&mut self.table[partition][offset])
        } else {
            None
        }
    }

    /// # Safety
    ///
    /// `index` must be below `len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        let (partition, offset) = Self::split_index(index);
        // SAFETY: index < len implies partition < partition_count and offset < partition length.
        unsafe { self.table.get_unchecked(partition).get_unchecked(offset) }
    }

    /// Swaps two elements, which may live in different partitions.
    pub fn swap(&mut self, a: usize, b: usize) {
        let (pa, oa) = Self::split_index(a);
        let (pb, ob) = Self::split_index(b);

        if pa == pb {
            self.table[pa].swap(oa, ob);
            return;
        }

        let ((lo, lo_offset), (hi, hi_offset)) = if pa < pb {
            ((pa, oa), (pb, ob))
        } else {
            ((pb, ob), (pa, oa))
        };
        let (head, tail) = self.table.split_at_mut(hi);
        mem::swap(&mut head[lo][lo_offset], &mut tail[0][hi_offset]);
    }

    /// Cursor on the first element.
    pub fn begin(&self) -> Cursor<'_, T, SHIFT, A> {
        Cursor::new(self, 0)
    }

    /// Sentinel cursor one past the last element. Never dereferences.
    pub fn end(&self) -> Cursor<'_, T, SHIFT, A> {
        Cursor::new(self, self.len)
    }

    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T, SHIFT, A> {
        debug_assert!(index <= self.len);
        Cursor::new(self, index)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.table, self.len)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(&mut self.table, self.len)
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Deep copy into a new array with the same allocator.
    ///
    /// Elements are written through `clone_from` one by one, not copied as raw memory.
    pub fn try_clone(&self) -> Result<Self>
    where
        T: Clone + Default,
        A: Clone,
    {
        let mut copy = Self::with_allocator(self.alloc.clone());
        copy.resize(self.len)?;

        for (dst, src) in copy.iter_mut().zip(self.iter()) {
            dst.clone_from(src);
        }

        Ok(copy)
    }

    /// Releases every partition and the table. Calling it again is a no-op.
    pub fn clear(&mut self) {
        for block in self.table.drain(..) {
            self.alloc.release(block);
        }
        self.alloc.release(mem::take(&mut self.table));
        self.len = 0;
    }

    /// Disjoint mutable views over `[bounds[0], bounds[1])`, `[bounds[1], bounds[2])`, ...
    ///
    /// `bounds` must be non-decreasing and end at or below `len()`. The views can be handed to
    /// separate threads.
    pub fn split_ranges_mut(&mut self, bounds: &[usize]) -> Vec<RangeMut<'_, T, SHIFT>> {
        debug_assert!(bounds.windows(2).all(|w| w[0] <= w[1]));
        debug_assert!(bounds.last().map_or(true, |&end| end <= self.len));

        let mut ranges: Vec<RangeMut<'_, T, SHIFT>> = bounds
            .windows(2)
            .map(|w| RangeMut::new(w[0], w[1]))
            .collect();

        let mut r = 0;
        for (partition, block) in self.table.iter_mut().enumerate() {
            let mut rest: &mut [T] = block.as_mut_slice();
            let mut rest_start = partition << SHIFT;

            while r < ranges.len() && !rest.is_empty() {
                let range = &mut ranges[r];
                if range.end() <= rest_start {
                    r += 1;
                    continue;
                }

                if range.start() > rest_start {
                    let skip = (range.start() - rest_start).min(rest.len());
                    rest = &mut mem::take(&mut rest)[skip..];
                    rest_start += skip;
                    continue;
                }

                let take = (range.end() - rest_start).min(rest.len());
                let (head, tail) = mem::take(&mut rest).split_at_mut(take);
                range.push_chunk(head);
                rest = tail;
                rest_start += take;

                if rest_start == range.end() {
                    r += 1;
                }
            }
        }

        ranges
    }

    pub(crate) fn take_parts(&mut self) -> (Vec<Vec<T>>, usize) {
        let len = mem::replace(&mut self.len, 0);
        (mem::take(&mut self.table), len)
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Drop for PartitionedArray<T, SHIFT, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Index<usize> for PartitionedArray<T, SHIFT, A> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        let (partition, offset) = Self::split_index(index);
        &self.table[partition][offset]
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> IndexMut<usize>
    for PartitionedArray<T, SHIFT, A>
{
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let (partition, offset) = Self::split_index(index);
        &mut self.table[partition][offset]
    }
}

impl<T: fmt::Debug, const SHIFT: u32, A: PartitionAllocator> fmt::Debug
    for PartitionedArray<T, SHIFT, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, const SHIFT: u32, A: PartitionAllocator> IntoIterator
    for &'a PartitionedArray<T, SHIFT, A>
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, const SHIFT: u32, A: PartitionAllocator> IntoIterator
    for &'a mut PartitionedArray<T, SHIFT, A>
{
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}
