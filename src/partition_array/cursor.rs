use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::slice;

use super::PartitionedArray;
use crate::alloc::PartitionAllocator;

/// Random-access position inside a [`PartitionedArray`].
///
/// The cursor caches the slice of the partition it points into, stepping inside a partition is a
/// plain offset bump. Only crossing a partition boundary re-resolves the cached slice. Large jumps
/// go through the linear index `partition << SHIFT | offset` instead of walking partitions.
///
/// A cursor at `len()` is the end sentinel, [`Cursor::get`] returns `None` there.
pub struct Cursor<'a, T, const SHIFT: u32, A: PartitionAllocator> {
    array: &'a PartitionedArray<T, SHIFT, A>,
    partition: usize,
    offset: usize,
    current: &'a [T],
}

impl<'a, T, const SHIFT: u32, A: PartitionAllocator> Cursor<'a, T, SHIFT, A> {
    pub(super) fn new(array: &'a PartitionedArray<T, SHIFT, A>, index: usize) -> Self {
        let mut cursor = Self {
            array,
            partition: 0,
            offset: 0,
            current: &[],
        };
        cursor.seek(index);
        cursor
    }

    fn resolve(&mut self) {
        self.current = self
            .array
            .table
            .get(self.partition)
            .map_or(&[][..], |block| block.as_slice());
    }

    /// Moves to the linear `index`.
    pub fn seek(&mut self, index: usize) {
        let count = self.array.partition_count();
        let mut partition = index >> SHIFT;
        if partition >= count && partition > 0 {
            // The end sentinel of a full last partition sits at offset PARTITION_SIZE.
            partition = count.saturating_sub(1);
        }

        self.offset = index - (partition << SHIFT);
        if partition != self.partition || self.current.is_empty() {
            self.partition = partition;
            self.resolve();
        }
    }

    /// Linear index of the cursor.
    #[inline]
    pub fn index(&self) -> usize {
        (self.partition << SHIFT) + self.offset
    }

    #[inline]
    pub fn partition(&self) -> usize {
        self.partition
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.index() >= self.array.len()
    }

    #[inline]
    pub fn get(&self) -> Option<&'a T> {
        self.current.get(self.offset)
    }

    /// `++`
    #[inline]
    pub fn move_next(&mut self) {
        let last_partition = self.partition + 1 >= self.array.partition_count();
        if self.offset + 1 < self.current.len() || last_partition {
            self.offset += 1;
        } else {
            self.partition += 1;
            self.offset = 0;
            self.resolve();
        }
    }

    /// `--`, returns `false` when already at the first element.
    #[inline]
    pub fn move_prev(&mut self) -> bool {
        if self.offset > 0 {
            self.offset -= 1;
            true
        } else if self.partition > 0 {
            self.partition -= 1;
            self.resolve();
            self.offset = self.current.len() - 1;
            true
        } else {
            false
        }
    }

    /// `+= n`, through the combined linear index.
    #[inline]
    pub fn advance(&mut self, n: isize) {
        let index = self.index() as isize + n;
        debug_assert!(index >= 0 && index as usize <= self.array.len());
        self.seek(index.max(0) as usize);
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Clone for Cursor<'_, T, SHIFT, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Copy for Cursor<'_, T, SHIFT, A> {}

impl<T, const SHIFT: u32, A: PartitionAllocator> PartialEq for Cursor<'_, T, SHIFT, A> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.array, other.array) && self.index() == other.index()
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Eq for Cursor<'_, T, SHIFT, A> {}

impl<T, const SHIFT: u32, A: PartitionAllocator> PartialOrd for Cursor<'_, T, SHIFT, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Ord for Cursor<'_, T, SHIFT, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index().cmp(&other.index())
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> AddAssign<isize> for Cursor<'_, T, SHIFT, A> {
    fn add_assign(&mut self, n: isize) {
        self.advance(n);
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> SubAssign<isize> for Cursor<'_, T, SHIFT, A> {
    fn sub_assign(&mut self, n: isize) {
        self.advance(-n);
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Add<isize> for Cursor<'_, T, SHIFT, A> {
    type Output = Self;

    fn add(mut self, n: isize) -> Self {
        self.advance(n);
        self
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Sub<isize> for Cursor<'_, T, SHIFT, A> {
    type Output = Self;

    fn sub(mut self, n: isize) -> Self {
        self.advance(-n);
        self
    }
}

/// Distance between two cursors of the same array.
impl<'a, T, const SHIFT: u32, A: PartitionAllocator> Sub for Cursor<'a, T, SHIFT, A> {
    type Output = isize;

    fn sub(self, other: Self) -> isize {
        self.index() as isize - other.index() as isize
    }
}

impl<'a, T, const SHIFT: u32, A: PartitionAllocator> Iterator for Cursor<'a, T, SHIFT, A> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let item = self.get()?;
        self.move_next();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len().saturating_sub(self.index());
        (remaining, Some(remaining))
    }
}

impl<T: fmt::Debug, const SHIFT: u32, A: PartitionAllocator> fmt::Debug
    for Cursor<'_, T, SHIFT, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("partition", &self.partition)
            .field("offset", &self.offset)
            .field("value", &self.get())
            .finish()
    }
}

/// Iterator over shared references, partition by partition.
pub struct Iter<'a, T> {
    parts: slice::Iter<'a, Vec<T>>,
    front: slice::Iter<'a, T>,
    back: slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(table: &'a [Vec<T>], len: usize) -> Self {
        Self {
            parts: table.iter(),
            front: <&[T]>::default().iter(),
            back: <&[T]>::default().iter(),
            remaining: len,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.front.next() {
                self.remaining -= 1;
                return Some(item);
            }
            match self.parts.next() {
                Some(block) => self.front = block.iter(),
                None => {
                    let item = self.back.next();
                    if item.is_some() {
                        self.remaining -= 1;
                    }
                    return item;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.back.next_back() {
                self.remaining -= 1;
                return Some(item);
            }
            match self.parts.next_back() {
                Some(block) => self.back = block.iter(),
                None => {
                    let item = self.front.next_back();
                    if item.is_some() {
                        self.remaining -= 1;
                    }
                    return item;
                }
            }
        }
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over mutable references, partition by partition.
pub struct IterMut<'a, T> {
    parts: slice::IterMut<'a, Vec<T>>,
    front: slice::IterMut<'a, T>,
    back: slice::IterMut<'a, T>,
    remaining: usize,
}

impl<'a, T> IterMut<'a, T> {
    pub(super) fn new(table: &'a mut [Vec<T>], len: usize) -> Self {
        Self {
            parts: table.iter_mut(),
            front: <&mut [T]>::default().iter_mut(),
            back: <&mut [T]>::default().iter_mut(),
            remaining: len,
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        loop {
            if let Some(item) = self.front.next() {
                self.remaining -= 1;
                return Some(item);
            }
            match self.parts.next() {
                Some(block) => self.front = block.iter_mut(),
                None => {
                    let item = self.back.next();
                    if item.is_some() {
                        self.remaining -= 1;
                    }
                    return item;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a mut T> {
        loop {
            if let Some(item) = self.back.next_back() {
                self.remaining -= 1;
                return Some(item);
            }
            match self.parts.next_back() {
                Some(block) => self.back = block.iter_mut(),
                None => {
                    let item = self.front.next_back();
                    if item.is_some() {
                        self.remaining -= 1;
                    }
                    return item;
                }
            }
        }
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}
