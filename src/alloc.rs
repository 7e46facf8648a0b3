//! Allocation capability used by [`PartitionedArray`](crate::PartitionedArray).
//!
//! The partitioned array never calls the global allocator directly. Every partition block and the
//! partition table itself are grown and released through a [`PartitionAllocator`], so an arena or a
//! pool can be substituted without touching the addressing or sort code. Failures are reported as
//! [`Error::OutOfMemory`] instead of aborting the process.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

pub trait PartitionAllocator {
    /// Makes room for at least `additional` more elements in `block`, with amortized growth.
    fn reserve<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()>;

    /// Makes room for exactly `additional` more elements in `block`.
    ///
    /// Used wherever the final length of a block is known, so a partition never holds more
    /// capacity than its size.
    fn reserve_exact<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()>;

    /// Shrinks `block` to `new_len` elements and gives back the unused capacity.
    fn shrink<T>(&self, block: &mut Vec<T>, new_len: usize) {
        block.truncate(new_len);
        block.shrink_to_fit();
    }

    /// Gives a block back. The elements are dropped.
    fn release<T>(&self, block: Vec<T>) {
        drop(block);
    }

    /// Allocates a block holding exactly `len` default elements.
    fn allocate<T: Default>(&self, len: usize) -> Result<Vec<T>> {
        let mut block = Vec::new();
        self.reserve_exact(&mut block, len)?;
        block.resize_with(len, T::default);
        Ok(block)
    }

    /// Grows or shrinks `block` to `new_len` elements. New slots hold `T::default()`.
    fn resize<T: Default>(&self, block: &mut Vec<T>, new_len: usize) -> Result<()> {
        let len = block.len();
        if new_len > len {
            self.reserve_exact(block, new_len - len)?;
            block.resize_with(new_len, T::default);
        } else if new_len < len {
            self.shrink(block, new_len);
        }
        Ok(())
    }
}

/// The process heap.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapAllocator;

impl PartitionAllocator for HeapAllocator {
    #[inline]
    fn reserve<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()> {
        // Amortized growth, so appending one element at a time into the last partition stays cheap.
        block.try_reserve(additional).map_err(|_| {
            log::warn!("heap allocation of {additional} elements failed");
            Error::out_of_memory::<T>(block.len().saturating_add(additional))
        })
    }

    #[inline]
    fn reserve_exact<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()> {
        block.try_reserve_exact(additional).map_err(|_| {
            log::warn!("heap allocation of {additional} elements failed");
            Error::out_of_memory::<T>(block.len().saturating_add(additional))
        })
    }
}

/// Heap allocator that refuses to hold more than a fixed number of bytes at once.
///
/// Capacity is charged on reserve and refunded on shrink and release, so the budget tracks the
/// live footprint of every array sharing the allocator.
#[derive(Debug)]
pub struct BudgetAllocator {
    limit: usize,
    used: AtomicUsize,
}

impl BudgetAllocator {
    pub fn new(limit_bytes: usize) -> Self {
        Self {
            limit: limit_bytes,
            used: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently charged against the budget.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    fn refund(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(bytes))
            });
    }
}

impl BudgetAllocator {
    fn charge<T>(&self, block: &mut Vec<T>, additional: usize, exact: bool) -> Result<()> {
        let required = block.len().saturating_add(additional);
        if required <= block.capacity() {
            return Ok(());
        }

        let grow_bytes = (required - block.capacity()).saturating_mul(mem::size_of::<T>());
        let charged = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(grow_bytes)
                    .filter(|&total| total <= self.limit)
            });
        if charged.is_err() {
            log::warn!(
                "allocation of {grow_bytes} bytes exceeds budget of {} bytes ({} in use)",
                self.limit,
                self.used()
            );
            return Err(Error::OutOfMemory { bytes: grow_bytes });
        }

        let old_capacity = block.capacity();
        let reserved = if exact {
            block.try_reserve_exact(additional)
        } else {
            block.try_reserve(additional)
        };
        if reserved.is_err() {
            self.refund(grow_bytes);
            return Err(Error::OutOfMemory { bytes: grow_bytes });
        }

        // The heap may round the capacity up, charge what was actually handed out.
        let granted = (block.capacity() - old_capacity).saturating_mul(mem::size_of::<T>());
        if granted > grow_bytes {
            self.used.fetch_add(granted - grow_bytes, Ordering::AcqRel);
        } else {
            self.refund(grow_bytes - granted);
        }
        Ok(())
    }
}

impl PartitionAllocator for BudgetAllocator {
    fn reserve<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()> {
        self.charge(block, additional, false)
    }

    fn reserve_exact<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()> {
        self.charge(block, additional, true)
    }

    fn shrink<T>(&self, block: &mut Vec<T>, new_len: usize) {
        let old_capacity = block.capacity();
        block.truncate(new_len);
        block.shrink_to_fit();
        self.refund((old_capacity - block.capacity()).saturating_mul(mem::size_of::<T>()));
    }

    fn release<T>(&self, block: Vec<T>) {
        self.refund(block.capacity().saturating_mul(mem::size_of::<T>()));
        drop(block);
    }
}

impl<A: PartitionAllocator> PartitionAllocator for &A {
    #[inline]
    fn reserve<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()> {
        (**self).reserve(block, additional)
    }

    #[inline]
    fn reserve_exact<T>(&self, block: &mut Vec<T>, additional: usize) -> Result<()> {
        (**self).reserve_exact(block, additional)
    }

    #[inline]
    fn shrink<T>(&self, block: &mut Vec<T>, new_len: usize) {
        (**self).shrink(block, new_len);
    }

    #[inline]
    fn release<T>(&self, block: Vec<T>) {
        (**self).release(block);
    }
}
