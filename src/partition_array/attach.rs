use std::mem;
use std::ops::{Deref, DerefMut};

use super::PartitionedArray;
use crate::alloc::PartitionAllocator;
use crate::error::{Error, Result};

/// Partition storage kept by an outside owner, such as a terrain object holding its point and
/// node tables between operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionTable<T> {
    partitions: Vec<Vec<T>>,
    len: usize,
}

impl<T> PartitionTable<T> {
    pub fn new() -> Self {
        Self {
            partitions: Vec::new(),
            len: 0,
        }
    }

    /// Takes partitions produced elsewhere. The shape is checked when the table is attached.
    pub fn from_parts(partitions: Vec<Vec<T>>, len: usize) -> Self {
        Self { partitions, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    pub fn into_parts(self) -> (Vec<Vec<T>>, usize) {
        (self.partitions, self.len)
    }
}

impl<T> Default for PartitionTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> PartitionedArray<T, SHIFT, A> {
    fn check_shape(partitions: &[Vec<T>], len: usize) -> Result<()> {
        let (count, remainder) = Self::layout(len);
        if partitions.len() != count {
            return Err(Error::ShapeMismatch {
                reason: format!(
                    "{} partitions for {len} elements, expected {count}",
                    partitions.len()
                ),
            });
        }

        if let Some((last, interior)) = partitions.split_last() {
            if let Some(p) = interior.iter().position(|p| p.len() != Self::PARTITION_SIZE) {
                return Err(Error::ShapeMismatch {
                    reason: format!(
                        "interior partition {p} holds {} elements, expected {}",
                        interior[p].len(),
                        Self::PARTITION_SIZE
                    ),
                });
            }
            if last.len() != remainder {
                return Err(Error::ShapeMismatch {
                    reason: format!(
                        "last partition holds {} elements, expected {remainder}",
                        last.len()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Takes ownership of a table, checking that its partitions match the layout for `SHIFT`.
    pub fn from_table(table: PartitionTable<T>, alloc: A) -> Result<Self> {
        Self::check_shape(&table.partitions, table.len)?;
        Ok(Self {
            len: table.len,
            table: table.partitions,
            alloc,
        })
    }

    /// Gives the storage back without releasing it.
    pub fn into_table(mut self) -> PartitionTable<T> {
        let (partitions, len) = self.take_parts();
        PartitionTable { partitions, len }
    }

    /// Works on `table` in place. Dropping the returned view frees nothing, the storage, resized or
    /// reordered, is handed back to `table`.
    pub fn attach(
        table: &mut PartitionTable<T>,
        alloc: A,
    ) -> Result<AttachedArray<'_, T, SHIFT, A>> {
        Self::check_shape(&table.partitions, table.len)?;

        let array = Self {
            len: table.len,
            table: mem::take(&mut table.partitions),
            alloc,
        };
        table.len = 0;

        Ok(AttachedArray { owner: table, array })
    }
}

/// A [`PartitionedArray`] borrowed over storage owned by a [`PartitionTable`].
pub struct AttachedArray<'a, T, const SHIFT: u32, A: PartitionAllocator> {
    owner: &'a mut PartitionTable<T>,
    array: PartitionedArray<T, SHIFT, A>,
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Deref for AttachedArray<'_, T, SHIFT, A> {
    type Target = PartitionedArray<T, SHIFT, A>;

    fn deref(&self) -> &Self::Target {
        &self.array
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> DerefMut for AttachedArray<'_, T, SHIFT, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.array
    }
}

impl<T, const SHIFT: u32, A: PartitionAllocator> Drop for AttachedArray<'_, T, SHIFT, A> {
    fn drop(&mut self) {
        let (partitions, len) = self.array.take_parts();
        self.owner.partitions = partitions;
        self.owner.len = len;
    }
}
