//! Index merge sort over partitioned arrays.
//!
//! Storage and order are kept apart. The sort never moves elements of the target while deciding
//! the order, it reorders a permutation `sortP` of `[0, len)` by merge sort, using `tempP` as
//! scratch. Only once the permutation is final the target is rearranged in a single linear
//! placement pass, and `tempP` is left holding the rank of every pre-sort index:
//!
//! * `permutation()[k]` is the pre-sort index of the element now at `k`,
//! * `ranks()[i]` is the slot the pre-sort element `i` moved to.
//!
//! Terrain code uses the rank table to renumber everything that pointed at the old positions.
//!
//! [`sort`](IndexMergeSort::sort) and friends run on the calling thread and put no thread safety
//! requirement on the element or comparator. The `par_` variants additionally honour
//! [`SortStrategy::Parallel`] and need both to be `Sync`.

mod merge;
mod parallel;
mod place;

use std::fmt;

use crate::alloc::{HeapAllocator, PartitionAllocator};
use crate::compare::{Compare, CompareFn, FuncCompare, XYPointCompare};
use crate::config::{SortConfig, SortStrategy};
use crate::error::{Error, Result};
use crate::partition_array::{PartitionedArray, DEFAULT_SHIFT};

use merge::{Keys, SortKeys};

pub const INDEX_SHIFT: u32 = DEFAULT_SHIFT;

/// Index and rank storage of the sort engine.
pub type IndexArray<A = HeapAllocator> = PartitionedArray<usize, INDEX_SHIFT, A>;

/// Sorts points x-major, y-minor.
pub type XYPointArraySort = IndexMergeSort<XYPointCompare>;

/// Sorts with a C-style three-way comparison function.
pub type FuncArraySort<T> = IndexMergeSort<FuncCompare<T>>;

/// Sorter holding the comparator and the two index arrays, reused across calls.
///
/// `A` allocates the index arrays. They take two `usize` per element, so a memory budget shared
/// with the target has to cover them too.
pub struct IndexMergeSort<C, A: PartitionAllocator = HeapAllocator> {
    compare: C,
    config: SortConfig,
    sort_p: IndexArray<A>,
    temp_p: IndexArray<A>,
}

impl<C> IndexMergeSort<C, HeapAllocator> {
    /// Engine using the configuration from the environment.
    pub fn new(compare: C) -> Self {
        Self::with_config(compare, SortConfig::from_env())
    }

    pub fn with_config(compare: C, config: SortConfig) -> Self {
        Self::with_allocator(compare, config, HeapAllocator)
    }
}

impl<C, A: PartitionAllocator> IndexMergeSort<C, A> {
    pub fn with_allocator(compare: C, config: SortConfig, alloc: A) -> Self
    where
        A: Clone,
    {
        Self {
            compare,
            config,
            sort_p: PartitionedArray::with_allocator(alloc.clone()),
            temp_p: PartitionedArray::with_allocator(alloc),
        }
    }

    pub fn compare(&self) -> &C {
        &self.compare
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn set_strategy(&mut self, strategy: SortStrategy) {
        self.config.strategy = strategy;
    }

    /// `sortP` of the last call: pre-sort index of the element at each sorted slot.
    pub fn permutation(&self) -> &IndexArray<A> {
        &self.sort_p
    }

    /// `tempP` of the last call: sorted slot of each pre-sort index.
    pub fn ranks(&self) -> &IndexArray<A> {
        &self.temp_p
    }

    /// Where the element that was at `old_index` before the last sort is now.
    pub fn remap(&self, old_index: usize) -> Option<usize> {
        self.temp_p.get(old_index).copied()
    }

    /// Releases the index arrays.
    pub fn clear(&mut self) {
        self.sort_p.clear();
        self.temp_p.clear();
    }

    /// Checks the range and sizes the index arrays for `len` elements. Returns the range end.
    fn init(&mut self, len: usize, start: usize, length: usize) -> Result<usize> {
        let end = match start.checked_add(length) {
            Some(end) if end <= len => end,
            _ => {
                return Err(Error::InvalidRange {
                    start,
                    length,
                    len,
                })
            }
        };

        let sized = self
            .sort_p
            .resize(len)
            .and_then(|()| self.temp_p.resize(len));
        if let Err(err) = sized {
            log::warn!("index arrays for {len} elements could not be allocated: {err}");
            // Half sized index arrays hold no usable permutation.
            self.clear();
            return Err(err);
        }

        for (slot, index) in self.sort_p.iter_mut().enumerate() {
            *index = slot;
        }

        Ok(end)
    }

    /// Computes `sortP` for `array` with `[0, start)` assumed sorted and `[start, start + length)`
    /// unsorted. Elements after the range keep their position.
    fn order<T, const SHIFT: u32, TA>(
        &mut self,
        array: &PartitionedArray<T, SHIFT, TA>,
        start: usize,
        length: usize,
    ) -> Result<()>
    where
        C: Compare<T>,
        TA: PartitionAllocator,
    {
        let end = self.init(array.len(), start, length)?;

        let strategy = match self.config.strategy {
            SortStrategy::Parallel => SortStrategy::TopDown,
            strategy => strategy,
        };
        log::debug!(
            "sorting {start}..{end} of {} elements, strategy {strategy}",
            array.len()
        );

        let keys = Keys::new(array, &self.compare);
        sort_range(&keys, strategy, &mut self.sort_p, &mut self.temp_p, start, end);
        merge::merge(&keys, &mut self.sort_p, &mut self.temp_p, 0, start, end);

        Ok(())
    }

    /// [`order`](Self::order) that fans out to worker tasks when the strategy asks for it.
    fn par_order<T, const SHIFT: u32, TA>(
        &mut self,
        array: &PartitionedArray<T, SHIFT, TA>,
        start: usize,
        length: usize,
    ) -> Result<()>
    where
        C: Compare<T> + Sync,
        T: Sync,
        TA: PartitionAllocator + Sync,
    {
        let end = self.init(array.len(), start, length)?;

        let strategy = match self.config.strategy {
            SortStrategy::Parallel if length < self.config.parallel_min_len => {
                SortStrategy::TopDown
            }
            strategy => strategy,
        };
        log::debug!(
            "sorting {start}..{end} of {} elements, strategy {strategy}",
            array.len()
        );

        let keys = Keys::new(array, &self.compare);
        if strategy == SortStrategy::Parallel {
            parallel::sort(&keys, &mut self.sort_p, &mut self.temp_p, start, end);
        } else {
            sort_range(&keys, strategy, &mut self.sort_p, &mut self.temp_p, start, end);
        }

        // Fold the freshly sorted range into the sorted prefix.
        merge::merge(&keys, &mut self.sort_p, &mut self.temp_p, 0, start, end);

        Ok(())
    }

    /// Sorts the whole array in place on the calling thread.
    ///
    /// [`SortStrategy::Parallel`] runs as top-down here, see [`par_sort`](Self::par_sort).
    pub fn sort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &mut PartitionedArray<T, SHIFT, TA>,
    ) -> Result<()>
    where
        C: Compare<T>,
        TA: PartitionAllocator,
    {
        let len = array.len();
        self.resort(array, 0, len)
    }

    /// Incorporates `[start, start + length)` into the already sorted prefix `[0, start)`, in
    /// place.
    ///
    /// Gives the same order as sorting the concatenation from scratch.
    pub fn resort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &mut PartitionedArray<T, SHIFT, TA>,
        start: usize,
        length: usize,
    ) -> Result<()>
    where
        C: Compare<T>,
        TA: PartitionAllocator,
    {
        self.order(array, start, length)?;
        place::place(array, &self.sort_p, &mut self.temp_p);
        Ok(())
    }

    /// Computes the permutation and the rank table without moving any element.
    pub fn argsort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &PartitionedArray<T, SHIFT, TA>,
    ) -> Result<()>
    where
        C: Compare<T>,
        TA: PartitionAllocator,
    {
        self.reargsort(array, 0, array.len())
    }

    /// [`argsort`](Self::argsort) with `[0, start)` assumed sorted.
    pub fn reargsort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &PartitionedArray<T, SHIFT, TA>,
        start: usize,
        length: usize,
    ) -> Result<()>
    where
        C: Compare<T>,
        TA: PartitionAllocator,
    {
        self.order(array, start, length)?;
        place::invert(&self.sort_p, &mut self.temp_p);
        Ok(())
    }

    /// [`sort`](Self::sort) running every configured strategy, the parallel one included.
    pub fn par_sort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &mut PartitionedArray<T, SHIFT, TA>,
    ) -> Result<()>
    where
        C: Compare<T> + Sync,
        T: Sync,
        TA: PartitionAllocator + Sync,
    {
        let len = array.len();
        self.par_resort(array, 0, len)
    }

    pub fn par_resort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &mut PartitionedArray<T, SHIFT, TA>,
        start: usize,
        length: usize,
    ) -> Result<()>
    where
        C: Compare<T> + Sync,
        T: Sync,
        TA: PartitionAllocator + Sync,
    {
        self.par_order(array, start, length)?;
        place::place(array, &self.sort_p, &mut self.temp_p);
        Ok(())
    }

    pub fn par_argsort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &PartitionedArray<T, SHIFT, TA>,
    ) -> Result<()>
    where
        C: Compare<T> + Sync,
        T: Sync,
        TA: PartitionAllocator + Sync,
    {
        self.par_reargsort(array, 0, array.len())
    }

    pub fn par_reargsort<T, const SHIFT: u32, TA>(
        &mut self,
        array: &PartitionedArray<T, SHIFT, TA>,
        start: usize,
        length: usize,
    ) -> Result<()>
    where
        C: Compare<T> + Sync,
        T: Sync,
        TA: PartitionAllocator + Sync,
    {
        self.par_order(array, start, length)?;
        place::invert(&self.sort_p, &mut self.temp_p);
        Ok(())
    }
}

fn sort_range<K, A>(
    keys: &K,
    strategy: SortStrategy,
    sort_p: &mut IndexArray<A>,
    temp_p: &mut IndexArray<A>,
    start: usize,
    end: usize,
) where
    K: SortKeys + ?Sized,
    A: PartitionAllocator,
{
    match strategy {
        SortStrategy::BottomUp => merge::bottom_up(keys, sort_p, temp_p, start, end),
        SortStrategy::TopDown | SortStrategy::Parallel => {
            merge::top_down(keys, sort_p, temp_p, start, end)
        }
    }
}

impl<T> IndexMergeSort<FuncCompare<T>> {
    pub fn with_fn(func: CompareFn<T>) -> Self {
        Self::new(FuncCompare::new(func))
    }
}

impl<C: Default> Default for IndexMergeSort<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C: fmt::Debug, A: PartitionAllocator> fmt::Debug for IndexMergeSort<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexMergeSort")
            .field("compare", &self.compare)
            .field("config", &self.config)
            .field("len", &self.sort_p.len())
            .finish()
    }
}
