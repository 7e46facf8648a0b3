//! Merge passes over the index arrays.
//!
//! All functions work on global index ranges of `sort`/`temp`, so they run the same on a whole
//! [`PartitionedArray`](crate::PartitionedArray) and on a [`RangeMut`](crate::RangeMut) handed to
//! a worker. Only `sort` holds results between calls, `temp` is scratch for the range being merged.

use std::ops::IndexMut;

use crate::alloc::PartitionAllocator;
use crate::compare::Compare;
use crate::partition_array::PartitionedArray;

/// Comparison of two target elements addressed by their pre-sort index.
pub(crate) trait SortKeys {
    fn greater(&self, a: usize, b: usize) -> bool;
    fn less(&self, a: usize, b: usize) -> bool;
}

pub(crate) struct Keys<'a, T, C, const SHIFT: u32, A: PartitionAllocator> {
    target: &'a PartitionedArray<T, SHIFT, A>,
    compare: &'a C,
}

impl<'a, T, C, const SHIFT: u32, A: PartitionAllocator> Keys<'a, T, C, SHIFT, A> {
    pub(crate) fn new(target: &'a PartitionedArray<T, SHIFT, A>, compare: &'a C) -> Self {
        Self { target, compare }
    }
}

impl<T, C, const SHIFT: u32, A> SortKeys for Keys<'_, T, C, SHIFT, A>
where
    C: Compare<T>,
    A: PartitionAllocator,
{
    #[inline]
    fn greater(&self, a: usize, b: usize) -> bool {
        self.compare.greater_than(&self.target[a], &self.target[b])
    }

    #[inline]
    fn less(&self, a: usize, b: usize) -> bool {
        self.compare.less_than(&self.target[a], &self.target[b])
    }
}

#[inline]
fn swap_slots<P: IndexMut<usize, Output = usize> + ?Sized>(sort: &mut P, a: usize, b: usize) {
    let tmp = sort[a];
    sort[a] = sort[b];
    sort[b] = tmp;
}

/// Merges the sorted runs `[lo, mid)` and `[mid, hi)` of `sort`.
///
/// Stable: an element of the right run only goes first if the left one is `greater`. When the
/// last of the left run is `less` than the first of the right run the runs are already in order
/// and nothing is touched.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub(crate) fn merge<K, P, Q>(
    keys: &K,
    sort: &mut P,
    temp: &mut Q,
    lo: usize,
    mid: usize,
    hi: usize,
) where
    K: SortKeys + ?Sized,
    P: IndexMut<usize, Output = usize> + ?Sized,
    Q: IndexMut<usize, Output = usize> + ?Sized,
{
    debug_assert!(lo <= mid && mid <= hi);

    if lo == mid || mid == hi || keys.less(sort[mid - 1], sort[mid]) {
        return;
    }

    let (mut left, mut right, mut out) = (lo, mid, lo);
    while left < mid && right < hi {
        if keys.greater(sort[left], sort[right]) {
            temp[out] = sort[right];
            right += 1;
        } else {
            temp[out] = sort[left];
            left += 1;
        }
        out += 1;
    }

    while left < mid {
        temp[out] = sort[left];
        left += 1;
        out += 1;
    }

    // Whatever is left of the right run already sits at `out..hi`.
    for slot in lo..out {
        sort[slot] = temp[slot];
    }
}

/// Recursive halving of `[lo, hi)`, pairs sorted directly.
pub(crate) fn top_down<K, P, Q>(keys: &K, sort: &mut P, temp: &mut Q, lo: usize, hi: usize)
where
    K: SortKeys + ?Sized,
    P: IndexMut<usize, Output = usize> + ?Sized,
    Q: IndexMut<usize, Output = usize> + ?Sized,
{
    let len = hi - lo;
    if len < 2 {
        return;
    }

    if len == 2 {
        if keys.greater(sort[lo], sort[lo + 1]) {
            swap_slots(sort, lo, lo + 1);
        }
        return;
    }

    let mid = lo + len / 2;
    top_down(keys, sort, temp, lo, mid);
    top_down(keys, sort, temp, mid, hi);
    merge(keys, sort, temp, lo, mid, hi);
}

/// Iterative variant: sort adjacent pairs, then merge runs of length `step`, doubling `step` until
/// it covers `[lo, hi)`.
pub(crate) fn bottom_up<K, P, Q>(keys: &K, sort: &mut P, temp: &mut Q, lo: usize, hi: usize)
where
    K: SortKeys + ?Sized,
    P: IndexMut<usize, Output = usize> + ?Sized,
    Q: IndexMut<usize, Output = usize> + ?Sized,
{
    let len = hi - lo;
    if len < 2 {
        return;
    }

    let mut pair = lo;
    while pair + 1 < hi {
        if keys.greater(sort[pair], sort[pair + 1]) {
            swap_slots(sort, pair, pair + 1);
        }
        pair += 2;
    }

    let mut step = 2;
    while step < len {
        let mut start = lo;
        while start + step < hi {
            let mid = start + step;
            let end = (mid + step).min(hi);
            merge(keys, sort, temp, start, mid, end);
            start = end;
        }

        log::trace!("bottom-up pass over {lo}..{hi} with step {step} done");
        step *= 2;
    }
}
