//! Eight-way fan-out of the index sort.
//!
//! `[lo, hi)` is cut into [`PARALLEL_WORKERS`] contiguous slices, the last one taking the
//! remainder. Each slice of `sort`/`temp` is handed to its own task as an exclusive
//! [`RangeMut`](crate::RangeMut), the target and comparator are shared read-only. After all tasks
//! joined, the calling thread merges the sorted slices in a fixed tournament:
//! `0+1, 2+3, 4+5, 6+7`, then `01+23, 45+67`, then `0123+4567`.

use crate::alloc::PartitionAllocator;
use crate::config::PARALLEL_WORKERS;
use crate::partition_array::PartitionedArray;

use super::merge::{self, SortKeys};

/// Slice boundaries, `bounds[i]..bounds[i + 1]` is slice `i`.
pub(crate) fn slice_bounds(lo: usize, hi: usize) -> [usize; PARALLEL_WORKERS + 1] {
    let chunk = (hi - lo) / PARALLEL_WORKERS;

    let mut bounds = [hi; PARALLEL_WORKERS + 1];
    for (i, bound) in bounds.iter_mut().take(PARALLEL_WORKERS).enumerate() {
        *bound = lo + i * chunk;
    }

    bounds
}

pub(crate) fn sort<K, const SHIFT: u32, A>(
    keys: &K,
    sort: &mut PartitionedArray<usize, SHIFT, A>,
    temp: &mut PartitionedArray<usize, SHIFT, A>,
    lo: usize,
    hi: usize,
) where
    K: SortKeys + Sync + ?Sized,
    A: PartitionAllocator,
{
    let bounds = slice_bounds(lo, hi);
    log::debug!("parallel sort of {lo}..{hi}, slice bounds {bounds:?}");

    {
        let sort_ranges = sort.split_ranges_mut(&bounds);
        let temp_ranges = temp.split_ranges_mut(&bounds);

        rayon::scope(|scope| {
            for (mut sort_range, mut temp_range) in sort_ranges.into_iter().zip(temp_ranges) {
                scope.spawn(move |_| {
                    let (start, end) = (sort_range.start(), sort_range.end());
                    merge::top_down(keys, &mut sort_range, &mut temp_range, start, end);
                });
            }
        });
    }

    let mut width = 1;
    while width < PARALLEL_WORKERS {
        for first in (0..PARALLEL_WORKERS).step_by(2 * width) {
            merge::merge(
                keys,
                sort,
                temp,
                bounds[first],
                bounds[first + width],
                bounds[first + 2 * width],
            );
        }
        log::trace!("tournament round of width {width} merged");
        width *= 2;
    }
}
