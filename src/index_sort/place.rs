use crate::alloc::PartitionAllocator;
use crate::partition_array::PartitionedArray;

/// `rank[sort[k]] = k` for every slot.
pub(crate) fn invert<const SHIFT: u32, A: PartitionAllocator>(
    sort: &PartitionedArray<usize, SHIFT, A>,
    rank: &mut PartitionedArray<usize, SHIFT, A>,
) {
    for (slot, &original) in sort.iter().enumerate() {
        rank[original] = slot;
    }
}

/// Moves every element of `target` to its sorted slot in one linear pass.
///
/// Cycle following: `rank[i]` is where the current occupant of slot `i` has to go. Each swap sends
/// one element home for good and carries the displaced occupant's rank along, so at most `len`
/// swaps happen and no second buffer of `T` is needed. Afterwards `rank` is rebuilt from `sort`,
/// leaving the two as exact inverses.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub(crate) fn place<T, const SHIFT: u32, A, const ISHIFT: u32, IA>(
    target: &mut PartitionedArray<T, SHIFT, A>,
    sort: &PartitionedArray<usize, ISHIFT, IA>,
    rank: &mut PartitionedArray<usize, ISHIFT, IA>,
) where
    A: PartitionAllocator,
    IA: PartitionAllocator,
{
    debug_assert_eq!(target.len(), sort.len());
    debug_assert_eq!(sort.len(), rank.len());

    invert(sort, rank);

    let mut swaps = 0usize;
    for slot in 0..target.len() {
        loop {
            let home = rank[slot];
            if home == slot {
                break;
            }
            target.swap(slot, home);
            rank.swap(slot, home);
            swaps += 1;
        }
    }

    invert(sort, rank);
    log::debug!("placed {} elements with {swaps} swaps", target.len());
}
