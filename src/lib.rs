//! Partitioned storage for large point tables and an index based merge sort over it.
//!
//! [`PartitionedArray`] keeps its elements in fixed-size blocks addressed by shift and mask, so
//! growing a table of millions of points never relocates the elements of interior partitions.
//! [`IndexMergeSort`] orders such an array by merge sorting a permutation of indices and moving
//! every element exactly once at the end, which also yields the old-to-new index map that
//! dependent tables need for renumbering.

pub mod alloc;
pub mod compare;
pub mod config;
pub mod error;
pub mod index_sort;
pub mod partition_array;
pub mod patterns;
pub mod point;

pub use alloc::{BudgetAllocator, HeapAllocator, PartitionAllocator};
pub use compare::{Compare, CompareBy, CompareFn, FuncCompare, OrdCompare, XYPointCompare};
pub use config::{SortConfig, SortStrategy, PARALLEL_WORKERS};
pub use error::{Error, Result};
pub use index_sort::{FuncArraySort, IndexArray, IndexMergeSort, XYPointArraySort, INDEX_SHIFT};
pub use partition_array::{
    AttachedArray, Cursor, Iter, IterMut, PartitionTable, PartitionedArray, RangeMut,
    DEFAULT_SHIFT,
};
pub use point::{Point2D, Point3D, TinPoint, XYPoint};
