//! Comparators driving the index merge sort.
//!
//! The engine never asks for a three-way result. Merging only needs [`Compare::greater_than`] and
//! the already-ordered shortcut only needs [`Compare::less_than`], which saves redundant floating
//! point comparisons for the point comparators.
//!
//! Static dispatch is the default, every sorter is generic over `C: Compare<T>`. The trait is
//! object safe, so `&dyn Compare<T>` and `Box<dyn Compare<T>>` work where the comparator is only
//! known at runtime.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use crate::point::XYPoint;

pub trait Compare<T: ?Sized> {
    fn less_than(&self, a: &T, b: &T) -> bool;
    fn greater_than(&self, a: &T, b: &T) -> bool;
}

impl<T: ?Sized, C: Compare<T> + ?Sized> Compare<T> for &C {
    #[inline]
    fn less_than(&self, a: &T, b: &T) -> bool {
        (**self).less_than(a, b)
    }

    #[inline]
    fn greater_than(&self, a: &T, b: &T) -> bool {
        (**self).greater_than(a, b)
    }
}

impl<T: ?Sized, C: Compare<T> + ?Sized> Compare<T> for Box<C> {
    #[inline]
    fn less_than(&self, a: &T, b: &T) -> bool {
        (**self).less_than(a, b)
    }

    #[inline]
    fn greater_than(&self, a: &T, b: &T) -> bool {
        (**self).greater_than(a, b)
    }
}

/// x ascending, then y ascending.
///
/// `less_than` treats equal `y` as less while `greater_than` is strict. The two are not mirror
/// images for points with equal coordinates, and downstream tie handling relies on exactly this
/// pair of predicates.
#[derive(Debug, Default, Clone, Copy)]
pub struct XYPointCompare;

impl<P: XYPoint + ?Sized> Compare<P> for XYPointCompare {
    #[inline]
    fn less_than(&self, a: &P, b: &P) -> bool {
        a.x() < b.x() || (a.x() == b.x() && a.y() <= b.y())
    }

    #[inline]
    fn greater_than(&self, a: &P, b: &P) -> bool {
        a.x() > b.x() || (a.x() == b.x() && a.y() > b.y())
    }
}

/// C-style three-way comparison function.
pub type CompareFn<T> = fn(&T, &T) -> i32;

/// Comparator over a plain function pointer returning `<0`, `0` or `>0`.
pub struct FuncCompare<T> {
    func: CompareFn<T>,
}

impl<T> FuncCompare<T> {
    pub const fn new(func: CompareFn<T>) -> Self {
        Self { func }
    }
}

impl<T> Clone for FuncCompare<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FuncCompare<T> {}

impl<T> fmt::Debug for FuncCompare<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncCompare").finish_non_exhaustive()
    }
}

impl<T> Compare<T> for FuncCompare<T> {
    #[inline]
    fn less_than(&self, a: &T, b: &T) -> bool {
        (self.func)(a, b) < 0
    }

    #[inline]
    fn greater_than(&self, a: &T, b: &T) -> bool {
        (self.func)(a, b) > 0
    }
}

/// Comparator over a closure returning [`Ordering`], the `sort_by` shape.
pub struct CompareBy<T: ?Sized, F> {
    compare: F,
    _marker: PhantomData<fn(&T, &T)>,
}

impl<T: ?Sized, F> CompareBy<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(compare: F) -> Self {
        Self {
            compare,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized, F: Clone> Clone for CompareBy<T, F> {
    fn clone(&self) -> Self {
        Self {
            compare: self.compare.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized, F> fmt::Debug for CompareBy<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareBy").finish_non_exhaustive()
    }
}

impl<T: ?Sized, F> Compare<T> for CompareBy<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn less_than(&self, a: &T, b: &T) -> bool {
        (self.compare)(a, b) == Ordering::Less
    }

    #[inline]
    fn greater_than(&self, a: &T, b: &T) -> bool {
        (self.compare)(a, b) == Ordering::Greater
    }
}

/// `T: Ord` in its natural order.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrdCompare;

impl<T: Ord + ?Sized> Compare<T> for OrdCompare {
    #[inline]
    fn less_than(&self, a: &T, b: &T) -> bool {
        a < b
    }

    #[inline]
    fn greater_than(&self, a: &T, b: &T) -> bool {
        a > b
    }
}
