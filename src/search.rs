//! Binary search over sorted sequences.
//!
//! Every function here assumes the slice is sorted consistently with the
//! comparator it is given. The `_by` variants take an explicit comparator so
//! they work for any element type; the plain variants use [`Ord`].
//!
//! All searches are built on [`partition_point_by`]: keep a half-open window
//! `[low, high)`, test its midpoint and discard the half that cannot hold
//! the answer, until the window is empty.
//!
//! # Example
//!
//! ```
//! use framegrab::search;
//!
//! let times = [1, 3, 3, 3, 7];
//! assert_eq!(search::left_insertion_point(&times, &3), 1);
//! assert_eq!(search::right_insertion_point(&times, &3), 4);
//! assert_eq!(search::first_index_equal_to(&times, &4), None);
//! assert_eq!(search::last_index_less_or_equal_to(&times, &4), Some(3));
//! ```

use std::cmp::Ordering;

/// Index of the first element for which `predicate` is `false`.
///
/// `predicate` must be `true` for a (possibly empty) prefix of the slice
/// and `false` for the rest.
pub fn partition_point_by<T, F>(sequence: &[T], mut predicate: F) -> usize
where
    F: FnMut(&T) -> bool,
{
    let mut low = 0;
    let mut high = sequence.len();

    while low != high {
        let middle = low + (high - low) / 2;
        if predicate(&sequence[middle]) {
            low = middle + 1;
        } else {
            high = middle;
        }
    }

    low
}

/// Smallest index `i` with `sequence[i] >= target`, or `sequence.len()`.
pub fn left_insertion_point_by<T, F>(sequence: &[T], target: &T, mut compare: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    partition_point_by(sequence, |element| {
        compare(element, target) == Ordering::Less
    })
}

/// Smallest index `i` with `sequence[i] > target`, or `sequence.len()`.
pub fn right_insertion_point_by<T, F>(sequence: &[T], target: &T, mut compare: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    partition_point_by(sequence, |element| {
        compare(element, target) != Ordering::Greater
    })
}

/// Index of the first element equal to `target`.
pub fn first_index_equal_to_by<T, F>(sequence: &[T], target: &T, mut compare: F) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let index = left_insertion_point_by(sequence, target, &mut compare);
    sequence
        .get(index)
        .filter(|element| compare(*element, target) == Ordering::Equal)
        .map(|_| index)
}

/// Index of the last element less than or equal to `target`.
pub fn last_index_less_or_equal_to_by<T, F>(
    sequence: &[T],
    target: &T,
    compare: F,
) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    right_insertion_point_by(sequence, target, compare).checked_sub(1)
}

/// [`left_insertion_point_by`] using [`Ord`].
pub fn left_insertion_point<T: Ord>(sequence: &[T], target: &T) -> usize {
    left_insertion_point_by(sequence, target, T::cmp)
}

/// [`right_insertion_point_by`] using [`Ord`].
pub fn right_insertion_point<T: Ord>(sequence: &[T], target: &T) -> usize {
    right_insertion_point_by(sequence, target, T::cmp)
}

/// [`first_index_equal_to_by`] using [`Ord`].
pub fn first_index_equal_to<T: Ord>(sequence: &[T], target: &T) -> Option<usize> {
    first_index_equal_to_by(sequence, target, T::cmp)
}

/// [`last_index_less_or_equal_to_by`] using [`Ord`].
pub fn last_index_less_or_equal_to<T: Ord>(sequence: &[T], target: &T) -> Option<usize> {
    last_index_less_or_equal_to_by(sequence, target, T::cmp)
}
