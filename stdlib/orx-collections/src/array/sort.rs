//! In-place sorting of slot runs with a fallible comparator.
//!
//! Comparators may fail (a user comparator can return something that is not
//! a number), so both sorts take `FnMut(&T, &T) -> Result<Ordering, E>` and
//! stop at the first error. When a sort stops early the slice still holds a
//! permutation of its input; no element is lost or duplicated.

use std::cmp::Ordering;

/// Runs at or below this length are merge sorted by insertion.
const INSERTION_CUTOFF: usize = 7;

/// Unstable in-place quicksort.
///
/// The pivot is the leftmost element of each partition and the partition
/// scans from both ends toward each other. Recursion goes into the smaller
/// partition and the larger one is handled by the loop, so the stack depth
/// stays logarithmic even for adversarial input.
///
/// # Errors
///
/// Returns the first comparator error.
pub fn quick_sort<T, E, F>(items: &mut [T], mut cmp: F) -> Result<(), E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    quick_sort_in(items, &mut cmp)
}

fn quick_sort_in<T, E, F>(mut items: &mut [T], cmp: &mut F) -> Result<(), E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    while items.len() > 1 {
        let pivot = partition(items, cmp)?;
        let whole = items;
        let (left, rest) = whole.split_at_mut(pivot);
        let right = &mut rest[1..];
        if left.len() < right.len() {
            quick_sort_in(left, cmp)?;
            items = right;
        } else {
            quick_sort_in(right, cmp)?;
            items = left;
        }
    }
    Ok(())
}

/// Partition around `items[0]`; returns the pivot's final index.
fn partition<T, E, F>(items: &mut [T], cmp: &mut F) -> Result<usize, E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    let hi = items.len() - 1;
    let pivot = items[0];
    let mut i = 0;
    let mut j = hi + 1;
    loop {
        loop {
            i += 1;
            if cmp(&items[i], &pivot)? != Ordering::Less || i == hi {
                break;
            }
        }
        loop {
            j -= 1;
            if cmp(&pivot, &items[j])? != Ordering::Less || j == 0 {
                break;
            }
        }
        if i >= j {
            break;
        }
        items.swap(i, j);
    }
    items.swap(0, j);
    Ok(j)
}

/// Stable merge sort.
///
/// Elements that compare equal keep their relative order.
///
/// # Errors
///
/// Returns the first comparator error.
pub fn merge_sort<T, E, F>(items: &mut [T], mut cmp: F) -> Result<(), E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    if items.len() < 2 {
        return Ok(());
    }
    let mut scratch = items.to_vec();
    merge_sort_in(items, &mut scratch, &mut cmp)
}

fn merge_sort_in<T, E, F>(items: &mut [T], scratch: &mut [T], cmp: &mut F) -> Result<(), E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    let len = items.len();
    if len <= INSERTION_CUTOFF {
        return insertion_sort(items, cmp);
    }

    let mid = len / 2;
    merge_sort_in(&mut items[..mid], &mut scratch[..mid], cmp)?;
    merge_sort_in(&mut items[mid..], &mut scratch[mid..], cmp)?;

    // halves already in order
    if cmp(&items[mid - 1], &items[mid])? != Ordering::Greater {
        return Ok(());
    }

    let (mut i, mut j) = (0, mid);
    for out in scratch.iter_mut() {
        let take_right = if i == mid {
            true
        } else if j == len {
            false
        } else {
            cmp(&items[j], &items[i])? == Ordering::Less
        };
        if take_right {
            *out = items[j];
            j += 1;
        } else {
            *out = items[i];
            i += 1;
        }
    }
    items.copy_from_slice(scratch);
    Ok(())
}

fn insertion_sort<T, E, F>(items: &mut [T], cmp: &mut F) -> Result<(), E>
where
    T: Copy,
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && cmp(&items[j - 1], &items[j])? == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn natural(a: &i32, b: &i32) -> Result<Ordering, Infallible> {
        Ok(a.cmp(b))
    }

    fn sample() -> Vec<i32> {
        vec![5, -3, 9, 0, 9, 12, 1, 1, -8, 4, 7, 3, 3, 100, -1, 2, 6]
    }

    #[test]
    fn test_quick_sort_orders() {
        let mut v = sample();
        quick_sort(&mut v, natural).unwrap();
        let mut expected = sample();
        expected.sort();
        assert_eq!(v, expected);
    }

    #[test]
    fn test_merge_sort_orders() {
        let mut v = sample();
        merge_sort(&mut v, natural).unwrap();
        let mut expected = sample();
        expected.sort();
        assert_eq!(v, expected);
    }

    #[test]
    fn test_degenerate_inputs() {
        for input in [vec![], vec![1], vec![2, 1], vec![4; 20]] {
            let mut expected = input.clone();
            expected.sort();

            let mut q = input.clone();
            quick_sort(&mut q, natural).unwrap();
            assert_eq!(q, expected);

            let mut m = input;
            merge_sort(&mut m, natural).unwrap();
            assert_eq!(m, expected);
        }
    }

    #[test]
    fn test_sorted_and_reversed_runs() {
        let ascending: Vec<i32> = (0..500).collect();
        let mut descending = ascending.clone();
        descending.reverse();

        let mut q = descending.clone();
        quick_sort(&mut q, natural).unwrap();
        assert_eq!(q, ascending);

        let mut m = descending;
        merge_sort(&mut m, natural).unwrap();
        assert_eq!(m, ascending);

        let mut already = ascending.clone();
        quick_sort(&mut already, natural).unwrap();
        assert_eq!(already, ascending);
    }

    #[test]
    fn test_merge_sort_is_stable() {
        // (key, original position)
        let mut v: Vec<(u8, usize)> = [3u8, 1, 2, 1, 3, 2, 1, 0, 2, 3, 1, 0, 2]
            .iter()
            .enumerate()
            .map(|(i, &k)| (k, i))
            .collect();
        merge_sort(&mut v, |a: &(u8, usize), b: &(u8, usize)| -> Result<Ordering, Infallible> {
            Ok(a.0.cmp(&b.0))
        })
        .unwrap();

        for pair in v.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                assert!(pair[0].1 < pair[1].1);
            }
        }
    }

    #[test]
    fn test_comparator_error_stops_sort() {
        let mut calls = 0;
        let mut v = sample();
        let result = merge_sort(&mut v, |a: &i32, b: &i32| {
            calls += 1;
            if calls == 20 {
                Err("bad comparator")
            } else {
                Ok(a.cmp(b))
            }
        });
        assert_eq!(result, Err("bad comparator"));

        let mut seen = v.clone();
        seen.sort();
        let mut expected = sample();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_quick_sort_error_keeps_permutation() {
        let mut v = sample();
        let result = quick_sort(&mut v, |a: &i32, b: &i32| {
            if *a == 100 || *b == 100 {
                Err(())
            } else {
                Ok(a.cmp(b))
            }
        });
        assert!(result.is_err());
        v.sort();
        let mut expected = sample();
        expected.sort();
        assert_eq!(v, expected);
    }
}
