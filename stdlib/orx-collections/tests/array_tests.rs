//! Array class tests through the object space
//!
//! Tests for managed Array objects including:
//! - Construction, put/at and holes
//! - Growth, shrinkage and multidimensional extension
//! - Sorting with natural order and comparators
//! - Sequence operations (insert, delete, section, join)
//! - Interaction with the generational collector

use orx_collections::{
    ArrayConfig, ArrayError, ArrayIndex, GcConfig, Generation, InsertAt, ObjRef, Object,
    ObjectSpace, SpaceConfig,
};
use std::cmp::Ordering;

fn texts(space: &ObjectSpace, array: ObjRef) -> Vec<String> {
    space
        .array(array)
        .unwrap()
        .all_items()
        .into_iter()
        .map(|r| space.string_value(r).unwrap())
        .collect()
}

// ============================================================
// Holes and items
// ============================================================

mod hole_tests {
    use super::*;

    #[test]
    fn test_sparse_array_example() {
        let mut space = ObjectSpace::default();
        let array = space.new_array(3).unwrap();
        let a = space.new_string("a").unwrap();
        let c = space.new_string("c").unwrap();
        space.array_put(array, a, 1_usize).unwrap();
        space.array_put(array, c, 3_usize).unwrap();

        assert_eq!(space.array_items(array).unwrap(), 2);
        let all = space.array_all_items(array).unwrap();
        assert_eq!(texts(&space, all), vec!["a", "c"]);
        assert_eq!(
            space.array_sort(array),
            Err(ArrayError::SparseArray { index: 2 })
        );
        assert_eq!(
            space.array_stable_sort(array),
            Err(ArrayError::SparseArray { index: 2 })
        );
        // nothing moved
        assert_eq!(space.array_at(array, 1_usize).unwrap(), Some(a));
        assert_eq!(space.array_at(array, 3_usize).unwrap(), Some(c));
    }

    #[test]
    fn test_hole_is_not_empty_string() {
        let mut space = ObjectSpace::default();
        let array = space.new_array(2).unwrap();
        let empty = space.new_string("").unwrap();
        space.array_put(array, empty, 1_usize).unwrap();

        assert!(space.array_has_index(array, 1_usize).unwrap());
        assert!(!space.array_has_index(array, 2_usize).unwrap());
        assert_eq!(space.array_items(array).unwrap(), 1);
    }

    #[test]
    fn test_remove_leaves_hole() {
        let mut space = ObjectSpace::default();
        let list = space.array_of_strings(["a", "b", "c"]).unwrap();
        let removed = space.array_remove(list, 2_usize).unwrap().unwrap();
        assert_eq!(space.string_value(removed).unwrap(), "b");
        assert_eq!(space.array_size(list).unwrap(), 3);
        assert_eq!(space.array_items(list).unwrap(), 2);
        assert_eq!(space.array_remove(list, 2_usize).unwrap(), None);
        assert_eq!(space.array_remove(list, 10_usize).unwrap(), None);
    }

    #[test]
    fn test_navigation_skips_holes() {
        let mut space = ObjectSpace::default();
        let array = space.new_array(6).unwrap();
        let x = space.new_string("x").unwrap();
        let y = space.new_string("y").unwrap();
        space.array_put(array, x, 2_usize).unwrap();
        space.array_put(array, y, 5_usize).unwrap();

        assert_eq!(space.array_first(array).unwrap(), Some(2));
        assert_eq!(space.array_last(array).unwrap(), Some(5));
        assert_eq!(space.array_next(array, 2).unwrap(), Some(5));
        assert_eq!(space.array_previous(array, 5).unwrap(), Some(2));
        assert_eq!(space.array_first_item(array).unwrap(), Some(x));
        assert_eq!(space.array_last_item(array).unwrap(), Some(y));
    }
}

// ============================================================
// Growth
// ============================================================

mod growth_tests {
    use super::*;

    #[test]
    fn test_put_beyond_size_extends() {
        let mut space = ObjectSpace::default();
        let array = space.new_array(2).unwrap();
        let v = space.new_string("v").unwrap();
        space.array_put(array, v, 50_usize).unwrap();

        assert_eq!(space.array_size(array).unwrap(), 50);
        assert_eq!(space.array_items(array).unwrap(), 1);
        assert_eq!(space.array_at(array, 50_usize).unwrap(), Some(v));
        assert_eq!(space.array_at(array, 51_usize).unwrap(), None);
    }

    #[test]
    fn test_append_grows_past_capacity() {
        let mut space = ObjectSpace::default();
        let array = space.new_array(0).unwrap();
        for i in 0..100 {
            let v = space.new_string(i.to_string()).unwrap();
            assert_eq!(space.array_append(array, v).unwrap(), i + 1);
        }
        assert_eq!(space.array_items(array).unwrap(), 100);
        assert!(space.array(array).unwrap().capacity() >= 100);
    }

    #[test]
    fn test_capacity_limit_is_reported() {
        let config = SpaceConfig {
            arrays: ArrayConfig {
                max_elements: 8,
                ..ArrayConfig::default()
            },
            ..SpaceConfig::default()
        };
        let mut space = ObjectSpace::new(config);
        let array = space.new_array(4).unwrap();
        let v = space.new_string("v").unwrap();

        assert_eq!(
            space.array_put(array, v, 9_usize),
            Err(ArrayError::CapacityExceeded {
                requested: 9,
                max: 8
            })
        );
        assert_eq!(space.array_size(array).unwrap(), 4);
        assert!(matches!(
            space.new_array_dims(&[3, 3]),
            Err(ArrayError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_multidimensional_put_extends_dimensions() {
        let mut space = ObjectSpace::default();
        let matrix = space.new_array_dims(&[2, 2]).unwrap();
        let mut values = Vec::new();
        for i in 1..=2_usize {
            for j in 1..=2_usize {
                let v = space.new_string(format!("{i},{j}")).unwrap();
                space.array_put(matrix, v, [i, j]).unwrap();
                values.push(((i, j), v));
            }
        }

        let far = space.new_string("far").unwrap();
        space.array_put(matrix, far, [4_usize, 3]).unwrap();

        assert_eq!(space.array_dimensions(matrix).unwrap(), vec![4, 3]);
        assert_eq!(space.array_size(matrix).unwrap(), 12);
        for ((i, j), v) in values {
            assert_eq!(space.array_at(matrix, [i, j]).unwrap(), Some(v));
        }
        assert_eq!(space.array_at(matrix, [4_usize, 3]).unwrap(), Some(far));
        assert_eq!(space.array_at(matrix, [3_usize, 3]).unwrap(), None);
    }

    #[test]
    fn test_surplus_subscripts_add_leading_dimension() {
        let mut space = ObjectSpace::default();
        let list = space.array_of_strings(["a", "b", "c"]).unwrap();
        let v = space.new_string("v").unwrap();
        space.array_put(list, v, [2_usize, 3]).unwrap();

        assert_eq!(space.array_dimensions(list).unwrap(), vec![2, 3]);
        assert_eq!(space.array_items(list).unwrap(), 4);
        assert_eq!(texts(&space, list), ["a", "b", "c", "v"]);
        for (j, text) in ["a", "b", "c"].iter().enumerate() {
            let item = space.array_at(list, [1_usize, j + 1]).unwrap().unwrap();
            assert_eq!(space.string_value(item).unwrap(), *text);
        }
        assert_eq!(space.array_at(list, [2_usize, 1]).unwrap(), None);
        assert_eq!(space.array_at(list, [2_usize, 3]).unwrap(), Some(v));
    }

    #[test]
    fn test_matrix_gains_a_dimension() {
        let mut space = ObjectSpace::default();
        let matrix = space.new_array_dims(&[2, 2]).unwrap();
        let mut values = Vec::new();
        for i in 1..=2_usize {
            for j in 1..=2_usize {
                let v = space.new_string(format!("{i},{j}")).unwrap();
                space.array_put(matrix, v, [i, j]).unwrap();
                values.push(((i, j), v));
            }
        }

        let deep = space.new_string("deep").unwrap();
        space.array_put(matrix, deep, [2_usize, 1, 1]).unwrap();

        assert_eq!(space.array_dimensions(matrix).unwrap(), vec![2, 2, 2]);
        for ((i, j), v) in values {
            assert_eq!(space.array_at(matrix, [1_usize, i, j]).unwrap(), Some(v));
        }
        assert_eq!(space.array_at(matrix, [2_usize, 1, 1]).unwrap(), Some(deep));
        assert_eq!(
            space.array_at(matrix, [1_usize, 1]),
            Err(ArrayError::TooFewSubscripts { min: 3 })
        );
    }

    #[test]
    fn test_empty_array_takes_shape_of_first_put() {
        let mut space = ObjectSpace::default();
        let array = space.new_array(0).unwrap();
        let v = space.new_string("v").unwrap();
        space.array_put(array, v, [2_usize, 3, 4]).unwrap();

        assert_eq!(space.array_dimension_count(array).unwrap(), 3);
        assert_eq!(space.array_dimension(array, 2).unwrap(), 3);
        assert_eq!(space.array_dimension(array, 4).unwrap(), 0);
        assert_eq!(space.array_at(array, [2_usize, 3, 4]).unwrap(), Some(v));
    }

    #[test]
    fn test_subscript_count_errors() {
        let mut space = ObjectSpace::default();
        let matrix = space.new_array_dims(&[2, 2]).unwrap();
        let list = space.new_array(3).unwrap();
        let v = space.new_string("v").unwrap();

        assert_eq!(
            space.array_put(matrix, v, 1_usize),
            Err(ArrayError::TooFewSubscripts { min: 2 })
        );
        assert_eq!(
            space.array_at(list, [1_usize, 1]),
            Err(ArrayError::TooManySubscripts { max: 1 })
        );
        assert_eq!(
            space.array_put(list, v, ArrayIndex::Numbers(vec![Some(0)])),
            Err(ArrayError::InvalidSubscript {
                position: 1,
                value: "0".into()
            })
        );
        assert_eq!(
            space.array_dimension(list, 0),
            Err(ArrayError::InvalidSubscript {
                position: 1,
                value: "0".into()
            })
        );
    }
}

// ============================================================
// Sorting
// ============================================================

mod sort_tests {
    use super::*;

    fn numeric(space: &ObjectSpace, a: ObjRef, b: ObjRef) -> Option<Object> {
        let a: i64 = space.string_value(a).ok()?.parse().ok()?;
        let b: i64 = space.string_value(b).ok()?.parse().ok()?;
        Some(Object::String((a - b).signum().to_string()))
    }

    #[test]
    fn test_natural_sort() {
        let mut space = ObjectSpace::default();
        let list = space
            .array_of_strings(["pear", "apple", "fig", "Banana", "apple"])
            .unwrap();
        space.array_sort(list).unwrap();
        assert_eq!(
            texts(&space, list),
            vec!["Banana", "apple", "apple", "fig", "pear"]
        );
    }

    #[test]
    fn test_numeric_comparator() {
        let mut space = ObjectSpace::default();
        let list = space.array_of_strings(["10", "9", "100", "-1"]).unwrap();
        let mut cmp = numeric;
        space.array_sort_with(list, &mut cmp).unwrap();
        assert_eq!(texts(&space, list), vec!["-1", "9", "10", "100"]);
    }

    #[test]
    fn test_stable_sort_keeps_ties_in_order() {
        let mut space = ObjectSpace::default();
        let list = space
            .array_of_strings(["b1", "a1", "b2", "a2", "b3", "a3", "c1", "a4", "b4"])
            .unwrap();
        let mut by_letter = |space: &ObjectSpace, a: ObjRef, b: ObjRef| -> Option<Object> {
            let a = space.string_value(a).ok()?;
            let b = space.string_value(b).ok()?;
            let n = match a[..1].cmp(&b[..1]) {
                Ordering::Less => "-1",
                Ordering::Equal => "0",
                Ordering::Greater => "1",
            };
            Some(Object::String(n.into()))
        };
        space.array_stable_sort_with(list, &mut by_letter).unwrap();
        assert_eq!(
            texts(&space, list),
            vec!["a1", "a2", "a3", "a4", "b1", "b2", "b3", "b4", "c1"]
        );
    }

    #[test]
    fn test_sort_rejects_non_strings() {
        let mut space = ObjectSpace::default();
        let inner = space.new_array(0).unwrap();
        let s = space.new_string("s").unwrap();
        let list = space.array_of(&[Some(s), Some(inner)]).unwrap();
        assert_eq!(
            space.array_sort(list),
            Err(ArrayError::NotComparable { class: "Array" })
        );
        assert_eq!(space.array_items(list).unwrap(), 2);
    }

    #[test]
    fn test_trailing_holes_do_not_block_sort() {
        let mut space = ObjectSpace::default();
        let list = space.new_array(6).unwrap();
        for (i, text) in ["c", "a", "b"].iter().enumerate() {
            let v = space.new_string(*text).unwrap();
            space.array_put(list, v, i + 1).unwrap();
        }
        space.array_sort(list).unwrap();
        assert_eq!(space.array_size(list).unwrap(), 6);
        assert_eq!(texts(&space, list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_multidimensional_sort_uses_flat_order() {
        let mut space = ObjectSpace::default();
        let matrix = space.new_array_dims(&[2, 2]).unwrap();
        for (i, text) in ["d", "c", "b", "a"].iter().enumerate() {
            let v = space.new_string(*text).unwrap();
            space.array_put(matrix, v, [i / 2 + 1, i % 2 + 1]).unwrap();
        }
        space.array_sort(matrix).unwrap();
        let first = space.array_at(matrix, [1_usize, 1]).unwrap().unwrap();
        let last = space.array_at(matrix, [2_usize, 2]).unwrap().unwrap();
        assert_eq!(space.string_value(first).unwrap(), "a");
        assert_eq!(space.string_value(last).unwrap(), "d");
    }
}

// ============================================================
// Sequence operations
// ============================================================

mod sequence_tests {
    use super::*;

    #[test]
    fn test_insert_shifts_up() {
        let mut space = ObjectSpace::default();
        let list = space.array_of_strings(["a", "c"]).unwrap();
        let b = space.new_string("b").unwrap();
        let z = space.new_string("z").unwrap();

        assert_eq!(space.array_insert(list, Some(b), Some(1)).unwrap(), 2);
        assert_eq!(space.array_insert(list, Some(z), None).unwrap(), 1);
        assert_eq!(texts(&space, list), vec!["z", "a", "b", "c"]);

        let end = space.new_string("end").unwrap();
        assert_eq!(space.array_insert_at(list, Some(end), InsertAt::Last).unwrap(), 5);
        assert_eq!(
            space.array_insert(list, Some(end), Some(9)),
            Err(ArrayError::SubscriptOutOfRange {
                position: 1,
                value: 9,
                limit: 5
            })
        );
    }

    #[test]
    fn test_delete_shifts_down() {
        let mut space = ObjectSpace::default();
        let list = space.array_of_strings(["a", "b", "c"]).unwrap();
        let removed = space.array_delete(list, 1).unwrap().unwrap();
        assert_eq!(space.string_value(removed).unwrap(), "a");
        assert_eq!(space.array_size(list).unwrap(), 2);
        assert_eq!(texts(&space, list), vec!["b", "c"]);
    }

    #[test]
    fn test_section_and_join() {
        let mut space = ObjectSpace::default();
        let list = space.array_of_strings(["a", "b", "c", "d"]).unwrap();

        let mid = space.array_section(list, 2, Some(2)).unwrap();
        assert_eq!(texts(&space, mid), vec!["b", "c"]);
        let tail = space.array_section(list, 3, None).unwrap();
        assert_eq!(texts(&space, tail), vec!["c", "d"]);

        let joined = space.array_join(mid, tail).unwrap();
        assert_eq!(space.array_size(joined).unwrap(), 4);
        assert_eq!(texts(&space, joined), vec!["b", "c", "c", "d"]);

        let matrix = space.new_array_dims(&[2, 2]).unwrap();
        assert_eq!(
            space.array_section(matrix, 1, None),
            Err(ArrayError::MultiDimensional {
                operation: "section"
            })
        );
    }

    #[test]
    fn test_fill_empty_and_copy() {
        let mut space = ObjectSpace::default();
        let list = space.new_array(3).unwrap();
        let x = space.new_string("x").unwrap();
        space.array_fill(list, x).unwrap();
        assert_eq!(space.array_items(list).unwrap(), 3);

        let copy = space.array_copy(list).unwrap();
        space.array_empty(list).unwrap();
        assert!(space.array_is_empty(list).unwrap());
        assert_eq!(space.array_items(copy).unwrap(), 3);
    }

    #[test]
    fn test_array_supplier_walks_items() {
        let mut space = ObjectSpace::default();
        let list = space.new_array(4).unwrap();
        let a = space.new_string("a").unwrap();
        let d = space.new_string("d").unwrap();
        space.array_put(list, a, 1_usize).unwrap();
        space.array_put(list, d, 4_usize).unwrap();

        let sup = space.array_supplier(list).unwrap();
        let mut seen = Vec::new();
        while space.supplier_available(sup).unwrap() {
            let item = space.supplier_item(sup).unwrap();
            let index = space.supplier_index(sup).unwrap();
            seen.push((
                space.string_value(index).unwrap(),
                space.string_value(item).unwrap(),
            ));
            space.supplier_next(sup).unwrap();
        }
        assert_eq!(
            seen,
            vec![("1".to_string(), "a".to_string()), ("4".to_string(), "d".to_string())]
        );
    }
}

// ============================================================
// Collector interaction
// ============================================================

mod gc_tests {
    use super::*;

    #[test]
    fn test_barriered_store_survives_minor_collection() {
        let mut space = ObjectSpace::default();
        let array = space.new_array(0).unwrap();
        space.root(array);
        space.tenure(array).unwrap();
        assert_eq!(space.generation(array).unwrap(), Generation::Old);

        let young = space.new_string("young").unwrap();
        space.array_append(array, young).unwrap();
        space.collect_minor();

        assert!(space.contains(young));
        assert_eq!(space.array_at(array, 1_usize).unwrap(), Some(young));
    }

    #[test]
    fn test_unrooted_arrays_are_collected() {
        let mut space = ObjectSpace::default();
        let kept = space.array_of_strings(["a", "b"]).unwrap();
        let dropped = space.array_of_strings(["c"]).unwrap();
        space.root(kept);

        let report = space.collect_major();
        // the dropped array and its one string
        assert_eq!(report.freed, 2);
        assert!(space.contains(kept));
        assert!(!space.contains(dropped));
        assert_eq!(texts(&space, kept), vec!["a", "b"]);
    }

    #[test]
    fn test_items_survive_promotion() {
        let config = SpaceConfig {
            gc: GcConfig {
                nursery_threshold: 1,
                ..GcConfig::default()
            },
            ..SpaceConfig::default()
        };
        let mut space = ObjectSpace::new(config);
        let list = space.array_of_strings(["x", "y"]).unwrap();
        space.root(list);

        // nursery, then survivor, then old
        space.collect_minor();
        assert_eq!(space.generation(list).unwrap(), Generation::Survivor);
        space.collect_minor();
        assert_eq!(space.generation(list).unwrap(), Generation::Old);

        let z = space.new_string("z").unwrap();
        space.array_put(list, z, 3_usize).unwrap();
        space.collect_minor();
        space.collect_minor();
        assert_eq!(texts(&space, list), vec!["x", "y", "z"]);
    }
}
