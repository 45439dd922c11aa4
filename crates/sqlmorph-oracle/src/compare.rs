//! Result comparison.
//!
//! Cells compare by storage class. Integers, text and blobs compare exactly;
//! a relative tolerance applies only when at least one side is a real. A
//! NULL equals only another NULL. Unordered row collections are sorted by a
//! typed total order and then compared cell by cell.

use std::cmp::Ordering;

use crate::exec::{Cell, Row};

/// Relative tolerance for floating-point comparison.
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// Whether two reals agree within [`FLOAT_TOLERANCE`]. NaN matches only
/// NaN; infinities match only themselves.
pub fn reals_match(a: f64, b: f64) -> bool {
    if a == b || (a.is_nan() && b.is_nan()) {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    ((a - b).abs() / scale) < FLOAT_TOLERANCE
}

/// Exact count equality. `None` (undetermined) never equals anything.
pub const fn counts_equal(a: Option<u64>, b: Option<u64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Value equality, with tolerance only where a real is involved.
pub fn values_equal_approx(a: &Cell, b: &Cell) -> bool {
    match (a, b) {
        (Cell::Null, Cell::Null) => true,
        (Cell::Integer(x), Cell::Integer(y)) => x == y,
        (Cell::Real(x), Cell::Real(y)) => reals_match(*x, *y),
        (Cell::Integer(i), Cell::Real(r)) | (Cell::Real(r), Cell::Integer(i)) => reals_match(*i as f64, *r),
        (Cell::Text(x), Cell::Text(y)) => x == y,
        (Cell::Blob(x), Cell::Blob(y)) => x == y,
        _ => false,
    }
}

fn rows_equal_approx(a: &Row, b: &Row) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal_approx(x, y))
}

const fn class_rank(cell: &Cell) -> u8 {
    match cell {
        Cell::Null => 0,
        Cell::Integer(_) | Cell::Real(_) => 1,
        Cell::Text(_) => 2,
        Cell::Blob(_) => 3,
    }
}

/// Total order over cells: NULL, then numbers by value (integers before
/// reals of equal value), then text, then blobs. Nearly equal numbers of
/// either class sort next to each other.
pub fn cmp_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Integer(x), Cell::Integer(y)) => x.cmp(y),
        (Cell::Real(x), Cell::Real(y)) => x.total_cmp(y),
        (Cell::Integer(i), Cell::Real(r)) => (*i as f64).total_cmp(r).then(Ordering::Less),
        (Cell::Real(r), Cell::Integer(i)) => r.total_cmp(&(*i as f64)).then(Ordering::Greater),
        (Cell::Text(x), Cell::Text(y)) => x.cmp(y),
        (Cell::Blob(x), Cell::Blob(y)) => x.cmp(y),
        _ => class_rank(a).cmp(&class_rank(b)),
    }
}

fn cmp_rows(a: &Row, b: &Row) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| cmp_cells(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Rows in canonical order, for comparison and stable defect reports.
pub fn sorted_rows(rows: &[Row]) -> Vec<Row> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(cmp_rows);
    sorted
}

fn sorted_rows_equal(a: &[Row], b: &[Row]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| rows_equal_approx(x, y))
}

/// Duplicate-counting equality of two unordered row collections.
pub fn multiset_eq(a: &[Row], b: &[Row]) -> bool {
    a.len() == b.len() && sorted_rows_equal(&sorted_rows(a), &sorted_rows(b))
}

/// Equality of two row collections ignoring order and duplicates.
pub fn set_eq(a: &[Row], b: &[Row]) -> bool {
    let mut left = sorted_rows(a);
    let mut right = sorted_rows(b);
    left.dedup_by(|x, y| rows_equal_approx(x, y));
    right.dedup_by(|x, y| rows_equal_approx(x, y));
    sorted_rows_equal(&left, &right)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn int_row(values: &[i64]) -> Row {
        values.iter().map(|v| Cell::Integer(*v)).collect()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_owned())
    }

    // -----------------------------------------------------------------------
    // Single values
    // -----------------------------------------------------------------------

    #[test]
    fn one_sided_null_is_a_mismatch() {
        assert!(!values_equal_approx(&Cell::Null, &Cell::Integer(0)));
        assert!(!values_equal_approx(&Cell::Text(String::new()), &Cell::Null));
        assert!(!values_equal_approx(&Cell::Null, &text("NULL")));
        assert!(values_equal_approx(&Cell::Null, &Cell::Null));
    }

    #[test]
    fn float_tolerance_applies_only_to_reals() {
        assert!(values_equal_approx(&Cell::Real(0.1 + 0.2), &Cell::Real(0.3)));
        assert!(!values_equal_approx(&Cell::Real(1.0), &Cell::Real(1.001)));
        assert!(values_equal_approx(&Cell::Integer(3), &Cell::Real(3.0)));
        assert!(!values_equal_approx(&Cell::Integer(10_000_000_000), &Cell::Integer(10_000_000_001)));
        assert!(!values_equal_approx(&Cell::Real(f64::INFINITY), &Cell::Real(f64::NEG_INFINITY)));
    }

    #[test]
    fn storage_classes_do_not_mix() {
        assert!(!values_equal_approx(&Cell::Integer(3), &text("3")));
        assert!(!values_equal_approx(&text("1e2"), &text("100")));
        assert!(!values_equal_approx(&Cell::Blob(b"x'00'".to_vec()), &text("x'00'")));
        assert!(!values_equal_approx(&Cell::Blob(vec![0]), &text("x'00'")));
        assert!(values_equal_approx(&Cell::Blob(vec![0, 1]), &Cell::Blob(vec![0, 1])));
    }

    #[test]
    fn undetermined_counts_never_match() {
        assert!(counts_equal(Some(2), Some(2)));
        assert!(!counts_equal(Some(2), Some(3)));
        assert!(!counts_equal(None, None));
        assert!(!counts_equal(Some(0), None));
    }

    // -----------------------------------------------------------------------
    // Row collections
    // -----------------------------------------------------------------------

    #[test]
    fn multiset_counts_duplicates() {
        let a = vec![int_row(&[1]), int_row(&[1]), int_row(&[2])];
        let b = vec![int_row(&[2]), int_row(&[1]), int_row(&[1])];
        let c = vec![int_row(&[2]), int_row(&[1])];
        assert!(multiset_eq(&a, &b));
        assert!(!multiset_eq(&a, &c));
        assert!(set_eq(&a, &c));
    }

    #[test]
    fn null_cells_in_rows() {
        let a = vec![vec![Cell::Integer(3), Cell::Null], vec![Cell::Integer(1), Cell::Integer(2)]];
        let b = vec![vec![Cell::Integer(1), Cell::Integer(2)], vec![Cell::Integer(3), Cell::Null]];
        assert!(multiset_eq(&a, &b));
        assert_eq!(sorted_rows(&a), sorted_rows(&b));
    }

    #[test]
    fn row_comparison_is_exact_for_discrete_values() {
        let big = 1_i64 << 53;
        assert!(!multiset_eq(&[int_row(&[big + 1])], &[int_row(&[big])]));
        assert!(!multiset_eq(&[vec![Cell::Null]], &[vec![text("NULL")]]));
        assert!(!multiset_eq(&[vec![text("1e2")]], &[vec![text("100")]]));
        assert!(!set_eq(&[vec![Cell::Null]], &[vec![text("NULL")]]));
        assert!(!set_eq(&[int_row(&[big + 1])], &[int_row(&[big])]));
    }

    #[test]
    fn nearly_equal_reals_pair_up_after_sorting() {
        let a = vec![vec![Cell::Real(0.3)], vec![Cell::Integer(1)], vec![Cell::Real(2.0)]];
        let b = vec![vec![Cell::Real(2.0)], vec![Cell::Real(0.1 + 0.2)], vec![Cell::Integer(1)]];
        assert!(multiset_eq(&a, &b));
    }

    #[test]
    fn mixed_classes_sort_null_numbers_text_blob() {
        let rows = vec![
            vec![Cell::Blob(vec![1])],
            vec![text("a")],
            vec![Cell::Real(1.5)],
            vec![Cell::Null],
            vec![Cell::Integer(2)],
            vec![Cell::Integer(1)],
        ];
        assert_eq!(
            sorted_rows(&rows),
            vec![
                vec![Cell::Null],
                vec![Cell::Integer(1)],
                vec![Cell::Real(1.5)],
                vec![Cell::Integer(2)],
                vec![text("a")],
                vec![Cell::Blob(vec![1])],
            ]
        );
    }

    proptest! {
        #[test]
        fn multiset_eq_ignores_order(mut rows in prop::collection::vec(prop::collection::vec(-3i64..3, 1..3), 0..12), seed in any::<u64>()) {
            let original: Vec<Row> = rows.iter().map(|r| int_row(r)).collect();
            let n = rows.len().max(1);
            rows.rotate_left((seed as usize) % n);
            let rotated: Vec<Row> = rows.iter().map(|r| int_row(r)).collect();
            prop_assert!(multiset_eq(&original, &rotated));
        }

        #[test]
        fn cell_order_is_antisymmetric(a in -5i64..5, b in -5.0f64..5.0) {
            let (x, y) = (Cell::Integer(a), Cell::Real(b));
            prop_assert_eq!(cmp_cells(&x, &y), cmp_cells(&y, &x).reverse());
        }
    }
}
