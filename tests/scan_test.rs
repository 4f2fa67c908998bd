use std::cmp::Ordering;

use slotdb::executor::predicate::Predicate;
use slotdb::executor::scan::{Aggregate, ScanOptions, SortOrder, apply_pipeline, compare_values};
use slotdb::types::error::StorageError;

// Test utilities
fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn people_rows() -> Vec<Vec<String>> {
    vec![
        strings(&["Alice", "20"]),
        strings(&["Bob", "30"]),
        strings(&["Carol", "40"]),
    ]
}

#[test]
fn test_plain_scan_passes_rows_through() {
    let rows = people_rows();
    let result = apply_pipeline(rows.clone(), &ScanOptions::new(), 2).unwrap();
    assert_eq!(result, rows);
}

#[test]
fn test_filter_project_order_pipeline() {
    // Filter sees the full row; ordering addresses the projected row
    let options = ScanOptions::new()
        .filter(Predicate::ge(1, "30".to_string()))
        .project(vec![1, 0])
        .order_by(0, SortOrder::Descending);

    let result = apply_pipeline(people_rows(), &options, 2).unwrap();
    assert_eq!(result, vec![strings(&["40", "Carol"]), strings(&["30", "Bob"])]);
}

#[test]
fn test_projection_validated_against_schema_width() {
    let options = ScanOptions::new().project(vec![0, 3]);
    match apply_pipeline(people_rows(), &options, 2) {
        Err(StorageError::ColumnIndexOutOfBounds { index }) => assert_eq!(index, 3),
        other => panic!("Expected ColumnIndexOutOfBounds, got {:?}", other),
    }

    // Validation fires even when there are no rows to project
    let options = ScanOptions::new().project(vec![9]);
    assert!(matches!(
        apply_pipeline(Vec::new(), &options, 2),
        Err(StorageError::ColumnIndexOutOfBounds { index: 9 })
    ));
}

#[test]
fn test_order_key_validated_against_projected_width() {
    // Column 1 exists in the schema but not in the projected row
    let options = ScanOptions::new()
        .project(vec![0])
        .order_by(1, SortOrder::Ascending);
    assert!(matches!(
        apply_pipeline(people_rows(), &options, 2),
        Err(StorageError::ColumnIndexOutOfBounds { index: 1 })
    ));

    // Without a projection the same key addresses the full row
    let options = ScanOptions::new().order_by(1, SortOrder::Ascending);
    assert!(apply_pipeline(people_rows(), &options, 2).is_ok());
}

#[test]
fn test_multi_key_sort_is_stable() {
    let rows = vec![
        strings(&["b", "2", "row0"]),
        strings(&["a", "1", "row1"]),
        strings(&["a", "3", "row2"]),
        strings(&["b", "2", "row3"]),
    ];
    let options = ScanOptions::new()
        .order_by(0, SortOrder::Ascending)
        .order_by(1, SortOrder::Descending);

    let result = apply_pipeline(rows, &options, 3).unwrap();
    // Fully tied rows keep their scan order
    assert_eq!(
        result,
        vec![
            strings(&["a", "3", "row2"]),
            strings(&["a", "1", "row1"]),
            strings(&["b", "2", "row0"]),
            strings(&["b", "2", "row3"]),
        ]
    );
}

#[test]
fn test_value_comparison_rules() {
    assert_eq!(compare_values("9", "10"), Ordering::Less);
    assert_eq!(compare_values("10", "9"), Ordering::Greater);
    assert_eq!(compare_values("-5", "3"), Ordering::Less);
    assert_eq!(compare_values(" 7 ", "7"), Ordering::Equal);
    assert_eq!(compare_values("apple", "banana"), Ordering::Less);
    // Mixed operands fall back to bytewise ordering
    assert_eq!(compare_values("10", "apple"), Ordering::Less);

    let rows = vec![strings(&["100"]), strings(&["9"]), strings(&["10"])];
    let options = ScanOptions::new().order_by(0, SortOrder::Ascending);
    let result = apply_pipeline(rows, &options, 1).unwrap();
    assert_eq!(
        result,
        vec![strings(&["9"]), strings(&["10"]), strings(&["100"])]
    );
}

#[test]
fn test_limit_truncates_results() {
    let options = ScanOptions::new().limit(2);
    assert_eq!(apply_pipeline(people_rows(), &options, 2).unwrap().len(), 2);

    let options = ScanOptions::new().limit(0);
    assert!(apply_pipeline(people_rows(), &options, 2).unwrap().is_empty());

    let options = ScanOptions::new().limit(50);
    assert_eq!(apply_pipeline(people_rows(), &options, 2).unwrap().len(), 3);
}

#[test]
fn test_sum_aggregate() {
    let rows = vec![strings(&["10"]), strings(&["20"]), strings(&["-5"])];
    let options = ScanOptions::new().aggregate(Aggregate::Sum { column: 0 });
    let result = apply_pipeline(rows, &options, 1).unwrap();
    assert_eq!(result, vec![strings(&["25"])]);

    // Cells that do not parse contribute nothing to the sum
    let rows = vec![strings(&["10"]), strings(&["oops"]), strings(&["-3"])];
    let options = ScanOptions::new().aggregate(Aggregate::Sum { column: 0 });
    let result = apply_pipeline(rows, &options, 1).unwrap();
    assert_eq!(result, vec![strings(&["7"])]);
}

#[test]
fn test_limit_applies_before_sum() {
    let rows = vec![
        strings(&["10"]),
        strings(&["20"]),
        strings(&["30"]),
        strings(&["40"]),
    ];
    let options = ScanOptions::new()
        .order_by(0, SortOrder::Descending)
        .limit(2)
        .aggregate(Aggregate::Sum { column: 0 });

    let result = apply_pipeline(rows, &options, 1).unwrap();
    assert_eq!(result, vec![strings(&["70"])]);
}

#[test]
fn test_abs_aggregate_preserves_rows() {
    let rows = vec![
        strings(&["-7", "a"]),
        strings(&["3", "b"]),
        strings(&["oops", "c"]),
    ];
    let options = ScanOptions::new().aggregate(Aggregate::Abs { column: 0 });

    let result = apply_pipeline(rows, &options, 2).unwrap();
    assert_eq!(
        result,
        vec![
            strings(&["7", "a"]),
            strings(&["3", "b"]),
            strings(&["oops", "c"]),
        ]
    );
}

#[test]
fn test_aggregate_over_empty_result_fails() {
    let options = ScanOptions::new().aggregate(Aggregate::Sum { column: 0 });
    assert!(matches!(
        apply_pipeline(Vec::new(), &options, 1),
        Err(StorageError::InvalidAggregateColumn { index: 0 })
    ));

    // A filter that eliminates every row leaves nothing to aggregate
    let options = ScanOptions::new()
        .filter(Predicate::gt(1, "100".to_string()))
        .aggregate(Aggregate::Abs { column: 1 });
    assert!(matches!(
        apply_pipeline(people_rows(), &options, 2),
        Err(StorageError::InvalidAggregateColumn { index: 1 })
    ));
}

#[test]
fn test_aggregate_column_out_of_bounds() {
    let options = ScanOptions::new().aggregate(Aggregate::Sum { column: 5 });
    assert!(matches!(
        apply_pipeline(people_rows(), &options, 2),
        Err(StorageError::InvalidAggregateColumn { index: 5 })
    ));

    // The aggregate addresses the projected row, not the schema
    let options = ScanOptions::new()
        .project(vec![0])
        .aggregate(Aggregate::Sum { column: 1 });
    assert!(matches!(
        apply_pipeline(people_rows(), &options, 2),
        Err(StorageError::InvalidAggregateColumn { index: 1 })
    ));
}

#[test]
fn test_aggregate_from_op() {
    assert_eq!(
        Aggregate::from_op("SUM", 2).unwrap(),
        Aggregate::Sum { column: 2 }
    );
    assert_eq!(
        Aggregate::from_op("abs", 0).unwrap(),
        Aggregate::Abs { column: 0 }
    );
    match Aggregate::from_op("Count", 0) {
        Err(StorageError::UnsupportedAggregate { op }) => assert_eq!(op, "Count"),
        other => panic!("Expected UnsupportedAggregate, got {:?}", other),
    }
}

#[test]
fn test_predicate_operators() {
    let row = strings(&["Alice", "30"]);

    assert!(Predicate::eq(0, "Alice".to_string()).matches(&row));
    assert!(!Predicate::eq(0, "alice".to_string()).matches(&row));
    assert!(Predicate::ne(0, "Bob".to_string()).matches(&row));
    assert!(Predicate::lt(1, "31".to_string()).matches(&row));
    assert!(Predicate::le(1, "30".to_string()).matches(&row));
    assert!(Predicate::gt(1, "29".to_string()).matches(&row));
    assert!(Predicate::ge(1, "30".to_string()).matches(&row));
    assert!(!Predicate::gt(1, "30".to_string()).matches(&row));

    // Equality is textual, so a numerically equal spelling is no match
    assert!(!Predicate::eq(1, "030".to_string()).matches(&row));
    // Range operators compare numerically: "9" < "30" as integers
    assert!(Predicate::gt(1, "9".to_string()).matches(&row));
}

#[test]
fn test_predicate_combinators() {
    let row = strings(&["Alice", "30"]);

    let range = Predicate::and(
        Predicate::ge(1, "20".to_string()),
        Predicate::lt(1, "40".to_string()),
    );
    assert!(range.matches(&row));

    assert!(Predicate::True.matches(&row));
    assert!(Predicate::all(Vec::new()).matches(&row));

    let all = Predicate::all(vec![
        Predicate::eq(0, "Alice".to_string()),
        Predicate::ne(1, "0".to_string()),
        Predicate::le(1, "30".to_string()),
    ]);
    assert!(all.matches(&row));
    assert!(!Predicate::all(vec![
        Predicate::eq(0, "Alice".to_string()),
        Predicate::eq(1, "99".to_string()),
    ])
    .matches(&row));
}

#[test]
fn test_predicate_on_missing_column_never_matches() {
    let short_row = strings(&["only"]);

    assert!(!Predicate::eq(1, "x".to_string()).matches(&short_row));
    assert!(!Predicate::ne(1, "x".to_string()).matches(&short_row));
    assert!(!Predicate::ge(1, "0".to_string()).matches(&short_row));
}

#[test]
fn test_projection_drops_ragged_cells() {
    // A truncated row lacks the projected columns; its cells are skipped
    // rather than invented
    let rows = vec![strings(&["a", "b", "c"]), strings(&["x"])];
    let options = ScanOptions::new().project(vec![1, 2]);

    let result = apply_pipeline(rows, &options, 3).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0], strings(&["b", "c"]));
    assert!(result[1].is_empty());
}
