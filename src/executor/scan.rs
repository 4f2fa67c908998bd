use std::cmp::Ordering;

use crate::executor::predicate::Predicate;
use crate::types::{
    error::{Result, StorageError},
    row::Row,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One ordering key addressing a column of the projected row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub order: SortOrder,
}

/// Aggregate applied at the very end of the pipeline, addressing a column
/// of the projected row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Collapse the result into a single row holding the integer sum.
    Sum { column: usize },
    /// Keep every row, replacing the column with its absolute value.
    Abs { column: usize },
}

impl Aggregate {
    /// Resolves an operator keyword (`SUM`, `ABS`, any case) to an aggregate.
    pub fn from_op(op: &str, column: usize) -> Result<Self> {
        match op.to_ascii_uppercase().as_str() {
            "SUM" => Ok(Aggregate::Sum { column }),
            "ABS" => Ok(Aggregate::Abs { column }),
            _ => Err(StorageError::UnsupportedAggregate { op: op.to_string() }),
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Aggregate::Sum { column } | Aggregate::Abs { column } => *column,
        }
    }
}

/// Options for a table scan. The pipeline runs in a fixed order:
/// filter, project, order, limit, aggregate. The filter addresses the
/// full row; ordering and aggregation address the projected row.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub projection: Option<Vec<usize>>,
    pub filter: Option<Predicate>,
    pub order_by: Vec<SortKey>,
    pub limit: Option<usize>,
    pub aggregate: Option<Aggregate>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, columns: Vec<usize>) -> Self {
        self.projection = Some(columns);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn order_by(mut self, column: usize, order: SortOrder) -> Self {
        self.order_by.push(SortKey { column, order });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }
}

/// Compares two cell values numerically when both parse as integers,
/// bytewise otherwise.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => a.cmp(b),
    }
}

/// Runs the scan pipeline over decoded rows. `source_width` is the column
/// count of the table schema; projection indices are validated against it,
/// ordering and aggregate indices against the projected width.
pub fn apply_pipeline(rows: Vec<Row>, options: &ScanOptions, source_width: usize) -> Result<Vec<Row>> {
    if let Some(projection) = &options.projection {
        for &column in projection {
            if column >= source_width {
                return Err(StorageError::ColumnIndexOutOfBounds { index: column });
            }
        }
    }

    let mut results = rows;

    if let Some(predicate) = &options.filter {
        results.retain(|row| predicate.matches(row));
    }

    if let Some(projection) = &options.projection {
        results = results
            .into_iter()
            .map(|row| {
                projection
                    .iter()
                    .filter_map(|&column| row.get(column).cloned())
                    .collect()
            })
            .collect();
    }

    let result_width = options
        .projection
        .as_ref()
        .map_or(source_width, |projection| projection.len());

    if !options.order_by.is_empty() {
        for key in &options.order_by {
            if key.column >= result_width {
                return Err(StorageError::ColumnIndexOutOfBounds { index: key.column });
            }
        }
        results.sort_by(|a, b| {
            for key in &options.order_by {
                // Rows truncated by a failed decode may miss the key column;
                // such a key does not order the pair.
                let (Some(left), Some(right)) = (a.get(key.column), b.get(key.column)) else {
                    continue;
                };
                let ordering = match key.order {
                    SortOrder::Ascending => compare_values(left, right),
                    SortOrder::Descending => compare_values(left, right).reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    if let Some(limit) = options.limit {
        results.truncate(limit);
    }

    match options.aggregate {
        Some(Aggregate::Sum { column }) => {
            if results.is_empty() || column >= result_width {
                return Err(StorageError::InvalidAggregateColumn { index: column });
            }
            let sum: i64 = results
                .iter()
                .filter_map(|row| row.get(column))
                .filter_map(|cell| cell.trim().parse::<i64>().ok())
                .sum();
            Ok(vec![vec![sum.to_string()]])
        }
        Some(Aggregate::Abs { column }) => {
            if results.is_empty() || column >= result_width {
                return Err(StorageError::InvalidAggregateColumn { index: column });
            }
            for row in &mut results {
                if let Some(cell) = row.get_mut(column) {
                    if let Ok(value) = cell.trim().parse::<i64>() {
                        *cell = value.abs().to_string();
                    }
                }
            }
            Ok(results)
        }
        None => Ok(results),
    }
}
