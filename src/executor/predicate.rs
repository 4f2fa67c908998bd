use std::cmp::Ordering;

use crate::executor::scan::compare_values;

/// Comparison operators for predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// A predicate expression for filtering rows. Columns are addressed by
/// position within the unprojected row.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Column comparison: row[column] op value
    Compare {
        column: usize,
        op: CompareOp,
        value: String,
    },
    /// Logical conjunction of predicates
    And(Box<Predicate>, Box<Predicate>),
    /// Always true predicate
    True,
}

impl Predicate {
    /// Create an equality predicate
    pub fn eq(column: usize, value: String) -> Self {
        Self::Compare {
            column,
            op: CompareOp::Eq,
            value,
        }
    }

    /// Create a not equal predicate
    pub fn ne(column: usize, value: String) -> Self {
        Self::Compare {
            column,
            op: CompareOp::NotEq,
            value,
        }
    }

    /// Create a less than predicate
    pub fn lt(column: usize, value: String) -> Self {
        Self::Compare {
            column,
            op: CompareOp::Lt,
            value,
        }
    }

    /// Create a less than or equal predicate
    pub fn le(column: usize, value: String) -> Self {
        Self::Compare {
            column,
            op: CompareOp::LtEq,
            value,
        }
    }

    /// Create a greater than predicate
    pub fn gt(column: usize, value: String) -> Self {
        Self::Compare {
            column,
            op: CompareOp::Gt,
            value,
        }
    }

    /// Create a greater than or equal predicate
    pub fn ge(column: usize, value: String) -> Self {
        Self::Compare {
            column,
            op: CompareOp::GtEq,
            value,
        }
    }

    /// Create an AND predicate
    pub fn and(left: Predicate, right: Predicate) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// Fold a list of predicates into a single conjunction. An empty list
    /// yields the always-true predicate.
    pub fn all(predicates: Vec<Predicate>) -> Self {
        predicates
            .into_iter()
            .reduce(Predicate::and)
            .unwrap_or(Predicate::True)
    }

    /// Evaluate the predicate against a row. Equality and inequality
    /// compare the cell text as-is; the range operators compare
    /// numerically when both sides parse as integers. A row missing the
    /// addressed column never matches.
    pub fn matches(&self, row: &[String]) -> bool {
        match self {
            Predicate::Compare { column, op, value } => {
                let Some(cell) = row.get(*column) else {
                    return false;
                };
                match op {
                    CompareOp::Eq => cell == value,
                    CompareOp::NotEq => cell != value,
                    CompareOp::Lt => compare_values(cell, value) == Ordering::Less,
                    CompareOp::LtEq => compare_values(cell, value) != Ordering::Greater,
                    CompareOp::Gt => compare_values(cell, value) == Ordering::Greater,
                    CompareOp::GtEq => compare_values(cell, value) != Ordering::Less,
                }
            }
            Predicate::And(left, right) => left.matches(row) && right.matches(row),
            Predicate::True => true,
        }
    }
}
