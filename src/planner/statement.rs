use crate::executor::predicate::CompareOp;
use crate::executor::scan::SortOrder;
use crate::storage::schema::ColumnSchema;

/// A parsed SQL statement, reduced to the operations the storage engine
/// supports. Columns are still referenced by name here; the executor
/// resolves them to schema positions.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTableStatement),
    Insert(InsertStatement),
    Select(SelectStatement),
    Delete(DeleteStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub values: Vec<String>,
}

/// One item of a SELECT projection.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    Column(String),
    /// Aggregate function call, e.g. `SUM(age)`. The operator keyword is
    /// kept verbatim; the executor decides whether it is supported.
    Aggregate { op: String, column: String },
}

/// A single `column op literal` comparison from a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

/// An inner equi-join against a second table. `left_column` belongs to
/// the FROM table, `right_column` to the joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub left_column: String,
    pub right_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub column: String,
    pub order: SortOrder,
}

/// `columns: None` stands for `SELECT *`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub table: String,
    pub join: Option<JoinClause>,
    pub columns: Option<Vec<SelectColumn>>,
    pub filters: Vec<FilterClause>,
    pub order_by: Vec<OrderClause>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub filters: Vec<FilterClause>,
}
