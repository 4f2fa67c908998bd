use std::collections::HashMap;

use crate::executor::predicate::Predicate;
use crate::executor::scan::{self, Aggregate, ScanOptions};
use crate::planner::statement::{
    CreateTableStatement, DeleteStatement, FilterClause, InsertStatement, JoinClause,
    SelectColumn, SelectStatement, Statement,
};
use crate::storage::file_storage::FileStorage;
use crate::types::{
    RecordId,
    error::{Result, StorageError},
    row::Row,
};

/// Result of executing one SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    Created { table: String },
    Inserted { record_id: RecordId },
    Rows { columns: Vec<String>, rows: Vec<Row> },
    Deleted { count: usize },
}

/// Executes parsed statements against a storage engine. Symbolic column
/// references are resolved to schema positions here; the storage layer
/// works purely with indices.
pub struct StatementExecutor<'a> {
    storage: &'a mut FileStorage,
}

impl<'a> StatementExecutor<'a> {
    pub fn new(storage: &'a mut FileStorage) -> Self {
        Self { storage }
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<StatementResult> {
        match statement {
            Statement::CreateTable(create) => self.execute_create(create),
            Statement::Insert(insert) => self.execute_insert(insert),
            Statement::Select(select) => self.execute_select(select),
            Statement::Delete(delete) => self.execute_delete(delete),
        }
    }

    fn execute_create(&mut self, statement: &CreateTableStatement) -> Result<StatementResult> {
        self.storage
            .create(&statement.table, statement.columns.clone())?;
        Ok(StatementResult::Created {
            table: statement.table.clone(),
        })
    }

    fn execute_insert(&mut self, statement: &InsertStatement) -> Result<StatementResult> {
        let record_id = self.storage.insert(&statement.table, &statement.values)?;
        Ok(StatementResult::Inserted { record_id })
    }

    fn execute_delete(&mut self, statement: &DeleteStatement) -> Result<StatementResult> {
        let names = self.storage.column_names(&statement.table)?;
        let predicate = build_predicate(&statement.filters, &names, &statement.table)?;
        let count = self.storage.delete_where(&statement.table, &predicate)?;
        Ok(StatementResult::Deleted { count })
    }

    fn execute_select(&mut self, statement: &SelectStatement) -> Result<StatementResult> {
        match &statement.join {
            Some(join) => self.execute_join_select(statement, join),
            None => self.execute_table_select(statement),
        }
    }

    fn execute_table_select(&mut self, statement: &SelectStatement) -> Result<StatementResult> {
        let names = self.storage.column_names(&statement.table)?;
        let (options, columns) = build_scan_options(statement, &names, &statement.table)?;
        let rows = self.storage.scan(&statement.table, &options)?;
        Ok(StatementResult::Rows { columns, rows })
    }

    fn execute_join_select(
        &mut self,
        statement: &SelectStatement,
        join: &JoinClause,
    ) -> Result<StatementResult> {
        let left_names = self.storage.column_names(&statement.table)?;
        let right_names = self.storage.column_names(&join.table)?;
        let left_key = resolve_column(&left_names, &join.left_column, &statement.table)?;
        let right_key = resolve_column(&right_names, &join.right_column, &join.table)?;

        let left_rows = self.storage.scan(&statement.table, &ScanOptions::new())?;
        let right_rows = self.storage.scan(&join.table, &ScanOptions::new())?;

        // Hash join: bucket the joined table by key value, probe with the
        // FROM table's rows so their order is preserved.
        let mut buckets: HashMap<&str, Vec<&Row>> = HashMap::new();
        for row in &right_rows {
            if let Some(key) = row.get(right_key) {
                buckets.entry(key.as_str()).or_default().push(row);
            }
        }
        let mut combined = Vec::new();
        for left_row in &left_rows {
            let Some(key) = left_row.get(left_key) else {
                continue;
            };
            let Some(matches) = buckets.get(key.as_str()) else {
                continue;
            };
            for right_row in matches {
                let mut row = left_row.clone();
                row.extend(right_row.iter().cloned());
                combined.push(row);
            }
        }

        // Joined rows expose every column of both tables, FROM table first;
        // a duplicated name resolves to the FROM table's column.
        let mut all_names = left_names;
        all_names.extend(right_names);
        let scope = format!("{} JOIN {}", statement.table, join.table);
        let (options, columns) = build_scan_options(statement, &all_names, &scope)?;
        let rows = scan::apply_pipeline(combined, &options, all_names.len())?;
        Ok(StatementResult::Rows { columns, rows })
    }
}

fn resolve_column(names: &[String], name: &str, scope: &str) -> Result<usize> {
    names
        .iter()
        .position(|candidate| candidate == name)
        .ok_or_else(|| StorageError::ColumnNotFound {
            name: name.to_string(),
            table: scope.to_string(),
        })
}

fn build_predicate(filters: &[FilterClause], names: &[String], scope: &str) -> Result<Predicate> {
    let mut parts = Vec::with_capacity(filters.len());
    for filter in filters {
        let column = resolve_column(names, &filter.column, scope)?;
        parts.push(Predicate::Compare {
            column,
            op: filter.op,
            value: filter.value.clone(),
        });
    }
    Ok(Predicate::all(parts))
}

/// Translates a SELECT into scan options plus the header of the result.
/// Projection and filters address the source row; ordering and the
/// aggregate address the projected row, so their positions are resolved
/// against the projected column names.
fn build_scan_options(
    statement: &SelectStatement,
    source_names: &[String],
    scope: &str,
) -> Result<(ScanOptions, Vec<String>)> {
    let mut options = ScanOptions::new();
    let mut header: Vec<String>;
    let projected_names: Vec<String>;

    match &statement.columns {
        None => {
            projected_names = source_names.to_vec();
            header = source_names.to_vec();
        }
        Some(items) => {
            let mut projection = Vec::with_capacity(items.len());
            let mut aggregate: Option<(String, usize)> = None;
            let mut names = Vec::with_capacity(items.len());
            header = Vec::with_capacity(items.len());
            for (position, item) in items.iter().enumerate() {
                match item {
                    SelectColumn::Column(name) => {
                        projection.push(resolve_column(source_names, name, scope)?);
                        names.push(name.clone());
                        header.push(name.clone());
                    }
                    SelectColumn::Aggregate { op, column } => {
                        if let Some((first, _)) = &aggregate {
                            return Err(StorageError::UnsupportedAggregate {
                                op: format!("{} combined with {}", first, op),
                            });
                        }
                        projection.push(resolve_column(source_names, column, scope)?);
                        names.push(column.clone());
                        header.push(format!("{}({})", op.to_uppercase(), column));
                        aggregate = Some((op.clone(), position));
                    }
                }
            }
            projected_names = names;
            options = options.project(projection);
            if let Some((op, position)) = aggregate {
                let aggregate = Aggregate::from_op(&op, position)?;
                if let Aggregate::Sum { column } = aggregate {
                    // SUM collapses the result to a single column.
                    header = vec![header[column].clone()];
                }
                options = options.aggregate(aggregate);
            }
        }
    }

    if !statement.filters.is_empty() {
        options = options.filter(build_predicate(&statement.filters, source_names, scope)?);
    }

    for clause in &statement.order_by {
        let index = resolve_column(&projected_names, &clause.column, scope)?;
        options = options.order_by(index, clause.order);
    }

    if let Some(limit) = statement.limit {
        options = options.limit(limit);
    }

    Ok((options, header))
}
