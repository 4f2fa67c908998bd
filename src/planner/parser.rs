use crate::{
    planner::{
        error::PlannerError,
        statement::{
            CreateTableStatement, DeleteStatement, FilterClause, InsertStatement, JoinClause,
            OrderClause, SelectColumn, SelectStatement, Statement,
        },
    },
    executor::{predicate::CompareOp, scan::SortOrder},
    storage::schema::{ColumnSchema, ColumnType},
};
use sqlparser::{
    ast::{
        BinaryOperator, DataType as SqlDataType, Expr, FromTable, Function, FunctionArg,
        FunctionArgExpr, FunctionArguments, Join, JoinConstraint, JoinOperator, Query, Select,
        SelectItem, SetExpr, Statement as SqlStatement, TableFactor, TableObject, UnaryOperator,
        Value,
    },
    dialect::SQLiteDialect,
    parser::Parser,
};

pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_sql(&self, sql: &str) -> Result<Statement, PlannerError> {
        let dialect = SQLiteDialect {};
        let statements = Parser::parse_sql(&dialect, sql)?;

        if statements.len() != 1 {
            return Err(PlannerError::InvalidQuery(
                "Expected exactly one statement".to_string(),
            ));
        }

        self.to_statement(&statements[0])
    }

    fn to_statement(&self, statement: &SqlStatement) -> Result<Statement, PlannerError> {
        match statement {
            SqlStatement::CreateTable(create) => {
                let mut columns = Vec::with_capacity(create.columns.len());
                for column in &create.columns {
                    let column_type = self.convert_data_type(&column.data_type)?;
                    columns.push(ColumnSchema::new(column.name.value.clone(), column_type));
                }
                Ok(Statement::CreateTable(CreateTableStatement {
                    table: create.name.to_string(),
                    columns,
                }))
            }
            SqlStatement::Insert(insert) => {
                let table = match &insert.table {
                    TableObject::TableName(name) => name.to_string(),
                    other => {
                        return Err(PlannerError::UnsupportedStatement(format!("{:?}", other)));
                    }
                };
                if !insert.columns.is_empty() {
                    return Err(PlannerError::InvalidQuery(
                        "INSERT with an explicit column list is not supported".to_string(),
                    ));
                }
                let values = self.insert_values(insert.source.as_deref())?;
                Ok(Statement::Insert(InsertStatement { table, values }))
            }
            SqlStatement::Query(query) => self.convert_query(query),
            SqlStatement::Delete(delete) => {
                let tables = match &delete.from {
                    FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                        tables
                    }
                };
                let [table] = tables.as_slice() else {
                    return Err(PlannerError::InvalidQuery(
                        "DELETE expects exactly one table".to_string(),
                    ));
                };
                if !table.joins.is_empty() {
                    return Err(PlannerError::UnsupportedJoin(
                        "DELETE does not support JOIN".to_string(),
                    ));
                }
                let mut filters = Vec::new();
                if let Some(selection) = &delete.selection {
                    self.collect_filters(selection, &mut filters)?;
                }
                Ok(Statement::Delete(DeleteStatement {
                    table: self.table_name(&table.relation)?,
                    filters,
                }))
            }
            _ => Err(PlannerError::UnsupportedStatement(format!("{:?}", statement))),
        }
    }

    fn convert_query(&self, query: &Query) -> Result<Statement, PlannerError> {
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(PlannerError::UnsupportedStatement(format!(
                "{:?}",
                query.body
            )));
        };

        let [from] = select.from.as_slice() else {
            return Err(PlannerError::InvalidQuery(
                "Expected exactly one table in FROM".to_string(),
            ));
        };
        let table = self.table_name(&from.relation)?;

        let join = match from.joins.as_slice() {
            [] => None,
            [join] => Some(self.convert_join(&table, join)?),
            _ => {
                return Err(PlannerError::UnsupportedJoin(
                    "At most one JOIN is supported".to_string(),
                ));
            }
        };

        let columns = self.convert_projection(select)?;

        let mut filters = Vec::new();
        if let Some(selection) = &select.selection {
            self.collect_filters(selection, &mut filters)?;
        }

        let mut order_by = Vec::new();
        if let Some(order) = &query.order_by {
            for order_expr in &order.exprs {
                let (_, column) = self.column_ref(&order_expr.expr)?;
                let direction = match order_expr.asc {
                    Some(false) => SortOrder::Descending,
                    _ => SortOrder::Ascending,
                };
                order_by.push(OrderClause {
                    column,
                    order: direction,
                });
            }
        }

        let limit = match &query.limit {
            Some(Expr::Value(Value::Number(number, _))) => {
                Some(number.parse::<usize>().map_err(|_| {
                    PlannerError::InvalidQuery(format!("Invalid LIMIT value: {}", number))
                })?)
            }
            Some(other) => {
                return Err(PlannerError::UnsupportedExpression(format!("{:?}", other)));
            }
            None => None,
        };

        Ok(Statement::Select(SelectStatement {
            table,
            join,
            columns,
            filters,
            order_by,
            limit,
        }))
    }

    fn convert_projection(
        &self,
        select: &Select,
    ) -> Result<Option<Vec<SelectColumn>>, PlannerError> {
        if let [SelectItem::Wildcard(_)] = select.projection.as_slice() {
            return Ok(None);
        }
        let mut columns = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            let SelectItem::UnnamedExpr(expr) = item else {
                return Err(PlannerError::UnsupportedExpression(format!("{:?}", item)));
            };
            match expr {
                Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                    let (_, column) = self.column_ref(expr)?;
                    columns.push(SelectColumn::Column(column));
                }
                Expr::Function(function) => columns.push(self.convert_aggregate(function)?),
                other => {
                    return Err(PlannerError::UnsupportedExpression(format!("{:?}", other)));
                }
            }
        }
        Ok(Some(columns))
    }

    fn convert_aggregate(&self, function: &Function) -> Result<SelectColumn, PlannerError> {
        let FunctionArguments::List(list) = &function.args else {
            return Err(PlannerError::InvalidQuery(
                "Aggregate functions take exactly one column argument".to_string(),
            ));
        };
        let [FunctionArg::Unnamed(FunctionArgExpr::Expr(argument))] = list.args.as_slice() else {
            return Err(PlannerError::InvalidQuery(
                "Aggregate functions take exactly one column argument".to_string(),
            ));
        };
        let (_, column) = self.column_ref(argument)?;
        Ok(SelectColumn::Aggregate {
            op: function.name.to_string(),
            column,
        })
    }

    fn convert_join(&self, from_table: &str, join: &Join) -> Result<JoinClause, PlannerError> {
        let join_table = self.table_name(&join.relation)?;
        let constraint = match &join.join_operator {
            JoinOperator::Inner(JoinConstraint::On(expr)) => expr,
            other => {
                return Err(PlannerError::UnsupportedJoin(format!("{:?}", other)));
            }
        };
        let Expr::BinaryOp { left, op, right } = constraint else {
            return Err(PlannerError::UnsupportedExpression(format!(
                "{:?}",
                constraint
            )));
        };
        if *op != BinaryOperator::Eq {
            return Err(PlannerError::UnsupportedJoin(
                "JOIN supports only equality constraints".to_string(),
            ));
        }
        let (left_qualifier, left_column) = self.column_ref(left)?;
        let (right_qualifier, right_column) = self.column_ref(right)?;

        // `ON a.x = b.y` may name the sides in either order; put the FROM
        // table's column first when qualifiers identify the sides.
        let swapped = left_qualifier.as_deref() == Some(join_table.as_str())
            || right_qualifier.as_deref() == Some(from_table);
        let (left_column, right_column) = if swapped {
            (right_column, left_column)
        } else {
            (left_column, right_column)
        };

        Ok(JoinClause {
            table: join_table,
            left_column,
            right_column,
        })
    }

    fn insert_values(&self, source: Option<&Query>) -> Result<Vec<String>, PlannerError> {
        let Some(query) = source else {
            return Err(PlannerError::InvalidQuery(
                "INSERT requires a VALUES clause".to_string(),
            ));
        };
        let SetExpr::Values(values) = query.body.as_ref() else {
            return Err(PlannerError::InvalidQuery(
                "INSERT requires a VALUES clause".to_string(),
            ));
        };
        let [row] = values.rows.as_slice() else {
            return Err(PlannerError::InvalidQuery(
                "INSERT takes exactly one row of values".to_string(),
            ));
        };
        row.iter().map(|expr| self.literal_value(expr)).collect()
    }

    /// Flattens an AND chain of `column op literal` comparisons. Anything
    /// else in the WHERE clause is rejected.
    fn collect_filters(
        &self,
        expr: &Expr,
        filters: &mut Vec<FilterClause>,
    ) -> Result<(), PlannerError> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                self.collect_filters(left, filters)?;
                self.collect_filters(right, filters)?;
                Ok(())
            }
            Expr::BinaryOp { left, op, right } => {
                let (_, column) = self.column_ref(left)?;
                let op = self.convert_compare_op(op)?;
                let value = self.literal_value(right)?;
                filters.push(FilterClause { column, op, value });
                Ok(())
            }
            Expr::Nested(inner) => self.collect_filters(inner, filters),
            other => Err(PlannerError::UnsupportedExpression(format!("{:?}", other))),
        }
    }

    fn convert_compare_op(&self, op: &BinaryOperator) -> Result<CompareOp, PlannerError> {
        match op {
            BinaryOperator::Eq => Ok(CompareOp::Eq),
            BinaryOperator::NotEq => Ok(CompareOp::NotEq),
            BinaryOperator::Lt => Ok(CompareOp::Lt),
            BinaryOperator::LtEq => Ok(CompareOp::LtEq),
            BinaryOperator::Gt => Ok(CompareOp::Gt),
            BinaryOperator::GtEq => Ok(CompareOp::GtEq),
            other => Err(PlannerError::UnsupportedExpression(format!("{:?}", other))),
        }
    }

    /// Splits a column reference into optional table qualifier and column
    /// name. Deeper qualification (`db.table.column`) is rejected.
    fn column_ref(&self, expr: &Expr) -> Result<(Option<String>, String), PlannerError> {
        match expr {
            Expr::Identifier(ident) => Ok((None, ident.value.clone())),
            Expr::CompoundIdentifier(parts) => match parts.as_slice() {
                [qualifier, column] => {
                    Ok((Some(qualifier.value.clone()), column.value.clone()))
                }
                _ => Err(PlannerError::UnsupportedExpression(format!("{:?}", expr))),
            },
            other => Err(PlannerError::UnsupportedExpression(format!("{:?}", other))),
        }
    }

    fn literal_value(&self, expr: &Expr) -> Result<String, PlannerError> {
        match expr {
            Expr::Value(Value::Number(number, _)) => Ok(number.clone()),
            Expr::Value(Value::SingleQuotedString(text)) => Ok(text.clone()),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => Ok(format!("-{}", self.literal_value(expr)?)),
            // Unquoted words show up as identifiers; take them verbatim.
            Expr::Identifier(ident) => Ok(ident.value.clone()),
            other => Err(PlannerError::UnsupportedExpression(format!("{:?}", other))),
        }
    }

    fn table_name(&self, factor: &TableFactor) -> Result<String, PlannerError> {
        match factor {
            TableFactor::Table { name, .. } => Ok(name.to_string()),
            other => Err(PlannerError::UnsupportedStatement(format!("{:?}", other))),
        }
    }

    fn convert_data_type(&self, sql_type: &SqlDataType) -> Result<ColumnType, PlannerError> {
        match sql_type {
            SqlDataType::Int(_) => Ok(ColumnType::Int),
            SqlDataType::Integer(_) => Ok(ColumnType::Int),
            SqlDataType::Text => Ok(ColumnType::Text),
            SqlDataType::Varchar(_) => Ok(ColumnType::Text),
            SqlDataType::Char(_) => Ok(ColumnType::Text),
            _ => Err(PlannerError::UnsupportedDataType(format!("{:?}", sql_type))),
        }
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}
