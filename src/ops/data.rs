//! INSERT / SELECT / UPDATE / DELETE.
//!
//! Every operation re-reads the table from disk, works on the in-memory
//! row set, and persists whole files. Nothing is written until all
//! validation has passed, so a failed statement leaves the table
//! untouched; there is no cross-statement locking (concurrent writers to
//! one table are last-writer-wins).

use std::path::PathBuf;

use indexmap::IndexMap;
use sqlparser::ast::{
    AssignmentTarget, BinaryOperator, Expr, SelectItem, SetExpr, Statement, TableFactor,
    TableObject, Update as UpdateStatement,
};
use tokio::fs;
use tracing::{debug, info};

use super::{table_csv_path, table_meta_path};
use crate::error::EngineError;
use crate::metadata::{ColumnMeta, TableMetadata};
use crate::rows::RowSet;
use crate::sql::predicate::RowPredicate;
use crate::sql::{SqlLiteral, literal_from_expr, object_name_to_string, parse_one, unquote_identifier};
use crate::types::handler::TypeHandler;
use crate::types::{Row, Value};

/// Row-level statements against one database directory.
#[derive(Debug, Clone)]
pub struct DataOperations {
    base_dir: PathBuf,
    type_handler: TypeHandler,
}

impl DataOperations {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        DataOperations {
            base_dir: base_dir.into(),
            type_handler: TypeHandler::new(),
        }
    }

    /// Execute an INSERT statement.
    ///
    /// Values are coerced and validated per row; PK/UNIQUE run against
    /// the combined existing-plus-new row set. On success the rows and
    /// the bumped SERIAL counters are persisted together.
    pub async fn insert(&self, sql: &str, database: &str) -> Result<(), EngineError> {
        let insert = match parse_one(sql)? {
            Statement::Insert(insert) => insert,
            _ => return Err(EngineError::parse("Invalid INSERT statement")),
        };
        let table = match &insert.table {
            TableObject::TableName(name) => object_name_to_string(name),
            _ => return Err(EngineError::parse("Invalid INSERT target")),
        };

        let csv_path = table_csv_path(&self.base_dir, database, &table);
        let meta_path = table_meta_path(&self.base_dir, database, &table);
        if !fs::try_exists(&csv_path).await? {
            return Err(EngineError::TableNotFound(table));
        }
        let mut metadata = TableMetadata::load(&meta_path).await?;

        // Target column list: explicit, else every non-SERIAL column in
        // declaration order.
        let target_columns: Vec<String> = if insert.columns.is_empty() {
            metadata
                .columns
                .iter()
                .filter(|(_, meta)| !meta.is_serial)
                .map(|(name, _)| name.clone())
                .collect()
        } else {
            let columns: Vec<String> = insert
                .columns
                .iter()
                .map(|ident| unquote_identifier(&ident.value))
                .collect();
            for column in &columns {
                if !metadata.columns.contains_key(column) {
                    return Err(EngineError::UnknownColumn {
                        column: column.clone(),
                        table,
                    });
                }
            }
            columns
        };

        let source = insert
            .source
            .ok_or_else(|| EngineError::parse("INSERT without a VALUES clause"))?;
        let values = match *source.body {
            SetExpr::Values(values) => values,
            _ => return Err(EngineError::parse("INSERT source must be VALUES")),
        };

        let mut new_rows: Vec<Row> = Vec::with_capacity(values.rows.len());
        for tuple in &values.rows {
            if tuple.len() > target_columns.len() {
                return Err(EngineError::parse(format!(
                    "INSERT supplies {} values for {} target columns",
                    tuple.len(),
                    target_columns.len()
                )));
            }

            let mut row: Row = IndexMap::with_capacity(metadata.columns.len());
            for (name, meta) in metadata.columns.iter_mut() {
                let value = if meta.is_serial {
                    let counter = meta.auto_increment_counter.unwrap_or(1);
                    meta.auto_increment_counter = Some(counter + 1);
                    Value::Int(counter)
                } else if let Some(default) = meta.default.clone() {
                    self.materialise_default(&default, &meta.data_type)?
                } else {
                    Value::Null
                };
                row.insert(name.clone(), value);
            }

            for (i, expr) in tuple.iter().enumerate() {
                let column = &target_columns[i];
                let meta = metadata
                    .columns
                    .get(column)
                    .ok_or_else(|| EngineError::UnknownColumn {
                        column: column.clone(),
                        table: table.clone(),
                    })?;
                // SERIAL values are auto-assigned; a provided one is ignored.
                if meta.is_serial {
                    continue;
                }

                let literal = literal_from_expr(expr)?;
                if literal.is_string() && meta.data_type.to_uppercase().contains("INT") {
                    return Err(EngineError::type_error(format!(
                        "String literal cannot be used for INT column '{}'",
                        column
                    )));
                }
                let coerced = self
                    .type_handler
                    .coerce(literal.into_value()?, &meta.data_type)?;
                row.insert(column.clone(), coerced);
            }

            for (name, meta) in metadata.columns.iter() {
                if meta.rejects_null() && row[name.as_str()].is_null() {
                    return Err(EngineError::constraint(format!(
                        "Column '{}' cannot be NULL",
                        name
                    )));
                }
            }

            new_rows.push(row);
        }

        let mut set = RowSet::load(&csv_path, &metadata).await?;
        set.rows.extend(new_rows);
        enforce_distinct(&metadata, &set)?;

        tokio::try_join!(set.persist(&csv_path), metadata.save(&meta_path))?;
        info!("Inserted into '{}' in database '{}'", table, database);
        Ok(())
    }

    /// Execute a SELECT statement and return the matching rows.
    pub async fn select(&self, sql: &str, database: &str) -> Result<Vec<Row>, EngineError> {
        let query = match parse_one(sql)? {
            Statement::Query(query) => query,
            _ => return Err(EngineError::parse("Invalid SELECT statement")),
        };
        let select = match *query.body {
            SetExpr::Select(select) => select,
            _ => return Err(EngineError::parse("Invalid SELECT statement")),
        };

        let table = single_table_name(&select.from)?;
        let csv_path = table_csv_path(&self.base_dir, database, &table);
        if !fs::try_exists(&csv_path).await? {
            return Err(EngineError::TableNotFound(table));
        }
        let metadata = TableMetadata::load(&table_meta_path(&self.base_dir, database, &table)).await?;
        let set = RowSet::load(&csv_path, &metadata).await?;

        let rows: Vec<Row> = match &select.selection {
            Some(condition) => {
                let predicate = RowPredicate::lower(condition)?;
                set.rows
                    .into_iter()
                    .filter(|row| predicate.matches(row))
                    .collect()
            }
            None => set.rows,
        };

        let projected = project(&select.projection, rows, &table)?;
        debug!(
            "Selected {} rows from '{}' in database '{}'",
            projected.len(),
            table,
            database
        );
        Ok(projected)
    }

    /// Execute an UPDATE statement.
    ///
    /// Array columns support `col = col || 'elem'` (append, idempotent)
    /// and `col = col - 'elem'` (remove). Plain assignments store the
    /// literal without re-running type coercion (known limitation).
    pub async fn update_row(&self, sql: &str, database: &str) -> Result<(), EngineError> {
        let (target_table, assignments, selection) = match parse_one(sql)? {
            Statement::Update(UpdateStatement {
                table,
                assignments,
                selection,
                ..
            }) => (table, assignments, selection),
            _ => return Err(EngineError::parse("Invalid UPDATE statement")),
        };
        let table = match &target_table.relation {
            TableFactor::Table { name, .. } => object_name_to_string(&name),
            _ => return Err(EngineError::parse("Invalid UPDATE target")),
        };

        let csv_path = table_csv_path(&self.base_dir, database, &table);
        if !fs::try_exists(&csv_path).await? {
            return Err(EngineError::TableNotFound(table));
        }
        let metadata = TableMetadata::load(&table_meta_path(&self.base_dir, database, &table)).await?;
        let mut set = RowSet::load(&csv_path, &metadata).await?;

        let mask: Vec<bool> = match &selection {
            Some(condition) => {
                let predicate = RowPredicate::lower(condition)?;
                set.rows.iter().map(|row| predicate.matches(row)).collect()
            }
            None => vec![true; set.rows.len()],
        };

        for assignment in &assignments {
            let column = match &assignment.target {
                AssignmentTarget::ColumnName(name) => object_name_to_string(&name),
                _ => return Err(EngineError::parse("Invalid UPDATE assignment target")),
            };
            let meta = metadata
                .columns
                .get(&column)
                .ok_or_else(|| EngineError::UnknownColumn {
                    column: column.clone(),
                    table: table.clone(),
                })?;

            match array_op(&assignment.value, meta)? {
                Some(ArrayOp::Append(element)) => {
                    apply_masked(&mut set.rows, &mask, |row| {
                        let items = match row.get(&column) {
                            Some(Value::Array(items)) => {
                                let mut items = items.clone();
                                if !items.contains(&element) {
                                    items.push(element.clone());
                                }
                                items
                            }
                            Some(Value::Null) | None => vec![element.clone()],
                            // Unparseable storage: start over with the new element.
                            Some(_) => vec![element.clone()],
                        };
                        row.insert(column.clone(), Value::Array(items));
                    });
                }
                Some(ArrayOp::Remove(element)) => {
                    apply_masked(&mut set.rows, &mask, |row| {
                        let items = match row.get(&column) {
                            Some(Value::Array(items)) => {
                                items.iter().filter(|i| **i != element).cloned().collect()
                            }
                            // Blank or invalid storage resets to empty.
                            _ => Vec::new(),
                        };
                        row.insert(column.clone(), Value::Array(items));
                    });
                }
                None => {
                    let value = literal_from_expr(&assignment.value)?.into_value()?;
                    apply_masked(&mut set.rows, &mask, |row| {
                        row.insert(column.clone(), value.clone());
                    });
                }
            }
        }

        set.persist(&csv_path).await?;
        info!("Updated '{}' in database '{}'", table, database);
        Ok(())
    }

    /// Execute a DELETE statement. Without a WHERE clause every row is
    /// removed; the header and schema stay intact.
    pub async fn delete_row(&self, sql: &str, database: &str) -> Result<(), EngineError> {
        let delete = match parse_one(sql)? {
            Statement::Delete(delete) => delete,
            _ => return Err(EngineError::parse("Invalid DELETE statement")),
        };
        let from = match &delete.from {
            sqlparser::ast::FromTable::WithFromKeyword(tables)
            | sqlparser::ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let table = single_table_name(from)?;

        let csv_path = table_csv_path(&self.base_dir, database, &table);
        if !fs::try_exists(&csv_path).await? {
            return Err(EngineError::TableNotFound(table));
        }
        let metadata = TableMetadata::load(&table_meta_path(&self.base_dir, database, &table)).await?;
        let mut set = RowSet::load(&csv_path, &metadata).await?;

        match &delete.selection {
            Some(condition) => {
                let predicate = RowPredicate::lower(condition)?;
                set.rows.retain(|row| !predicate.matches(row));
            }
            None => set.rows.clear(),
        }

        set.persist(&csv_path).await?;
        info!("Deleted from '{}' in database '{}'", table, database);
        Ok(())
    }

    /// Turn a recorded default into a row value: `[]` becomes a fresh
    /// empty list, the timestamp sentinel materialises, everything else
    /// coerces like an inserted literal.
    fn materialise_default(
        &self,
        default: &serde_json::Value,
        declared_type: &str,
    ) -> Result<Value, EngineError> {
        let raw = match default {
            serde_json::Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Null => Value::Null,
            other => Value::Text(other.to_string()),
        };
        self.type_handler.coerce(raw, declared_type)
    }
}

/// PK/UNIQUE columns must hold distinct values across the combined row
/// set. NULL never collides with NULL; PRIMARY KEY NULLs are already
/// rejected per row before this runs.
fn enforce_distinct(metadata: &TableMetadata, set: &RowSet) -> Result<(), EngineError> {
    for (name, meta) in metadata.columns.iter() {
        if !meta.requires_distinct() {
            continue;
        }
        let mut seen: Vec<&Value> = Vec::with_capacity(set.rows.len());
        for row in &set.rows {
            let value = row.get(name).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }
            if seen.iter().any(|existing| existing.loosely_eq(value)) {
                let kind = if meta.primary_key {
                    "primary key"
                } else {
                    "unique"
                };
                return Err(EngineError::constraint(format!(
                    "Duplicate value in {} column '{}'",
                    kind, name
                )));
            }
            seen.push(value);
        }
    }
    Ok(())
}

/// The array algebra recognised on the right-hand side of SET.
enum ArrayOp {
    Append(String),
    Remove(String),
}

/// Recognise `col || 'elem'` / `col - 'elem'` against an ARRAY column.
/// Returns `None` for plain assignments; on non-array columns the two
/// operators are ignored rather than evaluated.
fn array_op(value: &Expr, meta: &ColumnMeta) -> Result<Option<ArrayOp>, EngineError> {
    let Expr::BinaryOp { op, right, .. } = value else {
        return Ok(None);
    };
    if !meta.is_array() {
        return Ok(None);
    }
    match op {
        BinaryOperator::StringConcat => Ok(Some(ArrayOp::Append(array_element(right)?))),
        BinaryOperator::Minus => Ok(Some(ArrayOp::Remove(array_element(right)?))),
        _ => Ok(None),
    }
}

/// The single element named by an array operand, with enclosing `{}`
/// stripped.
fn array_element(expr: &Expr) -> Result<String, EngineError> {
    let raw = match literal_from_expr(expr)? {
        SqlLiteral::String(s) => s,
        SqlLiteral::Number(n) => n,
        other => {
            return Err(EngineError::parse(format!(
                "unsupported array element: {:?}",
                other
            )));
        }
    };
    Ok(raw.trim_matches(|c| c == '{' || c == '}').to_string())
}

fn apply_masked<F: FnMut(&mut Row)>(rows: &mut [Row], mask: &[bool], mut apply: F) {
    for (row, hit) in rows.iter_mut().zip(mask) {
        if *hit {
            apply(row);
        }
    }
}

/// Name of the single table in a FROM list; joins and nested queries are
/// not supported.
fn single_table_name(
    from: &[sqlparser::ast::TableWithJoins],
) -> Result<String, EngineError> {
    let [table] = from else {
        return Err(EngineError::parse("exactly one FROM table is required"));
    };
    if !table.joins.is_empty() {
        return Err(EngineError::parse("joins are not supported"));
    }
    match &table.relation {
        TableFactor::Table { name, .. } => Ok(object_name_to_string(name)),
        other => Err(EngineError::parse(format!(
            "unsupported FROM clause: {}",
            other
        ))),
    }
}

/// Apply the projection list. `SELECT *` keeps every column; otherwise
/// each item resolves to a column, keyed by its alias when present.
fn project(
    projection: &[SelectItem],
    rows: Vec<Row>,
    table: &str,
) -> Result<Vec<Row>, EngineError> {
    if let [SelectItem::Wildcard(_)] = projection {
        return Ok(rows.into_iter().map(normalise_row).collect());
    }

    let mut wanted: Vec<(String, String)> = Vec::with_capacity(projection.len());
    for item in projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                let column = crate::sql::column_from_expr(expr)?;
                wanted.push((column.clone(), column));
            }
            SelectItem::ExprWithAlias { expr, alias } => {
                let column = crate::sql::column_from_expr(expr)?;
                wanted.push((unquote_identifier(&alias.value), column));
            }
            other => {
                return Err(EngineError::parse(format!(
                    "unsupported projection: {}",
                    other
                )));
            }
        }
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut projected: Row = IndexMap::with_capacity(wanted.len());
        for (key, column) in &wanted {
            let value = row
                .get(column)
                .cloned()
                .ok_or_else(|| EngineError::UnknownColumn {
                    column: column.clone(),
                    table: table.to_string(),
                })?;
            projected.insert(key.clone(), value);
        }
        out.push(normalise_row(projected));
    }
    Ok(out)
}

/// NaN floats become the NULL sentinel in returned rows.
fn normalise_row(mut row: Row) -> Row {
    for value in row.values_mut() {
        if let Value::Float(f) = value
            && f.is_nan()
        {
            *value = Value::Null;
        }
    }
    row
}
