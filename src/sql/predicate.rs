//! WHERE-clause lowering.
//!
//! A WHERE sub-tree is lowered once into a [`RowPredicate`] and then
//! evaluated against every row of the statement's row set. Lowering is
//! exhaustive over the supported node kinds; anything else is rejected
//! up front with `UnsupportedPredicate` instead of being mis-evaluated
//! row by row.

use sqlparser::ast::{BinaryOperator, Expr};

use super::{column_from_expr, literal_from_expr};
use crate::error::EngineError;
use crate::types::{Row, Value};
use std::cmp::Ordering;

/// Comparison operators supported in WHERE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

/// A lowered row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum RowPredicate {
    And(Box<RowPredicate>, Box<RowPredicate>),
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
}

impl RowPredicate {
    /// Lower a WHERE expression.
    pub fn lower(expr: &Expr) -> Result<Self, EngineError> {
        match expr {
            Expr::Nested(inner) => Self::lower(inner),
            Expr::BinaryOp { left, op, right } => {
                let compare_op = match op {
                    BinaryOperator::And => {
                        return Ok(RowPredicate::And(
                            Box::new(Self::lower(left)?),
                            Box::new(Self::lower(right)?),
                        ));
                    }
                    BinaryOperator::Eq => CompareOp::Eq,
                    BinaryOperator::NotEq => CompareOp::NotEq,
                    BinaryOperator::Gt => CompareOp::Gt,
                    BinaryOperator::GtEq => CompareOp::GtEq,
                    BinaryOperator::Lt => CompareOp::Lt,
                    BinaryOperator::LtEq => CompareOp::LtEq,
                    other => {
                        return Err(EngineError::UnsupportedPredicate(other.to_string()));
                    }
                };
                let column = column_from_expr(left)
                    .map_err(|_| EngineError::UnsupportedPredicate(expr.to_string()))?;
                let value = literal_from_expr(right)
                    .map_err(|_| EngineError::UnsupportedPredicate(expr.to_string()))?
                    .into_value()?;
                Ok(RowPredicate::Compare {
                    column,
                    op: compare_op,
                    value,
                })
            }
            Expr::InList {
                expr: target,
                list,
                negated,
            } => {
                let column = column_from_expr(target)
                    .map_err(|_| EngineError::UnsupportedPredicate(expr.to_string()))?;
                let mut values = Vec::with_capacity(list.len());
                for item in list {
                    values.push(
                        literal_from_expr(item)
                            .map_err(|_| EngineError::UnsupportedPredicate(expr.to_string()))?
                            .into_value()?,
                    );
                }
                Ok(RowPredicate::InList {
                    column,
                    values,
                    negated: *negated,
                })
            }
            Expr::IsNull(target) => Ok(RowPredicate::Null {
                column: column_from_expr(target)
                    .map_err(|_| EngineError::UnsupportedPredicate(expr.to_string()))?,
                negated: false,
            }),
            Expr::IsNotNull(target) => Ok(RowPredicate::Null {
                column: column_from_expr(target)
                    .map_err(|_| EngineError::UnsupportedPredicate(expr.to_string()))?,
                negated: true,
            }),
            other => Err(EngineError::UnsupportedPredicate(other.to_string())),
        }
    }

    /// Evaluate against one row. Missing columns behave as NULL.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            RowPredicate::And(left, right) => left.matches(row) && right.matches(row),
            RowPredicate::Compare { column, op, value } => {
                let cell = row.get(column).unwrap_or(&Value::Null);
                match op {
                    CompareOp::Eq => cell.loosely_eq(value),
                    CompareOp::NotEq => !cell.loosely_eq(value),
                    CompareOp::Gt => matches!(cell.numeric_cmp(value), Some(Ordering::Greater)),
                    CompareOp::GtEq => matches!(
                        cell.numeric_cmp(value),
                        Some(Ordering::Greater) | Some(Ordering::Equal)
                    ),
                    CompareOp::Lt => matches!(cell.numeric_cmp(value), Some(Ordering::Less)),
                    CompareOp::LtEq => matches!(
                        cell.numeric_cmp(value),
                        Some(Ordering::Less) | Some(Ordering::Equal)
                    ),
                }
            }
            RowPredicate::InList {
                column,
                values,
                negated,
            } => {
                let cell = row.get(column).unwrap_or(&Value::Null);
                let found = values.iter().any(|v| cell.loosely_eq(v));
                found != *negated
            }
            RowPredicate::Null { column, negated } => {
                let is_null = row.get(column).map(Value::is_null).unwrap_or(true);
                is_null != *negated
            }
        }
    }
}
