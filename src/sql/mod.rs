//! SQL parsing entry points.
//!
//! Statements are parsed with `sqlparser` using the PostgreSQL dialect,
//! which covers the accepted surface (SERIAL, ARRAY literals, `||`).
//! Each ops module pattern-matches the returned [`Statement`] and rejects
//! any node kind it was not invoked for.

pub mod columns;
pub mod predicate;

use sqlparser::ast::{Expr, ObjectName, Statement, UnaryOperator, Value as AstValue};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::EngineError;
use crate::types::Value;

/// Parse exactly one statement.
pub fn parse_one(sql: &str) -> Result<Statement, EngineError> {
    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| EngineError::parse(e.to_string()))?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err(EngineError::parse("empty statement")),
        n => Err(EngineError::parse(format!(
            "expected a single statement, got {}",
            n
        ))),
    }
}

/// Final identifier of an object name, unquoted (supports
/// schema-qualified names).
pub fn object_name_to_string(name: &ObjectName) -> String {
    let last = name
        .0
        .last()
        .map_or_else(|| name.to_string(), |part| part.to_string());
    unquote_identifier(&last)
}

/// Quoting styles an identifier may arrive in. In every style a doubled
/// closing character inside the identifier escapes one literal
/// occurrence of it.
const QUOTE_STYLES: [(char, char); 3] = [('"', '"'), ('`', '`'), ('[', ']')];

/// Strip one layer of identifier quoting and unescape the delimiter.
pub fn unquote_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    for (open, close) in QUOTE_STYLES {
        if trimmed.len() >= 2 && trimmed.starts_with(open) && trimmed.ends_with(close) {
            let inner = &trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()];
            return inner.replace(&format!("{}{}", close, close), &close.to_string());
        }
    }
    trimmed.to_string()
}

/// A literal extracted from the AST, before type coercion.
///
/// The string/number distinction is preserved because INSERT rejects
/// string literals for INT columns even when the text is numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlLiteral {
    Null,
    Number(String),
    String(String),
    Bool(bool),
    Array(Vec<String>),
    CurrentTimestamp,
}

impl SqlLiteral {
    pub fn is_string(&self) -> bool {
        matches!(self, SqlLiteral::String(_))
    }

    /// Convert to the engine value space. Numbers become Int when they
    /// parse as one, Float otherwise; the timestamp sentinel stays a
    /// sentinel until the type handler materialises it.
    pub fn into_value(self) -> Result<Value, EngineError> {
        Ok(match self {
            SqlLiteral::Null => Value::Null,
            SqlLiteral::Number(n) => {
                if let Ok(i) = n.parse::<i64>() {
                    Value::Int(i)
                } else {
                    Value::Float(n.parse::<f64>().map_err(|_| {
                        EngineError::parse(format!("invalid numeric literal '{}'", n))
                    })?)
                }
            }
            SqlLiteral::String(s) => Value::Text(s),
            SqlLiteral::Bool(b) => Value::Bool(b),
            SqlLiteral::Array(items) => Value::Array(items),
            SqlLiteral::CurrentTimestamp => Value::Text("CURRENT_TIMESTAMP".to_string()),
        })
    }
}

/// Extract a literal from an expression node.
pub fn literal_from_expr(expr: &Expr) -> Result<SqlLiteral, EngineError> {
    match expr {
        Expr::Value(v) => Ok(match &v.value {
            AstValue::Number(n, _) => SqlLiteral::Number(n.clone()),
            AstValue::SingleQuotedString(s) | AstValue::DoubleQuotedString(s) => {
                SqlLiteral::String(s.clone())
            }
            AstValue::Boolean(b) => SqlLiteral::Bool(*b),
            AstValue::Null => SqlLiteral::Null,
            other => {
                return Err(EngineError::parse(format!(
                    "unsupported literal: {}",
                    other
                )));
            }
        }),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match literal_from_expr(inner)? {
            SqlLiteral::Number(n) => Ok(SqlLiteral::Number(format!("-{}", n))),
            other => Err(EngineError::parse(format!(
                "unsupported negated literal: {:?}",
                other
            ))),
        },
        Expr::Array(array) => {
            let mut items = Vec::with_capacity(array.elem.len());
            for elem in &array.elem {
                match literal_from_expr(elem)? {
                    SqlLiteral::String(s) => items.push(s),
                    SqlLiteral::Number(n) => items.push(n),
                    other => {
                        return Err(EngineError::parse(format!(
                            "unsupported array element: {:?}",
                            other
                        )));
                    }
                }
            }
            Ok(SqlLiteral::Array(items))
        }
        Expr::Nested(inner) => literal_from_expr(inner),
        // CURRENT_TIMESTAMP parses as a zero-argument function call.
        other if other.to_string().to_uppercase().starts_with("CURRENT_TIMESTAMP") => {
            Ok(SqlLiteral::CurrentTimestamp)
        }
        other => Err(EngineError::parse(format!(
            "expected a literal, got: {}",
            other
        ))),
    }
}

/// Column name from an identifier expression.
pub fn column_from_expr(expr: &Expr) -> Result<String, EngineError> {
    match expr {
        Expr::Identifier(ident) => Ok(unquote_identifier(&ident.value)),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| unquote_identifier(&ident.value))
            .ok_or_else(|| EngineError::parse("empty compound identifier")),
        other => Err(EngineError::parse(format!(
            "expected a column reference, got: {}",
            other
        ))),
    }
}
