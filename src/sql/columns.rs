//! Column extraction from CREATE TABLE statements.

use sqlparser::ast::{ColumnDef, ColumnOption, DataType, Expr, TableConstraint, Value as AstValue};

use super::{SqlLiteral, literal_from_expr, unquote_identifier};
use crate::error::EngineError;

/// A column definition lifted out of the AST, before it becomes
/// persisted metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// Declared type as a string, `(n)` length suffix preserved.
    /// SERIAL columns are recorded as `INT`, array columns as `ARRAY`.
    pub data_type: String,
    /// Element subtype for `ARRAY` columns.
    pub array_type: Option<String>,
    pub is_serial: bool,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// Unparsed default literal, the `CURRENT_TIMESTAMP` sentinel, or
    /// `[]` for arrays.
    pub default: Option<serde_json::Value>,
    /// Counter seed for SERIAL columns (trailing integer DEFAULT).
    pub initial_counter_value: Option<i64>,
}

/// Extract column definitions from a CREATE TABLE body.
///
/// Table-level PRIMARY KEY constraints are folded into the named columns.
pub fn extract_columns(
    columns: &[ColumnDef],
    constraints: &[TableConstraint],
) -> Result<Vec<ColumnDefinition>, EngineError> {
    let mut pk_columns = std::collections::HashSet::<String>::new();
    for constraint in constraints {
        if let TableConstraint::PrimaryKey(pk) = constraint {
            for col in &pk.columns {
                pk_columns.insert(unquote_identifier(&col.to_string()));
            }
        }
    }

    let mut out = Vec::with_capacity(columns.len());
    for col in columns {
        let name = unquote_identifier(&col.name.value);

        let mut data_type = col.data_type.to_string().to_uppercase();
        if let Some(stripped) = data_type.strip_prefix("TYPE.") {
            data_type = stripped.to_string();
        }
        let is_serial = data_type.ends_with("SERIAL");
        let is_array = matches!(col.data_type, DataType::Array(_))
            || data_type.ends_with("[]")
            || data_type.starts_with("ARRAY");
        let array_type = is_array.then(|| array_element_type(&data_type)).flatten();

        let mut not_null = false;
        let mut primary_key = pk_columns.contains(&name);
        let mut unique = false;
        let mut default: Option<serde_json::Value> = None;
        let mut default_int: Option<i64> = None;

        for opt in &col.options {
            match &opt.option {
                ColumnOption::NotNull => not_null = true,
                ColumnOption::Null => not_null = false,
                ColumnOption::PrimaryKey(_) => primary_key = true,
                ColumnOption::Unique(_) => unique = true,
                ColumnOption::Default(expr) => match default_literal(expr)? {
                    DefaultLiteral::Null => {
                        // DEFAULT NULL clears NOT NULL and records nothing.
                        default = None;
                        not_null = false;
                    }
                    DefaultLiteral::Value(value) => {
                        if let serde_json::Value::String(s) = &value {
                            default_int = s.parse::<i64>().ok();
                        }
                        default = Some(value);
                    }
                },
                _ => {}
            }
        }

        if is_serial {
            out.push(ColumnDefinition {
                name,
                data_type: "INT".to_string(),
                array_type: None,
                is_serial: true,
                not_null: false,
                primary_key,
                unique: false,
                default: None,
                initial_counter_value: default_int,
            });
            continue;
        }

        if primary_key {
            not_null = true;
            unique = false;
        }

        if is_array {
            data_type = "ARRAY".to_string();
            if default.is_none() {
                default = Some(serde_json::Value::Array(Vec::new()));
            }
        }

        out.push(ColumnDefinition {
            name,
            data_type,
            array_type,
            is_serial: false,
            not_null,
            primary_key,
            unique,
            default,
            initial_counter_value: None,
        });
    }

    Ok(out)
}

enum DefaultLiteral {
    Null,
    Value(serde_json::Value),
}

fn default_literal(expr: &Expr) -> Result<DefaultLiteral, EngineError> {
    let rendered = expr.to_string();
    if rendered.to_uppercase().starts_with("CURRENT_TIMESTAMP") {
        return Ok(DefaultLiteral::Value(serde_json::Value::String(
            "CURRENT_TIMESTAMP".to_string(),
        )));
    }
    match expr {
        Expr::Value(v) => Ok(match &v.value {
            AstValue::Null => DefaultLiteral::Null,
            AstValue::SingleQuotedString(s) | AstValue::DoubleQuotedString(s) => {
                DefaultLiteral::Value(serde_json::Value::String(s.clone()))
            }
            AstValue::Number(n, _) => DefaultLiteral::Value(serde_json::Value::String(n.clone())),
            AstValue::Boolean(b) => {
                DefaultLiteral::Value(serde_json::Value::String(b.to_string()))
            }
            _ => DefaultLiteral::Value(serde_json::Value::String(rendered)),
        }),
        Expr::Array(_) => {
            // Element unwrapping (quote stripping included) lives in the
            // shared literal extractor.
            let items = match literal_from_expr(expr)? {
                SqlLiteral::Array(items) => items,
                _ => Vec::new(),
            };
            Ok(DefaultLiteral::Value(serde_json::Value::Array(
                items.into_iter().map(serde_json::Value::String).collect(),
            )))
        }
        Expr::Nested(inner) => default_literal(inner),
        // Any other expression is kept in its rendered form; coercion
        // happens at insert time.
        _ => Ok(DefaultLiteral::Value(serde_json::Value::String(rendered))),
    }
}

/// Element subtype from an array type string (`TEXT[]`, `ARRAY<TEXT>`,
/// `ARRAY(TEXT)`); `None` for a bare `ARRAY`.
fn array_element_type(data_type: &str) -> Option<String> {
    if let Some(elem) = data_type.strip_suffix("[]") {
        return Some(elem.trim().to_string());
    }
    let inner = data_type
        .strip_prefix("ARRAY<")
        .and_then(|rest| rest.strip_suffix('>'))
        .or_else(|| {
            data_type
                .strip_prefix("ARRAY(")
                .and_then(|rest| rest.strip_suffix(')'))
        })?;
    Some(inner.trim().to_string())
}
