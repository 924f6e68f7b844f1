//! Declared-type value coercion.
//!
//! Dispatch is keyed on the upper-cased declared type by substring, the
//! same way the metadata records types (`VARCHAR(32)` still contains
//! `CHAR`). NULL passes through every branch unchecked.

use chrono::Local;

use super::{Value, parse_array_literal};
use crate::error::EngineError;

/// Stateless coercion helper shared by the data ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeHandler;

impl TypeHandler {
    pub fn new() -> Self {
        TypeHandler
    }

    /// Coerce `value` to the declared column type.
    ///
    /// String inputs have one layer of surrounding quotes stripped before
    /// any branch runs, matching how literals arrive from the parser.
    pub fn coerce(&self, value: Value, declared_type: &str) -> Result<Value, EngineError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let value = match value {
            Value::Text(s) => Value::Text(strip_quotes(&s).to_string()),
            other => other,
        };
        let upper = declared_type.to_uppercase();

        if upper.contains("CHAR") || upper.contains("TEXT") {
            return Ok(Value::Text(value.to_string()));
        }

        if upper.contains("INT") {
            return match value {
                Value::Int(n) => Ok(Value::Int(n)),
                Value::Float(f) => Ok(Value::Int(f as i64)),
                Value::Bool(b) => Ok(Value::Int(b as i64)),
                Value::Text(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
                    Ok(Value::Int(s.parse::<i64>().map_err(|_| {
                        EngineError::type_error(format!("Invalid integer value: '{}'", s))
                    })?))
                }
                other => Err(EngineError::type_error(format!(
                    "Invalid integer value: '{}'",
                    other
                ))),
            };
        }

        if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
            return match value {
                Value::Int(n) => Ok(Value::Float(n as f64)),
                Value::Float(f) => Ok(Value::Float(f)),
                Value::Text(s) => s.parse::<f64>().map(Value::Float).map_err(|_| {
                    EngineError::type_error(format!("Invalid decimal value: '{}'", s))
                }),
                other => Err(EngineError::type_error(format!(
                    "Invalid decimal value: '{}'",
                    other
                ))),
            };
        }

        if upper == "BOOLEAN" {
            return match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::Int(n) => Ok(Value::Bool(n != 0)),
                Value::Text(s) => match s.to_lowercase().as_str() {
                    "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
                    "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
                    _ => Err(EngineError::type_error(format!(
                        "Invalid boolean value: '{}'",
                        s
                    ))),
                },
                other => Err(EngineError::type_error(format!(
                    "Invalid boolean value: '{}'",
                    other
                ))),
            };
        }

        if upper.contains("TIMESTAMP") || upper.contains("DATE") {
            return Ok(match value {
                Value::Text(s) if s == "CURRENT_TIMESTAMP" => Value::Text(current_timestamp()),
                other => other,
            });
        }

        if upper.contains("ARRAY") {
            return match value {
                Value::Array(items) => Ok(Value::Array(items)),
                Value::Text(s) => parse_array_literal(&s).map(Value::Array).ok_or_else(|| {
                    EngineError::type_error(format!("Invalid array value: '{}'", s))
                }),
                other => Err(EngineError::type_error(format!(
                    "Invalid array value: '{}'",
                    other
                ))),
            };
        }

        // Unrecognised declared types pass through unchanged.
        Ok(value)
    }
}

/// Wall-clock timestamp in ISO-8601, used to materialise the
/// `CURRENT_TIMESTAMP` sentinel.
pub fn current_timestamp() -> String {
    Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        if (bytes[0] == b'\'' && bytes[s.len() - 1] == b'\'')
            || (bytes[0] == b'"' && bytes[s.len() - 1] == b'"')
        {
            return &s[1..s.len() - 1];
        }
    }
    s
}
