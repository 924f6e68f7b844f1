//! Dynamic row values and the central cell codec.
//!
//! Rows carry mixed-type values (integer, float, string, bool, array,
//! null). All CSV serialisation goes through [`encode_cell`] /
//! [`decode_cell`] so the read-back-equals-written invariant lives in one
//! place. Array cells use a single well-known textual form,
//! `['a', 'b']`, handled by [`encode_array_literal`] /
//! [`parse_array_literal`].

pub mod handler;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// One row, keyed by column name in declaration order.
pub type Row = IndexMap<String, Value>;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Array(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by comparison predicates.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Loose equality: numerics compare across Int/Float, NULL never
    /// equals anything (including NULL).
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Numeric ordering; `None` when either side is not a number.
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Array(items) => write!(f, "{}", encode_array_literal(items)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Encode a value as a CSV cell. NULL becomes the empty field; the csv
/// writer handles quoting of commas/quotes/newlines.
pub fn encode_cell(value: &Value) -> String {
    value.to_string()
}

/// Decode a CSV cell against the declared column type.
///
/// The empty field is NULL for every type. Array cells that do not parse
/// as a list literal are kept as raw text so the update-path reset
/// semantics can see them; scalar cells that do not coerce are rejected.
pub fn decode_cell(cell: &str, declared_type: &str) -> Result<Value, crate::error::EngineError> {
    use crate::error::EngineError;

    if cell.is_empty() {
        return Ok(Value::Null);
    }
    let upper = declared_type.to_uppercase();

    if upper.contains("ARRAY") {
        return Ok(match parse_array_literal(cell) {
            Some(items) => Value::Array(items),
            None => Value::Text(cell.to_string()),
        });
    }
    if upper.contains("INT") {
        if let Ok(n) = cell.parse::<i64>() {
            return Ok(Value::Int(n));
        }
        // Re-reading a file written by a looser producer: accept a float
        // rendering of an integer cell.
        if let Ok(f) = cell.parse::<f64>() {
            return Ok(Value::Float(f));
        }
        return Err(EngineError::type_error(format!(
            "Invalid integer value: '{}'",
            cell
        )));
    }
    if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        return cell
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| EngineError::type_error(format!("Invalid decimal value: '{}'", cell)));
    }
    if upper == "BOOLEAN" {
        return match cell.to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
            _ => Err(EngineError::type_error(format!(
                "Invalid boolean value: '{}'",
                cell
            ))),
        };
    }

    Ok(Value::Text(cell.to_string()))
}

/// Render a list of elements in the canonical array cell form.
pub fn encode_array_literal(items: &[String]) -> String {
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('\'');
        for ch in item.chars() {
            match ch {
                '\'' => out.push_str("\\'"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
    }
    out.push(']');
    out
}

/// Parse the textual list form back into elements.
///
/// Accepts single- or double-quoted elements with `\'`/`\"`/`\\` escapes.
/// Returns `None` for anything that is not a well-formed list literal.
pub fn parse_array_literal(cell: &str) -> Option<Vec<String>> {
    let trimmed = cell.trim();
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        // Skip separators and whitespace before the next element.
        while matches!(chars.peek(), Some(' ') | Some(',')) {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return None,
        };
        let mut item = String::new();
        loop {
            match chars.next() {
                None => return None,
                Some('\\') => match chars.next() {
                    Some(escaped) => item.push(escaped),
                    None => return None,
                },
                Some(c) if c == quote => break,
                Some(c) => item.push(c),
            }
        }
        items.push(item);
    }

    Some(items)
}
