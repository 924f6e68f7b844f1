//! Per-table column metadata and its JSON sidecar.
//!
//! Each table's sidecar is `{ "columns": { <name>: <ColumnMeta>, … } }`
//! with the mapping in declaration order; fields are present only when
//! meaningful. The sidecar is human-readable (2-space indentation) and
//! written whole-file via a temp file and rename.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::error::EngineError;
use crate::sql::columns::ColumnDefinition;

/// Metadata for one column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnMeta {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_serial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_counter_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment_counter: Option<i64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_type: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ColumnMeta {
    /// Whether NULL is rejected for this column.
    pub fn rejects_null(&self) -> bool {
        self.not_null || self.primary_key
    }

    /// Whether values must be distinct across rows.
    pub fn requires_distinct(&self) -> bool {
        self.unique || self.primary_key
    }

    pub fn is_array(&self) -> bool {
        self.data_type.to_uppercase().contains("ARRAY")
    }
}

impl From<&ColumnDefinition> for ColumnMeta {
    fn from(col: &ColumnDefinition) -> Self {
        let counter = col.is_serial.then(|| col.initial_counter_value.unwrap_or(1));
        ColumnMeta {
            data_type: col.data_type.clone(),
            is_serial: col.is_serial,
            initial_counter_value: counter,
            auto_increment_counter: counter,
            primary_key: col.primary_key,
            // PRIMARY KEY implies NOT NULL; only record the flag on its own.
            not_null: col.not_null && !col.primary_key,
            unique: col.unique && !col.primary_key,
            default: if col.is_serial { None } else { col.default.clone() },
            array_type: col.array_type.clone(),
        }
    }
}

/// The full sidecar document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TableMetadata {
    pub columns: IndexMap<String, ColumnMeta>,
}

impl TableMetadata {
    /// Build metadata from extracted column definitions, in declaration
    /// order.
    pub fn from_definitions(definitions: &[ColumnDefinition]) -> Self {
        let mut columns = IndexMap::with_capacity(definitions.len());
        for def in definitions {
            columns.insert(def.name.clone(), ColumnMeta::from(def));
        }
        TableMetadata { columns }
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Load a sidecar from disk.
    pub async fn load(path: &Path) -> Result<Self, EngineError> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist the sidecar: pretty JSON to a temp file, then rename.
    pub async fn save(&self, path: &Path) -> Result<(), EngineError> {
        let rendered = serde_json::to_string_pretty(self)?;
        crate::storage::write_atomic(path, rendered.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::columns::extract_columns;
    use crate::sql::parse_one;
    use sqlparser::ast::Statement;

    fn metadata_for(sql: &str) -> TableMetadata {
        match parse_one(sql).unwrap() {
            Statement::CreateTable(create) => TableMetadata::from_definitions(
                &extract_columns(&create.columns, &create.constraints).unwrap(),
            ),
            _ => panic!("expected CREATE TABLE"),
        }
    }

    #[test]
    fn test_columns_keep_declaration_order() {
        let meta = metadata_for("CREATE TABLE users (id INT, name TEXT, age INT)");
        assert_eq!(meta.column_names(), vec!["id", "name", "age"]);
    }

    #[test]
    fn test_minimal_fields_only() {
        let meta = metadata_for("CREATE TABLE users (id INT, name TEXT)");
        let rendered = serde_json::to_string_pretty(&meta).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(
            parsed["columns"]["id"],
            serde_json::json!({ "type": "INT" })
        );
    }

    #[test]
    fn test_serial_counters_seeded() {
        let meta = metadata_for("CREATE TABLE t (id SERIAL DEFAULT 50)");
        let id = &meta.columns["id"];
        assert!(id.is_serial);
        assert_eq!(id.initial_counter_value, Some(50));
        assert_eq!(id.auto_increment_counter, Some(50));
        assert_eq!(id.default, None);

        let meta = metadata_for("CREATE TABLE t (id SERIAL)");
        assert_eq!(meta.columns["id"].auto_increment_counter, Some(1));
    }

    #[test]
    fn test_primary_key_suppresses_not_null_flag() {
        let meta = metadata_for("CREATE TABLE t (id INT PRIMARY KEY NOT NULL)");
        let id = &meta.columns["id"];
        assert!(id.primary_key);
        assert!(!id.not_null);
        assert!(id.rejects_null());
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let meta = metadata_for("CREATE TABLE t (z INT, a TEXT, m BOOLEAN)");
        let rendered = serde_json::to_string_pretty(&meta).unwrap();
        let reloaded: TableMetadata = serde_json::from_str(&rendered).unwrap();
        assert_eq!(reloaded.column_names(), vec!["z", "a", "m"]);
    }
}
