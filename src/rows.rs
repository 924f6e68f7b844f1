//! Row storage: the per-statement CSV materialisation.
//!
//! A [`RowSet`] is the in-memory form of one table's CSV for the
//! duration of a single statement. File bytes move through `tokio::fs`;
//! CSV encode/decode runs on the blocking pool so the cooperative
//! runtime is never stalled by a large table. All persistence is a
//! whole-file write to a temp path followed by a rename.

use std::path::Path;

use indexmap::IndexMap;
use tokio::fs;
use tokio::task;

use crate::error::EngineError;
use crate::metadata::TableMetadata;
use crate::types::{Row, Value, decode_cell, encode_cell};

/// Ordered rows plus the header they were read with.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    /// A row set with a header and no rows (new table, WHERE-less
    /// DELETE).
    pub fn empty(columns: Vec<String>) -> Self {
        RowSet {
            columns,
            rows: Vec::new(),
        }
    }

    /// Read and type a table's CSV.
    ///
    /// Cells are typed against the sidecar metadata; missing trailing
    /// fields pad with NULL. A header-only file yields zero rows.
    pub async fn load(path: &Path, meta: &TableMetadata) -> Result<Self, EngineError> {
        let bytes = fs::read(path).await?;
        let meta = meta.clone();
        task::spawn_blocking(move || Self::decode(&bytes, &meta))
            .await
            .map_err(|e| std::io::Error::other(e))?
    }

    /// Persist the row set, consuming it.
    pub async fn persist(self, path: &Path) -> Result<(), EngineError> {
        let encoded = task::spawn_blocking(move || self.encode())
            .await
            .map_err(|e| std::io::Error::other(e))??;
        crate::storage::write_atomic(path, &encoded).await
    }

    fn decode(bytes: &[u8], meta: &TableMetadata) -> Result<Self, EngineError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let columns = if columns.is_empty() {
            meta.column_names()
        } else {
            columns
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Row = IndexMap::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                let cell = record.get(i).unwrap_or("");
                let declared = meta
                    .columns
                    .get(name)
                    .map(|c| c.data_type.as_str())
                    .unwrap_or("TEXT");
                row.insert(name.clone(), decode_cell(cell, declared)?);
            }
            rows.push(row);
        }

        Ok(RowSet { columns, rows })
    }

    fn encode(&self) -> Result<Vec<u8>, EngineError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|name| encode_cell(row.get(name).unwrap_or(&Value::Null)))
                .collect();
            writer.write_record(&record)?;
        }
        writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::columns::extract_columns;
    use crate::sql::parse_one;
    use sqlparser::ast::Statement;

    fn meta(sql: &str) -> TableMetadata {
        match parse_one(sql).unwrap() {
            Statement::CreateTable(create) => TableMetadata::from_definitions(
                &extract_columns(&create.columns, &create.constraints).unwrap(),
            ),
            _ => panic!("expected CREATE TABLE"),
        }
    }

    #[test]
    fn test_decode_types_cells() {
        let meta = meta("CREATE TABLE users (id INT, name TEXT, age INT)");
        let set = RowSet::decode(b"id,name,age\n1,John,30\n", &meta).unwrap();
        assert_eq!(set.columns, vec!["id", "name", "age"]);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.rows[0]["id"], Value::Int(1));
        assert_eq!(set.rows[0]["name"], Value::Text("John".into()));
    }

    #[test]
    fn test_decode_missing_trailing_fields_are_null() {
        let meta = meta("CREATE TABLE users (id INT, name TEXT, age INT)");
        let set = RowSet::decode(b"id,name,age\n1,John\n", &meta).unwrap();
        assert_eq!(set.rows[0]["age"], Value::Null);
    }

    #[test]
    fn test_decode_empty_field_is_null() {
        let meta = meta("CREATE TABLE users (id INT, name TEXT)");
        let set = RowSet::decode(b"id,name\n1,\n", &meta).unwrap();
        assert_eq!(set.rows[0]["name"], Value::Null);
    }

    #[test]
    fn test_encode_quotes_embedded_commas() {
        let meta = meta("CREATE TABLE t (note TEXT)");
        let mut set = RowSet::empty(vec!["note".to_string()]);
        let mut row = IndexMap::new();
        row.insert("note".to_string(), Value::Text("a, b".into()));
        set.rows.push(row);
        let bytes = set.encode().unwrap();
        let reloaded = RowSet::decode(&bytes, &meta).unwrap();
        assert_eq!(reloaded.rows[0]["note"], Value::Text("a, b".into()));
    }

    #[test]
    fn test_roundtrip_header_only() {
        let meta = meta("CREATE TABLE t (id INT, tags TEXT[])");
        let set = RowSet::empty(meta.column_names());
        let bytes = set.encode().unwrap();
        assert_eq!(bytes, b"id,tags\n");
        let reloaded = RowSet::decode(&bytes, &meta).unwrap();
        assert!(reloaded.rows.is_empty());
        assert_eq!(reloaded.columns, vec!["id", "tags"]);
    }

    #[test]
    fn test_array_cells_roundtrip() {
        let meta = meta("CREATE TABLE t (tags TEXT[])");
        let mut set = RowSet::empty(vec!["tags".to_string()]);
        let mut row = IndexMap::new();
        row.insert(
            "tags".to_string(),
            Value::Array(vec!["db1".into(), "db2".into()]),
        );
        set.rows.push(row);
        let bytes = set.encode().unwrap();
        let reloaded = RowSet::decode(&bytes, &meta).unwrap();
        assert_eq!(
            reloaded.rows[0]["tags"],
            Value::Array(vec!["db1".into(), "db2".into()])
        );
    }
}
