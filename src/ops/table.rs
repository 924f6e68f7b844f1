//! CREATE TABLE / DROP TABLE.

use std::path::PathBuf;

use sqlparser::ast::{ObjectType, Statement};
use tokio::fs;
use tracing::info;

use super::{METADATA_DIR, TABLES_DIR, database_path, table_csv_path, table_meta_path};
use crate::error::EngineError;
use crate::metadata::TableMetadata;
use crate::rows::RowSet;
use crate::sql::columns::extract_columns;
use crate::sql::{object_name_to_string, parse_one};

/// Table-level DDL within one database directory.
#[derive(Debug, Clone)]
pub struct TableOperations {
    base_dir: PathBuf,
}

impl TableOperations {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        TableOperations {
            base_dir: base_dir.into(),
        }
    }

    /// Execute a CREATE TABLE statement: write a header-only CSV and the
    /// metadata sidecar, concurrently.
    pub async fn create_table(&self, sql: &str, database: &str) -> Result<(), EngineError> {
        let create = match parse_one(sql)? {
            Statement::CreateTable(create) => create,
            _ => return Err(EngineError::parse("Invalid CREATE TABLE statement")),
        };
        let table = object_name_to_string(&create.name);

        let db_path = database_path(&self.base_dir, database);
        fs::create_dir_all(db_path.join(METADATA_DIR)).await?;
        fs::create_dir_all(db_path.join(TABLES_DIR)).await?;

        let csv_path = table_csv_path(&self.base_dir, database, &table);
        let meta_path = table_meta_path(&self.base_dir, database, &table);
        if fs::try_exists(&csv_path).await? {
            return Err(EngineError::TableAlreadyExists(table));
        }

        let definitions = extract_columns(&create.columns, &create.constraints)?;
        let metadata = TableMetadata::from_definitions(&definitions);
        let header = RowSet::empty(metadata.column_names());

        tokio::try_join!(header.persist(&csv_path), metadata.save(&meta_path))?;

        info!("Created table '{}' in database '{}'", table, database);
        Ok(())
    }

    /// Execute a DROP TABLE statement. The sidecar may already be gone;
    /// only the CSV is required to exist.
    pub async fn drop_table(&self, sql: &str, database: &str) -> Result<(), EngineError> {
        let table = match parse_one(sql)? {
            Statement::Drop {
                object_type: ObjectType::Table,
                names,
                ..
            } => names
                .first()
                .map(object_name_to_string)
                .ok_or_else(|| EngineError::parse("DROP TABLE names no table"))?,
            _ => return Err(EngineError::parse("Invalid DROP TABLE statement")),
        };

        let csv_path = table_csv_path(&self.base_dir, database, &table);
        let meta_path = table_meta_path(&self.base_dir, database, &table);
        if !fs::try_exists(&csv_path).await? {
            return Err(EngineError::TableNotFound(table));
        }

        fs::remove_file(&csv_path).await?;
        if fs::try_exists(&meta_path).await? {
            fs::remove_file(&meta_path).await?;
        }

        info!("Dropped table '{}' from database '{}'", table, database);
        Ok(())
    }
}
