//! The engine façade.
//!
//! [`Csvgres`] owns the data root, dispatches each statement kind to its
//! ops module, and tracks an advisory current-database name. The pointer
//! is only a default for callers that omit a database argument; nothing
//! prevents cross-database calls while "connected". It sits behind a
//! mutex so one instance can be shared.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::fs;
use tracing::info;

use crate::error::EngineError;
use crate::ops::data::DataOperations;
use crate::ops::database::DatabaseOperations;
use crate::ops::table::TableOperations;
use crate::types::Row;

/// Database used when the caller names none and no connect has happened.
pub const DEFAULT_DATABASE: &str = "csvgres";

static RE_CONNECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\\?c(onnect)?$").expect("Invalid regex"));

/// Stateful SQL-over-CSV engine rooted at a data directory.
pub struct Csvgres {
    base_dir: PathBuf,
    current_database: Mutex<Option<String>>,
    db_ops: DatabaseOperations,
    table_ops: TableOperations,
    data_ops: DataOperations,
}

impl Csvgres {
    /// Create an engine over `data_directory`. Call [`Csvgres::init`]
    /// once to make sure the directory exists.
    pub fn new(data_directory: impl Into<PathBuf>) -> Self {
        let base_dir = data_directory.into();
        Csvgres {
            db_ops: DatabaseOperations::new(&base_dir),
            table_ops: TableOperations::new(&base_dir),
            data_ops: DataOperations::new(&base_dir),
            current_database: Mutex::new(None),
            base_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Currently connected database, if any.
    pub fn current_database(&self) -> Option<String> {
        self.current_database.lock().expect("poisoned lock").clone()
    }

    /// Ensure the data root exists.
    pub async fn init(&self) -> Result<(), EngineError> {
        fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    /// Execute CREATE DATABASE and connect to the new database.
    pub async fn create_database(&self, sql: &str) -> Result<String, EngineError> {
        let name = self.db_ops.create_database(sql).await?;
        *self.current_database.lock().expect("poisoned lock") = Some(name.clone());
        Ok(name)
    }

    /// Execute DROP DATABASE. The connect pointer is advisory, so even
    /// the connected database may be dropped.
    pub async fn drop_database(&self, sql: &str) -> Result<(), EngineError> {
        self.db_ops.drop_database(sql).await
    }

    /// Handle `\c <db>` / `connect <db>`: validate the target and move
    /// the pointer.
    pub async fn connect(&self, command: &str) -> Result<(), EngineError> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let valid = matches!(parts.first(), Some(first) if RE_CONNECT.is_match(first));
        if !valid || parts.len() != 2 {
            return Err(EngineError::parse(
                "Invalid connect command. Use \"c dbname\" or \"connect dbname\"",
            ));
        }

        let name = parts[1];
        let path = self.base_dir.join(name);
        let metadata = fs::metadata(&path)
            .await
            .map_err(|_| EngineError::DatabaseNotFound(name.to_string()))?;
        if !metadata.is_dir() {
            return Err(EngineError::DatabaseNotFound(name.to_string()));
        }

        *self.current_database.lock().expect("poisoned lock") = Some(name.to_string());
        info!("Connected to database '{}'", name);
        Ok(())
    }

    pub async fn create_table(
        &self,
        sql: &str,
        database: Option<&str>,
    ) -> Result<(), EngineError> {
        let database = self.resolve_database(database);
        self.table_ops.create_table(sql, &database).await
    }

    pub async fn drop_table(&self, sql: &str, database: Option<&str>) -> Result<(), EngineError> {
        let database = self.resolve_database(database);
        self.table_ops.drop_table(sql, &database).await
    }

    pub async fn insert(&self, sql: &str, database: Option<&str>) -> Result<(), EngineError> {
        let database = self.resolve_database(database);
        self.data_ops.insert(sql, &database).await
    }

    pub async fn select(
        &self,
        sql: &str,
        database: Option<&str>,
    ) -> Result<Vec<Row>, EngineError> {
        let database = self.resolve_database(database);
        self.data_ops.select(sql, &database).await
    }

    pub async fn update_row(&self, sql: &str, database: Option<&str>) -> Result<(), EngineError> {
        let database = self.resolve_database(database);
        self.data_ops.update_row(sql, &database).await
    }

    pub async fn delete_row(&self, sql: &str, database: Option<&str>) -> Result<(), EngineError> {
        let database = self.resolve_database(database);
        self.data_ops.delete_row(sql, &database).await
    }

    /// Explicit argument, else the connect pointer, else the default.
    fn resolve_database(&self, database: Option<&str>) -> String {
        if let Some(name) = database {
            return name.to_string();
        }
        self.current_database()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
    }
}
