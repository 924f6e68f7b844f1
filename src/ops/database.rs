//! CREATE DATABASE / DROP DATABASE.

use std::path::PathBuf;

use sqlparser::ast::{ObjectType, Statement};
use tokio::fs;
use tracing::info;

use super::database_path;
use crate::error::EngineError;
use crate::sql::{object_name_to_string, parse_one};

/// Database-level DDL against the data root.
#[derive(Debug, Clone)]
pub struct DatabaseOperations {
    base_dir: PathBuf,
}

impl DatabaseOperations {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        DatabaseOperations {
            base_dir: base_dir.into(),
        }
    }

    /// Execute a CREATE DATABASE statement; returns the database name.
    pub async fn create_database(&self, sql: &str) -> Result<String, EngineError> {
        let name = match parse_one(sql)? {
            Statement::CreateDatabase { db_name, .. } => object_name_to_string(&db_name),
            _ => return Err(EngineError::parse("Invalid CREATE DATABASE statement")),
        };

        let path = database_path(&self.base_dir, &name);
        if fs::try_exists(&path).await? {
            return Err(EngineError::DatabaseAlreadyExists(name));
        }

        fs::create_dir_all(&path).await?;
        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            // rwxr-xr-x on the database directory and the data root.
            fs::set_permissions(&path, Permissions::from_mode(0o755)).await?;
            fs::set_permissions(&self.base_dir, Permissions::from_mode(0o755)).await?;
        }

        info!("Created database '{}'", name);
        Ok(name)
    }

    /// Execute a DROP DATABASE statement, removing the tree recursively.
    pub async fn drop_database(&self, sql: &str) -> Result<(), EngineError> {
        let name = match parse_one(sql)? {
            Statement::Drop {
                object_type: ObjectType::Database,
                names,
                ..
            } => names
                .first()
                .map(object_name_to_string)
                .ok_or_else(|| EngineError::parse("DROP DATABASE names no database"))?,
            _ => return Err(EngineError::parse("Invalid DROP DATABASE statement")),
        };

        let path = database_path(&self.base_dir, &name);
        if !fs::try_exists(&path).await? {
            return Err(EngineError::DatabaseNotFound(name));
        }

        fs::remove_dir_all(&path).await?;
        info!("Dropped database '{}'", name);
        Ok(())
    }
}
