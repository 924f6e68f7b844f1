//! Statement execution, split by object kind: databases, tables, data.

pub mod data;
pub mod database;
pub mod table;

use std::path::{Path, PathBuf};

/// Hidden directory holding the per-table JSON sidecars.
pub(crate) const METADATA_DIR: &str = ".metadata";
/// Directory holding the per-table CSV row files.
pub(crate) const TABLES_DIR: &str = "tables";

pub(crate) fn database_path(base_dir: &Path, database: &str) -> PathBuf {
    base_dir.join(database)
}

pub(crate) fn table_csv_path(base_dir: &Path, database: &str, table: &str) -> PathBuf {
    base_dir
        .join(database)
        .join(TABLES_DIR)
        .join(format!("{}.csv", table))
}

pub(crate) fn table_meta_path(base_dir: &Path, database: &str, table: &str) -> PathBuf {
    base_dir
        .join(database)
        .join(METADATA_DIR)
        .join(format!("{}.json", table))
}
