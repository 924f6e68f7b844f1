//! csvgres - a small SQL-over-CSV database engine.
//!
//! Statements are parsed with `sqlparser` and executed against a
//! directory hierarchy: each database is a directory under a data root,
//! each table a CSV row file (`tables/<name>.csv`) paired with a JSON
//! column-metadata sidecar (`.metadata/<name>.json`).
//!
//! Supported surface:
//! - CREATE/DROP DATABASE, CREATE/DROP TABLE
//! - INSERT, SELECT, UPDATE, DELETE with WHERE
//!   (`AND`, `=`, `!=`, `>`, `<`, `>=`, `<=`, `IN`, `IS [NOT] NULL`)
//! - Typed columns with PRIMARY KEY / NOT NULL / UNIQUE / DEFAULT,
//!   SERIAL auto-increment, and array columns with `||` append and `-`
//!   remove
//!
//! All state lives on disk; every statement re-reads the table it
//! touches and writes whole files back. There are no transactions, no
//! indexes and no cross-statement locking.

pub mod engine;
pub mod error;
pub mod metadata;
pub mod ops;
pub mod rows;
pub mod sql;
mod storage;
pub mod types;

pub use engine::{Csvgres, DEFAULT_DATABASE};
pub use error::EngineError;
pub use metadata::{ColumnMeta, TableMetadata};
pub use ops::{data::DataOperations, database::DatabaseOperations, table::TableOperations};
pub use rows::RowSet;
pub use sql::columns::ColumnDefinition;
pub use sql::predicate::RowPredicate;
pub use types::handler::TypeHandler;
pub use types::{Row, Value};
